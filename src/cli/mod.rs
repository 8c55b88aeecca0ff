use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Chat-style calculator for plain-language arithmetic", long_about = None)]
pub struct Args {
    // --- Conversation Store Args ---
    /// Conversation store type (file, memory)
    #[arg(long, env = "STORE_TYPE", default_value = "file")]
    pub store_type: String,

    /// Path of the JSON file holding every conversation (file store only)
    #[arg(long, env = "STORE_PATH", default_value = "data/conversations.json")]
    pub store_path: String,

    // --- Voice Args ---
    /// Speak bot replies aloud
    #[arg(long, env = "VOICE_ENABLED", default_value = "true", action = clap::ArgAction::Set)]
    pub voice_enabled: bool,

    /// Text-to-speech program; the reply text is passed as its last argument (e.g. "espeak -s 160")
    #[arg(long, env = "TTS_COMMAND")]
    pub tts_command: Option<String>,

    /// Speech-to-text program; its first non-empty stdout line is used as the utterance
    #[arg(long, env = "STT_COMMAND")]
    pub stt_command: Option<String>,

    /// Locale handed to the speech-to-text program via SPEECH_LOCALE
    #[arg(long, env = "SPEECH_LOCALE", default_value = "en-US")]
    pub speech_locale: String,

    // --- Chat Args ---
    /// Simulated thinking time between a question and its answer, in milliseconds
    #[arg(long, env = "THINKING_DELAY_MS", default_value = "600")]
    pub thinking_delay_ms: u64,

    // --- Server Args ---
    /// Run the WebSocket server instead of the terminal chat
    #[arg(long, env = "SERVE", default_value = "false")]
    pub serve: bool,

    /// Host address and port for the WebSocket server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Optional API Key required for clients to connect to the WebSocket server. If set, clients must provide this key.
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    /// Port for the read-only HTTP API (disabled when unset)
    #[arg(long, env = "HTTP_PORT")]
    pub http_port: Option<u16>,

    // --- General App Args ---
    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

impl Args {
    pub fn thinking_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.thinking_delay_ms)
    }
}
