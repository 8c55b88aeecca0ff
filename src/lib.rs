pub mod agent;
pub mod calc;
pub mod cli;
pub mod history;
pub mod models;
pub mod repl;
pub mod server;
pub mod state;
pub mod view;
pub mod voice;

use agent::CalcAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Store Type: {}", args.store_type);
    info!("Store Path: {}", args.store_path);
    info!("Voice Replies: {}", args.voice_enabled);
    info!("TTS Command: {}", args.tts_command.as_deref().unwrap_or("none"));
    info!("STT Command: {}", args.stt_command.as_deref().unwrap_or("none"));
    info!("Speech Locale: {}", args.speech_locale);
    info!("Thinking Delay: {} ms", args.thinking_delay_ms);
    info!("Serve Mode: {}", args.serve);
    if args.serve {
        info!("Server Address: {}", args.server_addr);
        info!("HTTP API Port: {}", args.http_port.map(|p| p.to_string()).unwrap_or_else(|| "disabled".into()));
    }
    info!("-------------------------");

    if !args.serve {
        return repl::run(&args).await;
    }

    let agent = CalcAgent::new(&args).await?;
    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, agent, &args);
    server.run().await?;

    Ok(())
}
