use async_trait::async_trait;
use log::{ debug, warn };
use std::process::Stdio;
use tokio::process::{ Child, Command };

use super::{ Recognizer, Speaker, VoiceError };

fn split_command(command: &str) -> Result<(String, Vec<String>), VoiceError> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next().ok_or_else(|| VoiceError::InvalidCommand(command.to_string()))?;
    Ok((program, parts.collect()))
}

/// Runs an external text-to-speech program per reply.
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    current: Option<Child>,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args, current: None }
    }

    pub fn parse(command: &str) -> Result<Self, VoiceError> {
        let (program, args) = split_command(command)?;
        Ok(Self::new(program, args))
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            if let Err(e) = child.start_kill() {
                // already finished on its own
                debug!("Previous utterance not killed: {}", e);
            }
        }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str) -> Result<(), VoiceError> {
        self.cancel();
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| VoiceError::Spawn { program: self.program.clone(), source })?;
        self.current = Some(child);
        Ok(())
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs an external speech-to-text program once per capture.
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
    locale: String,
}

impl CommandRecognizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, locale: impl Into<String>) -> Self {
        Self { program: program.into(), args, locale: locale.into() }
    }

    pub fn parse(command: &str, locale: &str) -> Result<Self, VoiceError> {
        let (program, args) = split_command(command)?;
        Ok(Self::new(program, args, locale))
    }
}

#[async_trait]
impl Recognizer for CommandRecognizer {
    async fn listen(&self) -> Result<Option<String>, VoiceError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .env("SPEECH_LOCALE", &self.locale)
            .stdin(Stdio::null())
            .output().await
            .map_err(|source| VoiceError::Spawn { program: self.program.clone(), source })?;

        if !output.status.success() {
            warn!("Speech recognizer '{}' failed", self.program);
            return Err(VoiceError::Failed { program: self.program.clone(), status: output.status });
        }

        // first result, first alternative
        let transcript = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string);
        debug!("Recognized: {:?}", transcript);
        Ok(transcript)
    }
}
