mod command;

pub use command::{ CommandRecognizer, CommandSpeaker };

use async_trait::async_trait;
use log::info;
use thiserror::Error;

use crate::cli::Args;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("speech {0} is not configured")]
    Unavailable(&'static str),

    #[error("invalid voice command: {0}")]
    InvalidCommand(String),

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },
}

/// Reads bot replies aloud. A new utterance cancels the one in flight.
pub trait Speaker: Send {
    fn speak(&mut self, text: &str) -> Result<(), VoiceError>;
}

/// Single-shot speech capture.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// `Ok(None)` when nothing was heard.
    async fn listen(&self) -> Result<Option<String>, VoiceError>;
}

pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&mut self, _text: &str) -> Result<(), VoiceError> {
        Ok(())
    }
}

pub struct NoRecognizer;

#[async_trait]
impl Recognizer for NoRecognizer {
    async fn listen(&self) -> Result<Option<String>, VoiceError> {
        Err(VoiceError::Unavailable("recognition"))
    }
}

pub fn create_speaker(args: &Args) -> Result<Box<dyn Speaker>, VoiceError> {
    match args.tts_command.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(command) => {
            info!("Speech output via: {}", command);
            Ok(Box::new(CommandSpeaker::parse(command)?))
        }
        None => {
            info!("Speech output not configured; replies stay silent.");
            Ok(Box::new(SilentSpeaker))
        }
    }
}

pub fn create_recognizer(args: &Args) -> Result<Box<dyn Recognizer>, VoiceError> {
    match args.stt_command.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(command) => {
            info!("Speech input via: {} ({})", command, args.speech_locale);
            Ok(Box::new(CommandRecognizer::parse(command, &args.speech_locale)?))
        }
        None => Ok(Box::new(NoRecognizer)),
    }
}
