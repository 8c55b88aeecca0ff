use async_trait::async_trait;
use log::debug;
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use tokio::fs;

use crate::history::{ HistoryError, StorageBackend };
use crate::models::chat::Conversation;

/// Keeps the whole conversation array in one JSON file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn read_all(&self) -> Result<Vec<Conversation>, HistoryError> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No conversation file at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(HistoryError::Io(e));
            }
        };

        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        // a stored `null` reads as an empty history
        serde_json
            ::from_str::<Option<Vec<Conversation>>>(&json)
            .map(Option::unwrap_or_default)
            .map_err(|e|
                HistoryError::Deserialization(format!("{}: {}", self.path.display(), e))
            )
    }

    async fn write_all(&self, conversations: &[Conversation]) -> Result<(), HistoryError> {
        let json = serde_json
            ::to_string(conversations)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        fs::write(&temp, json).await?;
        fs::rename(&temp, &self.path).await?;
        debug!("Wrote {} conversation(s) to {}", conversations.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file at {}", self.path.display())
    }
}
