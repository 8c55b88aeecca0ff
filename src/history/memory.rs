use async_trait::async_trait;
use std::sync::Mutex;

use crate::history::{ HistoryError, StorageBackend };
use crate::models::chat::Conversation;

/// In-process slot. Holds the serialized array, not live values, so it
/// behaves like the on-disk slot.
#[derive(Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, HistoryError> {
        self.slot.lock().map_err(|e| HistoryError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn read_all(&self) -> Result<Vec<Conversation>, HistoryError> {
        match self.slot()?.as_deref() {
            None => Ok(Vec::new()),
            Some(json) =>
                serde_json
                    ::from_str::<Option<Vec<Conversation>>>(json)
                    .map(Option::unwrap_or_default)
                    .map_err(|e| HistoryError::Deserialization(e.to_string())),
        }
    }

    async fn write_all(&self, conversations: &[Conversation]) -> Result<(), HistoryError> {
        let json = serde_json
            ::to_string(conversations)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;
        *self.slot()? = Some(json);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
