mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use log::{ info, warn };
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::cli::Args;
use crate::models::chat::Conversation;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// One durable slot holding every conversation as a single JSON array.
/// Reads and writes always move the whole array.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn read_all(&self) -> Result<Vec<Conversation>, HistoryError>;

    async fn write_all(&self, conversations: &[Conversation]) -> Result<(), HistoryError>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreType {
    File,
    Memory,
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("Invalid store type: '{0}'")]
pub struct ParseStoreTypeError(String);

impl FromStr for StoreType {
    type Err = ParseStoreTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StoreType::File),
            "memory" => Ok(StoreType::Memory),
            _ => Err(ParseStoreTypeError(s.to_string())),
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreType::File => write!(f, "file"),
            StoreType::Memory => write!(f, "memory"),
        }
    }
}

pub fn create_storage_backend(
    args: &Args
) -> Result<Arc<dyn StorageBackend>, ParseStoreTypeError> {
    let backend: Arc<dyn StorageBackend> = match args.store_type.parse()? {
        StoreType::File => Arc::new(FileStorage::new(&args.store_path)),
        StoreType::Memory => Arc::new(MemoryStorage::new()),
    };
    info!("Conversations will be stored in: {}", backend.describe());
    Ok(backend)
}

/// Newest-first list of conversations mirrored to a [`StorageBackend`].
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    backend: Arc<dyn StorageBackend>,
}

impl ConversationStore {
    /// Reads the slot once. Duplicate ids keep their first occurrence.
    pub async fn open(backend: Arc<dyn StorageBackend>) -> Result<Self, HistoryError> {
        let stored = backend.read_all().await?;
        let mut seen = HashSet::new();
        let mut conversations = Vec::with_capacity(stored.len());
        for conversation in stored {
            if seen.insert(conversation.id) {
                conversations.push(conversation);
            } else {
                warn!("Dropping duplicate stored conversation {}", conversation.id);
            }
        }
        info!("Loaded {} conversation(s) from {}", conversations.len(), backend.describe());
        Ok(Self { conversations, backend })
    }

    pub fn list(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: i64) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Replaces the entry with the same id in place, or inserts at the front.
    /// The in-memory list is updated even when persisting fails.
    pub async fn save(&mut self, conversation: &Conversation) -> Result<(), HistoryError> {
        match self.conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => {
                *existing = conversation.clone();
            }
            None => self.conversations.insert(0, conversation.clone()),
        }
        self.persist().await
    }

    /// Returns whether anything was removed. Persists either way.
    pub async fn remove(&mut self, id: i64) -> Result<bool, HistoryError> {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        let removed = self.conversations.len() != before;
        self.persist().await?;
        Ok(removed)
    }

    async fn persist(&self) -> Result<(), HistoryError> {
        self.backend.write_all(&self.conversations).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::chat::ChatMessage;

    /// Backend whose writes always fail, for storage-outage paths.
    pub(crate) struct BrokenStorage;

    #[async_trait]
    impl StorageBackend for BrokenStorage {
        async fn read_all(&self) -> Result<Vec<Conversation>, HistoryError> {
            Ok(Vec::new())
        }

        async fn write_all(&self, _: &[Conversation]) -> Result<(), HistoryError> {
            Err(HistoryError::Unavailable("quota exceeded".to_string()))
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    fn conversation(id: i64, text: &str) -> Conversation {
        let mut conv = Conversation::new(id);
        conv.push(ChatMessage::user(text));
        conv
    }

    #[test]
    fn parses_store_types() {
        assert_eq!("file".parse::<StoreType>(), Ok(StoreType::File));
        assert_eq!(" Memory ".parse::<StoreType>(), Ok(StoreType::Memory));
        assert!("redis".parse::<StoreType>().is_err());
    }

    #[tokio::test]
    async fn save_inserts_newest_first() {
        let mut store = ConversationStore::open(Arc::new(MemoryStorage::new())).await.unwrap();
        store.save(&conversation(1, "first")).await.unwrap();
        store.save(&conversation(2, "second")).await.unwrap();

        let ids: Vec<i64> = store.list().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn saving_same_id_twice_replaces_in_place() {
        let mut store = ConversationStore::open(Arc::new(MemoryStorage::new())).await.unwrap();
        let mut first = conversation(1, "first");
        store.save(&first).await.unwrap();
        store.save(&conversation(2, "second")).await.unwrap();

        first.push(ChatMessage::bot("Answer: 1", None));
        store.save(&first).await.unwrap();
        store.save(&first).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.list()[1].id, 1);
        assert_eq!(store.list()[1].messages.len(), 2);
    }

    #[tokio::test]
    async fn remove_reports_whether_anything_changed() {
        let mut store = ConversationStore::open(Arc::new(MemoryStorage::new())).await.unwrap();
        store.save(&conversation(1, "first")).await.unwrap();

        assert!(!store.remove(99).await.unwrap());
        assert!(store.remove(1).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn reopening_round_trips_order_and_messages() {
        let backend = Arc::new(MemoryStorage::new());
        let mut store = ConversationStore::open(backend.clone()).await.unwrap();
        for id in 1..=3 {
            let mut conv = conversation(id, &format!("{id} add {id}"));
            conv.push(ChatMessage::bot(format!("Answer: {}", id * 2), Some(format!("{id} + {id}"))));
            store.save(&conv).await.unwrap();
        }

        let reopened = ConversationStore::open(backend).await.unwrap();
        assert_eq!(reopened.list(), store.list());
    }

    #[tokio::test]
    async fn duplicate_ids_in_slot_are_collapsed() {
        let backend = Arc::new(MemoryStorage::new());
        backend.write_all(&[conversation(5, "kept"), conversation(5, "dropped")]).await.unwrap();

        let store = ConversationStore::open(backend).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.list()[0].title, "kept");
    }

    #[tokio::test]
    async fn failed_write_keeps_in_memory_state() {
        let mut store = ConversationStore::open(Arc::new(BrokenStorage)).await.unwrap();
        let result = store.save(&conversation(1, "first")).await;

        assert!(matches!(result, Err(HistoryError::Unavailable(_))));
        assert!(store.contains(1));
    }
}
