use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::ports::EventStore;
use crate::domain::{DomainError, EventBook};

/// Whole-file JSON persistence for the event book. A missing file reads as an
/// empty book; every save rewrites the complete file.
pub struct JsonEventStore {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl JsonEventStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DomainError::internal(format!("could not create event store directory: {e}"))
            })?;
        }
        Ok(Self {
            path,
            io_lock: Mutex::new(()),
        })
    }
}

#[async_trait]
impl EventStore for JsonEventStore {
    async fn load(&self) -> Result<EventBook, DomainError> {
        let _guard = self.io_lock.lock().await;
        if !self.path.exists() {
            return Ok(EventBook::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| DomainError::internal(format!("could not read event store: {e}")))?;
        serde_json::from_str(&raw).map_err(|e| {
            DomainError::internal(format!(
                "corrupt event store {}: {e}",
                self.path.display()
            ))
        })
    }

    async fn save(&self, book: &EventBook) -> Result<(), DomainError> {
        let _guard = self.io_lock.lock().await;
        let json = serde_json::to_string_pretty(book)
            .map_err(|e| DomainError::internal(format!("could not serialize events: {e}")))?;
        std::fs::write(&self.path, json)
            .map_err(|e| DomainError::internal(format!("could not write event store: {e}")))
    }
}
