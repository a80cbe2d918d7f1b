use async_trait::async_trait;

use crate::domain::{errors::DomainError, EventBook};

/// Whole-file persistence for the event book: load everything, mutate in
/// memory, save everything back. Callers serialize their read-modify-write
/// cycles; the store itself guarantees only that individual loads and saves
/// are not interleaved.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn load(&self) -> Result<EventBook, DomainError>;
    async fn save(&self, book: &EventBook) -> Result<(), DomainError>;
}
