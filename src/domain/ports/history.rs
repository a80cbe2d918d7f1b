use async_trait::async_trait;

use crate::domain::{errors::DomainError, SessionRecord};

/// Flat-file archive for image-analysis sessions plus the append-only
/// question log.
#[async_trait]
pub trait HistoryArchive: Send + Sync {
    /// Writes (or rewrites) the session record, returning the archive entry
    /// name it was stored under.
    async fn save_session(&self, record: &SessionRecord) -> Result<String, DomainError>;

    /// Archive entry names, newest first.
    async fn list_sessions(&self) -> Result<Vec<String>, DomainError>;

    async fn load_session(&self, name: &str) -> Result<SessionRecord, DomainError>;

    /// Appends one submitted question to the plain-text log.
    async fn log_question(&self, question: &str) -> Result<(), DomainError>;
}
