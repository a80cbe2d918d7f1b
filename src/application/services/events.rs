use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;

use crate::domain::ports::{EventStore, GenerateRequest, GenerativeModel};
use crate::domain::{prompt, DomainError};

/// Event management plus event-grounded Q&A: answers use only the stored
/// description of the named event.
pub struct EventService {
    store: Arc<dyn EventStore>,
    model: Arc<dyn GenerativeModel>,
    // Serializes the load-modify-save cycle; the store alone only guards
    // individual reads and writes.
    write_lock: Mutex<()>,
}

impl EventService {
    pub fn new(store: Arc<dyn EventStore>, model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            store,
            model,
            write_lock: Mutex::new(()),
        }
    }

    #[instrument(skip(self, description))]
    pub async fn upsert(&self, name: &str, description: &str) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock().await;
        let mut book = self.store.load().await?;
        book.upsert(name, description)?;
        self.store.save(&book).await?;
        tracing::info!(event = name, "event saved");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock().await;
        let mut book = self.store.load().await?;
        book.remove(name)?;
        self.store.save(&book).await?;
        tracing::info!(event = name, "event deleted");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<String>, DomainError> {
        Ok(self.store.load().await?.names())
    }

    pub async fn description(&self, name: &str) -> Result<String, DomainError> {
        self.store
            .load()
            .await?
            .description(name)
            .map(String::from)
            .ok_or_else(|| DomainError::not_found(format!("event '{name}'")))
    }

    /// Answers a question about one event, grounded only in its description.
    #[instrument(skip(self))]
    pub async fn ask(&self, name: &str, question: &str) -> Result<String, DomainError> {
        if question.trim().is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }

        let description = self.description(name).await?;
        let rendered = prompt::EVENT_EXPERT.render(&[
            ("event_name", name),
            ("description", &description),
            ("question", question),
        ])?;

        self.model.generate(&GenerateRequest::text(rendered)).await
    }
}
