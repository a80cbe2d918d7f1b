use async_trait::async_trait;

use crate::domain::{errors::DomainError, DocumentWindow, Embedding, ScoredWindow};

/// A local nearest-neighbor index over document windows, keyed by an opaque
/// corpus identifier. Writing an existing identifier replaces its entire
/// index; there is no incremental update.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Replaces the index stored under `corpus_id` with the given pairs,
    /// persisting the corpus source text alongside them.
    async fn replace(
        &self,
        corpus_id: &str,
        source_text: &str,
        entries: Vec<(DocumentWindow, Embedding)>,
    ) -> Result<(), DomainError>;

    /// Returns the `k` stored windows nearest to `query` by cosine
    /// similarity, best first.
    async fn search(
        &self,
        corpus_id: &str,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<ScoredWindow>, DomainError>;

    async fn contains(&self, corpus_id: &str) -> Result<bool, DomainError>;

    /// The source text persisted when the corpus was ingested.
    async fn source_text(&self, corpus_id: &str) -> Result<String, DomainError>;

    async fn delete(&self, corpus_id: &str) -> Result<(), DomainError>;
}
