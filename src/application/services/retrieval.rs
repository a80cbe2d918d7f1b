use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::domain::ports::{Embedder, GenerateRequest, GenerativeModel, VectorIndex};
use crate::domain::{prompt, split_windows, DomainError};

/// Fixed reply used when retrieval finds nothing; the generation model is not
/// called in that case.
pub const NO_RELEVANT_INFORMATION: &str =
    "Could not find relevant information in the documents for your question.";

#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub corpus_id: String,
    pub windows: usize,
}

/// The retrieval-augmented answer flow: ingest a corpus into the local
/// vector index, then answer questions grounded only in retrieved windows.
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    model: Arc<dyn GenerativeModel>,
    window_chars: usize,
    overlap_chars: usize,
    top_k: usize,
    sentiment_max_chars: usize,
}

impl RetrievalService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        model: Arc<dyn GenerativeModel>,
        window_chars: usize,
        overlap_chars: usize,
        top_k: usize,
        sentiment_max_chars: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            model,
            window_chars,
            overlap_chars,
            top_k,
            sentiment_max_chars,
        }
    }

    /// Splits the corpus into overlapping windows, embeds every window, and
    /// replaces the index stored under `corpus_id`.
    ///
    /// An empty corpus or any embedding failure aborts ingestion before the
    /// index is touched, so a previously ingested corpus stays intact.
    #[instrument(skip(self, text), fields(corpus_id))]
    pub async fn ingest(
        &self,
        corpus_id: &str,
        text: &str,
    ) -> Result<IngestSummary, DomainError> {
        let windows = split_windows(text, self.window_chars, self.overlap_chars)?;

        let contents: Vec<&str> = windows.iter().map(|w| w.content.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&contents).await?;

        if embeddings.len() != windows.len() {
            return Err(DomainError::internal(format!(
                "embedding count {} does not match window count {}",
                embeddings.len(),
                windows.len()
            )));
        }

        let count = windows.len();
        let entries = windows.into_iter().zip(embeddings).collect();
        self.index.replace(corpus_id, text, entries).await?;

        tracing::info!(corpus_id, windows = count, "corpus ingested");
        Ok(IngestSummary {
            corpus_id: corpus_id.to_string(),
            windows: count,
        })
    }

    /// Answers a question from the `top_k` windows nearest to it, grounded
    /// only in the retrieved text.
    #[instrument(skip(self))]
    pub async fn ask(&self, corpus_id: &str, question: &str) -> Result<String, DomainError> {
        if question.trim().is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }

        let query = self.embedder.embed(question).await?;
        let results = self.index.search(corpus_id, &query, self.top_k).await?;

        if results.is_empty() {
            return Ok(NO_RELEVANT_INFORMATION.to_string());
        }

        let context = results
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[{}] {}", i + 1, r.window.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let rendered = prompt::GROUNDED_ANSWER
            .render(&[("context", &context), ("question", question)])?;

        self.model.generate(&GenerateRequest::text(rendered)).await
    }

    /// Sentiment analysis over the corpus source text, truncated to the
    /// configured maximum before prompting.
    #[instrument(skip(self))]
    pub async fn sentiment(&self, corpus_id: &str) -> Result<String, DomainError> {
        let source = self.index.source_text(corpus_id).await?;
        if source.trim().is_empty() {
            return Err(DomainError::ingestion(
                "no text available for sentiment analysis",
            ));
        }

        let truncated: String = source.chars().take(self.sentiment_max_chars).collect();
        if truncated.len() < source.len() {
            tracing::info!(
                corpus_id,
                max_chars = self.sentiment_max_chars,
                "sentiment input truncated"
            );
        }

        let rendered = prompt::SENTIMENT.render(&[("text", &truncated)])?;
        self.model
            .generate(&GenerateRequest::text(rendered).with_temperature(0.4))
            .await
    }

    pub async fn delete(&self, corpus_id: &str) -> Result<(), DomainError> {
        self.index.delete(corpus_id).await
    }

    pub async fn is_ready(&self, corpus_id: &str) -> Result<bool, DomainError> {
        self.index.contains(corpus_id).await
    }
}
