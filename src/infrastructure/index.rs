//! Local nearest-neighbor index with flat-file persistence.
//!
//! One JSON file per corpus identifier under the index directory; indexes are
//! loaded lazily on first use and kept in memory afterwards. Replacing a
//! corpus rewrites its whole file; there is no incremental update.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::ports::VectorIndex;
use crate::domain::{DocumentWindow, DomainError, Embedding, ScoredWindow};

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    corpus_id: String,
    dimension: usize,
    source_text: String,
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    window: DocumentWindow,
    embedding: Embedding,
}

pub struct LocalVectorIndex {
    dir: PathBuf,
    loaded: RwLock<HashMap<String, IndexFile>>,
}

impl LocalVectorIndex {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            DomainError::internal(format!(
                "could not create index directory {}: {e}",
                dir.display()
            ))
        })?;
        Ok(Self {
            dir,
            loaded: RwLock::new(HashMap::new()),
        })
    }

    fn file_path(&self, corpus_id: &str) -> Result<PathBuf, DomainError> {
        validate_corpus_id(corpus_id)?;
        Ok(self.dir.join(format!("{corpus_id}.json")))
    }

    /// Ensures the corpus is resident, loading it from disk if a file exists.
    /// Returns false when the corpus is unknown both in memory and on disk.
    async fn ensure_loaded(&self, corpus_id: &str) -> Result<bool, DomainError> {
        if self.loaded.read().await.contains_key(corpus_id) {
            return Ok(true);
        }

        let path = self.file_path(corpus_id)?;
        if !path.exists() {
            return Ok(false);
        }

        let file = read_index_file(&path)?;
        self.loaded
            .write()
            .await
            .insert(corpus_id.to_string(), file);
        Ok(true)
    }
}

fn validate_corpus_id(corpus_id: &str) -> Result<(), DomainError> {
    let valid = !corpus_id.is_empty()
        && corpus_id.len() <= 64
        && corpus_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DomainError::validation(
            "corpus id must be 1-64 characters of [A-Za-z0-9_-]",
        ))
    }
}

fn read_index_file(path: &Path) -> Result<IndexFile, DomainError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| DomainError::internal(format!("could not read index file: {e}")))?;
    serde_json::from_str(&raw)
        .map_err(|e| DomainError::internal(format!("corrupt index file {}: {e}", path.display())))
}

fn write_index_file(path: &Path, file: &IndexFile) -> Result<(), DomainError> {
    let json = serde_json::to_string(file)
        .map_err(|e| DomainError::internal(format!("could not serialize index: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| DomainError::internal(format!("could not write index file: {e}")))
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn replace(
        &self,
        corpus_id: &str,
        source_text: &str,
        entries: Vec<(DocumentWindow, Embedding)>,
    ) -> Result<(), DomainError> {
        let path = self.file_path(corpus_id)?;

        let dimension = entries
            .first()
            .map(|(_, e)| e.dimension())
            .unwrap_or_default();
        if entries.iter().any(|(_, e)| e.dimension() != dimension) {
            return Err(DomainError::internal(
                "embedding dimensions are inconsistent within one corpus",
            ));
        }

        let file = IndexFile {
            corpus_id: corpus_id.to_string(),
            dimension,
            source_text: source_text.to_string(),
            entries: entries
                .into_iter()
                .map(|(window, embedding)| IndexEntry { window, embedding })
                .collect(),
        };

        // Holding the write lock across the file write keeps writers
        // serialized per the single-writer discipline.
        let mut loaded = self.loaded.write().await;
        write_index_file(&path, &file)?;
        loaded.insert(corpus_id.to_string(), file);
        Ok(())
    }

    async fn search(
        &self,
        corpus_id: &str,
        query: &Embedding,
        k: usize,
    ) -> Result<Vec<ScoredWindow>, DomainError> {
        if !self.ensure_loaded(corpus_id).await? {
            return Err(DomainError::not_ready(format!(
                "no index for corpus '{corpus_id}'; ingest it first"
            )));
        }

        let loaded = self.loaded.read().await;
        let file = loaded
            .get(corpus_id)
            .ok_or_else(|| DomainError::internal("index vanished between load and search"))?;

        if file.dimension != 0 && query.dimension() != file.dimension {
            return Err(DomainError::validation(format!(
                "query dimension {} does not match index dimension {}",
                query.dimension(),
                file.dimension
            )));
        }

        let mut results: Vec<ScoredWindow> = file
            .entries
            .iter()
            .map(|entry| ScoredWindow {
                window: entry.window.clone(),
                score: query.cosine_similarity(&entry.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(results.into_iter().take(k).collect())
    }

    async fn contains(&self, corpus_id: &str) -> Result<bool, DomainError> {
        self.ensure_loaded(corpus_id).await
    }

    async fn source_text(&self, corpus_id: &str) -> Result<String, DomainError> {
        if !self.ensure_loaded(corpus_id).await? {
            return Err(DomainError::not_ready(format!(
                "no index for corpus '{corpus_id}'; ingest it first"
            )));
        }
        let loaded = self.loaded.read().await;
        Ok(loaded
            .get(corpus_id)
            .map(|f| f.source_text.clone())
            .unwrap_or_default())
    }

    async fn delete(&self, corpus_id: &str) -> Result<(), DomainError> {
        let path = self.file_path(corpus_id)?;
        let mut loaded = self.loaded.write().await;
        let existed = loaded.remove(corpus_id).is_some() || path.exists();
        if !existed {
            return Err(DomainError::not_found(format!("corpus '{corpus_id}'")));
        }
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| DomainError::internal(format!("could not delete index: {e}")))?;
        }
        Ok(())
    }
}
