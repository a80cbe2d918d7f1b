use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::ports::HistoryArchive;
use crate::domain::{DomainError, SessionRecord};

/// One JSON file per image-analysis session under the history directory,
/// plus an append-only plain-text question log.
pub struct FileHistoryArchive {
    dir: PathBuf,
    question_log: PathBuf,
    log_lock: Mutex<()>,
}

impl FileHistoryArchive {
    pub fn new(
        dir: impl Into<PathBuf>,
        question_log: impl Into<PathBuf>,
    ) -> Result<Self, DomainError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            DomainError::internal(format!("could not create history directory: {e}"))
        })?;
        Ok(Self {
            dir,
            question_log: question_log.into(),
            log_lock: Mutex::new(()),
        })
    }

    fn session_path(&self, name: &str) -> Result<PathBuf, DomainError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || name.contains("..")
        {
            return Err(DomainError::validation("invalid history entry name"));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

/// Filenames follow the original layout: image name plus save timestamp.
fn entry_name(record: &SessionRecord) -> String {
    let stem: String = record
        .image_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stamp = record.saved_at.format("%Y-%m-%d_%H-%M-%S");
    format!("{stem}_{stamp}")
}

#[async_trait]
impl HistoryArchive for FileHistoryArchive {
    async fn save_session(&self, record: &SessionRecord) -> Result<String, DomainError> {
        let name = entry_name(record);
        let path = self.session_path(&name)?;
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| DomainError::internal(format!("could not serialize session: {e}")))?;
        std::fs::write(&path, json)
            .map_err(|e| DomainError::internal(format!("could not write session file: {e}")))?;
        Ok(name)
    }

    async fn list_sessions(&self) -> Result<Vec<String>, DomainError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| DomainError::internal(format!("could not list history: {e}")))?;

        let mut names: Vec<(String, std::time::SystemTime)> = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| DomainError::internal(format!("could not list history: {e}")))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            names.push((stem.to_string(), modified));
        }

        names.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(names.into_iter().map(|(name, _)| name).collect())
    }

    async fn load_session(&self, name: &str) -> Result<SessionRecord, DomainError> {
        let path = self.session_path(name)?;
        if !path.exists() {
            return Err(DomainError::not_found(format!("history entry '{name}'")));
        }
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| DomainError::internal(format!("could not read session file: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| DomainError::internal(format!("corrupt session file '{name}': {e}")))
    }

    async fn log_question(&self, question: &str) -> Result<(), DomainError> {
        let _guard = self.log_lock.lock().await;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.question_log)
            .map_err(|e| DomainError::internal(format!("could not open question log: {e}")))?;
        writeln!(file, "{}", question.replace('\n', " "))
            .map_err(|e| DomainError::internal(format!("could not append question log: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConversationTurn;
    use chrono::Utc;

    fn record(image_name: &str) -> SessionRecord {
        SessionRecord {
            image_name: image_name.to_string(),
            saved_at: Utc::now(),
            description: "a description".to_string(),
            turns: vec![ConversationTurn::new("q", "a")],
        }
    }

    fn archive(dir: &std::path::Path) -> FileHistoryArchive {
        FileHistoryArchive::new(dir.join("chat_history"), dir.join("questions.log")).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load_session() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = archive(dir.path());

        let name = archive.save_session(&record("vacation photo")).await.unwrap();
        assert!(name.starts_with("vacation_photo_"));

        let loaded = archive.load_session(&name).await.unwrap();
        assert_eq!(loaded.description, "a description");
        assert_eq!(loaded.turns.len(), 1);
    }

    #[tokio::test]
    async fn test_list_sessions_returns_saved_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = archive(dir.path());

        let first = archive.save_session(&record("one")).await.unwrap();
        let second = archive.save_session(&record("two")).await.unwrap();

        let names = archive.list_sessions().await.unwrap();
        assert!(names.contains(&first));
        assert!(names.contains(&second));
    }

    #[tokio::test]
    async fn test_load_missing_session_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = archive(dir.path());

        let err = archive.load_session("nope_2024-01-01_00-00-00").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_question_log_appends_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = archive(dir.path());

        archive.log_question("what is DNS?").await.unwrap();
        archive.log_question("multi\nline").await.unwrap();

        let log = std::fs::read_to_string(dir.path().join("questions.log")).unwrap();
        assert_eq!(log, "what is DNS?\nmulti line\n");
    }
}
