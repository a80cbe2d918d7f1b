use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// The full set of events, keyed by name. Uniqueness is enforced by the key;
/// upserting an existing name overwrites its description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventBook {
    pub events: BTreeMap<String, String>,
}

impl EventBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), DomainError> {
        let name = name.into();
        let description = description.into();
        if name.trim().is_empty() || description.trim().is_empty() {
            return Err(DomainError::validation(
                "event name and description are both required",
            ));
        }
        self.events.insert(name, description);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), DomainError> {
        self.events
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DomainError::not_found(format!("event '{name}'")))
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.events.get(name).map(String::as_str)
    }

    pub fn names(&self) -> Vec<String> {
        self.events.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_overwrites_existing() {
        let mut book = EventBook::new();
        book.upsert("RustConf", "annual conference").unwrap();
        book.upsert("RustConf", "moved to September").unwrap();

        assert_eq!(book.description("RustConf"), Some("moved to September"));
        assert_eq!(book.names().len(), 1);
    }

    #[test]
    fn test_upsert_rejects_blank_fields() {
        let mut book = EventBook::new();
        assert!(book.upsert("", "something").is_err());
        assert!(book.upsert("name", "  ").is_err());
        assert!(book.is_empty());
    }

    #[test]
    fn test_remove_deletes_exactly_one_entry() {
        let mut book = EventBook::new();
        book.upsert("a", "first").unwrap();
        book.upsert("b", "second").unwrap();

        book.remove("a").unwrap();

        assert_eq!(book.description("a"), None);
        assert_eq!(book.description("b"), Some("second"));
    }

    #[test]
    fn test_remove_missing_reports_not_found() {
        let mut book = EventBook::new();
        book.upsert("kept", "still here").unwrap();

        let err = book.remove("ghost").unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(book.description("kept"), Some("still here"));
    }
}
