use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;

/// A bounded contiguous slice of corpus text used as a retrieval unit.
///
/// Adjacent windows share a fixed character overlap so that answers spanning
/// a window boundary are still retrievable from either side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentWindow {
    pub id: Uuid,
    pub index: usize,
    pub content: String,
}

impl DocumentWindow {
    pub fn new(index: usize, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            index,
            content: content.into(),
        }
    }
}

/// A retrieved window with its similarity score against the query vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredWindow {
    pub window: DocumentWindow,
    pub score: f32,
}

/// Splits corpus text into windows of at most `window` characters with
/// `overlap` characters shared between consecutive windows.
///
/// Windows are produced in document order and every character of the input
/// appears in at least one window. Counts are in characters, so multi-byte
/// text is never split inside a code point.
pub fn split_windows(
    text: &str,
    window: usize,
    overlap: usize,
) -> Result<Vec<DocumentWindow>, DomainError> {
    if window == 0 {
        return Err(DomainError::validation("window size must be positive"));
    }
    if overlap >= window {
        return Err(DomainError::validation(
            "overlap must be smaller than window size",
        ));
    }
    if text.trim().is_empty() {
        return Err(DomainError::ingestion("empty corpus"));
    }

    let chars: Vec<char> = text.chars().collect();
    let step = window - overlap;
    let mut windows = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + window).min(chars.len());
        let content: String = chars[start..end].iter().collect();
        windows.push(DocumentWindow::new(windows.len(), content));

        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_windows_with_overlap() {
        let windows = split_windows("AAAAABBBBBCCCCC", 10, 5).unwrap();

        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].content, "AAAAABBBBB");
        assert_eq!(windows[1].content, "BBBBBCCCCC");
        assert_eq!(windows[0].index, 0);
        assert_eq!(windows[1].index, 1);
    }

    #[test]
    fn test_split_windows_single_window() {
        let windows = split_windows("short", 100, 10).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].content, "short");
    }

    #[test]
    fn test_split_windows_covers_every_character() {
        let text: String = ('a'..='z').cycle().take(137).collect();
        let window = 40;
        let overlap = 15;
        let windows = split_windows(&text, window, overlap).unwrap();

        let step = window - overlap;
        for (i, w) in windows.iter().enumerate() {
            let expected_start = i * step;
            let expected: String = text
                .chars()
                .skip(expected_start)
                .take(window)
                .collect();
            assert_eq!(w.content, expected);
        }

        // Non-overlapping advances cover the corpus within one window of slack.
        let advanced = (windows.len() - 1) * step + windows.last().unwrap().content.chars().count();
        assert_eq!(advanced, text.chars().count());
    }

    #[test]
    fn test_split_windows_adjacent_overlap_preserved() {
        let text: String = "0123456789".repeat(5);
        let windows = split_windows(&text, 20, 8).unwrap();

        for pair in windows.windows(2) {
            let tail: String = pair[0].content.chars().rev().take(8).collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            assert!(pair[1].content.starts_with(&tail));
        }
    }

    #[test]
    fn test_split_windows_empty_corpus_fails() {
        let err = split_windows("   \n\t", 10, 2).unwrap_err();
        assert!(matches!(err, DomainError::Ingestion(_)));
    }

    #[test]
    fn test_split_windows_rejects_bad_overlap() {
        let err = split_windows("hello", 5, 5).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_split_windows_multibyte_text() {
        let text = "日本語のテキストを分割する".repeat(4);
        let windows = split_windows(&text, 10, 3).unwrap();
        assert!(windows.iter().all(|w| w.content.chars().count() <= 10));
    }
}
