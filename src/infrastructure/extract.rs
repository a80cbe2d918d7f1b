//! Text extraction from uploaded binary documents.

use crate::domain::DomainError;

pub const MIME_PDF: &str = "application/pdf";

/// Extracts the text of one PDF. Fails with an ingestion error when the file
/// is unreadable (scanned, encrypted, or corrupted).
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, DomainError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| DomainError::ingestion(format!("could not read text from PDF: {e}")))
}

/// Extracts and concatenates text from several PDFs, in upload order.
///
/// Files that cannot be read are skipped with a warning as long as at least
/// one file yields text; when nothing at all is extracted the whole ingestion
/// fails.
pub fn extract_pdf_corpus(documents: &[(String, Vec<u8>)]) -> Result<String, DomainError> {
    if documents.is_empty() {
        return Err(DomainError::validation("no documents supplied"));
    }

    let mut corpus = String::new();
    for (name, bytes) in documents {
        match extract_pdf_text(bytes) {
            Ok(text) => corpus.push_str(&text),
            Err(e) => {
                tracing::warn!(document = %name, error = %e, "skipping unreadable document");
            }
        }
    }

    if corpus.trim().is_empty() {
        return Err(DomainError::ingestion(
            "no text could be extracted from the supplied documents; \
             they may be image-based or empty",
        ));
    }

    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pdf_returns_ingestion_error() {
        let err = extract_pdf_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, DomainError::Ingestion(_)));
    }

    #[test]
    fn test_empty_document_list_is_rejected() {
        let err = extract_pdf_corpus(&[]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn test_all_unreadable_documents_fail_ingestion() {
        let docs = vec![
            ("a.pdf".to_string(), b"junk".to_vec()),
            ("b.pdf".to_string(), b"more junk".to_vec()),
        ];
        let err = extract_pdf_corpus(&docs).unwrap_err();
        assert!(matches!(err, DomainError::Ingestion(_)));
    }
}
