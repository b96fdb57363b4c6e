//! Source document loading.
//!
//! Turns the configured file into a [`SourceDocument`] made of pages.
//! PDFs go through `pdf-extract`; every other file is read as UTF-8
//! text and becomes a single page.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::Path;

use crate::models::{Page, SourceDocument};

/// Page separator emitted by `pdf-extract` between pages.
const FORM_FEED: char = '\x0c';

/// Load the document at `path`.
///
/// # Errors
///
/// - the file does not exist or cannot be read,
/// - PDF extraction fails,
/// - the document has no extractable text.
pub fn load_document(path: &Path) -> Result<SourceDocument> {
    if !path.exists() {
        bail!("document not found: {}", path.display());
    }

    let pages = if is_pdf(path) {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        extract_pdf_pages(&bytes)
            .with_context(|| format!("Failed to extract text from {}", path.display()))?
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        vec![Page { number: 1, text }]
    };

    let doc = SourceDocument {
        path: path.to_path_buf(),
        pages,
        loaded_at: Utc::now(),
    };

    if doc.full_text().trim().is_empty() {
        bail!(
            "document contains no extractable text: {}",
            path.display()
        );
    }

    tracing::debug!(
        path = %doc.path.display(),
        pages = doc.pages.len(),
        "document loaded"
    );

    Ok(doc)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<Page>> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e))?;
    Ok(split_pages(&text))
}

/// Split extracted PDF text on form feeds, dropping blank pages.
fn split_pages(text: &str) -> Vec<Page> {
    text.split(FORM_FEED)
        .enumerate()
        .filter(|(_, t)| !t.trim().is_empty())
        .map(|(i, t)| Page {
            number: i + 1,
            text: t.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_text_file_single_page() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("policy.txt");
        fs::write(&path, "The speed limit is 60 km/h.").unwrap();

        let before = Utc::now();
        let doc = load_document(&path).unwrap();
        assert!(doc.loaded_at >= before);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].number, 1);
        assert_eq!(doc.full_text(), "The speed limit is 60 km/h.");
    }

    #[test]
    fn test_missing_file() {
        let err = load_document(Path::new("/nonexistent/policy.pdf")).unwrap_err();
        assert!(err.to_string().contains("document not found"));
    }

    #[test]
    fn test_blank_file_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blank.md");
        fs::write(&path, "  \n\n ").unwrap();
        let err = load_document(&path).unwrap_err();
        assert!(err.to_string().contains("no extractable text"));
    }

    #[test]
    fn test_corrupt_pdf_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.PDF");
        fs::write(&path, b"not a valid pdf").unwrap();
        assert!(load_document(&path).is_err());
    }

    #[test]
    fn test_split_pages_drops_blank_pages() {
        let pages = split_pages("first page\x0c\n\x0cthird page");
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[1].number, 3);
        assert_eq!(pages[1].text, "third page");
    }

    #[test]
    fn test_full_text_joins_pages() {
        let doc = SourceDocument {
            path: "x.pdf".into(),
            pages: vec![
                Page {
                    number: 1,
                    text: "one".to_string(),
                },
                Page {
                    number: 2,
                    text: "two".to_string(),
                },
            ],
            loaded_at: Utc::now(),
        };
        assert_eq!(doc.full_text(), "one\n\ntwo");
    }
}
