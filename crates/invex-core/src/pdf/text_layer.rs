//! Per-page text extraction using lopdf.

use std::path::Path;

use tracing::{debug, trace};

use super::{load_document, Result, TextLayer};
use crate::error::PdfError;

/// Reads the text layer of a PDF page by page.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfTextLayer;

impl LopdfTextLayer {
    /// Create a new text-layer reader.
    pub fn new() -> Self {
        Self
    }
}

impl TextLayer for LopdfTextLayer {
    fn load(&self, path: &Path) -> Result<Vec<String>> {
        let doc = load_document(path)?;
        let pages = doc.get_pages();

        let mut texts = Vec::with_capacity(pages.len());
        for &number in pages.keys() {
            let text = doc
                .extract_text(&[number])
                .map_err(|e| PdfError::TextExtraction(format!("page {number}: {e}")))?;
            trace!("Page {} has {} chars of text", number, text.len());
            texts.push(text);
        }

        debug!("Loaded text layer of {} pages from {}", texts.len(), path.display());
        Ok(texts)
    }
}
