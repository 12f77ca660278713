//! PDF text-layer loading and page rasterization.

mod images;
mod poppler;
mod text_layer;

pub use images::EmbeddedImageRasterizer;
pub use poppler::PopplerRasterizer;
pub use text_layer::LopdfTextLayer;

use std::path::Path;

use image::DynamicImage;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Source of the machine-readable text embedded in a PDF.
pub trait TextLayer: Send + Sync {
    /// Load the text of every page, in page order.
    fn load(&self, path: &Path) -> Result<Vec<String>>;
}

/// Turns the pages of a PDF into images for OCR.
pub trait Rasterizer: Send + Sync {
    /// Produce one image per page, in page order.
    fn rasterize(&self, path: &Path) -> Result<Vec<DynamicImage>>;
}

/// Load a PDF with lopdf, decrypting files protected by an empty password.
pub(crate) fn load_document(path: &Path) -> Result<lopdf::Document> {
    let mut doc = lopdf::Document::load(path).map_err(|e| PdfError::Parse(e.to_string()))?;

    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        tracing::debug!("Decrypted {} with empty password", path.display());
    }

    if doc.get_pages().is_empty() {
        return Err(PdfError::NoPages);
    }

    Ok(doc)
}
