//! Optical character recognition for pages without a text layer.

#[cfg(feature = "onnx-ocr")]
mod onnx;
mod tesseract;

#[cfg(feature = "onnx-ocr")]
pub use onnx::OnnxRecognizer;
pub use tesseract::TesseractRecognizer;

use image::DynamicImage;

use crate::error::OcrError;

/// Trait for OCR engines.
pub trait Recognizer: Send + Sync {
    /// Recognize the text of one page image.
    ///
    /// # Arguments
    /// * `image` - Rasterized page
    /// * `language` - Tesseract-style language code, e.g. `eng`
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError>;
}
