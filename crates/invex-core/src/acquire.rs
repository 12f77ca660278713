//! Document text acquisition with OCR fallback.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{AcquisitionError, InvexError};
use crate::models::config::{InvexConfig, OcrBackend, RasterizerKind};
use crate::models::record::{AcquisitionMode, Document};
use crate::ocr::{Recognizer, TesseractRecognizer};
use crate::pdf::{EmbeddedImageRasterizer, LopdfTextLayer, PopplerRasterizer, Rasterizer, TextLayer};

/// Default OCR language.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Obtains the text of a PDF.
///
/// The text layer is tried first. When it cannot be read, has no pages, or
/// its first page is blank after trimming, every page is rasterized and
/// recognized instead. A single call never mixes the two sources.
pub struct TextAcquirer {
    text_layer: Box<dyn TextLayer>,
    rasterizer: Box<dyn Rasterizer>,
    recognizer: Box<dyn Recognizer>,
    language: String,
}

impl TextAcquirer {
    /// Create an acquirer from its three capabilities.
    pub fn new(
        text_layer: impl TextLayer + 'static,
        rasterizer: impl Rasterizer + 'static,
        recognizer: impl Recognizer + 'static,
    ) -> Self {
        Self {
            text_layer: Box::new(text_layer),
            rasterizer: Box::new(rasterizer),
            recognizer: Box::new(recognizer),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Build an acquirer from configuration.
    pub fn from_config(config: &InvexConfig) -> Result<Self, InvexError> {
        let rasterizer: Box<dyn Rasterizer> = match config.pdf.rasterizer {
            RasterizerKind::EmbeddedImages => Box::new(EmbeddedImageRasterizer::new()),
            RasterizerKind::Poppler => Box::new(PopplerRasterizer::new(config.pdf.render_dpi)),
        };

        let recognizer: Box<dyn Recognizer> = match config.ocr.backend {
            OcrBackend::Tesseract => Box::new(TesseractRecognizer::new()),
            #[cfg(feature = "onnx-ocr")]
            OcrBackend::Onnx => Box::new(
                crate::ocr::OnnxRecognizer::from_dir(&config.ocr.model_dir)
                    .map_err(|e| InvexError::Config(e.to_string()))?
                    .with_keep_unk(config.ocr.keep_unk),
            ),
            #[cfg(not(feature = "onnx-ocr"))]
            OcrBackend::Onnx => {
                return Err(InvexError::Config(
                    "ONNX OCR backend requires the `onnx-ocr` feature".to_string(),
                ));
            }
        };

        Ok(Self {
            text_layer: Box::new(LopdfTextLayer::new()),
            rasterizer,
            recognizer,
            language: config.ocr.language.clone(),
        })
    }

    /// Set the OCR language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Acquire the text of the PDF at `path`.
    pub fn acquire(&self, path: &Path) -> Result<Document, AcquisitionError> {
        match self.text_layer.load(path) {
            Ok(pages) if has_text_layer(&pages) => {
                debug!("Using text layer of {} ({} pages)", path.display(), pages.len());
                return Ok(Document {
                    path: path.to_path_buf(),
                    page_count: pages.len(),
                    text: pages.join("\n"),
                    mode: AcquisitionMode::TextLayer,
                });
            }
            Ok(_) => warn!("First page of {} has no text, trying OCR", path.display()),
            Err(e) => warn!("Text layer of {} unavailable ({}), trying OCR", path.display(), e),
        }

        self.acquire_ocr(path)
    }

    fn acquire_ocr(&self, path: &Path) -> Result<Document, AcquisitionError> {
        let start = Instant::now();

        let images = self
            .rasterizer
            .rasterize(path)
            .map_err(|source| AcquisitionError::Rasterize {
                path: path.to_path_buf(),
                source,
            })?;

        if images.is_empty() {
            return Err(AcquisitionError::NoPages(path.to_path_buf()));
        }

        let mut pages = Vec::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            let text = self
                .recognizer
                .recognize(image, &self.language)
                .map_err(|source| AcquisitionError::Recognize { page: i + 1, source })?;
            debug!("Page {} OCR: {} chars", i + 1, text.len());
            pages.push(text);
        }

        info!(
            "OCR of {} pages from {} took {}ms",
            pages.len(),
            path.display(),
            start.elapsed().as_millis()
        );

        Ok(Document {
            path: path.to_path_buf(),
            page_count: pages.len(),
            text: pages.join("\n"),
            mode: AcquisitionMode::Ocr,
        })
    }
}

/// A text layer counts only if its first page has non-whitespace content.
fn has_text_layer(pages: &[String]) -> bool {
    pages.first().is_some_and(|p| !p.trim().is_empty())
}
