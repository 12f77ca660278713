//! OCR with PaddleOCR models through `pure-onnx-ocr`.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use super::Recognizer;
use crate::error::OcrError;

/// A recognized line with its top-left corner.
struct Line {
    x: f32,
    y: f32,
    text: String,
}

/// Recognizer backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).
///
/// The recognition model fixes the script, so the language argument only
/// shows up in logs.
pub struct OnnxRecognizer {
    engine: pure_onnx_ocr::engine::OcrEngine,
    keep_unk: bool,
}

impl OnnxRecognizer {
    /// Create a recognizer from `det.onnx`, `latin_rec.onnx` and
    /// `latin_dict.txt` in `model_dir`.
    pub fn from_dir(model_dir: &Path) -> Result<Self, OcrError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("latin_rec.onnx");
        let dict_path = model_dir.join("latin_dict.txt");

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::EngineLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self {
            engine,
            keep_unk: false,
        })
    }

    /// Keep `[UNK]` tokens instead of replacing them with spaces.
    pub fn with_keep_unk(mut self, keep_unk: bool) -> Self {
        self.keep_unk = keep_unk;
        self
    }
}

impl Recognizer for OnnxRecognizer {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        debug!("Recognizing {}x{} page (language hint {})", width, height, language);

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        let mut lines: Vec<Line> = results
            .iter()
            .map(|r| {
                let (x, y) = r
                    .bounding_box
                    .exterior()
                    .coords()
                    .fold((f32::INFINITY, f32::INFINITY), |(x, y), c| {
                        (x.min(c.x as f32), y.min(c.y as f32))
                    });
                let text = if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                Line { x, y, text }
            })
            .collect();

        sort_reading_order(&mut lines);

        let text = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            "OCR complete: {} lines in {}ms",
            lines.len(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

/// Sort top-to-bottom in 20 px rows, then left-to-right.
fn sort_reading_order(lines: &mut [Line]) {
    lines.sort_by(|a, b| {
        let row_a = (a.y / 20.0) as i32;
        let row_b = (b.y / 20.0) as i32;
        if row_a != row_b {
            row_a.cmp(&row_b)
        } else {
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
        }
    });
}
