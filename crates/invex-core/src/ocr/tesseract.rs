//! OCR through the `tesseract` command-line tool.

use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use tracing::{debug, trace};

use super::Recognizer;
use crate::error::OcrError;

/// Runs `tesseract <image> stdout -l <language>` for each page.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: PathBuf,
}

impl TesseractRecognizer {
    /// Create a recognizer using `tesseract` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
        }
    }

    /// Use a specific `tesseract` executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<String, OcrError> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| OcrError::InvalidImage(format!("failed to create temp dir: {e}")))?;
        let image_path = temp_dir.path().join("page.png");

        image
            .save_with_format(&image_path, image::ImageFormat::Png)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;

        trace!("Running {} on {}", self.program.display(), image_path.display());

        let output = Command::new(&self.program)
            .arg(&image_path)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .output()
            .map_err(|e| {
                OcrError::EngineLoad(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(OcrError::Recognition(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract recognized {} chars", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_engine_error() {
        let recognizer = TesseractRecognizer::new().with_program("/nonexistent/tesseract");
        let image = DynamicImage::new_rgb8(4, 4);

        let result = recognizer.recognize(&image, "eng");
        assert!(matches!(result, Err(OcrError::EngineLoad(_))));
    }
}
