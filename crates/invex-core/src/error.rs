//! Error types for the invex-core library.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::extraction::TaskKind;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Document text could not be acquired.
    #[error("acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    /// A model response could not be prepared for parsing.
    #[error("sanitization error: {0}")]
    Sanitize(#[from] SanitizeError),

    /// An extraction task failed.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to turn pages into images.
    #[error("failed to render pages: {0}")]
    Render(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// I/O error while reading the file or temporary output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models or start the engine.
    #[error("failed to load engine: {0}")]
    EngineLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Failed to hand the image over to the engine.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised while acquiring document text.
///
/// Only the OCR fallback produces these: a missing or empty text layer is a
/// signal to fall back, never a failure on its own.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Page rasterization failed.
    #[error("failed to rasterize {}: {source}", .path.display())]
    Rasterize {
        path: PathBuf,
        #[source]
        source: PdfError,
    },

    /// Rasterization produced no page images.
    #[error("no page images produced for {}", .0.display())]
    NoPages(PathBuf),

    /// Recognition failed on a page (1-indexed).
    #[error("OCR failed on page {page}: {source}")]
    Recognize {
        page: usize,
        #[source]
        source: OcrError,
    },
}

/// Stage of response sanitization.
///
/// Only decoding can fail; the cleaning steps that follow are total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeStage {
    /// Decoding raw bytes as UTF-8.
    Decode,
}

impl fmt::Display for SanitizeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizeStage::Decode => write!(f, "decode"),
        }
    }
}

/// A model response could not be cleaned.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {reason}")]
pub struct SanitizeError {
    /// Stage that failed.
    pub stage: SanitizeStage,
    /// Description of the failure.
    pub reason: String,
}

/// Errors related to the extraction tasks.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The language model could not be invoked for a task.
    #[error("model invocation failed for {task}: {source}")]
    Model {
        task: TaskKind,
        #[source]
        source: invex_llm::LlmError,
    },

    /// A sanitized task response was not valid JSON.
    #[error("failed to parse {task} response as JSON: {source}")]
    Parse {
        task: TaskKind,
        #[source]
        source: serde_json::Error,
    },

    /// A prompt template is unusable.
    #[error("invalid prompt template for {task}: {reason}")]
    Template { task: TaskKind, reason: String },

    /// The task catalog is inconsistent.
    #[error("invalid task catalog: {0}")]
    Catalog(String),

    /// No outcome was produced for a task.
    #[error("no outcome for task {0}")]
    MissingTask(TaskKind),
}

impl ExtractionError {
    /// Task the error belongs to, if any.
    pub fn task(&self) -> Option<TaskKind> {
        match self {
            ExtractionError::Model { task, .. }
            | ExtractionError::Parse { task, .. }
            | ExtractionError::Template { task, .. } => Some(*task),
            ExtractionError::MissingTask(task) => Some(*task),
            ExtractionError::Catalog(_) => None,
        }
    }
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
