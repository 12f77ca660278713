//! Core library for LLM-assisted invoice extraction.
//!
//! This crate provides:
//! - Document text acquisition (PDF text layer with OCR fallback)
//! - A declarative catalog of extraction tasks and their prompts
//! - Orchestration of one language-model pass per task
//! - Response sanitization and all-or-nothing result merging

pub mod acquire;
pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pdf;

pub use acquire::TextAcquirer;
pub use error::{
    AcquisitionError, ExtractionError, InvexError, OcrError, PdfError, Result, SanitizeError, SanitizeStage,
};
pub use extraction::{
    sanitize, sanitize_bytes, ExtractionOrchestrator, InvoicePipeline, ResultMerger, TaskCatalog,
    TaskKind, TaskOutcome, TaskSpec,
};
pub use models::config::InvexConfig;
pub use models::record::{AcquisitionMode, CompositeResult, Document, ExtractionReport, PartialResult};
pub use ocr::{Recognizer, TesseractRecognizer};
#[cfg(feature = "onnx-ocr")]
pub use ocr::OnnxRecognizer;
pub use pdf::{EmbeddedImageRasterizer, LopdfTextLayer, PopplerRasterizer, Rasterizer, TextLayer};

/// Re-export language-model types.
pub use invex_llm::{GeminiClient, GeminiConfig, LanguageModel, LlmError};
