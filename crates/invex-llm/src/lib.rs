//! Language-model abstraction layer for invex.
//!
//! This crate provides a single text-in, text-out interface over hosted
//! language models:
//! - `LanguageModel`, the completion trait the extraction pipeline calls
//! - `GeminiClient`, a backend for the Google Generative Language API

mod backend;
mod error;

pub use backend::LanguageModel;
pub use backend::gemini::{GeminiClient, GeminiConfig, DEFAULT_GEMINI_ENDPOINT};
pub use error::LlmError;

/// Result type for language-model operations.
pub type Result<T> = std::result::Result<T, LlmError>;
