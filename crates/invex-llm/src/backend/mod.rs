//! Language-model backend implementations.

pub mod gemini;

use async_trait::async_trait;

use crate::Result;

/// Trait for text completion backends.
///
/// A backend turns one prompt into one plain-text answer. There is no
/// streaming and no function calling; the caller decides how to interpret
/// the text it gets back.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt` with the model addressed by `model`.
    ///
    /// # Arguments
    /// * `model` - Backend-specific model identifier
    /// * `prompt` - Fully rendered prompt text
    ///
    /// # Returns
    /// The model's raw text response
    async fn complete(&self, model: &str, prompt: &str) -> Result<String>;

    /// Short backend name used in logs.
    fn name(&self) -> &str;
}
