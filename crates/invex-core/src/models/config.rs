//! Configuration structures for the extraction pipeline.

use std::path::PathBuf;
use std::time::Duration;

use invex_llm::{GeminiConfig, DEFAULT_GEMINI_ENDPOINT};
use serde::{Deserialize, Serialize};

use crate::extraction::TaskKind;

/// Main configuration for the invex pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// OCR fallback configuration.
    pub ocr: OcrConfig,

    /// Language-model client configuration.
    pub llm: LlmConfig,

    /// Model identifier per extraction task.
    pub tasks: TaskModelConfig,
}

/// How page images are produced for OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RasterizerKind {
    /// Decode the image objects embedded in each page (scanned PDFs).
    EmbeddedImages,
    /// Render pages with poppler's `pdftoppm`.
    Poppler,
}

/// OCR engine used for the fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OcrBackend {
    /// The `tesseract` command-line tool.
    Tesseract,
    /// PaddleOCR models through `pure-onnx-ocr`.
    Onnx,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// DPI for rendering PDF pages to images.
    pub render_dpi: u32,

    /// Page image source for OCR.
    pub rasterizer: RasterizerKind,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            render_dpi: 300,
            rasterizer: RasterizerKind::Poppler,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition engine.
    pub backend: OcrBackend,

    /// Recognition language (tesseract language code).
    pub language: String,

    /// Directory with `det.onnx`, `latin_rec.onnx` and `latin_dict.txt`.
    pub model_dir: PathBuf,

    /// Keep `[UNK]` tokens in ONNX recognition output.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Tesseract,
            language: "eng".to_string(),
            model_dir: PathBuf::from("models"),
            keep_unk: false,
        }
    }
}

/// Language-model client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the Generative Language API.
    pub endpoint: String,

    /// API key. Usually supplied on the command line or via environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Timeout for a single model request, in seconds.
    pub timeout_secs: u64,

    /// Issue the task requests concurrently.
    pub parallel: bool,

    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Output token limit per request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: 120,
            parallel: false,
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl LlmConfig {
    /// Build the client settings for the given API key.
    pub fn gemini_config(&self, api_key: impl Into<String>) -> GeminiConfig {
        GeminiConfig {
            api_key: api_key.into(),
            endpoint: self.endpoint.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
        }
    }
}

/// Model identifier per extraction task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskModelConfig {
    /// Model for invoice header data.
    pub general: String,

    /// Model for supplier and customer data.
    pub supplier_customer: String,

    /// Model for line items.
    pub item: String,

    /// Model for totals.
    pub total: String,
}

impl Default for TaskModelConfig {
    fn default() -> Self {
        Self {
            general: "gemini-1.5-flash-8b".to_string(),
            supplier_customer: "gemini-1.5-flash-8b".to_string(),
            item: "gemini-2.0-flash-exp".to_string(),
            total: "gemini-2.0-flash-exp".to_string(),
        }
    }
}

impl TaskModelConfig {
    /// Model identifier for a task.
    pub fn model_for(&self, kind: TaskKind) -> &str {
        match kind {
            TaskKind::General => &self.general,
            TaskKind::SupplierCustomer => &self.supplier_customer,
            TaskKind::Item => &self.item,
            TaskKind::Total => &self.total,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_task_models() {
        let models = TaskModelConfig::default();
        assert_eq!(models.model_for(TaskKind::General), "gemini-1.5-flash-8b");
        assert_eq!(models.model_for(TaskKind::SupplierCustomer), "gemini-1.5-flash-8b");
        assert_eq!(models.model_for(TaskKind::Item), "gemini-2.0-flash-exp");
        assert_eq!(models.model_for(TaskKind::Total), "gemini-2.0-flash-exp");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: InvexConfig =
            serde_json::from_str(r#"{ "llm": { "parallel": true }, "ocr": { "backend": "onnx" } }"#)
                .unwrap();

        assert!(config.llm.parallel);
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.ocr.backend, OcrBackend::Onnx);
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.pdf.rasterizer, RasterizerKind::Poppler);
    }

    #[test]
    fn test_api_key_not_written_when_unset() {
        let json = serde_json::to_value(InvexConfig::default()).unwrap();
        assert!(json["llm"].get("api_key").is_none());
        assert_eq!(json["pdf"]["rasterizer"], "poppler");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = InvexConfig::default();
        config.tasks.item = "gemini-1.5-pro".to_string();
        config.pdf.rasterizer = RasterizerKind::EmbeddedImages;
        config.save(&path).unwrap();

        let loaded = InvexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.tasks.item, "gemini-1.5-pro");
        assert_eq!(loaded.pdf.rasterizer, RasterizerKind::EmbeddedImages);
    }

    #[test]
    fn test_gemini_config_from_llm_config() {
        let mut llm = LlmConfig::default();
        llm.timeout_secs = 30;
        llm.temperature = Some(0.1);

        let gemini = llm.gemini_config("secret");
        assert_eq!(gemini.api_key, "secret");
        assert_eq!(gemini.timeout, Duration::from_secs(30));
        assert_eq!(gemini.temperature, Some(0.1));
        assert_eq!(gemini.endpoint, DEFAULT_GEMINI_ENDPOINT);
    }
}
