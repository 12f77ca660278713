//! Acquired documents and extraction results.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extraction::TaskKind;

/// How the text of a document was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Read from the PDF text layer.
    TextLayer,
    /// Recognized from page images.
    Ocr,
}

/// A PDF whose text has been acquired.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source file.
    pub path: PathBuf,
    /// Full document text, pages joined with newlines.
    pub text: String,
    /// Source of the text.
    pub mode: AcquisitionMode,
    /// Number of pages read or recognized.
    pub page_count: usize,
}

/// The merged output of all extraction tasks.
///
/// Holds exactly one record per task, keyed by [`TaskKind::result_key`] in
/// catalog order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CompositeResult {
    records: Map<String, Value>,
}

impl CompositeResult {
    pub(crate) fn from_records(records: Map<String, Value>) -> Self {
        Self { records }
    }

    /// Record extracted by a task.
    pub fn get(&self, kind: TaskKind) -> Option<&Value> {
        self.records.get(kind.result_key())
    }

    /// Result keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Number of task records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are present.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Convert into a JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.records)
    }
}

/// Merged output where failed tasks carry an error marker instead of a record.
#[derive(Debug, Clone, Serialize)]
pub struct PartialResult {
    /// Task records or `{"error": "..."}` markers, keyed by result key.
    pub records: Map<String, Value>,
    /// Tasks that failed.
    pub failed: Vec<TaskKind>,
}

impl PartialResult {
    /// Whether every task produced a record.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A composite result with metadata about how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Source file.
    pub source: PathBuf,
    /// Source of the document text.
    pub mode: AcquisitionMode,
    /// Pages read or recognized.
    pub page_count: usize,
    /// Model identifier used per result key.
    pub models: Map<String, Value>,
    /// Completion time.
    pub extracted_at: DateTime<Utc>,
    /// Wall-clock time of the whole call in milliseconds.
    pub processing_time_ms: u64,
    /// Merged task records.
    pub result: CompositeResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_composite_serializes_transparently() {
        let mut records = Map::new();
        records.insert("General_data".to_string(), json!({ "Invoice number": "1" }));
        let composite = CompositeResult::from_records(records);

        assert_eq!(
            serde_json::to_value(&composite).unwrap(),
            json!({ "General_data": { "Invoice number": "1" } })
        );
        assert_eq!(
            composite.get(TaskKind::General),
            Some(&json!({ "Invoice number": "1" }))
        );
        assert!(composite.get(TaskKind::Total).is_none());
    }

    #[test]
    fn test_acquisition_mode_serialization() {
        assert_eq!(serde_json::to_value(AcquisitionMode::TextLayer).unwrap(), "text_layer");
        assert_eq!(serde_json::to_value(AcquisitionMode::Ocr).unwrap(), "ocr");
    }
}
