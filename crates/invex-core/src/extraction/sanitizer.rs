//! Cleanup of raw model responses before JSON parsing.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::trace;

use crate::error::{SanitizeError, SanitizeStage};

lazy_static! {
    /// Opening fence, optionally tagged `json`, at the start of a line.
    static ref FENCE_OPEN: Regex = Regex::new(r"^\s*```[ \t]*(?i:json)?").unwrap();

    /// Closing fence at the end of a line.
    static ref FENCE_CLOSE: Regex = Regex::new(r"```\s*$").unwrap();
}

/// Clean a model response into text ready for a JSON parser.
///
/// Non-breaking spaces become plain spaces, byte-order marks are dropped,
/// code-fence markers are stripped (lines left empty by that are removed) and
/// the result is trimmed. Never fails, and applying it twice changes nothing.
pub fn sanitize(raw: &str) -> String {
    let normalized: String = raw
        .chars()
        .filter(|&c| c != '\u{feff}')
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .collect();

    let mut lines = Vec::new();
    for line in normalized.lines() {
        let stripped = FENCE_OPEN.replace(line, "");
        let stripped = FENCE_CLOSE.replace(&stripped, "");

        if stripped.len() != line.len() && stripped.trim().is_empty() {
            continue;
        }
        lines.push(stripped.into_owned());
    }

    let cleaned = lines.join("\n").trim().to_string();
    trace!("Sanitized response: {} -> {} bytes", raw.len(), cleaned.len());
    cleaned
}

/// Clean a response received as raw bytes.
///
/// Fails at the decode stage if the bytes are not UTF-8.
pub fn sanitize_bytes(raw: &[u8]) -> Result<String, SanitizeError> {
    let text = std::str::from_utf8(raw).map_err(|e| SanitizeError {
        stage: SanitizeStage::Decode,
        reason: e.to_string(),
    })?;
    Ok(sanitize(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    #[test]
    fn test_fenced_response_with_nbsp() {
        let raw = " \u{a0}```json\n{\"a\": \"1\"}\n``` ";

        let cleaned = sanitize(raw);

        assert_eq!(cleaned, "{\"a\": \"1\"}");
        let value: Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(value, json!({ "a": "1" }));
    }

    #[test]
    fn test_plain_json_untouched() {
        let raw = "{\n  \"Invoice number\": \"123\"\n}";
        assert_eq!(sanitize(raw), raw);
    }

    #[test]
    fn test_fence_variants() {
        assert_eq!(sanitize("```JSON\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(sanitize("```\n{}\n```"), "{}");
        assert_eq!(sanitize("```json {\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(sanitize("\u{feff}{\"a\": 1}\r\n"), "{\"a\": 1}");
    }

    #[test]
    fn test_nbsp_inside_json() {
        let raw = "```json\n{\u{a0}\"Total\":\u{a0}\"10.00\"}\n```";
        assert_eq!(sanitize(raw), "{ \"Total\": \"10.00\"}");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            " \u{a0}```json\n{\"a\": \"1\"}\n``` ",
            "```json\n{\n  \"Item data\": [\n    {\"x\": \"None\"}\n  ]\n}\n```\n",
            "   {\"a\": 1}   ",
            "",
            "not json at all",
        ];

        for raw in inputs {
            let once = sanitize(raw);
            assert_eq!(sanitize(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn test_round_trip_fenced_object() {
        let original = json!({
            "Supplier data": { "Supplier Name": "ACME GmbH", "Supplier City": "Berlin" },
            "Customer data": "None"
        });
        let pretty = serde_json::to_string_pretty(&original).unwrap();
        let raw = format!("\u{a0}\n  ```json\u{a0}\n{pretty}\n```\u{a0}\n\n");

        let parsed: Value = serde_json::from_str(&sanitize(&raw)).unwrap();

        assert_eq!(parsed, original);
    }

    #[test]
    fn test_sanitize_bytes() {
        assert_eq!(sanitize_bytes(b"```json\n{}\n```").unwrap(), "{}");

        let err = sanitize_bytes(&[b'{', 0xff, b'}']).unwrap_err();
        assert_eq!(err.stage, SanitizeStage::Decode);
        assert!(err.to_string().starts_with("decode stage failed"));
    }
}
