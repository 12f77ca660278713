//! Assembles task responses into one composite record.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::orchestrator::TaskOutcome;
use super::sanitizer::sanitize;
use super::tasks::TaskKind;
use crate::error::ExtractionError;
use crate::models::record::{CompositeResult, PartialResult};

/// Parses sanitized task responses and merges them by result key.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResultMerger;

impl ResultMerger {
    /// Create a merger.
    pub fn new() -> Self {
        Self
    }

    /// Merge all four task outcomes.
    ///
    /// All or nothing: the first failed task, in catalog order, fails the
    /// whole merge.
    pub fn merge(&self, outcomes: Vec<TaskOutcome>) -> Result<CompositeResult, ExtractionError> {
        let mut outcomes = outcomes;
        let mut records = Map::new();

        for kind in TaskKind::ALL {
            let outcome = take_outcome(&mut outcomes, kind).ok_or(ExtractionError::MissingTask(kind))?;
            let value = parse_outcome(outcome)?;
            records.insert(kind.result_key().to_string(), value);
        }

        debug!("Merged {} task records", records.len());
        Ok(CompositeResult::from_records(records))
    }

    /// Merge whatever succeeded, marking failed tasks with `{"error": ...}`.
    pub fn merge_partial(&self, outcomes: Vec<TaskOutcome>) -> PartialResult {
        let mut outcomes = outcomes;
        let mut records = Map::new();
        let mut failed = Vec::new();

        for kind in TaskKind::ALL {
            let parsed = take_outcome(&mut outcomes, kind)
                .ok_or(ExtractionError::MissingTask(kind))
                .and_then(parse_outcome);

            let value = match parsed {
                Ok(value) => value,
                Err(e) => {
                    warn!("Task {} left out of result: {}", kind, e);
                    failed.push(kind);
                    json!({ "error": e.to_string() })
                }
            };
            records.insert(kind.result_key().to_string(), value);
        }

        PartialResult { records, failed }
    }
}

fn take_outcome(outcomes: &mut Vec<TaskOutcome>, kind: TaskKind) -> Option<TaskOutcome> {
    let index = outcomes.iter().position(|o| o.task == kind)?;
    Some(outcomes.swap_remove(index))
}

fn parse_outcome(outcome: TaskOutcome) -> Result<Value, ExtractionError> {
    let raw = outcome.response?;
    let cleaned = sanitize(&raw);
    serde_json::from_str(&cleaned).map_err(|source| ExtractionError::Parse {
        task: outcome.task,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use invex_llm::LlmError;

    fn ok(task: TaskKind, raw: &str) -> TaskOutcome {
        TaskOutcome {
            task,
            model: "m".to_string(),
            response: Ok(raw.to_string()),
        }
    }

    fn failed(task: TaskKind) -> TaskOutcome {
        TaskOutcome {
            task,
            model: "m".to_string(),
            response: Err(ExtractionError::Model {
                task,
                source: LlmError::Timeout { model: "m".to_string() },
            }),
        }
    }

    fn valid() -> Vec<TaskOutcome> {
        vec![
            ok(TaskKind::General, "```json\n{\"Invoice number\": \"123\"}\n```"),
            ok(TaskKind::SupplierCustomer, "{\"Supplier data\": {\"Supplier Name\": \"ACME\"}}"),
            ok(TaskKind::Item, "\u{a0}{\"Item data\": [{\"Service or product quantity\": \"2\"}]}"),
            ok(TaskKind::Total, "{\"Total gross amount\": \"119.00\"}"),
        ]
    }

    #[test]
    fn test_merge_has_exactly_four_keys() {
        let composite = ResultMerger::new().merge(valid()).unwrap();

        let keys: Vec<&str> = composite.keys().collect();
        assert_eq!(
            keys,
            vec!["General_data", "Supplier_customer_data", "Item_data", "Total_amount"]
        );
        assert_eq!(
            composite.get(TaskKind::General),
            Some(&json!({ "Invoice number": "123" }))
        );
        assert_eq!(
            composite.get(TaskKind::Item),
            Some(&json!({ "Item data": [{ "Service or product quantity": "2" }] }))
        );
    }

    #[test]
    fn test_merge_orders_by_task_not_arrival() {
        let mut outcomes = valid();
        outcomes.reverse();

        let composite = ResultMerger::new().merge(outcomes).unwrap();

        assert_eq!(composite.keys().next(), Some("General_data"));
        assert_eq!(composite.len(), 4);
    }

    #[test]
    fn test_unparseable_item_fails_merge() {
        let mut outcomes = valid();
        outcomes[2] = ok(TaskKind::Item, "Sorry, I cannot read this invoice.");

        let err = ResultMerger::new().merge(outcomes).unwrap_err();

        assert!(matches!(err, ExtractionError::Parse { task: TaskKind::Item, .. }));
        assert_eq!(err.task(), Some(TaskKind::Item));
    }

    #[test]
    fn test_first_failure_in_catalog_order_wins() {
        let mut outcomes = valid();
        outcomes[3] = ok(TaskKind::Total, "{ broken");
        outcomes[1] = failed(TaskKind::SupplierCustomer);

        let err = ResultMerger::new().merge(outcomes).unwrap_err();

        assert!(matches!(err, ExtractionError::Model { task: TaskKind::SupplierCustomer, .. }));
    }

    #[test]
    fn test_missing_outcome() {
        let mut outcomes = valid();
        outcomes.pop();

        let err = ResultMerger::new().merge(outcomes).unwrap_err();

        assert!(matches!(err, ExtractionError::MissingTask(TaskKind::Total)));
    }

    #[test]
    fn test_merge_partial_marks_failures() {
        let mut outcomes = valid();
        outcomes[2] = ok(TaskKind::Item, "not json");
        outcomes[3] = failed(TaskKind::Total);

        let partial = ResultMerger::new().merge_partial(outcomes);

        assert!(!partial.is_complete());
        assert_eq!(partial.failed, vec![TaskKind::Item, TaskKind::Total]);
        assert_eq!(partial.records.len(), 4);
        assert_eq!(partial.records["General_data"], json!({ "Invoice number": "123" }));
        assert!(
            partial.records["Item_data"]["error"]
                .as_str()
                .unwrap()
                .starts_with("failed to parse item response as JSON")
        );
        assert!(partial.records["Total_amount"]["error"].is_string());
    }

    #[test]
    fn test_merge_partial_complete() {
        let partial = ResultMerger::new().merge_partial(valid());
        assert!(partial.is_complete());
        assert_eq!(
            serde_json::to_value(&partial).unwrap()["failed"],
            json!([])
        );
    }
}
