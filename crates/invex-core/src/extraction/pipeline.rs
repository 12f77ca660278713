//! End-to-end extraction of one invoice.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{info, warn};

use invex_llm::LanguageModel;

use super::merger::ResultMerger;
use super::orchestrator::ExtractionOrchestrator;
use super::tasks::TaskCatalog;
use crate::acquire::TextAcquirer;
use crate::error::Result;
use crate::models::record::{CompositeResult, Document, ExtractionReport, PartialResult};

/// Acquisition, task orchestration and merging for one document per call.
pub struct InvoicePipeline<M> {
    acquirer: TextAcquirer,
    orchestrator: ExtractionOrchestrator<M>,
    merger: ResultMerger,
}

impl<M: LanguageModel> InvoicePipeline<M> {
    /// Create a pipeline.
    pub fn new(acquirer: TextAcquirer, orchestrator: ExtractionOrchestrator<M>) -> Self {
        Self {
            acquirer,
            orchestrator,
            merger: ResultMerger::new(),
        }
    }

    /// Extract the composite record of the invoice at `path`.
    ///
    /// Fails if acquisition fails or if any task fails.
    pub async fn extract(&self, path: &Path) -> Result<ExtractionReport> {
        let start = Instant::now();

        let document = self.acquirer.acquire(path)?;
        let outcomes = self.orchestrator.run(&document.text).await;
        let result = self.merger.merge(outcomes)?;

        report_missing_fields(self.orchestrator.catalog(), &result);

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extracted {} ({:?}, {} pages) in {}ms",
            path.display(),
            document.mode,
            document.page_count,
            processing_time_ms
        );

        Ok(self.report(document, result, processing_time_ms))
    }

    /// Extract whatever the tasks return, marking failed tasks.
    ///
    /// Acquisition failures still fail the call.
    pub async fn extract_partial(&self, path: &Path) -> Result<PartialResult> {
        let document = self.acquirer.acquire(path)?;
        let outcomes = self.orchestrator.run(&document.text).await;
        let partial = self.merger.merge_partial(outcomes);

        if !partial.is_complete() {
            warn!("{} of {} tasks failed for {}", partial.failed.len(), partial.records.len(), path.display());
        }
        Ok(partial)
    }

    fn report(&self, document: Document, result: CompositeResult, processing_time_ms: u64) -> ExtractionReport {
        let models: Map<String, Value> = self
            .orchestrator
            .catalog()
            .iter()
            .map(|t| (t.kind().result_key().to_string(), Value::String(t.model().to_string())))
            .collect();

        ExtractionReport {
            source: document.path,
            mode: document.mode,
            page_count: document.page_count,
            models,
            extracted_at: Utc::now(),
            processing_time_ms,
            result,
        }
    }
}

fn report_missing_fields(catalog: &TaskCatalog, result: &CompositeResult) {
    for task in catalog.iter() {
        let Some(record) = result.get(task.kind()) else {
            continue;
        };
        let missing = task.missing_fields(record);
        if !missing.is_empty() {
            warn!("Task {} omitted fields: {}", task.kind(), missing.join(", "));
        }
    }
}
