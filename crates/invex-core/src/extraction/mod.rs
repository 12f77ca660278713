//! Language-model extraction: task catalog, orchestration, response cleanup
//! and merging.

mod merger;
mod orchestrator;
mod pipeline;
mod sanitizer;
mod tasks;

pub use merger::ResultMerger;
pub use orchestrator::{ExtractionOrchestrator, TaskOutcome};
pub use pipeline::InvoicePipeline;
pub use sanitizer::{sanitize, sanitize_bytes};
pub use tasks::{FieldShape, FieldSpec, TaskCatalog, TaskKind, TaskSpec, PAGE_DATA_PLACEHOLDER};
