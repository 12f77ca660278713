//! One language-model call per catalog task.

use std::time::Instant;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use invex_llm::LanguageModel;

use super::tasks::{TaskCatalog, TaskKind, TaskSpec};
use crate::error::ExtractionError;

/// The raw response of one task.
#[derive(Debug)]
pub struct TaskOutcome {
    /// Task that ran.
    pub task: TaskKind,
    /// Model that answered.
    pub model: String,
    /// Raw response text, or why the call failed.
    pub response: Result<String, ExtractionError>,
}

/// Runs every task of a catalog against a document text.
///
/// Tasks are independent: each gets the full text, and a failing call does
/// not stop the remaining ones. Outcomes always come back in catalog order.
pub struct ExtractionOrchestrator<M> {
    model: M,
    catalog: TaskCatalog,
    parallel: bool,
}

impl<M: LanguageModel> ExtractionOrchestrator<M> {
    /// Create a sequential orchestrator.
    pub fn new(model: M, catalog: TaskCatalog) -> Self {
        Self {
            model,
            catalog,
            parallel: false,
        }
    }

    /// Issue all model calls concurrently.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Task catalog in use.
    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    /// Language model in use.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run all tasks.
    pub async fn run(&self, text: &str) -> Vec<TaskOutcome> {
        let start = Instant::now();

        let outcomes = if self.parallel {
            join_all(self.catalog.iter().map(|task| self.run_task(task, text))).await
        } else {
            let mut outcomes = Vec::with_capacity(self.catalog.len());
            for task in self.catalog.iter() {
                outcomes.push(self.run_task(task, text).await);
            }
            outcomes
        };

        info!(
            "Ran {} tasks with {} in {}ms ({})",
            outcomes.len(),
            self.model.name(),
            start.elapsed().as_millis(),
            if self.parallel { "parallel" } else { "sequential" }
        );
        outcomes
    }

    async fn run_task(&self, task: &TaskSpec, text: &str) -> TaskOutcome {
        let prompt = task.render(text);
        let start = Instant::now();

        debug!("Task {}: {} prompt chars to {}", task.kind(), prompt.len(), task.model());

        let response = self
            .model
            .complete(task.model(), &prompt)
            .await
            .map_err(|source| ExtractionError::Model {
                task: task.kind(),
                source,
            });

        match &response {
            Ok(text) => debug!(
                "Task {} answered with {} chars in {}ms",
                task.kind(),
                text.len(),
                start.elapsed().as_millis()
            ),
            Err(e) => warn!("Task {} failed: {}", task.kind(), e),
        }

        TaskOutcome {
            task: task.kind(),
            model: task.model().to_string(),
            response,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use invex_llm::LlmError;

    /// Answers by matching the prompt against per-task markers.
    pub(crate) struct ScriptedModel {
        pub replies: HashMap<&'static str, Result<&'static str, u16>>,
        pub prompts: Mutex<Vec<(String, String)>>,
        /// Delay per marker, to shuffle completion order in parallel runs.
        pub delays: HashMap<&'static str, u64>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: &[(&'static str, Result<&'static str, u16>)]) -> Self {
            Self {
                replies: replies.iter().cloned().collect(),
                prompts: Mutex::new(Vec::new()),
                delays: HashMap::new(),
            }
        }

        /// Marker that identifies each task's prompt.
        pub(crate) fn marker(kind: TaskKind) -> &'static str {
            match kind {
                TaskKind::General => "general data",
                TaskKind::SupplierCustomer => "supplier and customer data",
                TaskKind::Item => "for each item",
                TaskKind::Total => "total amount data",
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, model: &str, prompt: &str) -> invex_llm::Result<String> {
            self.prompts
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));

            let (marker, reply) = self
                .replies
                .iter()
                .find(|(marker, _)| prompt.contains(*marker))
                .ok_or_else(|| LlmError::Request("unexpected prompt".to_string()))?;

            if let Some(ms) = self.delays.get(marker) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }

            match reply {
                Ok(text) => Ok(text.to_string()),
                Err(status) => Err(LlmError::Status {
                    model: model.to_string(),
                    status: *status,
                    body: "quota exceeded".to_string(),
                }),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    pub(crate) fn all_ok() -> Vec<(&'static str, Result<&'static str, u16>)> {
        vec![
            (ScriptedModel::marker(TaskKind::General), Ok("```json\n{\"Invoice number\": \"123\"}\n```")),
            (ScriptedModel::marker(TaskKind::SupplierCustomer), Ok("{\"Supplier data\": {\"Supplier Name\": \"ACME\"}}")),
            (ScriptedModel::marker(TaskKind::Item), Ok("{\"Item data\": []}")),
            (ScriptedModel::marker(TaskKind::Total), Ok("{\"Total gross amount\": \"119.00\"}")),
        ]
    }

    #[tokio::test]
    async fn test_every_task_gets_full_text() {
        let model = ScriptedModel::new(&all_ok());
        let orchestrator = ExtractionOrchestrator::new(model, TaskCatalog::default());

        let outcomes = orchestrator.run("Invoice #123\nTotal 119.00").await;

        assert_eq!(outcomes.len(), 4);
        let prompts = orchestrator.model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 4);
        for (_, prompt) in prompts.iter() {
            assert!(prompt.contains("Invoice #123\nTotal 119.00"));
        }
    }

    #[tokio::test]
    async fn test_models_follow_catalog() {
        let model = ScriptedModel::new(&all_ok());
        let orchestrator = ExtractionOrchestrator::new(model, TaskCatalog::default());

        let outcomes = orchestrator.run("text").await;

        let models: Vec<(TaskKind, &str)> = outcomes.iter().map(|o| (o.task, o.model.as_str())).collect();
        assert_eq!(
            models,
            vec![
                (TaskKind::General, "gemini-1.5-flash-8b"),
                (TaskKind::SupplierCustomer, "gemini-1.5-flash-8b"),
                (TaskKind::Item, "gemini-2.0-flash-exp"),
                (TaskKind::Total, "gemini-2.0-flash-exp"),
            ]
        );
        let called: Vec<String> = orchestrator
            .model
            .prompts
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect();
        assert_eq!(
            called,
            vec!["gemini-1.5-flash-8b", "gemini-1.5-flash-8b", "gemini-2.0-flash-exp", "gemini-2.0-flash-exp"]
        );
    }

    #[tokio::test]
    async fn test_failed_task_does_not_stop_others() {
        let mut replies = all_ok();
        replies[1].1 = Err(429);
        let model = ScriptedModel::new(&replies);
        let orchestrator = ExtractionOrchestrator::new(model, TaskCatalog::default());

        let outcomes = orchestrator.run("text").await;

        assert_eq!(orchestrator.model.prompts.lock().unwrap().len(), 4);
        assert!(outcomes[0].response.is_ok());
        assert!(matches!(
            outcomes[1].response,
            Err(ExtractionError::Model { task: TaskKind::SupplierCustomer, .. })
        ));
        assert!(outcomes[2].response.is_ok());
        assert!(outcomes[3].response.is_ok());
    }

    #[tokio::test]
    async fn test_parallel_keeps_catalog_order() {
        let mut model = ScriptedModel::new(&all_ok());
        model.delays.insert(ScriptedModel::marker(TaskKind::General), 40);
        model.delays.insert(ScriptedModel::marker(TaskKind::SupplierCustomer), 20);
        let orchestrator = ExtractionOrchestrator::new(model, TaskCatalog::default()).with_parallel(true);

        let outcomes = orchestrator.run("text").await;

        let order: Vec<TaskKind> = outcomes.iter().map(|o| o.task).collect();
        assert_eq!(order, TaskKind::ALL.to_vec());
        assert_eq!(
            outcomes[0].response.as_ref().unwrap(),
            "```json\n{\"Invoice number\": \"123\"}\n```"
        );
    }
}
