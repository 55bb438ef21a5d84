use super::{TranslationEngine, TranslationOptions, TranslationRequest, TranslationResult};
use crate::core::platform::Platform;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<TranslationResult>,
}

impl BatchResult {
    pub fn from_results(results: Vec<TranslationResult>) -> Self {
        let successful = results.iter().filter(|result| result.success).count();
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
        }
    }
}

impl TranslationEngine {
    /// Translate every workflow independently, at most `concurrency` at a time.
    ///
    /// Results keep input order and there is always one per input. Cancellation is
    /// checked before each item starts; items not started yet come back as failures.
    pub async fn translate_many(
        &self,
        workflows: Vec<Value>,
        source: Platform,
        target: Platform,
        options: TranslationOptions,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> BatchResult {
        let total = workflows.len();
        tracing::info!(total, concurrency, %source, %target, "starting batch translation");

        let results: Vec<TranslationResult> = stream::iter(workflows.into_iter().enumerate())
            .map(|(position, workflow)| async move {
                if cancel.is_cancelled() {
                    tracing::debug!(position, "batch item cancelled before start");
                    return TranslationResult::failure("batch cancelled before this workflow was translated", 0);
                }
                let request = TranslationRequest::new(workflow, source, target).with_options(options);
                let result = self.translate(request, cancel).await;
                tracing::info!(item = position + 1, total, success = result.success, "batch item finished");
                result
            })
            .buffered(concurrency.max(1))
            .collect()
            .await;

        let batch = BatchResult::from_results(results);
        tracing::info!(
            total = batch.total,
            successful = batch.successful,
            failed = batch.failed,
            "batch translation finished"
        );
        batch
    }
}
