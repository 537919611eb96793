use async_trait::async_trait;
use prompt_bench_core::domain::{AiEvaluation, BatchId};
use prompt_bench_core::error::Result;
use prompt_bench_core::traits::EvaluationStore;
use tracing::debug;

use crate::memory::InMemoryStore;

#[async_trait]
impl EvaluationStore for InMemoryStore {
    async fn save_evaluations(&self, evaluations: &[AiEvaluation]) -> Result<()> {
        for evaluation in evaluations {
            self.evaluations
                .entry(evaluation.batch_id)
                .or_default()
                .push(evaluation.clone());
        }
        debug!(count = evaluations.len(), "Stored AI evaluations");
        Ok(())
    }

    async fn list_evaluations(&self, batch_id: &BatchId) -> Result<Vec<AiEvaluation>> {
        Ok(self
            .evaluations
            .get(batch_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }
}
