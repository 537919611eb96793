use async_trait::async_trait;
use prompt_bench_core::domain::{BatchId, EvaluationBatch};
use prompt_bench_core::error::Result;
use prompt_bench_core::traits::BatchStore;

use crate::memory::InMemoryStore;

#[async_trait]
impl BatchStore for InMemoryStore {
    async fn save_batch(&self, batch: &EvaluationBatch) -> Result<()> {
        let previous = self.batches.insert(batch.id, batch.clone());
        if previous.is_none() {
            self.batches_by_prompt
                .entry(batch.prompt_name.clone())
                .or_default()
                .push(batch.id);
        }
        Ok(())
    }

    async fn get_batch(&self, batch_id: &BatchId) -> Result<Option<EvaluationBatch>> {
        Ok(self.batches.get(batch_id).map(|b| b.value().clone()))
    }

    async fn list_batches(&self, prompt_name: &str) -> Result<Vec<EvaluationBatch>> {
        // Copy the ids out first so no shard lock is held across both maps.
        let ids = self
            .batches_by_prompt
            .get(prompt_name)
            .map(|ids| ids.value().clone())
            .unwrap_or_default();

        Ok(ids
            .iter()
            .filter_map(|id| self.batches.get(id).map(|b| b.value().clone()))
            .collect())
    }
}
