use async_trait::async_trait;
use prompt_bench_core::domain::RankingWeights;
use prompt_bench_core::error::Result;
use prompt_bench_core::traits::WeightsStore;

use crate::memory::InMemoryStore;

/// One record per prompt; the latest write wins.
#[async_trait]
impl WeightsStore for InMemoryStore {
    async fn save_weights(&self, weights: &RankingWeights) -> Result<()> {
        self.weights.insert(weights.prompt_name.clone(), weights.clone());
        Ok(())
    }

    async fn get_weights(&self, prompt_name: &str) -> Result<Option<RankingWeights>> {
        Ok(self.weights.get(prompt_name).map(|w| w.value().clone()))
    }
}
