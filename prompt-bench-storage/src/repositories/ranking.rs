use async_trait::async_trait;
use prompt_bench_core::domain::HumanRanking;
use prompt_bench_core::error::Result;
use prompt_bench_core::traits::RankingStore;

use crate::memory::InMemoryStore;

#[async_trait]
impl RankingStore for InMemoryStore {
    async fn save_ranking(&self, ranking: &HumanRanking) -> Result<()> {
        self.rankings
            .entry(ranking.prompt_name.clone())
            .or_default()
            .push(ranking.clone());
        Ok(())
    }

    async fn list_rankings(&self, prompt_name: &str) -> Result<Vec<HumanRanking>> {
        Ok(self
            .rankings
            .get(prompt_name)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}
