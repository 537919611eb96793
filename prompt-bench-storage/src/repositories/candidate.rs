use async_trait::async_trait;
use prompt_bench_core::domain::Candidate;
use prompt_bench_core::error::Result;
use prompt_bench_core::traits::CandidateStore;

use crate::memory::InMemoryStore;

#[async_trait]
impl CandidateStore for InMemoryStore {
    async fn list_successful_candidates(
        &self,
        prompt_name: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<Candidate>> {
        let Some(candidates) = self.candidates.get(prompt_name) else {
            return Ok(Vec::new());
        };

        Ok(candidates
            .iter()
            .filter(|c| c.success)
            .filter(|c| run_id.map_or(true, |run| c.run_id.as_deref() == Some(run)))
            .cloned()
            .collect())
    }

    async fn list_candidates(&self, prompt_name: &str) -> Result<Vec<Candidate>> {
        Ok(self.all_candidates(prompt_name))
    }

    async fn list_prompt_names(&self) -> Result<Vec<String>> {
        Ok(self.prompt_names())
    }
}
