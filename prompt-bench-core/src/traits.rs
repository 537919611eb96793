use async_trait::async_trait;

use crate::domain::{
    AiEvaluation, BatchId, Candidate, EvaluationBatch, EvaluationTemplate, HumanRanking,
    JudgeRequest, JudgeVerdict, RankingWeights, TemplateId,
};
use crate::error::{JudgeError, Result};

/// Source of executed candidates, owned by the experiment runner.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Successful candidates of a prompt, optionally narrowed to one run, in
    /// submission order.
    async fn list_successful_candidates(
        &self,
        prompt_name: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<Candidate>>;

    /// Every candidate of a prompt, failed runs included.
    async fn list_candidates(&self, prompt_name: &str) -> Result<Vec<Candidate>>;

    /// Prompts with at least one candidate, sorted by name.
    async fn list_prompt_names(&self) -> Result<Vec<String>>;
}

/// An AI judge able to score one candidate.
#[async_trait]
pub trait JudgeGateway: Send + Sync {
    async fn evaluate(&self, request: &JudgeRequest) -> std::result::Result<JudgeVerdict, JudgeError>;
}

#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn save_evaluations(&self, evaluations: &[AiEvaluation]) -> Result<()>;

    async fn list_evaluations(&self, batch_id: &BatchId) -> Result<Vec<AiEvaluation>>;
}

#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Inserts or replaces the batch with the same id.
    async fn save_batch(&self, batch: &EvaluationBatch) -> Result<()>;

    async fn get_batch(&self, batch_id: &BatchId) -> Result<Option<EvaluationBatch>>;

    /// Batches of a prompt, oldest first.
    async fn list_batches(&self, prompt_name: &str) -> Result<Vec<EvaluationBatch>>;

    async fn latest_completed_batch(&self, prompt_name: &str) -> Result<Option<EvaluationBatch>> {
        let batches = self.list_batches(prompt_name).await?;
        Ok(batches
            .into_iter()
            .filter(|batch| batch.status == crate::domain::BatchStatus::Completed)
            .max_by_key(|batch| batch.completed_at))
    }
}

#[async_trait]
pub trait RankingStore: Send + Sync {
    async fn save_ranking(&self, ranking: &HumanRanking) -> Result<()>;

    /// Human rankings of a prompt, oldest first.
    async fn list_rankings(&self, prompt_name: &str) -> Result<Vec<HumanRanking>>;
}

#[async_trait]
pub trait WeightsStore: Send + Sync {
    async fn save_weights(&self, weights: &RankingWeights) -> Result<()>;

    async fn get_weights(&self, prompt_name: &str) -> Result<Option<RankingWeights>>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn save_template(&self, template: &EvaluationTemplate) -> Result<()>;

    async fn get_template(&self, template_id: &TemplateId) -> Result<Option<EvaluationTemplate>>;

    async fn list_active_templates(&self) -> Result<Vec<EvaluationTemplate>>;
}
