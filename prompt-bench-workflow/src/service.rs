use prompt_bench_core::domain::{
    AiEvaluation, BatchId, BatchStatus, CandidateId, EvaluationBatch, HumanRanking, NewHumanRanking,
    Ranking, RankingWeights, RecommendationOutcome, TemplateId, Weights, DEFAULT_WEIGHTS_KEY,
};
use prompt_bench_core::error::{CoreError, Result};
use prompt_bench_core::traits::{
    BatchStore, CandidateStore, EvaluationStore, JudgeGateway, RankingStore, TemplateStore,
    WeightsStore,
};
use prompt_bench_metrics::{
    ConfigAnalyzer, ConfigComparison, ConfigStats, ConsensusAggregator, ConsensusResult,
    RankAgreement, RecommendationEngine, RecommendationInput, DEFAULT_TOP_K,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::orchestrator::{BatchOrchestrator, BatchRequest, OrchestratorConfig};

/// Parameters for judging the candidates of a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartBatchRequest {
    pub prompt_name: String,
    pub template_id: TemplateId,
    /// Overrides the template's default judge model.
    #[serde(default)]
    pub judge_model: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

/// What a status poller sees of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchStatusView {
    pub batch_id: BatchId,
    pub status: BatchStatus,
    pub num_completed: usize,
    pub num_failed: usize,
    pub num_experiments: usize,
    pub progress: f64,
    /// Only present once the batch completed.
    pub ranked_ids: Option<Vec<CandidateId>>,
    pub error: Option<String>,
}

impl From<&EvaluationBatch> for BatchStatusView {
    fn from(batch: &EvaluationBatch) -> Self {
        Self {
            batch_id: batch.id,
            status: batch.status,
            num_completed: batch.num_completed,
            num_failed: batch.num_failed,
            num_experiments: batch.num_experiments,
            progress: batch.progress(),
            ranked_ids: (batch.status == BatchStatus::Completed).then(|| batch.ranked_candidate_ids.clone()),
            error: batch.error.clone(),
        }
    }
}

/// Entry point wiring the stores, the batch orchestrator and the ranking
/// engines together.
#[derive(Clone)]
pub struct BenchService {
    candidates: Arc<dyn CandidateStore>,
    evaluations: Arc<dyn EvaluationStore>,
    batches: Arc<dyn BatchStore>,
    rankings: Arc<dyn RankingStore>,
    weights: Arc<dyn WeightsStore>,
    templates: Arc<dyn TemplateStore>,
    orchestrator: BatchOrchestrator,
    engine: RecommendationEngine,
}

impl BenchService {
    /// Builds a service over a single store implementing every collaborator
    /// trait.
    pub fn new<S>(store: Arc<S>, judge: Arc<dyn JudgeGateway>, config: OrchestratorConfig) -> Self
    where
        S: CandidateStore + EvaluationStore + BatchStore + RankingStore + WeightsStore + TemplateStore + 'static,
    {
        let orchestrator = BatchOrchestrator::new(judge, store.clone(), store.clone(), config);
        Self {
            candidates: store.clone(),
            evaluations: store.clone(),
            batches: store.clone(),
            rankings: store.clone(),
            weights: store.clone(),
            templates: store,
            orchestrator,
            engine: RecommendationEngine::default(),
        }
    }

    pub fn with_engine(mut self, engine: RecommendationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn orchestrator(&self) -> &BatchOrchestrator {
        &self.orchestrator
    }

    /// Starts judging in the background and returns the new batch id.
    #[instrument(skip(self, request), fields(prompt = %request.prompt_name))]
    pub async fn start_batch_evaluation(&self, request: StartBatchRequest) -> Result<BatchId> {
        let batch_request = self.batch_request(request).await?;
        self.orchestrator.start_batch(batch_request).await
    }

    /// Judges the candidates and waits for the batch to finish.
    #[instrument(skip(self, request), fields(prompt = %request.prompt_name))]
    pub async fn run_batch_evaluation(&self, request: StartBatchRequest) -> Result<EvaluationBatch> {
        let batch_request = self.batch_request(request).await?;
        self.orchestrator.run_batch(batch_request).await
    }

    async fn batch_request(&self, request: StartBatchRequest) -> Result<BatchRequest> {
        let template = self
            .templates
            .get_template(&request.template_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("template {}", request.template_id)))?;

        let candidates = self
            .candidates
            .list_successful_candidates(&request.prompt_name, request.run_id.as_deref())
            .await?;
        if candidates.is_empty() {
            return Err(CoreError::Validation(format!(
                "no successful candidates for prompt '{}'",
                request.prompt_name
            )));
        }

        let judge_model = request
            .judge_model
            .unwrap_or_else(|| template.default_model.clone());

        Ok(BatchRequest {
            prompt_name: request.prompt_name,
            run_id: request.run_id,
            template,
            judge_model,
            candidates,
            parallel: request.parallel,
        })
    }

    pub async fn batch_status(&self, batch_id: &BatchId) -> Result<BatchStatusView> {
        let batch = self
            .batches
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("batch {}", batch_id)))?;
        Ok(BatchStatusView::from(&batch))
    }

    pub async fn cancel_batch(&self, batch_id: BatchId) -> Result<()> {
        self.orchestrator.cancel_batch(batch_id).await
    }

    /// Validates and stores a human ranking.
    ///
    /// The ranking must order exactly the candidates it is judged against:
    /// the referenced batch's AI ranking once that batch completed, otherwise
    /// the prompt's successful candidates. Against a completed batch the
    /// agreement with its AI ranking is computed and stored with it.
    #[instrument(skip(self, request), fields(prompt = %request.prompt_name, evaluator = %request.evaluator_name))]
    pub async fn save_human_ranking(&self, request: NewHumanRanking) -> Result<HumanRanking> {
        let mut ranking = HumanRanking::from_request(request)?;

        let batch = match ranking.based_on_batch_id {
            Some(batch_id) => {
                let batch = self
                    .batches
                    .get_batch(&batch_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound(format!("batch {}", batch_id)))?;
                if batch.prompt_name != ranking.prompt_name {
                    return Err(CoreError::Validation(format!(
                        "batch {} belongs to prompt '{}', not '{}'",
                        batch_id, batch.prompt_name, ranking.prompt_name
                    )));
                }
                Some(batch)
            }
            None => None,
        };

        match batch.as_ref().and_then(completed_ranking) {
            Some(ai_ranking) => {
                ensure_same_candidates(ai_ranking.ids(), &ranking.ranking)?;
                let agreement = RankAgreement::compare(&ai_ranking, &ranking.ranking, DEFAULT_TOP_K);
                ranking = ranking.with_agreement(agreement.summary());
            }
            None => {
                let expected: Vec<CandidateId> = self
                    .candidates
                    .list_successful_candidates(&ranking.prompt_name, None)
                    .await?
                    .into_iter()
                    .map(|c| c.id)
                    .collect();
                ensure_same_candidates(&expected, &ranking.ranking)?;
                if let Some(batch) = &batch {
                    warn!(
                        batch_id = %batch.id,
                        status = batch.status.as_str(),
                        "Referenced batch has no AI ranking yet; saving without agreement"
                    );
                }
            }
        }

        self.rankings.save_ranking(&ranking).await?;
        info!(ranking_id = %ranking.id, "Saved human ranking");
        Ok(ranking)
    }

    /// Borda consensus of the human rankings of a prompt, compared against
    /// the latest completed AI ranking. `None` until someone ranked.
    pub async fn consensus(&self, prompt_name: &str) -> Result<Option<ConsensusResult>> {
        let rankings: Vec<Ranking> = self
            .rankings
            .list_rankings(prompt_name)
            .await?
            .into_iter()
            .map(|r| r.ranking)
            .collect();
        if rankings.is_empty() {
            return Ok(None);
        }

        let ai_ranking = self
            .batches
            .latest_completed_batch(prompt_name)
            .await?
            .and_then(|batch| completed_ranking(&batch));

        ConsensusAggregator::aggregate(&rankings, ai_ranking.as_ref()).map(Some)
    }

    pub async fn recommendation(&self, prompt_name: &str) -> Result<RecommendationOutcome> {
        let candidates = self.candidates.list_successful_candidates(prompt_name, None).await?;

        let ai_evaluations = self.completed_evaluations(prompt_name).await?;

        let human_rankings = self
            .rankings
            .list_rankings(prompt_name)
            .await?
            .into_iter()
            .map(|r| r.ranking)
            .collect();

        let input = RecommendationInput::new(prompt_name, candidates)
            .with_ai_evaluations(ai_evaluations)
            .with_human_rankings(human_rankings)
            .with_weights(self.weights(prompt_name).await?);

        self.engine.recommend(&input)
    }

    /// Per-configuration statistics for one prompt, scored with the AI
    /// evaluations of its completed batches.
    pub async fn compare_configs(&self, prompt_name: &str) -> Result<ConfigComparison> {
        let candidates = self.candidates.list_candidates(prompt_name).await?;
        let evaluations = self.completed_evaluations(prompt_name).await?;
        Ok(ConfigAnalyzer::compare_configs(prompt_name, &candidates, &evaluations))
    }

    /// One comparison per prompt, by prompt name.
    pub async fn compare_all_prompts(&self) -> Result<Vec<ConfigComparison>> {
        let mut comparisons = Vec::new();
        for prompt_name in self.candidates.list_prompt_names().await? {
            comparisons.push(self.compare_configs(&prompt_name).await?);
        }
        Ok(comparisons)
    }

    /// Configuration statistics pooled across every prompt.
    pub async fn overall_rankings(&self) -> Result<Vec<ConfigStats>> {
        let mut candidates = Vec::new();
        let mut evaluations = Vec::new();
        for prompt_name in self.candidates.list_prompt_names().await? {
            candidates.extend(self.candidates.list_candidates(&prompt_name).await?);
            evaluations.extend(self.completed_evaluations(&prompt_name).await?);
        }
        Ok(ConfigAnalyzer::overall_rankings(&candidates, &evaluations))
    }

    async fn completed_evaluations(&self, prompt_name: &str) -> Result<Vec<AiEvaluation>> {
        let mut evaluations = Vec::new();
        for batch in self.batches.list_batches(prompt_name).await? {
            if batch.status == BatchStatus::Completed {
                evaluations.extend(self.evaluations.list_evaluations(&batch.id).await?);
            }
        }
        Ok(evaluations)
    }

    /// Stores weights for a prompt, or for every prompt under
    /// [`DEFAULT_WEIGHTS_KEY`]. Invalid triples are rejected before any write.
    pub async fn set_weights(
        &self,
        prompt_name: &str,
        quality: f64,
        speed: f64,
        cost: f64,
        updated_by: &str,
    ) -> Result<RankingWeights> {
        let weights = Weights::new(quality, speed, cost)?;
        let record = RankingWeights::new(prompt_name, weights, updated_by);
        self.weights.save_weights(&record).await?;
        info!(prompt = prompt_name, quality, speed, cost, "Updated ranking weights");
        Ok(record)
    }

    /// Prompt override, else the global default, else the built-in mix.
    pub async fn weights(&self, prompt_name: &str) -> Result<Weights> {
        if let Some(record) = self.weights.get_weights(prompt_name).await? {
            return Ok(record.weights);
        }
        if let Some(record) = self.weights.get_weights(DEFAULT_WEIGHTS_KEY).await? {
            return Ok(record.weights);
        }
        Ok(Weights::default())
    }
}

/// Rejects a ranking that leaves out expected candidates or names others.
fn ensure_same_candidates(expected: &[CandidateId], ranking: &Ranking) -> Result<()> {
    if expected.is_empty() {
        return Err(CoreError::InvalidRanking("there are no candidates to rank".to_string()));
    }

    let expected_set: HashSet<&CandidateId> = expected.iter().collect();
    let missing: Vec<&str> = expected
        .iter()
        .filter(|id| !ranking.contains(id))
        .map(|id| id.as_str())
        .collect();
    let unknown: Vec<&str> = ranking
        .iter()
        .filter(|id| !expected_set.contains(id))
        .map(|id| id.as_str())
        .collect();

    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing {}", missing.join(", ")));
    }
    if !unknown.is_empty() {
        problems.push(format!("unknown {}", unknown.join(", ")));
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(CoreError::InvalidRanking(format!(
            "ranking does not match the candidates: {}",
            problems.join("; ")
        )))
    }
}

fn completed_ranking(batch: &EvaluationBatch) -> Option<Ranking> {
    if batch.status != BatchStatus::Completed {
        return None;
    }
    Ranking::new(batch.ranked_candidate_ids.clone()).ok()
}
