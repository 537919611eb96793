use futures::stream::{FuturesUnordered, StreamExt};
use prompt_bench_core::domain::{
    AiEvaluation, BatchId, Candidate, CandidateFailure, CandidateId, EvaluationBatch,
    EvaluationTemplate, JudgeRequest, JudgeVerdict,
};
use prompt_bench_core::error::{CoreError, JudgeError, Result};
use prompt_bench_core::traits::{BatchStore, EvaluationStore, JudgeGateway};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::template;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Extra attempts after a failed judge call.
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Wall-clock cap on a whole batch.
    pub batch_timeout: Duration,
    /// Highest tolerated share of persistently failed candidates.
    pub max_failure_rate: f64,
    /// Bound on in-flight judge calls in parallel mode; `None` is unbounded.
    pub max_concurrency: Option<usize>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_delay: Duration::from_millis(500),
            batch_timeout: Duration::from_secs(300),
            max_failure_rate: 0.0,
            max_concurrency: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub prompt_name: String,
    pub run_id: Option<String>,
    pub template: EvaluationTemplate,
    pub judge_model: String,
    pub candidates: Vec<Candidate>,
    pub parallel: bool,
}

/// Result of judging one candidate, possibly after retries.
struct JudgeOutcome {
    index: usize,
    candidate_id: CandidateId,
    attempts: u32,
    result: std::result::Result<(JudgeVerdict, f64), JudgeError>,
}

enum Interruption {
    Cancelled,
    TimedOut(Duration),
}

/// Runs the AI judge over every candidate of a batch and turns the verdicts
/// into an AI ranking.
///
/// Judge failures never escape: they are retried, recorded on the batch and
/// reflected in its terminal status. Only storage errors are returned.
#[derive(Clone)]
pub struct BatchOrchestrator {
    judge: Arc<dyn JudgeGateway>,
    batches: Arc<dyn BatchStore>,
    evaluations: Arc<dyn EvaluationStore>,
    config: OrchestratorConfig,
    cancellation_tokens: Arc<RwLock<HashMap<BatchId, CancellationToken>>>,
}

impl BatchOrchestrator {
    pub fn new(
        judge: Arc<dyn JudgeGateway>,
        batches: Arc<dyn BatchStore>,
        evaluations: Arc<dyn EvaluationStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            judge,
            batches,
            evaluations,
            config,
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Stores a pending batch, runs it in the background and returns its id.
    #[instrument(skip(self, request), fields(prompt = %request.prompt_name))]
    pub async fn start_batch(&self, request: BatchRequest) -> Result<BatchId> {
        let (batch, token) = self.prepare(&request).await?;
        let batch_id = batch.id;

        let orchestrator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.execute(batch, request, token).await {
                error!(batch_id = %batch_id, error = %e, "Batch evaluation aborted");
            }
        });

        Ok(batch_id)
    }

    /// Runs a batch to completion and returns it in its terminal state.
    #[instrument(skip(self, request), fields(prompt = %request.prompt_name))]
    pub async fn run_batch(&self, request: BatchRequest) -> Result<EvaluationBatch> {
        let (batch, token) = self.prepare(&request).await?;
        self.execute(batch, request, token).await
    }

    pub async fn cancel_batch(&self, batch_id: BatchId) -> Result<()> {
        if let Some(token) = self.cancellation_tokens.read().await.get(&batch_id) {
            info!(batch_id = %batch_id, "Cancelling batch");
            token.cancel();
            return Ok(());
        }

        match self.batches.get_batch(&batch_id).await? {
            Some(batch) if batch.is_terminal() => Err(CoreError::InvalidState(format!(
                "batch {} already finished as {}",
                batch_id,
                batch.status.as_str()
            ))),
            Some(_) => Err(CoreError::InvalidState(format!(
                "batch {} is not running in this process",
                batch_id
            ))),
            None => Err(CoreError::NotFound(format!("batch {}", batch_id))),
        }
    }

    async fn prepare(&self, request: &BatchRequest) -> Result<(EvaluationBatch, CancellationToken)> {
        if request.candidates.is_empty() {
            return Err(CoreError::Validation(format!(
                "no candidates to evaluate for prompt '{}'",
                request.prompt_name
            )));
        }
        if request.judge_model.trim().is_empty() {
            return Err(CoreError::Validation("judge model is required".to_string()));
        }

        let batch = EvaluationBatch::new(
            request.prompt_name.clone(),
            request.run_id.clone(),
            request.template.id,
            request.judge_model.clone(),
            request.candidates.len(),
        );
        self.batches.save_batch(&batch).await?;

        let token = CancellationToken::new();
        self.cancellation_tokens.write().await.insert(batch.id, token.clone());

        info!(
            batch_id = %batch.id,
            candidates = batch.num_experiments,
            parallel = request.parallel,
            "Created evaluation batch"
        );
        Ok((batch, token))
    }

    async fn execute(
        &self,
        mut batch: EvaluationBatch,
        request: BatchRequest,
        token: CancellationToken,
    ) -> Result<EvaluationBatch> {
        let result = self.drive(&mut batch, &request, &token).await;
        self.cancellation_tokens.write().await.remove(&batch.id);

        if let Err(e) = &result {
            if !batch.is_terminal() {
                let elapsed = batch_elapsed(&batch);
                if batch.fail(e.to_string(), elapsed).is_ok() {
                    if let Err(save_err) = self.batches.save_batch(&batch).await {
                        warn!(batch_id = %batch.id, error = %save_err, "Could not record batch failure");
                    }
                }
            }
        }

        result.map(|_| batch)
    }

    async fn drive(
        &self,
        batch: &mut EvaluationBatch,
        request: &BatchRequest,
        token: &CancellationToken,
    ) -> Result<()> {
        batch.start()?;
        self.batches.save_batch(batch).await?;
        let started = Instant::now();

        let mut successes: Vec<(usize, AiEvaluation)> = Vec::new();
        let interruption = tokio::select! {
            _ = token.cancelled() => Some(Interruption::Cancelled),
            outcome = tokio::time::timeout(
                self.config.batch_timeout,
                self.evaluate_all(batch, request, &mut successes),
            ) => match outcome {
                Ok(result) => {
                    result?;
                    None
                }
                Err(_) => Some(Interruption::TimedOut(self.config.batch_timeout)),
            },
        };

        let evaluations = rank(successes);
        if !evaluations.is_empty() {
            self.evaluations.save_evaluations(&evaluations).await?;
        }
        batch.attach_evaluations(evaluations.iter().map(|e| e.id).collect())?;

        let elapsed = started.elapsed().as_secs_f64();
        match interruption {
            Some(Interruption::Cancelled) => {
                warn!(batch_id = %batch.id, "Batch cancelled");
                batch.fail("cancelled", elapsed)?;
            }
            Some(Interruption::TimedOut(limit)) => {
                warn!(batch_id = %batch.id, ?limit, "Batch timed out");
                batch.fail(format!("batch timed out after {:?}", limit), elapsed)?;
            }
            None if evaluations.is_empty() || self.failure_rate_exceeded(batch) => {
                let first = batch
                    .failures
                    .first()
                    .map(|f| f.error.clone())
                    .unwrap_or_default();
                let reason = format!(
                    "{} of {} candidates failed: {}",
                    batch.num_failed, batch.num_experiments, first
                );
                warn!(batch_id = %batch.id, %reason, "Batch failed");
                batch.fail(reason, elapsed)?;
            }
            None => {
                let ranked = evaluations.iter().map(|e| e.candidate_id.clone()).collect();
                batch.complete(ranked, elapsed)?;
                info!(
                    batch_id = %batch.id,
                    completed = batch.num_completed,
                    failed = batch.num_failed,
                    duration_secs = elapsed,
                    "Batch completed"
                );
            }
        }

        self.batches.save_batch(batch).await
    }

    /// Judges every candidate. Progress counters are only written here, by
    /// the task driving the batch, and persisted after each completion.
    async fn evaluate_all(
        &self,
        batch: &mut EvaluationBatch,
        request: &BatchRequest,
        successes: &mut Vec<(usize, AiEvaluation)>,
    ) -> Result<()> {
        let judge_requests: Vec<JudgeRequest> = request
            .candidates
            .iter()
            .map(|candidate| judge_request(&request.template, &request.judge_model, candidate))
            .collect();

        if request.parallel {
            let semaphore = self.config.max_concurrency.map(|n| Arc::new(Semaphore::new(n.max(1))));
            let mut pending: FuturesUnordered<_> = judge_requests
                .into_iter()
                .enumerate()
                .map(|(index, judge_request)| self.judge_with_retry(index, judge_request, semaphore.clone()))
                .collect();

            while let Some(outcome) = pending.next().await {
                self.record(batch, request, outcome, successes)?;
                self.batches.save_batch(batch).await?;
            }
        } else {
            for (index, judge_request) in judge_requests.into_iter().enumerate() {
                let outcome = self.judge_with_retry(index, judge_request, None).await;
                self.record(batch, request, outcome, successes)?;
                self.batches.save_batch(batch).await?;
            }
        }

        Ok(())
    }

    async fn judge_with_retry(
        &self,
        index: usize,
        request: JudgeRequest,
        semaphore: Option<Arc<Semaphore>>,
    ) -> JudgeOutcome {
        let _permit = match semaphore {
            Some(semaphore) => semaphore.acquire_owned().await.ok(),
            None => None,
        };

        let max_attempts = self.config.max_retries + 1;
        let mut attempts = 0;
        loop {
            attempts += 1;
            let started = Instant::now();
            let result = self
                .judge
                .evaluate(&request)
                .await
                .and_then(|verdict| verdict.validate().map(|_| verdict));

            match result {
                Ok(verdict) => {
                    return JudgeOutcome {
                        index,
                        candidate_id: request.candidate_id,
                        attempts,
                        result: Ok((verdict, started.elapsed().as_secs_f64())),
                    };
                }
                Err(e) if attempts < max_attempts && e.is_retryable() => {
                    warn!(
                        candidate = %request.candidate_id,
                        attempt = attempts,
                        error = %e,
                        "Judge call failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    return JudgeOutcome {
                        index,
                        candidate_id: request.candidate_id,
                        attempts,
                        result: Err(e),
                    };
                }
            }
        }
    }

    fn record(
        &self,
        batch: &mut EvaluationBatch,
        request: &BatchRequest,
        outcome: JudgeOutcome,
        successes: &mut Vec<(usize, AiEvaluation)>,
    ) -> Result<()> {
        match outcome.result {
            Ok((verdict, duration)) => {
                batch.record_success()?;
                debug!(
                    batch_id = %batch.id,
                    candidate = %outcome.candidate_id,
                    score = verdict.overall_score,
                    progress = batch.progress(),
                    "Candidate judged"
                );
                let evaluation = AiEvaluation::from_verdict(
                    outcome.candidate_id,
                    request.template.id,
                    batch.id,
                    request.judge_model.clone(),
                    verdict,
                    duration,
                );
                successes.push((outcome.index, evaluation));
            }
            Err(e) => {
                warn!(
                    batch_id = %batch.id,
                    candidate = %outcome.candidate_id,
                    attempts = outcome.attempts,
                    error = %e,
                    "Candidate could not be judged"
                );
                batch.record_failure(CandidateFailure {
                    candidate_id: outcome.candidate_id,
                    error: e.to_string(),
                    attempts: outcome.attempts,
                })?;
            }
        }
        Ok(())
    }

    fn failure_rate_exceeded(&self, batch: &EvaluationBatch) -> bool {
        if batch.num_experiments == 0 {
            return false;
        }
        batch.num_failed as f64 / batch.num_experiments as f64 > self.config.max_failure_rate
    }
}

fn judge_request(template: &EvaluationTemplate, model: &str, candidate: &Candidate) -> JudgeRequest {
    JudgeRequest {
        candidate_id: candidate.id.clone(),
        config_name: candidate.config_name.clone(),
        model: model.to_string(),
        system_prompt: template.system_prompt.clone(),
        rendered_prompt: template::render(template, candidate),
        candidate_output: candidate.output.clone(),
        criteria: template.criteria.clone(),
    }
}

/// Orders successes by score, best first, keeping submission order among
/// equal scores, and assigns `ai_rank` from 1.
fn rank(mut successes: Vec<(usize, AiEvaluation)>) -> Vec<AiEvaluation> {
    successes.sort_by_key(|(index, _)| *index);
    let mut evaluations: Vec<AiEvaluation> = successes.into_iter().map(|(_, e)| e).collect();
    evaluations.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));
    for (i, evaluation) in evaluations.iter_mut().enumerate() {
        evaluation.ai_rank = i + 1;
    }
    evaluations
}

fn batch_elapsed(batch: &EvaluationBatch) -> f64 {
    let elapsed = chrono::Utc::now() - batch.started_at;
    elapsed.num_milliseconds().max(0) as f64 / 1000.0
}
