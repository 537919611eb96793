use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BatchId, CandidateId, EvaluationId, TemplateId};
use crate::error::{CoreError, Result};

// ===== Batch Status =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, BatchStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Running => "running",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }
}

// ===== Candidate Failure =====

/// A candidate the judge could not score, after retries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateFailure {
    pub candidate_id: CandidateId,
    pub error: String,
    pub attempts: u32,
}

// ===== Evaluation Batch =====

/// One execution of the AI judge across the candidates of a prompt (or run).
///
/// Lifecycle: `pending -> running -> completed | failed`. Terminal batches
/// are kept for history and refuse further transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationBatch {
    pub id: BatchId,
    pub prompt_name: String,
    pub run_id: Option<String>,
    pub template_id: TemplateId,
    pub judge_model: String,
    pub status: BatchStatus,
    pub num_experiments: usize,
    pub num_completed: usize,
    pub num_failed: usize,
    pub evaluation_ids: Vec<EvaluationId>,
    pub ranked_candidate_ids: Vec<CandidateId>,
    pub failures: Vec<CandidateFailure>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_duration_seconds: Option<f64>,
}

impl EvaluationBatch {
    pub fn new(
        prompt_name: impl Into<String>,
        run_id: Option<String>,
        template_id: TemplateId,
        judge_model: impl Into<String>,
        num_experiments: usize,
    ) -> Self {
        Self {
            id: BatchId::new(),
            prompt_name: prompt_name.into(),
            run_id,
            template_id,
            judge_model: judge_model.into(),
            status: BatchStatus::Pending,
            num_experiments,
            num_completed: 0,
            num_failed: 0,
            evaluation_ids: Vec::new(),
            ranked_candidate_ids: Vec::new(),
            failures: Vec::new(),
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            total_duration_seconds: None,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if self.status != BatchStatus::Pending {
            return Err(self.illegal("start"));
        }
        self.status = BatchStatus::Running;
        self.started_at = Utc::now();
        Ok(())
    }

    pub fn record_success(&mut self) -> Result<()> {
        if !self.status.is_running() {
            return Err(self.illegal("record progress on"));
        }
        self.num_completed += 1;
        Ok(())
    }

    pub fn record_failure(&mut self, failure: CandidateFailure) -> Result<()> {
        if !self.status.is_running() {
            return Err(self.illegal("record progress on"));
        }
        self.num_failed += 1;
        self.failures.push(failure);
        Ok(())
    }

    /// Attaches the evaluations persisted for this batch.
    pub fn attach_evaluations(&mut self, evaluation_ids: Vec<EvaluationId>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.illegal("attach evaluations to"));
        }
        self.evaluation_ids = evaluation_ids;
        Ok(())
    }

    pub fn complete(&mut self, ranked_candidate_ids: Vec<CandidateId>, total_duration_seconds: f64) -> Result<()> {
        if !self.status.is_running() {
            return Err(self.illegal("complete"));
        }
        self.status = BatchStatus::Completed;
        self.ranked_candidate_ids = ranked_candidate_ids;
        self.total_duration_seconds = Some(total_duration_seconds);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>, total_duration_seconds: f64) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.illegal("fail"));
        }
        self.status = BatchStatus::Failed;
        self.error = Some(reason.into());
        self.total_duration_seconds = Some(total_duration_seconds);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Fraction of candidates that have been judged, successfully or not.
    pub fn progress(&self) -> f64 {
        if self.num_experiments == 0 {
            return 0.0;
        }
        (self.num_completed + self.num_failed) as f64 / self.num_experiments as f64
    }

    fn illegal(&self, action: &str) -> CoreError {
        CoreError::InvalidState(format!(
            "cannot {} batch {} in state {}",
            action,
            self.id,
            self.status.as_str()
        ))
    }
}
