use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::ids::{BatchId, CandidateId, EvaluationId, TemplateId};
use crate::error::JudgeError;

/// Upper bound of every judge score.
pub const MAX_SCORE: f64 = 10.0;

// ===== Evaluation Template =====

/// Judge prompt template. Placeholders: `{original_prompt}`, `{config_name}`,
/// `{result}` and `{criteria}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct EvaluationTemplate {
    pub id: TemplateId,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub template: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub criteria: Vec<String>,
    #[validate(length(min = 1, max = 255))]
    pub default_model: String,
    #[serde(default = "default_created_by")]
    pub created_by: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_created_by() -> String {
    "system".to_string()
}

fn default_active() -> bool {
    true
}

impl EvaluationTemplate {
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        criteria: Vec<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            id: TemplateId::new(),
            name: name.into(),
            description: None,
            template: template.into(),
            system_prompt: None,
            criteria,
            default_model: default_model.into(),
            created_by: default_created_by(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

// ===== Judge Request / Verdict =====

/// Everything a judge gateway needs to score one candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgeRequest {
    pub candidate_id: CandidateId,
    pub config_name: String,
    pub model: String,
    pub system_prompt: Option<String>,
    /// The judge prompt, already carrying the candidate output.
    pub rendered_prompt: String,
    pub candidate_output: String,
    pub criteria: Vec<String>,
}

/// Validated, structured judge output for one candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JudgeVerdict {
    pub criteria_scores: BTreeMap<String, f64>,
    pub overall_score: f64,
    pub justification: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

impl JudgeVerdict {
    pub fn new(overall_score: f64, justification: impl Into<String>) -> Self {
        Self {
            criteria_scores: BTreeMap::new(),
            overall_score,
            justification: justification.into(),
            strengths: Vec::new(),
            weaknesses: Vec::new(),
        }
    }

    pub fn with_criterion(mut self, name: impl Into<String>, score: f64) -> Self {
        self.criteria_scores.insert(name.into(), score);
        self
    }

    /// Rejects scores outside [0, 10], non-finite scores and an empty
    /// justification.
    pub fn validate(&self) -> Result<(), JudgeError> {
        if !in_score_range(self.overall_score) {
            return Err(JudgeError::Malformed(format!(
                "overall_score {} is outside 0-10",
                self.overall_score
            )));
        }

        for (criterion, score) in &self.criteria_scores {
            if !in_score_range(*score) {
                return Err(JudgeError::Malformed(format!(
                    "criterion '{}' score {} is outside 0-10",
                    criterion, score
                )));
            }
        }

        if self.justification.trim().is_empty() {
            return Err(JudgeError::Malformed("justification is empty".to_string()));
        }

        Ok(())
    }
}

fn in_score_range(score: f64) -> bool {
    score.is_finite() && (0.0..=MAX_SCORE).contains(&score)
}

// ===== AI Evaluation =====

/// One judged candidate within an evaluation batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiEvaluation {
    pub id: EvaluationId,
    pub candidate_id: CandidateId,
    pub template_id: TemplateId,
    pub batch_id: BatchId,
    pub judge_model: String,
    pub criteria_scores: BTreeMap<String, f64>,
    pub overall_score: f64,
    /// 1 = best within the batch.
    pub ai_rank: usize,
    pub justification: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub evaluated_at: DateTime<Utc>,
    pub evaluation_duration_seconds: f64,
}

impl AiEvaluation {
    pub fn from_verdict(
        candidate_id: CandidateId,
        template_id: TemplateId,
        batch_id: BatchId,
        judge_model: impl Into<String>,
        verdict: JudgeVerdict,
        evaluation_duration_seconds: f64,
    ) -> Self {
        Self {
            id: EvaluationId::new(),
            candidate_id,
            template_id,
            batch_id,
            judge_model: judge_model.into(),
            criteria_scores: verdict.criteria_scores,
            overall_score: verdict.overall_score,
            ai_rank: 0,
            justification: verdict.justification,
            strengths: verdict.strengths,
            weaknesses: verdict.weaknesses,
            evaluated_at: Utc::now(),
            evaluation_duration_seconds,
        }
    }
}
