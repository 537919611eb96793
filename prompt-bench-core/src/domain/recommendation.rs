use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::weights::Weights;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// `>= 4` high, `2..=3` medium, below that low.
    pub fn from_points(points: u32) -> Self {
        match points {
            p if p >= 4 => ConfidenceLevel::High,
            p if p >= 2 => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceLevel::Low => "LOW",
            ConfidenceLevel::Medium => "MEDIUM",
            ConfidenceLevel::High => "HIGH",
        };
        write!(f, "{}", label)
    }
}

/// Which signal produced a configuration's quality score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QualitySource {
    HumanRankings,
    AiEvaluations,
    Neutral,
}

/// Component and composite scores of one configuration, all on a 0-10 scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigScore {
    pub config_name: String,
    pub final_score: f64,
    pub quality_score: f64,
    pub quality_source: QualitySource,
    pub speed_score: f64,
    pub cost_score: f64,
    pub avg_duration_seconds: f64,
    pub avg_cost_usd: Option<f64>,
    pub num_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub prompt_name: String,
    pub recommended_config: String,
    pub final_score: f64,
    pub quality_score: f64,
    pub quality_source: QualitySource,
    pub speed_score: f64,
    pub cost_score: f64,
    pub confidence: ConfidenceLevel,
    pub confidence_factors: Vec<String>,
    pub num_ai_evaluations: usize,
    pub num_human_rankings: usize,
    /// Where the winner sits in the human consensus (1.0 = top), when at
    /// least two human rankings exist.
    pub consensus_agreement: Option<f64>,
    pub reasoning: String,
    pub runner_up_config: Option<String>,
    pub score_difference: Option<f64>,
    /// Every configuration, best composite score first.
    pub config_scores: Vec<ConfigScore>,
    pub weights: Weights,
    pub generated_at: DateTime<Utc>,
}

/// Result of asking for a recommendation. A prompt without successful
/// candidates yields `NoData` instead of a fabricated winner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Recommended(Box<Recommendation>),
    NoData { prompt_name: String },
}

impl RecommendationOutcome {
    pub fn recommendation(&self) -> Option<&Recommendation> {
        match self {
            RecommendationOutcome::Recommended(rec) => Some(rec),
            RecommendationOutcome::NoData { .. } => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, RecommendationOutcome::NoData { .. })
    }
}
