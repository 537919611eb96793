use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use validator::Validate;

use super::ids::{BatchId, CandidateId, RankingId};
use crate::error::{CoreError, Result};

// ===== Ranking =====

/// A total order over candidate ids, best first.
///
/// Every id appears exactly once and the order is never empty; both are
/// checked on construction and on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CandidateId>", into = "Vec<CandidateId>")]
pub struct Ranking {
    ids: Vec<CandidateId>,
}

impl Ranking {
    pub fn new(ids: Vec<CandidateId>) -> Result<Self> {
        if ids.is_empty() {
            return Err(CoreError::InvalidRanking("ranking is empty".to_string()));
        }

        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            if !seen.insert(id) {
                return Err(CoreError::InvalidRanking(format!(
                    "candidate {} appears more than once",
                    id
                )));
            }
        }

        Ok(Self { ids })
    }

    /// Convenience constructor for string ids.
    pub fn from_strs<S: AsRef<str>>(ids: &[S]) -> Result<Self> {
        Self::new(ids.iter().map(|s| CandidateId::new(s.as_ref())).collect())
    }

    pub fn ids(&self) -> &[CandidateId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn first(&self) -> &CandidateId {
        &self.ids[0]
    }

    /// 0-based position of `id`, if present.
    pub fn position_of(&self, id: &CandidateId) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }

    /// Position lookup table for repeated queries.
    pub fn positions(&self) -> HashMap<&CandidateId, usize> {
        self.ids.iter().enumerate().map(|(i, id)| (id, i)).collect()
    }

    pub fn contains(&self, id: &CandidateId) -> bool {
        self.ids.contains(id)
    }

    pub fn top(&self, k: usize) -> &[CandidateId] {
        &self.ids[..k.min(self.ids.len())]
    }

    pub fn reversed(&self) -> Self {
        let mut ids = self.ids.clone();
        ids.reverse();
        Self { ids }
    }

    /// True when both rankings order exactly the same set of candidates.
    pub fn same_items(&self, other: &Ranking) -> bool {
        self.len() == other.len() && self.ids.iter().all(|id| other.contains(id))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidateId> {
        self.ids.iter()
    }
}

impl TryFrom<Vec<CandidateId>> for Ranking {
    type Error = CoreError;

    fn try_from(ids: Vec<CandidateId>) -> Result<Self> {
        Ranking::new(ids)
    }
}

impl From<Ranking> for Vec<CandidateId> {
    fn from(ranking: Ranking) -> Self {
        ranking.ids
    }
}

impl<'a> IntoIterator for &'a Ranking {
    type Item = &'a CandidateId;
    type IntoIter = std::slice::Iter<'a, CandidateId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

// ===== Position Changes =====

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Movement of one candidate between a reference ranking and a compared one.
/// Ranks are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionChange {
    pub candidate_id: CandidateId,
    pub from_rank: usize,
    pub to_rank: usize,
    pub direction: Direction,
    pub magnitude: usize,
}

impl PositionChange {
    pub fn new(candidate_id: CandidateId, from_rank: usize, to_rank: usize) -> Self {
        let direction = if to_rank < from_rank {
            Direction::Up
        } else {
            Direction::Down
        };
        Self {
            candidate_id,
            from_rank,
            to_rank,
            direction,
            magnitude: from_rank.abs_diff(to_rank),
        }
    }
}

// ===== Human Ranking =====

/// Agreement summary stored alongside a human ranking for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgreementSummary {
    #[serde(default)]
    pub changes_from_ai: Vec<PositionChange>,
    pub ai_agreement_score: Option<f64>,
    pub top_3_overlap: Option<usize>,
    pub exact_position_matches: Option<usize>,
}

/// Input for recording a human ranking.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewHumanRanking {
    #[validate(length(min = 1, max = 255))]
    pub prompt_name: String,
    #[validate(length(min = 1, max = 255))]
    pub evaluator_name: String,
    pub ranked_ids: Vec<CandidateId>,
    pub based_on_batch_id: Option<BatchId>,
    #[validate(length(max = 10000))]
    pub notes: Option<String>,
    #[validate(range(min = 0.0))]
    pub time_spent_seconds: f64,
}

/// One evaluator's drag-ordered ranking of a prompt's candidates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HumanRanking {
    pub id: RankingId,
    pub prompt_name: String,
    pub evaluator_name: String,
    pub ranking: Ranking,
    pub based_on_batch_id: Option<BatchId>,
    pub notes: Option<String>,
    pub time_spent_seconds: f64,
    #[serde(flatten)]
    pub agreement: AgreementSummary,
    pub created_at: DateTime<Utc>,
}

impl HumanRanking {
    pub fn new(prompt_name: impl Into<String>, evaluator_name: impl Into<String>, ranking: Ranking) -> Self {
        Self {
            id: RankingId::new(),
            prompt_name: prompt_name.into(),
            evaluator_name: evaluator_name.into(),
            ranking,
            based_on_batch_id: None,
            notes: None,
            time_spent_seconds: 0.0,
            agreement: AgreementSummary::default(),
            created_at: Utc::now(),
        }
    }

    /// Validates the request and builds the ranking it describes.
    pub fn from_request(request: NewHumanRanking) -> Result<Self> {
        request.validate()?;
        let ranking = Ranking::new(request.ranked_ids)?;

        Ok(Self {
            id: RankingId::new(),
            prompt_name: request.prompt_name,
            evaluator_name: request.evaluator_name,
            ranking,
            based_on_batch_id: request.based_on_batch_id,
            notes: request.notes,
            time_spent_seconds: request.time_spent_seconds,
            agreement: AgreementSummary::default(),
            created_at: Utc::now(),
        })
    }

    pub fn with_agreement(mut self, agreement: AgreementSummary) -> Self {
        self.agreement = agreement;
        self
    }
}
