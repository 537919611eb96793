use prompt_bench_core::domain::{CandidateId, Ranking};
use prompt_bench_core::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::aggregators::ScoreAggregator;
use crate::agreement::{AgreementResult, RankAgreement, DEFAULT_TOP_K};

/// Mean pairwise tau at or above which evaluators broadly agree.
pub const LOW_VARIABILITY_TAU: f64 = 0.7;

/// Mean pairwise tau at or above which disagreement is moderate.
pub const MEDIUM_VARIABILITY_TAU: f64 = 0.4;

/// How much the individual rankers disagree with each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Variability {
    Low,
    Medium,
    High,
}

impl Variability {
    pub fn from_mean_tau(mean_tau: f64) -> Self {
        if mean_tau >= LOW_VARIABILITY_TAU {
            Variability::Low
        } else if mean_tau >= MEDIUM_VARIABILITY_TAU {
            Variability::Medium
        } else {
            Variability::High
        }
    }
}

impl fmt::Display for Variability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Variability::Low => "low",
            Variability::Medium => "medium",
            Variability::High => "high",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsensusResult {
    pub consensus_ranking: Ranking,
    /// Borda total per candidate.
    pub confidence_scores: BTreeMap<CandidateId, usize>,
    pub num_rankers: usize,
    pub agreement_with_ai: Option<AgreementResult>,
    pub variability: Variability,
    pub mean_pairwise_tau: f64,
}

impl ConsensusResult {
    pub fn top(&self) -> &CandidateId {
        self.consensus_ranking.first()
    }
}

/// Borda-count consensus over several rankings of the same candidates.
pub struct ConsensusAggregator;

impl ConsensusAggregator {
    /// Each ranking awards `n - i` points to the item at 0-based position
    /// `i`. Items are ordered by total points; equal totals keep the order
    /// of the first ranking.
    pub fn aggregate(rankings: &[Ranking], ai_ranking: Option<&Ranking>) -> Result<ConsensusResult> {
        let first = rankings
            .first()
            .ok_or_else(|| CoreError::InvalidRanking("no rankings to aggregate".to_string()))?;

        if let Some((index, _)) = rankings
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, ranking)| !ranking.same_items(first))
        {
            return Err(CoreError::InvalidRanking(format!(
                "ranking {} does not cover the same candidates as the first ranking",
                index
            )));
        }

        let n = first.len();
        let mut scores: HashMap<&CandidateId, usize> = HashMap::with_capacity(n);
        for ranking in rankings {
            for (position, id) in ranking.iter().enumerate() {
                *scores.entry(id).or_insert(0) += n - position;
            }
        }

        let mut ordered: Vec<CandidateId> = first.ids().to_vec();
        // Stable sort keeps first-ranking order among equal totals.
        ordered.sort_by(|a, b| scores[b].cmp(&scores[a]));

        let confidence_scores: BTreeMap<CandidateId, usize> = scores
            .iter()
            .map(|(id, points)| ((*id).clone(), *points))
            .collect();

        let consensus_ranking = Ranking::new(ordered)?;
        let agreement_with_ai =
            ai_ranking.map(|ai| RankAgreement::compare(ai, &consensus_ranking, DEFAULT_TOP_K));

        let mean_pairwise_tau = Self::mean_pairwise_tau(rankings);

        Ok(ConsensusResult {
            consensus_ranking,
            confidence_scores,
            num_rankers: rankings.len(),
            agreement_with_ai,
            variability: Variability::from_mean_tau(mean_pairwise_tau),
            mean_pairwise_tau,
        })
    }

    /// Mean Kendall tau over every pair of rankings; 1.0 for a single ranking.
    pub fn mean_pairwise_tau(rankings: &[Ranking]) -> f64 {
        let mut taus = Vec::new();
        for (i, a) in rankings.iter().enumerate() {
            for b in &rankings[i + 1..] {
                taus.push(RankAgreement::kendall_tau(a, b));
            }
        }
        ScoreAggregator::mean(&taus).unwrap_or(1.0)
    }

    /// Population variance of the best 0-based position any of `ids` holds
    /// in each ranking. Rankings containing none of `ids` are skipped.
    pub fn position_variance(rankings: &[Ranking], ids: &[CandidateId]) -> f64 {
        let positions: Vec<f64> = rankings
            .iter()
            .filter_map(|ranking| ids.iter().filter_map(|id| ranking.position_of(id)).min())
            .map(|p| p as f64)
            .collect();
        ScoreAggregator::population_variance(&positions)
    }
}
