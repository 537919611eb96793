use prompt_bench_core::domain::{AgreementSummary, CandidateId, PositionChange, Ranking};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Default `k` for top-k overlap.
pub const DEFAULT_TOP_K: usize = 3;

/// Comparison statistics between a reference ranking and a compared one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgreementResult {
    /// Kendall tau over the common items, in `[-1, 1]`.
    pub kendall_tau: f64,
    pub top_k: usize,
    pub top_k_overlap: usize,
    pub exact_position_matches: usize,
    /// Share of reference positions holding the same id in both rankings.
    pub agreement_percentage: f64,
    pub changes: Vec<PositionChange>,
    pub common_items: usize,
    pub only_in_reference: Vec<CandidateId>,
    pub only_in_compared: Vec<CandidateId>,
}

impl AgreementResult {
    pub fn num_changes(&self) -> usize {
        self.changes.len()
    }

    /// True when both rankings covered exactly the same candidates.
    pub fn is_complete(&self) -> bool {
        self.only_in_reference.is_empty() && self.only_in_compared.is_empty()
    }

    /// Fields stored alongside a human ranking.
    pub fn summary(&self) -> AgreementSummary {
        AgreementSummary {
            changes_from_ai: self.changes.clone(),
            ai_agreement_score: Some(self.kendall_tau),
            top_3_overlap: Some(self.top_k_overlap),
            exact_position_matches: Some(self.exact_position_matches),
        }
    }
}

/// Rank agreement between two orderings of candidates.
///
/// The first argument is always the reference (typically the AI ranking);
/// every [`PositionChange`] describes how an item moved from the reference
/// into the compared ranking.
pub struct RankAgreement;

impl RankAgreement {
    pub fn compare(reference: &Ranking, compared: &Ranking, top_k: usize) -> AgreementResult {
        let compared_set: HashSet<&CandidateId> = compared.iter().collect();
        let reference_set: HashSet<&CandidateId> = reference.iter().collect();

        let only_in_reference: Vec<CandidateId> = reference
            .iter()
            .filter(|id| !compared_set.contains(id))
            .cloned()
            .collect();
        let only_in_compared: Vec<CandidateId> = compared
            .iter()
            .filter(|id| !reference_set.contains(id))
            .cloned()
            .collect();

        let exact_position_matches = Self::exact_position_matches(reference, compared);
        let agreement_percentage = exact_position_matches as f64 / reference.len() as f64 * 100.0;

        AgreementResult {
            kendall_tau: Self::kendall_tau(reference, compared),
            top_k,
            top_k_overlap: Self::top_k_overlap(reference, compared, top_k),
            exact_position_matches,
            agreement_percentage,
            changes: Self::position_changes(reference, compared),
            common_items: reference.len() - only_in_reference.len(),
            only_in_reference,
            only_in_compared,
        }
    }

    /// `(concordant - discordant) / (n(n-1)/2)` over the items both rankings
    /// contain. Fewer than two common items carry no order information and
    /// yield 0.0.
    pub fn kendall_tau(reference: &Ranking, compared: &Ranking) -> f64 {
        let compared_positions = compared.positions();
        let common: Vec<usize> = reference
            .iter()
            .filter_map(|id| compared_positions.get(id).copied())
            .collect();

        let n = common.len();
        if n < 2 {
            return 0.0;
        }

        let mut concordant: i64 = 0;
        let mut discordant: i64 = 0;
        for i in 0..n {
            for j in (i + 1)..n {
                if common[i] < common[j] {
                    concordant += 1;
                } else {
                    discordant += 1;
                }
            }
        }

        let total_pairs = (n * (n - 1) / 2) as f64;
        (concordant - discordant) as f64 / total_pairs
    }

    pub fn top_k_overlap(reference: &Ranking, compared: &Ranking, k: usize) -> usize {
        let compared_top: HashSet<&CandidateId> = compared.top(k).iter().collect();
        reference
            .top(k)
            .iter()
            .filter(|id| compared_top.contains(id))
            .count()
    }

    pub fn exact_position_matches(reference: &Ranking, compared: &Ranking) -> usize {
        reference
            .iter()
            .zip(compared.iter())
            .filter(|(a, b)| a == b)
            .count()
    }

    /// Moves of every common item whose 1-based rank differs, in reference
    /// order.
    pub fn position_changes(reference: &Ranking, compared: &Ranking) -> Vec<PositionChange> {
        let compared_positions: HashMap<&CandidateId, usize> = compared.positions();

        reference
            .iter()
            .enumerate()
            .filter_map(|(from, id)| {
                let to = *compared_positions.get(id)?;
                (from != to).then(|| PositionChange::new(id.clone(), from + 1, to + 1))
            })
            .collect()
    }
}
