use dashmap::DashMap;
use prompt_bench_core::domain::{
    AiEvaluation, BatchId, Candidate, EvaluationBatch, EvaluationTemplate, HumanRanking,
    RankingWeights, TemplateId,
};

/// Process-local store backing every collaborator trait.
///
/// Histories (candidates, rankings, evaluations and the batch list of a
/// prompt) are append-only and keep insertion order. Batches themselves are
/// replaced in place as they progress.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    pub(crate) candidates: DashMap<String, Vec<Candidate>>,
    pub(crate) templates: DashMap<TemplateId, EvaluationTemplate>,
    pub(crate) batches: DashMap<BatchId, EvaluationBatch>,
    pub(crate) batches_by_prompt: DashMap<String, Vec<BatchId>>,
    pub(crate) evaluations: DashMap<BatchId, Vec<AiEvaluation>>,
    pub(crate) rankings: DashMap<String, Vec<HumanRanking>>,
    pub(crate) weights: DashMap<String, RankingWeights>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an executed candidate under its prompt.
    pub fn insert_candidate(&self, candidate: Candidate) {
        self.candidates
            .entry(candidate.prompt_name.clone())
            .or_default()
            .push(candidate);
    }

    pub fn insert_candidates(&self, candidates: impl IntoIterator<Item = Candidate>) {
        for candidate in candidates {
            self.insert_candidate(candidate);
        }
    }

    /// Every candidate, successful or not, of a prompt.
    pub fn all_candidates(&self, prompt_name: &str) -> Vec<Candidate> {
        self.candidates
            .get(prompt_name)
            .map(|c| c.value().clone())
            .unwrap_or_default()
    }

    /// Prompt names with at least one candidate, sorted.
    pub fn prompt_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.candidates.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
