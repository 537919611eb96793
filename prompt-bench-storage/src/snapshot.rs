//! JSON snapshot of a store, used to seed the in-memory store from disk and
//! to write back what a session produced.

use prompt_bench_core::domain::{
    AiEvaluation, Candidate, EvaluationBatch, EvaluationTemplate, HumanRanking, RankingWeights,
};
use prompt_bench_core::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use validator::Validate;

use crate::memory::InMemoryStore;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub templates: Vec<EvaluationTemplate>,
    #[serde(default)]
    pub batches: Vec<EvaluationBatch>,
    #[serde(default)]
    pub evaluations: Vec<AiEvaluation>,
    #[serde(default)]
    pub human_rankings: Vec<HumanRanking>,
    #[serde(default)]
    pub weights: Vec<RankingWeights>,
}

impl Snapshot {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Internal(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .map_err(|e| CoreError::Internal(format!("failed to write {}: {}", path.display(), e)))
    }

    /// Builds a store holding everything in the snapshot. Templates are
    /// validated on the way in.
    pub fn into_store(self) -> Result<InMemoryStore> {
        for template in &self.templates {
            template.validate()?;
        }

        let store = InMemoryStore::new();
        let counts = (
            self.candidates.len(),
            self.batches.len(),
            self.human_rankings.len(),
        );

        store.insert_candidates(self.candidates);
        for template in self.templates {
            store.templates.insert(template.id, template);
        }
        for batch in self.batches {
            store
                .batches_by_prompt
                .entry(batch.prompt_name.clone())
                .or_default()
                .push(batch.id);
            store.batches.insert(batch.id, batch);
        }
        for evaluation in self.evaluations {
            store.evaluations.entry(evaluation.batch_id).or_default().push(evaluation);
        }
        for ranking in self.human_rankings {
            store.rankings.entry(ranking.prompt_name.clone()).or_default().push(ranking);
        }
        for weights in self.weights {
            store.weights.insert(weights.prompt_name.clone(), weights);
        }

        info!(
            candidates = counts.0,
            batches = counts.1,
            rankings = counts.2,
            "Loaded snapshot"
        );
        Ok(store)
    }
}

impl InMemoryStore {
    /// Copies the store out, keeping per-prompt order. Prompts are visited
    /// alphabetically so repeated snapshots diff cleanly.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();

        for prompt in self.prompt_names() {
            snapshot.candidates.extend(self.all_candidates(&prompt));
        }

        let mut templates: Vec<EvaluationTemplate> =
            self.templates.iter().map(|t| t.value().clone()).collect();
        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        snapshot.templates = templates;

        let mut batch_prompts: Vec<String> =
            self.batches_by_prompt.iter().map(|e| e.key().clone()).collect();
        batch_prompts.sort();
        for prompt in batch_prompts {
            let ids = self
                .batches_by_prompt
                .get(&prompt)
                .map(|ids| ids.value().clone())
                .unwrap_or_default();
            for id in ids {
                if let Some(batch) = self.batches.get(&id) {
                    snapshot.batches.push(batch.value().clone());
                }
                if let Some(evaluations) = self.evaluations.get(&id) {
                    snapshot.evaluations.extend(evaluations.value().iter().cloned());
                }
            }
        }

        let mut ranking_prompts: Vec<String> = self.rankings.iter().map(|e| e.key().clone()).collect();
        ranking_prompts.sort();
        for prompt in ranking_prompts {
            if let Some(rankings) = self.rankings.get(&prompt) {
                snapshot.human_rankings.extend(rankings.value().iter().cloned());
            }
        }

        let mut weights: Vec<RankingWeights> = self.weights.iter().map(|w| w.value().clone()).collect();
        weights.sort_by(|a, b| a.prompt_name.cmp(&b.prompt_name));
        snapshot.weights = weights;

        snapshot
    }
}
