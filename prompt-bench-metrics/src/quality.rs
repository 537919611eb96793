use prompt_bench_core::domain::{CandidateId, QualitySource, Ranking};

use crate::aggregators::{ScoreAggregator, NEUTRAL_SCORE};

/// Quality evidence gathered for one configuration.
#[derive(Debug, Clone, Copy)]
pub struct QualityEvidence<'a> {
    /// Candidates produced by the configuration.
    pub candidate_ids: &'a [CandidateId],
    pub human_rankings: &'a [Ranking],
    /// Judge `overall_score`s of the configuration's candidates.
    pub ai_scores: &'a [f64],
}

/// Priority-ordered list of quality sources. The first source able to
/// produce a score wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityTable {
    sources: Vec<QualitySource>,
}

impl Default for QualityTable {
    fn default() -> Self {
        Self {
            sources: vec![
                QualitySource::HumanRankings,
                QualitySource::AiEvaluations,
                QualitySource::Neutral,
            ],
        }
    }
}

impl QualityTable {
    pub fn new(sources: Vec<QualitySource>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[QualitySource] {
        &self.sources
    }

    /// Score on the 0-10 scale and the source that produced it. A table
    /// without a matching entry falls back to the neutral score.
    pub fn evaluate(&self, evidence: &QualityEvidence<'_>) -> (f64, QualitySource) {
        self.sources
            .iter()
            .find_map(|source| Self::score(*source, evidence).map(|score| (score, *source)))
            .unwrap_or((NEUTRAL_SCORE, QualitySource::Neutral))
    }

    pub fn score(source: QualitySource, evidence: &QualityEvidence<'_>) -> Option<f64> {
        match source {
            QualitySource::HumanRankings => human_score(evidence),
            QualitySource::AiEvaluations => ScoreAggregator::mean(evidence.ai_scores),
            QualitySource::Neutral => Some(NEUTRAL_SCORE),
        }
    }
}

/// Average of `10 - p*10/n` over every occurrence of the configuration's
/// candidates in the human rankings.
fn human_score(evidence: &QualityEvidence<'_>) -> Option<f64> {
    let scores: Vec<f64> = evidence
        .human_rankings
        .iter()
        .flat_map(|ranking| {
            evidence.candidate_ids.iter().filter_map(move |id| {
                ranking
                    .position_of(id)
                    .map(|position| ScoreAggregator::position_score(position, ranking.len()))
            })
        })
        .collect();
    ScoreAggregator::mean(&scores)
}
