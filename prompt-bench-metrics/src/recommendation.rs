use chrono::Utc;
use prompt_bench_core::domain::{
    AiEvaluation, Candidate, CandidateId, ConfidenceLevel, ConfigScore, Ranking, Recommendation,
    RecommendationOutcome, Weights,
};
use prompt_bench_core::error::{CoreError, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::aggregators::{ScoreAggregator, NEUTRAL_SCORE};
use crate::consensus::{ConsensusAggregator, ConsensusResult};
use crate::quality::{QualityEvidence, QualityTable};

/// Position variance below which evaluators agree on the winner.
pub const HIGH_AGREEMENT_VARIANCE: f64 = 1.0;

/// Quality score from which the winner is described as "the highest".
const TOP_QUALITY: f64 = 8.0;

/// Everything the engine needs for one prompt. Weights are passed in rather
/// than looked up so the engine stays a pure function of its input.
#[derive(Debug, Clone)]
pub struct RecommendationInput {
    pub prompt_name: String,
    pub candidates: Vec<Candidate>,
    pub ai_evaluations: Vec<AiEvaluation>,
    pub human_rankings: Vec<Ranking>,
    pub weights: Weights,
}

impl RecommendationInput {
    pub fn new(prompt_name: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            prompt_name: prompt_name.into(),
            candidates,
            ai_evaluations: Vec::new(),
            human_rankings: Vec::new(),
            weights: Weights::default(),
        }
    }

    pub fn with_ai_evaluations(mut self, evaluations: Vec<AiEvaluation>) -> Self {
        self.ai_evaluations = evaluations;
        self
    }

    pub fn with_human_rankings(mut self, rankings: Vec<Ranking>) -> Self {
        self.human_rankings = rankings;
        self
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }
}

/// Candidates of one configuration, in submission order.
struct ConfigGroup<'a> {
    name: &'a str,
    candidates: Vec<&'a Candidate>,
}

impl ConfigGroup<'_> {
    fn candidate_ids(&self) -> Vec<CandidateId> {
        self.candidates.iter().map(|c| c.id.clone()).collect()
    }

    fn avg_duration(&self) -> f64 {
        let durations: Vec<f64> = self.candidates.iter().map(|c| c.duration_seconds).collect();
        ScoreAggregator::mean(&durations).unwrap_or(0.0)
    }

    fn avg_cost(&self) -> Option<f64> {
        let costs: Vec<f64> = self.candidates.iter().filter_map(|c| c.cost_f64()).collect();
        ScoreAggregator::mean(&costs)
    }
}

/// Picks the best configuration for a prompt from quality, speed and cost.
#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    quality_table: QualityTable,
}

impl RecommendationEngine {
    pub fn new(quality_table: QualityTable) -> Self {
        Self { quality_table }
    }

    pub fn recommend(&self, input: &RecommendationInput) -> Result<RecommendationOutcome> {
        let successful: Vec<&Candidate> = input.candidates.iter().filter(|c| c.success).collect();
        if successful.is_empty() {
            debug!(prompt = %input.prompt_name, "No successful candidates, nothing to recommend");
            return Ok(RecommendationOutcome::NoData {
                prompt_name: input.prompt_name.clone(),
            });
        }
        validate_candidates(&successful)?;

        let groups = group_by_config(&successful);
        let config_scores = self.score_configs(input, &successful, &groups);

        let winner = &config_scores[0];
        let runner_up = config_scores.get(1);
        let winner_group = groups
            .iter()
            .find(|g| g.name == winner.config_name)
            .ok_or_else(|| CoreError::Internal(format!("missing group for {}", winner.config_name)))?;
        let winner_ids = winner_group.candidate_ids();

        let consensus = human_consensus(&input.human_rankings);
        let (confidence, confidence_factors) = confidence(input, &winner_ids, consensus.as_ref());

        let consensus_agreement = consensus
            .as_ref()
            .filter(|_| input.human_rankings.len() > 1)
            .and_then(|c| {
                let ranking = &c.consensus_ranking;
                winner_ids
                    .iter()
                    .filter_map(|id| ranking.position_of(id))
                    .min()
                    .map(|pos| 1.0 - pos as f64 / ranking.len() as f64)
            });

        let reasoning = reasoning(winner, input.human_rankings.len());

        debug!(
            prompt = %input.prompt_name,
            winner = %winner.config_name,
            final_score = winner.final_score,
            confidence = %confidence,
            "Computed recommendation"
        );

        let recommendation = Recommendation {
            prompt_name: input.prompt_name.clone(),
            recommended_config: winner.config_name.clone(),
            final_score: winner.final_score,
            quality_score: winner.quality_score,
            quality_source: winner.quality_source,
            speed_score: winner.speed_score,
            cost_score: winner.cost_score,
            confidence,
            confidence_factors,
            num_ai_evaluations: input.ai_evaluations.len(),
            num_human_rankings: input.human_rankings.len(),
            consensus_agreement,
            reasoning,
            runner_up_config: runner_up.map(|r| r.config_name.clone()),
            score_difference: runner_up.map(|r| winner.final_score - r.final_score),
            weights: input.weights,
            config_scores: config_scores.clone(),
            generated_at: Utc::now(),
        };

        Ok(RecommendationOutcome::Recommended(Box::new(recommendation)))
    }

    /// Scores every configuration, best first. Equal scores keep the order in
    /// which configurations were first encountered.
    fn score_configs(
        &self,
        input: &RecommendationInput,
        successful: &[&Candidate],
        groups: &[ConfigGroup<'_>],
    ) -> Vec<ConfigScore> {
        let max_duration = ScoreAggregator::max(successful.iter().map(|c| c.duration_seconds)).unwrap_or(0.0);
        let max_cost = ScoreAggregator::max(successful.iter().filter_map(|c| c.cost_f64())).unwrap_or(0.0);

        let config_of: HashMap<&CandidateId, &str> = successful
            .iter()
            .map(|c| (&c.id, c.config_name.as_str()))
            .collect();

        let mut scores: Vec<ConfigScore> = groups
            .iter()
            .map(|group| {
                let candidate_ids = group.candidate_ids();
                let ai_scores: Vec<f64> = input
                    .ai_evaluations
                    .iter()
                    .filter(|e| config_of.get(&e.candidate_id) == Some(&group.name))
                    .map(|e| e.overall_score)
                    .collect();

                let (quality_score, quality_source) = self.quality_table.evaluate(&QualityEvidence {
                    candidate_ids: &candidate_ids,
                    human_rankings: &input.human_rankings,
                    ai_scores: &ai_scores,
                });

                let avg_duration = group.avg_duration();
                let speed_score = ScoreAggregator::inverse_normalized(avg_duration, max_duration);

                let avg_cost = group.avg_cost();
                let cost_score = match avg_cost {
                    Some(cost) => ScoreAggregator::inverse_normalized(cost, max_cost),
                    None => NEUTRAL_SCORE,
                };

                let final_score = input.weights.composite(quality_score, speed_score, cost_score);

                ConfigScore {
                    config_name: group.name.to_string(),
                    final_score,
                    quality_score,
                    quality_source,
                    speed_score,
                    cost_score,
                    avg_duration_seconds: avg_duration,
                    avg_cost_usd: avg_cost,
                    num_candidates: group.candidates.len(),
                }
            })
            .collect();

        scores.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        scores
    }
}

fn validate_candidates(candidates: &[&Candidate]) -> Result<()> {
    for candidate in candidates {
        if !candidate.duration_seconds.is_finite() || candidate.duration_seconds < 0.0 {
            return Err(CoreError::Validation(format!(
                "candidate {} has invalid duration {}",
                candidate.id, candidate.duration_seconds
            )));
        }
        if let Some(cost) = candidate.cost_f64() {
            if cost < 0.0 {
                return Err(CoreError::Validation(format!(
                    "candidate {} has negative cost {}",
                    candidate.id, cost
                )));
            }
        }
    }
    Ok(())
}

fn group_by_config<'a>(candidates: &[&'a Candidate]) -> Vec<ConfigGroup<'a>> {
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<ConfigGroup<'a>> = Vec::new();

    for &candidate in candidates {
        let name = candidate.config_name.as_str();
        match index.get(name) {
            Some(&i) => groups[i].candidates.push(candidate),
            None => {
                index.insert(name, groups.len());
                groups.push(ConfigGroup {
                    name,
                    candidates: vec![candidate],
                });
            }
        }
    }

    groups
}

fn human_consensus(rankings: &[Ranking]) -> Option<ConsensusResult> {
    if rankings.is_empty() {
        return None;
    }
    match ConsensusAggregator::aggregate(rankings, None) {
        Ok(consensus) => Some(consensus),
        Err(e) => {
            warn!(error = %e, "Human rankings cannot be aggregated, skipping consensus factors");
            None
        }
    }
}

fn confidence(
    input: &RecommendationInput,
    winner_ids: &[CandidateId],
    consensus: Option<&ConsensusResult>,
) -> (ConfidenceLevel, Vec<String>) {
    let has_ai = !input.ai_evaluations.is_empty();
    let num_humans = input.human_rankings.len();

    let mut points = 0;
    let mut factors = Vec::new();

    if has_ai {
        points += 1;
        factors.push("AI evaluation available".to_string());
    }

    if num_humans > 0 {
        points += 2;
        factors.push(format!("{} human ranking(s)", num_humans));

        if num_humans > 1 {
            let variance = ConsensusAggregator::position_variance(&input.human_rankings, winner_ids);
            if variance < HIGH_AGREEMENT_VARIANCE {
                points += 1;
                factors.push("High human agreement".to_string());
            } else {
                factors.push("Some human disagreement".to_string());
            }
        }
    }

    if has_ai {
        if let Some(consensus) = consensus {
            if winner_ids.contains(consensus.top()) {
                points += 1;
                factors.push("Humans confirm AI ranking".to_string());
            }
        }
    }

    let level = ConfidenceLevel::from_points(points);
    if level == ConfidenceLevel::Low && num_humans == 0 {
        factors.push("No human rankings yet".to_string());
    }

    (level, factors)
}

fn reasoning(winner: &ConfigScore, num_humans: usize) -> String {
    let strength = if winner.quality_score >= TOP_QUALITY {
        "the highest"
    } else {
        "a strong"
    };
    let mut quality = format!(
        "{} achieved {} quality score ({:.1}/10)",
        winner.config_name, strength, winner.quality_score
    );
    if num_humans > 0 {
        quality.push_str(&format!(
            " and was ranked highly by {} human evaluator{}",
            num_humans,
            if num_humans > 1 { "s" } else { "" }
        ));
    }

    let mut performance = format!(
        "It offers balanced performance with {:.1}s duration",
        winner.avg_duration_seconds
    );
    if let Some(cost) = winner.avg_cost_usd.filter(|c| *c > 0.0) {
        performance.push_str(&format!(" and ${:.4} cost", cost));
    }

    format!("{}. {}.", quality, performance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use prompt_bench_core::domain::QualitySource;
    use rust_decimal::Decimal;

    fn candidate(id: &str, config: &str, duration: f64, cost_cents: Option<i64>) -> Candidate {
        Candidate::new(id, "summarize", config, duration, cost_cents.map(|c| Decimal::new(c, 2)))
    }

    #[test]
    fn test_no_successful_candidates() {
        let input = RecommendationInput::new("summarize", vec![candidate("a", "A", 1.0, None).failed()]);
        let outcome = RecommendationEngine::default().recommend(&input).unwrap();
        assert!(outcome.is_no_data());
    }

    #[test]
    fn test_zero_durations_score_ten() {
        let input = RecommendationInput::new(
            "summarize",
            vec![candidate("a", "A", 0.0, None), candidate("b", "B", 0.0, None)],
        );
        let outcome = RecommendationEngine::default().recommend(&input).unwrap();
        let rec = outcome.recommendation().unwrap();

        for score in &rec.config_scores {
            assert_relative_eq!(score.speed_score, 10.0);
            assert_relative_eq!(score.cost_score, NEUTRAL_SCORE);
            assert_eq!(score.quality_source, QualitySource::Neutral);
        }
        // Equal composites keep the first configuration.
        assert_eq!(rec.recommended_config, "A");
        assert_eq!(rec.confidence, ConfidenceLevel::Low);
        assert!(rec.confidence_factors.contains(&"No human rankings yet".to_string()));
    }

    #[test]
    fn test_rejects_negative_duration() {
        let input = RecommendationInput::new("summarize", vec![candidate("a", "A", -1.0, None)]);
        assert!(matches!(
            RecommendationEngine::default().recommend(&input),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_reasoning_text() {
        let score = ConfigScore {
            config_name: "gpt4o".to_string(),
            final_score: 8.0,
            quality_score: 9.0,
            quality_source: QualitySource::AiEvaluations,
            speed_score: 5.0,
            cost_score: 5.0,
            avg_duration_seconds: 10.0,
            avg_cost_usd: Some(0.05),
            num_candidates: 1,
        };

        assert_eq!(
            reasoning(&score, 2),
            "gpt4o achieved the highest quality score (9.0/10) and was ranked highly by 2 human evaluators. \
             It offers balanced performance with 10.0s duration and $0.0500 cost."
        );
    }
}
