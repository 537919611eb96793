use prompt_bench_core::domain::{AiEvaluation, Candidate, CandidateId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::aggregators::ScoreAggregator;

/// Run statistics of one configuration.
///
/// Duration, cost and score figures only cover successful candidates and
/// are `None` when there is nothing to aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigStats {
    pub config_name: String,
    /// Successful candidates.
    pub count: usize,
    pub total_runs: usize,
    pub success_rate: f64,
    pub avg_duration: Option<f64>,
    pub min_duration: Option<f64>,
    pub max_duration: Option<f64>,
    pub avg_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub avg_score: Option<f64>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub num_evaluations: usize,
}

/// Side by side statistics of every configuration run for a prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigComparison {
    pub prompt_name: String,
    pub total_experiments: usize,
    pub total_evaluations: usize,
    pub best_by_score: Option<String>,
    pub best_by_speed: Option<String>,
    pub best_by_cost: Option<String>,
    /// In order of first appearance.
    pub config_stats: Vec<ConfigStats>,
}

impl ConfigComparison {
    pub fn is_empty(&self) -> bool {
        self.total_experiments == 0
    }

    pub fn stats(&self, config_name: &str) -> Option<&ConfigStats> {
        self.config_stats.iter().find(|s| s.config_name == config_name)
    }
}

/// Descriptive statistics over configurations, without weighting.
///
/// Scores come from the AI evaluations passed in; every evaluation of a
/// successful candidate counts once.
pub struct ConfigAnalyzer;

impl ConfigAnalyzer {
    /// Compares the configurations run for `prompt_name`. Candidates of other
    /// prompts are ignored.
    pub fn compare_configs(prompt_name: &str, candidates: &[Candidate], evaluations: &[AiEvaluation]) -> ConfigComparison {
        let candidates: Vec<&Candidate> = candidates.iter().filter(|c| c.prompt_name == prompt_name).collect();
        let scores = scores_by_candidate(evaluations);

        let config_stats: Vec<ConfigStats> = group_by_config(&candidates)
            .into_iter()
            .map(|(name, group)| config_stats(name, &group, &scores))
            .collect();

        let total_evaluations = candidates
            .iter()
            .map(|c| scores.get(&c.id).map_or(0, |s| s.len()))
            .sum();

        ConfigComparison {
            prompt_name: prompt_name.to_string(),
            total_experiments: candidates.len(),
            total_evaluations,
            best_by_score: best_by(&config_stats, |s| s.avg_score, Ordering::Greater),
            best_by_speed: best_by(&config_stats, |s| s.avg_duration, Ordering::Less),
            best_by_cost: best_by(&config_stats, |s| s.avg_cost, Ordering::Less),
            config_stats,
        }
    }

    /// Statistics per configuration across every prompt, best average score
    /// first. Configurations without scores come last in order of appearance.
    pub fn overall_rankings(candidates: &[Candidate], evaluations: &[AiEvaluation]) -> Vec<ConfigStats> {
        let all: Vec<&Candidate> = candidates.iter().collect();
        let scores = scores_by_candidate(evaluations);

        let mut stats: Vec<ConfigStats> = group_by_config(&all)
            .into_iter()
            .map(|(name, group)| config_stats(name, &group, &scores))
            .collect();

        stats.sort_by(|a, b| match (a.avg_score, b.avg_score) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        stats
    }
}

fn scores_by_candidate(evaluations: &[AiEvaluation]) -> HashMap<&CandidateId, Vec<f64>> {
    let mut scores: HashMap<&CandidateId, Vec<f64>> = HashMap::new();
    for evaluation in evaluations {
        scores.entry(&evaluation.candidate_id).or_default().push(evaluation.overall_score);
    }
    scores
}

fn group_by_config<'a>(candidates: &[&'a Candidate]) -> Vec<(&'a str, Vec<&'a Candidate>)> {
    let mut groups: Vec<(&str, Vec<&Candidate>)> = Vec::new();
    for &candidate in candidates {
        match groups.iter().position(|(name, _)| *name == candidate.config_name) {
            Some(i) => groups[i].1.push(candidate),
            None => groups.push((candidate.config_name.as_str(), vec![candidate])),
        }
    }
    groups
}

fn config_stats(name: &str, group: &[&Candidate], scores: &HashMap<&CandidateId, Vec<f64>>) -> ConfigStats {
    let successful: Vec<&Candidate> = group.iter().copied().filter(|c| c.success).collect();

    let durations: Vec<f64> = successful.iter().map(|c| c.duration_seconds).collect();
    let costs: Vec<f64> = successful.iter().filter_map(|c| c.cost_f64()).collect();
    let evaluation_scores: Vec<f64> = successful
        .iter()
        .filter_map(|c| scores.get(&c.id))
        .flatten()
        .copied()
        .collect();

    let success_rate = if group.is_empty() {
        0.0
    } else {
        successful.len() as f64 / group.len() as f64
    };

    ConfigStats {
        config_name: name.to_string(),
        count: successful.len(),
        total_runs: group.len(),
        success_rate,
        avg_duration: ScoreAggregator::mean(&durations),
        min_duration: ScoreAggregator::min(durations.iter().copied()),
        max_duration: ScoreAggregator::max(durations.iter().copied()),
        avg_cost: ScoreAggregator::mean(&costs),
        total_cost: (!costs.is_empty()).then(|| costs.iter().sum()),
        avg_score: ScoreAggregator::mean(&evaluation_scores),
        min_score: ScoreAggregator::min(evaluation_scores.iter().copied()),
        max_score: ScoreAggregator::max(evaluation_scores.iter().copied()),
        num_evaluations: evaluation_scores.len(),
    }
}

/// Name of the configuration whose metric compares as `preferred` against
/// every other. Ties keep the first configuration.
fn best_by(stats: &[ConfigStats], metric: impl Fn(&ConfigStats) -> Option<f64>, preferred: Ordering) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for s in stats {
        let Some(value) = metric(s) else { continue };
        match best {
            Some((_, current)) if value.partial_cmp(&current) != Some(preferred) => {}
            _ => best = Some((s.config_name.as_str(), value)),
        }
    }
    best.map(|(name, _)| name.to_string())
}
