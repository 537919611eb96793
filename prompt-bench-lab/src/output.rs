//! Output formatting for the CLI

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use prompt_bench_core::domain::{
    BatchStatus, CandidateId, ConfidenceLevel, Direction, EvaluationBatch, RecommendationOutcome,
};
use prompt_bench_metrics::{AgreementResult, ConfigComparison, ConfigStats, ConsensusResult, Variability};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables (default)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

/// Something the CLI can print as a table.
pub trait TableDisplay {
    fn display_table(&self);
}

pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format }
    }

    pub fn write<T: Serialize + TableDisplay>(&self, item: &T) -> Result<()> {
        match self.format {
            OutputFormat::Table => item.display_table(),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
        }
        Ok(())
    }

    pub fn info(&self, message: &str) {
        if self.format == OutputFormat::Table {
            println!("{} {}", "ℹ".blue(), message);
        }
    }
}

fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

pub fn print_field(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

pub fn print_section(title: &str) {
    println!("\n{}", title.bold().underline());
}

fn or_dash(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

fn colored_tau(tau: f64) -> String {
    let text = format!("{:.3}", tau);
    if tau >= 0.7 {
        text.green().to_string()
    } else if tau >= 0.4 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

impl TableDisplay for AgreementResult {
    fn display_table(&self) {
        print_section("Rank agreement");
        print_field("Kendall tau", &colored_tau(self.kendall_tau));
        print_field(
            &format!("Top-{} overlap", self.top_k),
            &format!("{}/{}", self.top_k_overlap, self.top_k),
        );
        print_field(
            "Exact position matches",
            &format!("{} ({:.1}%)", self.exact_position_matches, self.agreement_percentage),
        );
        print_field("Common candidates", &self.common_items.to_string());
        if !self.is_complete() {
            let ids = |ids: &[CandidateId]| {
                ids.iter().map(|id| id.as_str()).collect::<Vec<_>>().join(", ")
            };
            print_field("Only in reference", &ids(&self.only_in_reference));
            print_field("Only in compared", &ids(&self.only_in_compared));
        }

        if self.changes.is_empty() {
            println!("\n{}", "Rankings are identical.".green());
            return;
        }

        let mut table = table(&["Candidate", "From", "To", "Move"]);
        for change in &self.changes {
            let arrow = match change.direction {
                Direction::Up => Cell::new(format!("▲ {}", change.magnitude)).fg(Color::Green),
                Direction::Down => Cell::new(format!("▼ {}", change.magnitude)).fg(Color::Red),
            };
            table.add_row(vec![
                Cell::new(change.candidate_id.as_str()),
                Cell::new(change.from_rank),
                Cell::new(change.to_rank),
                arrow,
            ]);
        }
        println!("{table}");
    }
}

impl TableDisplay for ConsensusResult {
    fn display_table(&self) {
        print_section("Consensus ranking");
        let mut table = table(&["Rank", "Candidate", "Borda points"]);
        for (i, id) in self.consensus_ranking.iter().enumerate() {
            let points = self.confidence_scores.get(id).copied().unwrap_or_default();
            table.add_row(vec![Cell::new(i + 1), Cell::new(id.as_str()), Cell::new(points)]);
        }
        println!("{table}");

        print_field("Rankers", &self.num_rankers.to_string());
        let variability = match self.variability {
            Variability::Low => "low".green(),
            Variability::Medium => "medium".yellow(),
            Variability::High => "high".red(),
        };
        print_field(
            "Variability",
            &format!("{} (mean tau {:.3})", variability, self.mean_pairwise_tau),
        );
        if let Some(agreement) = &self.agreement_with_ai {
            print_field("Kendall tau vs AI", &colored_tau(agreement.kendall_tau));
        }
    }
}

impl TableDisplay for RecommendationOutcome {
    fn display_table(&self) {
        let Some(rec) = self.recommendation() else {
            println!("{}", "No successful candidates for this prompt yet.".dimmed());
            return;
        };

        print_section(&format!("Recommendation for '{}'", rec.prompt_name));
        let confidence = match rec.confidence {
            ConfidenceLevel::High => rec.confidence.to_string().green(),
            ConfidenceLevel::Medium => rec.confidence.to_string().yellow(),
            ConfidenceLevel::Low => rec.confidence.to_string().red(),
        };
        print_field("Configuration", &rec.recommended_config.bold().to_string());
        print_field("Score", &format!("{:.2}", rec.final_score));
        print_field("Confidence", &format!("{} ({})", confidence, rec.confidence_factors.join("; ")));
        if let (Some(runner_up), Some(diff)) = (&rec.runner_up_config, rec.score_difference) {
            print_field("Runner-up", &format!("{} (-{:.2})", runner_up, diff));
        }
        print_field(
            "Weights",
            &format!(
                "quality {:.2}, speed {:.2}, cost {:.2}",
                rec.weights.quality(),
                rec.weights.speed(),
                rec.weights.cost()
            ),
        );
        println!("\n{}", rec.reasoning);

        let mut table = table(&["Config", "Final", "Quality", "Source", "Speed", "Cost", "Avg s", "Avg $"]);
        for score in &rec.config_scores {
            let name = if score.config_name == rec.recommended_config {
                Cell::new(&score.config_name).fg(Color::Green)
            } else {
                Cell::new(&score.config_name)
            };
            table.add_row(vec![
                name,
                Cell::new(format!("{:.2}", score.final_score)),
                Cell::new(format!("{:.1}", score.quality_score)),
                Cell::new(format!("{:?}", score.quality_source)),
                Cell::new(format!("{:.1}", score.speed_score)),
                Cell::new(format!("{:.1}", score.cost_score)),
                Cell::new(format!("{:.2}", score.avg_duration_seconds)),
                Cell::new(
                    score
                        .avg_cost_usd
                        .map(|c| format!("{:.4}", c))
                        .unwrap_or_else(|| "-".to_string()),
                ),
            ]);
        }
        println!("{table}");
    }
}

impl TableDisplay for EvaluationBatch {
    fn display_table(&self) {
        print_section("Evaluation batch");
        let status = match self.status {
            BatchStatus::Completed => self.status.as_str().green(),
            BatchStatus::Failed => self.status.as_str().red(),
            _ => self.status.as_str().yellow(),
        };
        print_field("ID", &self.id.to_string());
        print_field("Status", &status.to_string());
        print_field("Judge", &self.judge_model);
        print_field(
            "Judged",
            &format!("{} ok, {} failed of {}", self.num_completed, self.num_failed, self.num_experiments),
        );
        if let Some(duration) = self.total_duration_seconds {
            print_field("Duration", &format!("{:.1}s", duration));
        }
        if let Some(error) = &self.error {
            print_field("Error", &error.red().to_string());
        }

        if !self.ranked_candidate_ids.is_empty() {
            let mut table = table(&["AI rank", "Candidate"]);
            for (i, id) in self.ranked_candidate_ids.iter().enumerate() {
                table.add_row(vec![Cell::new(i + 1), Cell::new(id.as_str())]);
            }
            println!("{table}");
        }
    }
}

impl TableDisplay for ConfigComparison {
    fn display_table(&self) {
        print_section(&format!("Configurations for '{}'", self.prompt_name));
        print_field("Experiments", &self.total_experiments.to_string());
        print_field("AI evaluations", &self.total_evaluations.to_string());
        if self.is_empty() {
            println!("{}", "No candidates for this prompt.".dimmed());
            return;
        }
        for (label, best) in [
            ("Best by score", &self.best_by_score),
            ("Best by speed", &self.best_by_speed),
            ("Best by cost", &self.best_by_cost),
        ] {
            if let Some(config) = best {
                print_field(label, &config.green().to_string());
            }
        }

        let mut table = table(&["Config", "Runs", "Success", "Avg score", "Min-max score", "Avg s", "Min-max s", "Avg $", "Total $"]);
        for stats in &self.config_stats {
            table.add_row(vec![
                Cell::new(&stats.config_name),
                Cell::new(stats.count),
                Cell::new(format!("{:.0}%", stats.success_rate * 100.0)),
                Cell::new(or_dash(stats.avg_score, 2)),
                Cell::new(format!("{}-{}", or_dash(stats.min_score, 1), or_dash(stats.max_score, 1))),
                Cell::new(or_dash(stats.avg_duration, 2)),
                Cell::new(format!("{}-{}", or_dash(stats.min_duration, 2), or_dash(stats.max_duration, 2))),
                Cell::new(or_dash(stats.avg_cost, 6)),
                Cell::new(or_dash(stats.total_cost, 4)),
            ]);
        }
        println!("{table}");
    }
}

impl TableDisplay for [ConfigStats] {
    fn display_table(&self) {
        print_section("Overall configuration ranking (all prompts)");
        let mut table = table(&["#", "Config", "Runs", "Avg score", "Evaluations", "Avg s", "Total $"]);
        for (i, stats) in self.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(&stats.config_name),
                Cell::new(stats.count),
                Cell::new(or_dash(stats.avg_score, 2)),
                Cell::new(stats.num_evaluations),
                Cell::new(or_dash(stats.avg_duration, 2)),
                Cell::new(or_dash(stats.total_cost, 4)),
            ]);
        }
        println!("{table}");
    }
}
