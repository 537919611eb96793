use anyhow::Result;
use clap::Args;
use prompt_bench_metrics::{ConfigComparison, ConfigStats};
use serde::Serialize;
use std::path::PathBuf;

use crate::context::Context;
use crate::output::TableDisplay;

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Snapshot file holding candidates and AI evaluations
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Analyze this prompt only
    #[arg(short, long)]
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalysisReport {
    comparisons: Vec<ConfigComparison>,
    overall: Vec<ConfigStats>,
}

impl TableDisplay for AnalysisReport {
    fn display_table(&self) {
        for comparison in &self.comparisons {
            comparison.display_table();
        }
        self.overall.display_table();
    }
}

pub async fn execute(ctx: &Context, args: AnalyzeArgs) -> Result<()> {
    let (service, _) = ctx.open_service(&args.snapshot)?;

    if let Some(prompt) = &args.prompt {
        let comparison = service.compare_configs(prompt).await?;
        return ctx.output.write(&comparison);
    }

    let comparisons = service.compare_all_prompts().await?;
    if comparisons.is_empty() {
        ctx.output.info("The snapshot holds no candidates");
        return Ok(());
    }

    let overall = service.overall_rankings().await?;
    ctx.output.write(&AnalysisReport { comparisons, overall })
}
