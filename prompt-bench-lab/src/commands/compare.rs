//! Compare two rankings without touching any store.

use anyhow::{Context as _, Result};
use clap::Args;
use prompt_bench_core::domain::Ranking;
use prompt_bench_metrics::{RankAgreement, DEFAULT_TOP_K};

use crate::context::Context;

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Reference ranking, best first (comma-separated candidate ids)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub reference: Vec<String>,

    /// Ranking to compare against the reference (comma-separated)
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub compared: Vec<String>,

    /// Size of the top-k window
    #[arg(short = 'k', long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,
}

pub fn execute(ctx: &Context, args: CompareArgs) -> Result<()> {
    let reference = Ranking::from_strs(&args.reference).context("Invalid reference ranking")?;
    let compared = Ranking::from_strs(&args.compared).context("Invalid compared ranking")?;

    let result = RankAgreement::compare(&reference, &compared, args.top_k);
    ctx.output.write(&result)
}
