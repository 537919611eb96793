use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct RecommendArgs {
    /// Snapshot file with candidates, evaluations and rankings
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Prompt name
    #[arg(short, long)]
    pub prompt: String,

    /// Quality, speed and cost weights summing to 1 (e.g. 0.6,0.3,0.1)
    #[arg(short, long, value_delimiter = ',')]
    pub weights: Option<Vec<f64>>,
}

pub async fn execute(ctx: &Context, args: RecommendArgs) -> Result<()> {
    let (service, _) = ctx.open_service(&args.snapshot)?;

    if let Some(weights) = args.weights {
        let &[quality, speed, cost] = weights.as_slice() else {
            bail!("--weights takes exactly three values: quality,speed,cost");
        };
        service
            .set_weights(&args.prompt, quality, speed, cost, "cli")
            .await?;
    }

    let outcome = service.recommendation(&args.prompt).await?;
    ctx.output.write(&outcome)
}
