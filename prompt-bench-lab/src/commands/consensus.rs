use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct ConsensusArgs {
    /// Snapshot file holding the prompt's human rankings
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Prompt name
    #[arg(short, long)]
    pub prompt: String,
}

pub async fn execute(ctx: &Context, args: ConsensusArgs) -> Result<()> {
    let (service, _) = ctx.open_service(&args.snapshot)?;

    match service.consensus(&args.prompt).await? {
        Some(consensus) => ctx.output.write(&consensus),
        None => {
            ctx.output
                .info(&format!("No human rankings for prompt '{}'", args.prompt));
            Ok(())
        }
    }
}
