//! Run an AI-judge batch over a snapshot's candidates.

use anyhow::{Context as _, Result};
use clap::Args;
use prompt_bench_core::domain::{EvaluationBatch, RecommendationOutcome, TemplateId};
use prompt_bench_core::traits::{BatchStore, TemplateStore};
use prompt_bench_workflow::{default_template, StartBatchRequest};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::context::Context;
use crate::output::TableDisplay;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    /// Snapshot file with the candidates to judge
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// Prompt name
    #[arg(short, long)]
    pub prompt: String,

    /// Template id from the snapshot; the built-in template when omitted
    #[arg(short, long)]
    pub template: Option<TemplateId>,

    /// Judge model, overriding the template's default
    #[arg(short, long)]
    pub model: Option<String>,

    /// Only judge candidates of this run
    #[arg(long)]
    pub run: Option<String>,

    /// Judge one candidate at a time
    #[arg(long)]
    pub sequential: bool,

    /// Write the batch and its evaluations back into the snapshot
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, Serialize)]
struct EvaluateReport {
    batch: EvaluationBatch,
    recommendation: RecommendationOutcome,
}

impl TableDisplay for EvaluateReport {
    fn display_table(&self) {
        self.batch.display_table();
        self.recommendation.display_table();
    }
}

pub async fn execute(ctx: &Context, args: EvaluateArgs) -> Result<()> {
    let (service, store) = ctx.open_service(&args.snapshot)?;

    let template_id = match args.template {
        Some(id) => id,
        None => {
            let model = args
                .model
                .clone()
                .unwrap_or_else(|| ctx.config.judge.default_model.clone());
            let template = default_template(model);
            store.save_template(&template).await?;
            template.id
        }
    };

    let batch_id = service
        .start_batch_evaluation(StartBatchRequest {
            prompt_name: args.prompt.clone(),
            template_id,
            judge_model: args.model,
            run_id: args.run,
            parallel: !args.sequential,
        })
        .await?;
    ctx.output.info(&format!("Started batch {} (Ctrl-C cancels)", batch_id));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancelled = false;

    loop {
        let view = service.batch_status(&batch_id).await?;
        if view.status.is_terminal() {
            break;
        }

        tokio::select! {
            _ = &mut ctrl_c, if !cancelled => {
                warn!(batch_id = %batch_id, "Interrupted, cancelling batch");
                cancelled = true;
                service.cancel_batch(batch_id).await?;
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {
                info!(
                    batch_id = %batch_id,
                    done = view.num_completed + view.num_failed,
                    total = view.num_experiments,
                    "Judging"
                );
            }
        }
    }

    let batch = store
        .get_batch(&batch_id)
        .await?
        .context("Batch disappeared from the store")?;
    let recommendation = service.recommendation(&args.prompt).await?;

    if args.save {
        store
            .snapshot()
            .save(&args.snapshot)
            .with_context(|| format!("Failed to write snapshot {:?}", args.snapshot))?;
        info!(path = ?args.snapshot, "Snapshot updated");
    }

    ctx.output.write(&EvaluateReport { batch, recommendation })
}
