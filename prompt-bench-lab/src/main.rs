use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod context;
mod output;

use commands::{analyze, compare, consensus, evaluate, recommend};
use config::{Config, LogFormat};
use context::Context;
use output::{OutputFormat, OutputWriter};

/// Judge, rank and recommend prompt configurations.
#[derive(Debug, Parser)]
#[command(name = "prompt-bench", version, about)]
struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Extra configuration file, layered over config/default and config/local
    #[arg(long, global = true, env = "PROMPT_BENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rank agreement between two rankings
    Compare(compare::CompareArgs),
    /// Borda consensus of a prompt's human rankings
    Consensus(consensus::ConsensusArgs),
    /// Recommend the best configuration for a prompt
    Recommend(recommend::RecommendArgs),
    /// Judge a prompt's candidates with the AI judge
    Evaluate(evaluate::EvaluateArgs),
    /// Per-configuration statistics for one or every prompt
    Analyze(analyze::AnalyzeArgs),
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("prompt_bench={}", config.log_level)));

    // Logs go to stderr so JSON output on stdout stays parseable.
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config);
    tracing::debug!(?config.log_format, "Configuration loaded");

    let ctx = Context::new(config, OutputWriter::new(cli.format, cli.no_color));

    match cli.command {
        Commands::Compare(args) => compare::execute(&ctx, args),
        Commands::Consensus(args) => consensus::execute(&ctx, args).await,
        Commands::Recommend(args) => recommend::execute(&ctx, args).await,
        Commands::Evaluate(args) => evaluate::execute(&ctx, args).await,
        Commands::Analyze(args) => analyze::execute(&ctx, args).await,
    }
}
