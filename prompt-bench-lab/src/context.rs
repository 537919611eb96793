//! CLI execution context

use anyhow::{Context as _, Result};
use prompt_bench_storage::{InMemoryStore, Snapshot};
use prompt_bench_workflow::{BenchService, OpenAiJudgeGateway};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::output::OutputWriter;

pub struct Context {
    pub config: Config,
    pub output: OutputWriter,
}

impl Context {
    pub fn new(config: Config, output: OutputWriter) -> Self {
        Self { config, output }
    }

    /// Seeds a store from a snapshot file and wires a service over it,
    /// judged by the configured OpenAI-compatible endpoint.
    pub fn open_service(&self, snapshot: &Path) -> Result<(BenchService, Arc<InMemoryStore>)> {
        let store = Snapshot::load(snapshot)
            .and_then(Snapshot::into_store)
            .with_context(|| format!("Failed to load snapshot {:?}", snapshot))?;
        let store = Arc::new(store);

        let judge = OpenAiJudgeGateway::new(self.config.judge_config())
            .context("Failed to build judge client")?;

        let service = BenchService::new(store.clone(), Arc::new(judge), self.config.orchestrator_config());
        Ok((service, store))
    }
}
