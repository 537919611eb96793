use anyhow::{Context as _, Result};
use config::{Config as ConfigLoader, Environment, File};
use prompt_bench_workflow::{OpenAiJudgeConfig, OrchestratorConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment prefix; nested keys use `__`, e.g. `PROMPT_BENCH_JUDGE__API_KEY`.
pub const ENV_PREFIX: &str = "PROMPT_BENCH";

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub judge: JudgeSettings,
    pub orchestrator: OrchestratorSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeSettings {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub default_model: String,
    pub request_timeout_secs: u64,
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSettings {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub batch_timeout_secs: u64,
    pub max_failure_rate: f64,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl Config {
    /// Layers built-in defaults, `config/default`, `config/local`, the
    /// optional `--config` file and `PROMPT_BENCH_*` variables, later
    /// sources winning.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let judge = OpenAiJudgeConfig::default();
        let orchestrator = OrchestratorConfig::default();

        let mut builder = ConfigLoader::builder()
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?
            .set_default("judge.base_url", judge.base_url)?
            .set_default("judge.default_model", "gpt-4o")?
            .set_default("judge.request_timeout_secs", judge.request_timeout.as_secs())?
            .set_default("judge.temperature", judge.temperature)?
            .set_default("orchestrator.max_retries", orchestrator.max_retries)?
            .set_default(
                "orchestrator.retry_delay_ms",
                orchestrator.retry_delay.as_millis() as u64,
            )?
            .set_default(
                "orchestrator.batch_timeout_secs",
                orchestrator.batch_timeout.as_secs(),
            )?
            .set_default("orchestrator.max_failure_rate", orchestrator.max_failure_rate)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to load configuration")?;

        let config: Config = config
            .try_deserialize()
            .context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let rate = self.orchestrator.max_failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            anyhow::bail!("orchestrator.max_failure_rate must be within 0-1, got {}", rate);
        }
        if self.orchestrator.max_concurrency == Some(0) {
            anyhow::bail!("orchestrator.max_concurrency must be at least 1");
        }
        Ok(())
    }

    pub fn judge_config(&self) -> OpenAiJudgeConfig {
        OpenAiJudgeConfig {
            base_url: self.judge.base_url.clone(),
            api_key: self.judge.api_key.clone(),
            request_timeout: Duration::from_secs(self.judge.request_timeout_secs),
            temperature: self.judge.temperature,
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_retries: self.orchestrator.max_retries,
            retry_delay: Duration::from_millis(self.orchestrator.retry_delay_ms),
            batch_timeout: Duration::from_secs(self.orchestrator.batch_timeout_secs),
            max_failure_rate: self.orchestrator.max_failure_rate,
            max_concurrency: self.orchestrator.max_concurrency,
        }
    }
}
