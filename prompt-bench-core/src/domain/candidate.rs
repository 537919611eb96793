use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::CandidateId;

/// One configuration's output for one prompt (or one run of a prompt).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub prompt_name: String,
    pub config_name: String,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub rendered_prompt: String,
    #[serde(default)]
    pub output: String,
    pub duration_seconds: f64,
    #[serde(default)]
    pub cost_usd: Option<Decimal>,
    pub success: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(
        id: impl Into<CandidateId>,
        prompt_name: impl Into<String>,
        config_name: impl Into<String>,
        duration_seconds: f64,
        cost_usd: Option<Decimal>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt_name: prompt_name.into(),
            config_name: config_name.into(),
            run_id: None,
            rendered_prompt: String::new(),
            output: String::new(),
            duration_seconds,
            cost_usd,
            success: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_output(mut self, rendered_prompt: impl Into<String>, output: impl Into<String>) -> Self {
        self.rendered_prompt = rendered_prompt.into();
        self.output = output.into();
        self
    }

    pub fn with_run(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }

    pub fn cost_f64(&self) -> Option<f64> {
        self.cost_usd.and_then(|c| c.to_f64())
    }
}
