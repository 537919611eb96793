use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Allowed distance between the weight sum and 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Prompt key holding the global fallback weights.
pub const DEFAULT_WEIGHTS_KEY: &str = "_default";

/// Mixture of quality, speed and cost used for the composite score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawWeights")]
pub struct Weights {
    quality: f64,
    speed: f64,
    cost: f64,
}

#[derive(Deserialize)]
struct RawWeights {
    quality: f64,
    speed: f64,
    cost: f64,
}

impl TryFrom<RawWeights> for Weights {
    type Error = CoreError;

    fn try_from(raw: RawWeights) -> Result<Self> {
        Weights::new(raw.quality, raw.speed, raw.cost)
    }
}

impl Weights {
    pub fn new(quality: f64, speed: f64, cost: f64) -> Result<Self> {
        for (name, value) in [("quality", quality), ("speed", speed), ("cost", cost)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(CoreError::Validation(format!(
                    "{} weight must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        let total = quality + speed + cost;
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(CoreError::Validation(format!(
                "weights must sum to 1.0, got {}",
                total
            )));
        }

        Ok(Self { quality, speed, cost })
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn composite(&self, quality: f64, speed: f64, cost: f64) -> f64 {
        quality * self.quality + speed * self.speed + cost * self.cost
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            quality: 0.60,
            speed: 0.30,
            cost: 0.10,
        }
    }
}

/// Weights scoped to a prompt, or to [`DEFAULT_WEIGHTS_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingWeights {
    pub prompt_name: String,
    pub weights: Weights,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl RankingWeights {
    pub fn new(prompt_name: impl Into<String>, weights: Weights, updated_by: impl Into<String>) -> Self {
        Self {
            prompt_name: prompt_name.into(),
            weights,
            updated_by: updated_by.into(),
            updated_at: Utc::now(),
        }
    }
}
