//! AI judge plumbing: turning free-form judge replies into validated
//! verdicts, and the HTTP gateway that produces those replies.

pub mod openai;

pub use openai::*;

use prompt_bench_core::domain::JudgeVerdict;
use prompt_bench_core::error::JudgeError;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Free text the judge may use for strengths or weaknesses: a single
/// sentence or a list.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum TextList {
    #[default]
    Empty,
    One(String),
    Many(Vec<String>),
}

impl TextList {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            TextList::Empty => Vec::new(),
            TextList::One(text) => vec![text],
            TextList::Many(items) => items,
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

/// Lenient shape of the judge's JSON reply.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(alias = "score")]
    overall_score: Option<f64>,
    #[serde(alias = "criteria", default)]
    criteria_scores: BTreeMap<String, f64>,
    #[serde(alias = "notes", alias = "reasoning")]
    justification: Option<String>,
    #[serde(default)]
    strengths: TextList,
    #[serde(default)]
    weaknesses: TextList,
}

impl TryFrom<RawVerdict> for JudgeVerdict {
    type Error = JudgeError;

    fn try_from(raw: RawVerdict) -> Result<Self, JudgeError> {
        let overall_score = raw
            .overall_score
            .ok_or_else(|| JudgeError::Malformed("missing overall score".to_string()))?;
        let justification = raw
            .justification
            .ok_or_else(|| JudgeError::Malformed("missing justification".to_string()))?;

        let verdict = JudgeVerdict {
            criteria_scores: raw.criteria_scores,
            overall_score,
            justification,
            strengths: raw.strengths.into_vec(),
            weaknesses: raw.weaknesses.into_vec(),
        };
        verdict.validate()?;
        Ok(verdict)
    }
}

/// Extracts and validates the verdict embedded in a judge reply.
#[derive(Debug, Clone)]
pub struct VerdictParser {
    fenced: Regex,
    bare: Regex,
}

impl VerdictParser {
    pub fn new() -> Result<Self, JudgeError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| JudgeError::Malformed(format!("invalid verdict pattern: {}", e)))
        };
        Ok(Self {
            fenced: compile(r"(?s)```(?:json)?\s*(\{.*?\})\s*```")?,
            bare: compile(r"(?s)\{.*\}")?,
        })
    }

    /// A fenced ```json block wins over a bare `{...}` span. Nothing is
    /// guessed: a reply without a valid verdict is `Malformed`.
    pub fn parse(&self, text: &str) -> Result<JudgeVerdict, JudgeError> {
        let json = self
            .fenced
            .captures(text)
            .and_then(|caps| caps.get(1))
            .or_else(|| self.bare.find(text))
            .map(|m| m.as_str())
            .ok_or_else(|| JudgeError::Malformed("no JSON object in judge reply".to_string()))?;

        let raw: RawVerdict = serde_json::from_str(json)
            .map_err(|e| JudgeError::Malformed(format!("invalid verdict JSON: {}", e)))?;
        JudgeVerdict::try_from(raw)
    }
}

/// Convenience wrapper around [`VerdictParser::parse`].
pub fn parse_verdict(text: &str) -> Result<JudgeVerdict, JudgeError> {
    VerdictParser::new()?.parse(text)
}
