#![allow(dead_code)]

use async_trait::async_trait;
use prompt_bench_core::domain::{Candidate, JudgeRequest, JudgeVerdict};
use prompt_bench_core::error::JudgeError;
use prompt_bench_core::traits::JudgeGateway;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Judge answering from a per-candidate script. Once a script runs out the
/// candidate scores a flat 5.
#[derive(Default)]
pub struct ScriptedJudge {
    scripts: Mutex<HashMap<String, VecDeque<Result<JudgeVerdict, JudgeError>>>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scores(scores: &[(&str, f64)]) -> Self {
        let judge = Self::new();
        for (candidate, score) in scores {
            judge.push(candidate, Ok(JudgeVerdict::new(*score, format!("scored {}", score))));
        }
        judge
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn push(&self, candidate: &str, reply: Result<JudgeVerdict, JudgeError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(candidate.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JudgeGateway for ScriptedJudge {
    async fn evaluate(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.scripts
            .lock()
            .unwrap()
            .get_mut(request.candidate_id.as_str())
            .and_then(|script| script.pop_front())
            .unwrap_or_else(|| Ok(JudgeVerdict::new(5.0, "default")))
    }
}

pub fn candidate(id: &str, config: &str, duration: f64) -> Candidate {
    Candidate::new(id, "summarize", config, duration, None)
        .with_output("Summarize the report", format!("output of {}", id))
}
