use async_trait::async_trait;
use prompt_bench_core::domain::{JudgeRequest, JudgeVerdict};
use prompt_bench_core::error::JudgeError;
use prompt_bench_core::traits::JudgeGateway;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::VerdictParser;
use crate::template::DEFAULT_SYSTEM_PROMPT;

/// Longest API error body kept in a [`JudgeError::Api`] message.
const MAX_ERROR_BODY: usize = 500;

#[derive(Debug, Clone)]
pub struct OpenAiJudgeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub temperature: f64,
}

impl Default for OpenAiJudgeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(60),
            temperature: 0.3,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Judge backed by any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiJudgeGateway {
    client: Client,
    config: OpenAiJudgeConfig,
    parser: VerdictParser,
}

impl OpenAiJudgeGateway {
    pub fn new(config: OpenAiJudgeConfig) -> Result<Self, JudgeError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| JudgeError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config,
            parser: VerdictParser::new()?,
        })
    }

    pub fn config(&self) -> &OpenAiJudgeConfig {
        &self.config
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn map_send_error(&self, err: reqwest::Error) -> JudgeError {
        if err.is_timeout() {
            JudgeError::Timeout(self.config.request_timeout)
        } else {
            JudgeError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl JudgeGateway for OpenAiJudgeGateway {
    async fn evaluate(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        let system_prompt = request.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.rendered_prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        let mut builder = self.client.post(self.url()).json(&body);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        debug!(candidate = %request.candidate_id, model = %request.model, "Calling judge");
        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            let message: String = text.chars().take(MAX_ERROR_BODY).collect();
            return Err(JudgeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| JudgeError::Malformed(format!("unexpected completion payload: {}", e)))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| JudgeError::Malformed("completion has no content".to_string()))?;

        self.parser.parse(&content)
    }
}
