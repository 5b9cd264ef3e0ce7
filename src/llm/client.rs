// 🤖 Completion client - talks to a local llama.cpp server over HTTP

use crate::config::{LlmSettings, SamplingParams};
use crate::error::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A single prompt plus the sampling parameters to generate it with
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub params: SamplingParams,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, params: &SamplingParams) -> Self {
        CompletionRequest {
            prompt: prompt.into(),
            params: params.clone(),
        }
    }
}

/// Anything that can turn a prompt into generated text
pub trait CompletionBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

impl<T: CompletionBackend + ?Sized> CompletionBackend for &T {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        (**self).complete(request)
    }
}

impl<T: CompletionBackend + ?Sized> CompletionBackend for Box<T> {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        (**self).complete(request)
    }
}

// ============================================================================
// LLAMA.CPP SERVER
// ============================================================================

/// Request body of the llama.cpp `/completion` endpoint
#[derive(Debug, Serialize)]
struct LlamaCompletionBody<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_penalty: Option<f32>,
    #[serde(skip_serializing_if = "no_stops")]
    stop: &'a [String],
    stream: bool,
}

fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Deserialize)]
struct LlamaCompletionReply {
    #[serde(default)]
    content: String,
}

pub struct LlamaServerBackend {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl LlamaServerBackend {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(LlamaServerBackend {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn completion_url(&self) -> String {
        format!("{}/completion", self.endpoint)
    }
}

impl CompletionBackend for LlamaServerBackend {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let params = &request.params;
        let body = LlamaCompletionBody {
            prompt: &request.prompt,
            n_predict: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            repeat_penalty: params.repeat_penalty,
            stop: &params.stop,
            stream: false,
        };

        debug!(
            url = %self.completion_url(),
            max_tokens = params.max_tokens,
            prompt_chars = request.prompt.len(),
            "Sending completion request"
        );

        let resp = self.http.post(self.completion_url()).json(&body).send()?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let reply: LlamaCompletionReply = resp.json()?;
        Ok(reply.content)
    }
}

fn status_error(status: reqwest::StatusCode, body: &str) -> AdvisorError {
    AdvisorError::Llm {
        message: format!("server returned {}: {}", status, body.trim()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
