//! Reasoning Client Abstraction
//!
//! The controller talks to the reasoning backend through [`ReasoningClient`].
//! The HTTP client speaks either the Ollama generate API or an
//! OpenAI-compatible chat API. The fake client scripts responses for tests.

use crate::error::InsightError;
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};
use crate::telemetry::TelemetrySnapshot;
use crate::trend::TrendContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Wire protocol of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    #[default]
    Ollama,
    Openai,
}

/// Reasoning backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP-level timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub api: ApiStyle,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen2.5:7b-instruct".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            api: ApiStyle::default(),
        }
    }
}

/// The external reasoning boundary.
///
/// Returns the raw response body. Parsing into an insight is the caller's job.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn request(
        &self,
        snapshot: &TelemetrySnapshot,
        context: TrendContext,
    ) -> Result<String, InsightError>;
}

/// Real reasoning client over HTTP
pub struct HttpReasoningClient {
    config: ReasoningConfig,
    client: reqwest::Client,
}

impl HttpReasoningClient {
    pub fn new(config: ReasoningConfig) -> Result<Self, InsightError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InsightError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    fn map_send_error(&self, e: reqwest::Error) -> InsightError {
        if e.is_timeout() {
            InsightError::Timeout(Duration::from_secs(self.config.timeout_secs))
        } else {
            InsightError::Transport(format!("Request failed: {}", e))
        }
    }

    async fn call_ollama(&self, user_prompt: &str) -> Result<String, InsightError> {
        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));

        let request_body = serde_json::json!({
            "model": self.config.model,
            "system": SYSTEM_PROMPT,
            "prompt": user_prompt,
            "stream": false,
            "format": "json",
        });

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(InsightError::Transport(format!(
                "HTTP {} from Ollama",
                response.status()
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InsightError::Transport(format!("Failed to read response: {}", e)))?;

        response_json
            .get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                InsightError::MalformedResponse("missing \"response\" field".to_string())
            })
    }

    async fn call_openai_compatible(&self, user_prompt: &str) -> Result<String, InsightError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        );

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt},
            ],
            "response_format": {"type": "json_object"},
        });

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(InsightError::Transport(format!(
                "HTTP {} from OpenAI-compatible API",
                response.status()
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InsightError::Transport(format!("Failed to read response: {}", e)))?;

        response_json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| InsightError::MalformedResponse("missing message content".to_string()))
    }
}

#[async_trait]
impl ReasoningClient for HttpReasoningClient {
    async fn request(
        &self,
        snapshot: &TelemetrySnapshot,
        context: TrendContext,
    ) -> Result<String, InsightError> {
        if !self.config.enabled {
            return Err(InsightError::Disabled);
        }

        let user_prompt = build_user_prompt(snapshot, context);
        debug!(
            model = %self.config.model,
            context = %context,
            prompt_bytes = user_prompt.len(),
            "Calling reasoning backend"
        );

        match self.config.api {
            ApiStyle::Ollama => self.call_ollama(&user_prompt).await,
            ApiStyle::Openai => self.call_openai_compatible(&user_prompt).await,
        }
    }
}

/// Fake reasoning client for testing
///
/// Responses are consumed in order; the last one repeats. With a gate,
/// every call waits for a `notify_one` before answering, which keeps the
/// request outstanding for as long as a test needs.
pub struct FakeReasoningClient {
    responses: Mutex<Vec<Result<String, InsightError>>>,
    call_count: AtomicUsize,
    contexts: Mutex<Vec<TrendContext>>,
    gate: Option<Arc<Notify>>,
}

impl FakeReasoningClient {
    pub fn new(responses: Vec<Result<String, InsightError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Always answer with this body
    pub fn always(body: &str) -> Self {
        Self::new(vec![Ok(body.to_string())])
    }

    /// Always fail with this error
    pub fn always_error(error: InsightError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Hold every call until the returned handle is notified
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Contexts of every call made so far
    pub fn contexts(&self) -> Vec<TrendContext> {
        self.contexts.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn next_response(&self) -> Result<String, InsightError> {
        let mut responses = match self.responses.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match responses.len() {
            0 => Err(InsightError::Transport("no scripted response".to_string())),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}

#[async_trait]
impl ReasoningClient for FakeReasoningClient {
    async fn request(
        &self,
        _snapshot: &TelemetrySnapshot,
        context: TrendContext,
    ) -> Result<String, InsightError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.push(context);
        }

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        self.next_response()
    }
}
