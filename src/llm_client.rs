//! Chat-completion client.
//!
//! One request per invocation, no retries, no streaming. The [`Completer`]
//! trait is the seam the dispatcher depends on; [`OpenAiClient`] is the real
//! implementation and [`MockCompleter`] answers offline when
//! `SUDOTHINK_USE_MOCK` is set.

use crate::error::CompletionError;
use crate::http_client::{HttpClient, HttpResponse, ReqwestHttpClient};
use crate::prompt::Mode;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const MODEL: &str = "gpt-4";
pub const SYSTEM_MESSAGE: &str = "You are a helpful terminal assistant.";

/// Temperature for prompts enriched with system context.
pub const CONTEXT_TEMPERATURE: f64 = 0.1;
/// Temperature for direct translation without context.
pub const DIRECT_TEMPERATURE: f64 = 0.0;

/// Environment variable enabling [`MockCompleter`].
pub const USE_MOCK_ENV: &str = "SUDOTHINK_USE_MOCK";

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub mode: Mode,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(prompt: String, mode: Mode, direct: bool) -> Self {
        Self {
            prompt,
            mode,
            temperature: if direct { DIRECT_TEMPERATURE } else { CONTEXT_TEMPERATURE },
        }
    }
}

#[async_trait]
pub trait Completer: Send + Sync {
    /// Returns the model's reply text, trimmed.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[async_trait]
impl<T: Completer + ?Sized> Completer for Box<T> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        (**self).complete(request).await
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiClient<H: HttpClient = ReqwestHttpClient> {
    http: H,
    api_key: String,
    url: String,
}

impl OpenAiClient<ReqwestHttpClient> {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_http_client(api_key, ReqwestHttpClient::new())
    }
}

impl<H: HttpClient> OpenAiClient<H> {
    pub fn with_http_client(api_key: impl Into<String>, http: H) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            url: OPENAI_CHAT_URL.to_string(),
        }
    }

    fn request_body(request: &CompletionRequest) -> Value {
        json!({
            "model": MODEL,
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user", "content": request.prompt }
            ],
            "temperature": request.temperature,
            "max_tokens": request.mode.max_tokens()
        })
    }

    fn parse_response(response: HttpResponse) -> Result<String, CompletionError> {
        if response.status == 401 {
            return Err(CompletionError::Authentication);
        }

        if !response.is_success() {
            return Err(CompletionError::Api {
                status: response.status,
                message: api_error_message(&response.body),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&response.body)
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| CompletionError::MalformedResponse("no message content in first choice".to_string()))
    }
}

#[async_trait]
impl<H: HttpClient> Completer for OpenAiClient<H> {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        info!(
            "Requesting {} completion (model {}, temperature {})",
            request.mode, MODEL, request.temperature
        );

        let authorization = format!("Bearer {}", self.api_key);
        let headers = [
            ("Authorization", authorization.as_str()),
            ("Content-Type", "application/json"),
        ];

        let response = self
            .http
            .post_json(&self.url, &headers, &Self::request_body(request))
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        debug!("Completion API responded with status {}", response.status);
        let result = Self::parse_response(response);
        if let Err(e) = &result {
            warn!("Completion failed: {}", e);
        }
        result
    }
}

/// Pulls `error.message` out of an OpenAI error body, else returns the body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Offline completer with canned answers per mode.
pub struct MockCompleter;

impl MockCompleter {
    pub fn new() -> Self {
        Self
    }

    pub fn is_enabled() -> bool {
        std::env::var_os(USE_MOCK_ENV).is_some()
    }

    pub fn respond(&self, request: &CompletionRequest) -> String {
        match request.mode {
            Mode::Command => "ls -la".to_string(),
            Mode::Plan => json!([
                {
                    "description": "Show the working directory",
                    "command": "pwd",
                    "explanation": "Confirms where the following steps run"
                },
                {
                    "description": "Say hello",
                    "command": "echo mock-plan-step",
                    "explanation": "Prints a marker line"
                }
            ])
            .to_string(),
            Mode::Explain => "This is a mock explanation of the request.".to_string(),
        }
    }
}

impl Default for MockCompleter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Completer for MockCompleter {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        info!("Using mock completer ({}=1)", USE_MOCK_ENV);
        Ok(self.respond(request))
    }
}
