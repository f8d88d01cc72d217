//! Error types for the typed failure domains.
//!
//! Glue code uses `anyhow`; these enums exist where callers need to tell
//! failures apart (validation vs. I/O, authentication vs. other API errors,
//! malformed plans).

use thiserror::Error;

/// Failures of the on-disk configuration store.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("API key cannot be empty")]
    EmptyKey,

    #[error("Invalid API key format. OpenAI API keys start with '{0}'")]
    InvalidFormat(&'static str),

    #[error("Could not find home directory")]
    NoHomeDir,

    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Whether the error comes from key validation rather than the filesystem.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyKey | Self::InvalidFormat(_))
    }
}

/// Failures of the chat-completion call.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Invalid OpenAI API key. Please check OPENAI_API_KEY or run 'sudothink setup'.")]
    Authentication,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected API response: {0}")]
    MalformedResponse(String),
}

/// Failures while turning model output into a plan.
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Invalid JSON in plan: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid plan format: expected a JSON array of steps")]
    NotAnArray,

    #[error("Invalid plan format: step {index} is not a step object ({reason})")]
    InvalidStep { index: usize, reason: String },
}
