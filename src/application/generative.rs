//! Traits describing the generative-AI collaborators.

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub(crate) const METRIC_AI_FALLBACK_TOTAL: &str = "bookwright_ai_fallback_total";

/// One conversation turn in the `{role, parts: [{text}]}` wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<TurnPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPart {
    #[serde(default)]
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![TurnPart { text: text.into() }],
        }
    }
}

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("no API key configured for {service}")]
    MissingCredential { service: &'static str },
    #[error("upstream returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GenAiError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GenAiError::MissingCredential { .. } => "missing_credential",
            GenAiError::Upstream { .. } => "upstream",
            GenAiError::Transport(_) => "transport",
            GenAiError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Text model. Structured calls return JSON conforming to `schema`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, turns: &[Turn]) -> Result<String, GenAiError>;

    async fn generate_json(&self, turns: &[Turn], schema: &Value) -> Result<Value, GenAiError>;
}

/// Image model. Returns a `data:` URI for the generated picture.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<String, GenAiError>;
}

/// A generated value, or the fallback that replaced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated<T> {
    pub value: T,
    pub fell_back: bool,
}

impl<T> Generated<T> {
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            fell_back: false,
        }
    }

    pub fn fallback(value: T) -> Self {
        Self {
            value,
            fell_back: true,
        }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

pub trait OrFallback<T> {
    /// Substitutes `fallback` on error, recording the failure under `op`.
    fn or_fallback(self, op: &'static str, fallback: impl FnOnce() -> T) -> Generated<T>;
}

impl<T> OrFallback<T> for Result<T, GenAiError> {
    fn or_fallback(self, op: &'static str, fallback: impl FnOnce() -> T) -> Generated<T> {
        match self {
            Ok(value) => Generated::fresh(value),
            Err(err) => {
                warn!(
                    target = "bookwright::application::generative",
                    op,
                    result = "fallback",
                    error_kind = err.kind(),
                    error = %err,
                    "Generative call failed; using fallback"
                );
                counter!(METRIC_AI_FALLBACK_TOTAL, "op" => op, "kind" => err.kind()).increment(1);
                Generated::fallback(fallback())
            }
        }
    }
}

/// Leading `max_chars` characters of `text`, never splitting a character.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
