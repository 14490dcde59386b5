use std::error::Error as StdError;

use axum::{http::StatusCode, response::Response};
use thiserror::Error;

use crate::{config::LoadError, infra::error::InfraError};

/// Diagnostics attached to an error response for the logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Top-level failure for the binary's commands.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 78,
            AppError::Infra(InfraError::Io(_)) => 74,
            AppError::Infra(_) | AppError::Unexpected(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn report_walks_source_chain() {
        let err = Outer(std::io::Error::other("inner"));
        let report = ErrorReport::from_error("test", StatusCode::INTERNAL_SERVER_ERROR, &err);
        assert_eq!(report.messages, vec!["outer".to_string(), "inner".to_string()]);
    }

    #[test]
    fn exit_codes_follow_error_class() {
        let config = AppError::from(LoadError::Invalid {
            key: "server.port",
            reason: "must be non-zero".to_string(),
        });
        assert_eq!(config.exit_code(), 78);
        assert_eq!(AppError::unexpected("boom").exit_code(), 1);
    }
}
