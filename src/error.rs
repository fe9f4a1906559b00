use std::{io, path::PathBuf, string::FromUtf8Error};

use thiserror::Error;

pub type JournalResult<T> = Result<T, JournalError>;

/// Failures surfaced by the journal components. Local file problems are always fatal for the
/// operation that hit them, network problems only disable the optional feature that needed them.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("template not found at {0:?}")]
    TemplateNotFound(PathBuf),

    #[error("template at {path:?} is not valid UTF-8 text: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: FromUtf8Error,
    },

    #[error("failed to {operation} {path:?}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("request to {endpoint} failed: {message}")]
    Network {
        endpoint: String,
        message: String,
        retryable: bool,
    },
}

impl JournalError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn network(
        endpoint: impl Into<String>,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Error for an unsuccessful HTTP status. Rate limiting and server errors are transient.
    pub fn from_status(endpoint: &str, status: reqwest::StatusCode, body: &str) -> Self {
        let retryable =
            status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
        let body = body.trim();
        let message = if body.is_empty() {
            format!("server returned {status}")
        } else {
            format!("server returned {status}: {body}")
        };
        Self::network(endpoint, message, retryable)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { retryable: true, .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}

impl From<reqwest::Error> for JournalError {
    fn from(value: reqwest::Error) -> Self {
        let endpoint = value
            .url()
            .map(|url| url.to_string())
            .unwrap_or_else(|| "<unknown>".into());
        // Decode failures won't fix themselves, transport failures might.
        let retryable = !value.is_decode() && !value.is_builder();
        Self::Network {
            endpoint,
            message: value.to_string(),
            retryable,
        }
    }
}
