//! Typed error hierarchy for postboard.
//!
//! One enum per subsystem:
//! - `ConfigError`: settings file and environment loading
//! - `ValidationError`: flow input constraint violations
//! - `ProviderError`: model provider transport and output failures
//! - `FlowError`: a single flow invocation (validation or provider)
//! - `ClientError`: the flow client talking to the backend
//! - `BoardError`: top-level kanban orchestration failures

use thiserror::Error;

/// Errors raised while assembling `Settings`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is required but not defined")]
    MissingVar(&'static str),

    #[error("Invalid value '{value}' for {name}: {message}")]
    InvalidVar {
        name: &'static str,
        value: String,
        message: String,
    },

    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    FileParse {
        path: std::path::PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// A flow input violated one of its declared constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Failures talking to the model provider or interpreting what it returned.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("network connection to model provider failed: {0}")]
    Network(String),

    #[error("model provider request timeout: {0}")]
    Timeout(String),

    #[error("model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model output failed schema validation: {0}")]
    Malformed(String),

    #[error("model provider returned no output")]
    EmptyOutput,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Errors from running one generation flow.
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("flow {flow} produced output that failed schema validation: {message}")]
    Schema { flow: &'static str, message: String },
}

impl FlowError {
    /// HTTP status this error maps to at the API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            FlowError::Validation(_) => 400,
            FlowError::Provider(_) | FlowError::Schema { .. } => 500,
        }
    }
}

/// Errors seen by the flow client.
///
/// Display strings carry the words the card error classifier
/// looks for (`timeout`, `network`, `validation`).
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("network request failed: {0}")]
    Network(String),

    #[error("request timeout: {0}")]
    Timeout(String),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Remote(String),

    #[error("response validation failed: {0}")]
    Validation(String),

    #[error("stream ended without a final result")]
    Incomplete,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Top-level board generation failures (surfaced as the global banner).
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Subtopics(#[from] ClientError),
}
