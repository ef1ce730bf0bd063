//! Error types for zapit

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for zapit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the scanner control API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("The scanner rejected the API key. Pass the key configured in ZAP with --api-key.")]
    Unauthorized,

    #[error("Scanner endpoint not found: {0}")]
    NotFound(String),

    #[error("Scanner rejected the request ({code}): {message}")]
    BadRequest { code: String, message: String },

    #[error("Scanner internal error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid scanner response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to the scanner API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration and argument errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("--start needs the path to zap.sh. Pass --zapsh <PATH> or set zap_sh in the config file.")]
    MissingZapSh,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Report generation errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("File {0} exists and --force was not used. Please remove the file manually and re-run.")]
    Exists(PathBuf),

    #[error("Unable to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Unable to fetch report from the scanner: {0}")]
    Fetch(#[from] ApiError),
}

impl ReportError {
    /// True when the error is an overwrite conflict, which aborts the run
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReportError::Exists(_))
    }
}

/// Scanner process lifecycle errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to launch {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scanner API at {url} did not become ready within {timeout:?}")]
    NotReady { url: String, timeout: Duration },

    #[error("Scanner process exited before its API became ready ({0})")]
    Exited(String),

    #[error("Interrupted while waiting for the scanner to start")]
    Cancelled,
}
