//! FILENAME: dashboard/src/error.rs

use qc_model::RecordError;
use report_export::ExportError;
use thiserror::Error;

/// Failure to obtain records from the inspection API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded with status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response: {0}")]
    Decode(#[from] RecordError),

    #[error("Invalid URL {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("An export is already running")]
    ExportRunning,

    #[error("Nothing to export: {0}")]
    ExportUnavailable(String),

    #[error("Export worker stopped: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A logger is already installed")]
    LoggerInstalled,
}
