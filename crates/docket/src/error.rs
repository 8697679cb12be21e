use std::path::PathBuf;
use thiserror::Error;

pub use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum DocketError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to serialize snapshot: {0}")]
    Snapshot(#[source] serde_json::Error),

    #[error("Failed to build spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("Failed to render PDF: {0}")]
    Pdf(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Record '{record_id}' already has an active job")]
    AlreadyTracking { record_id: String },

    #[error("Job submission failed: {0}")]
    Submission(#[source] ApiError),

    #[error("Failed to persist job state: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to render artifact: {0}")]
    Render(#[from] ExportError),
}

pub type Result<T> = std::result::Result<T, DocketError>;
