use std::path::PathBuf;

use docket::{ApiError, ConfigError, DocketError, ExportError, StoreError, TrackerError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Docket(#[from] DocketError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("No record with id '{0}'")]
    RecordNotFound(String),

    #[error("{0} job(s) failed")]
    JobsFailed(usize),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
