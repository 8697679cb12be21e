//! Backend interfaces: record listing, job submission and job status.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

pub mod cache;
pub mod http;

pub use cache::RecordCache;
pub use http::HttpBackend;

/// An artifact handed to the backend for server-side processing.
#[derive(Debug, Clone)]
pub struct Submission {
    pub record_id: String,
    /// Folder the backend files the artifact under.
    pub group_key: Option<String>,
    pub filename: String,
    pub artifact: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(default, alias = "task_id", alias = "jobId")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Normalized job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Pending,
    Success,
    Failure,
}

impl RemoteStatus {
    /// Maps a backend status string, ignoring case. Anything that is not a
    /// known terminal status counts as still pending.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => RemoteStatus::Success,
            "FAILURE" | "REVOKED" => RemoteStatus::Failure,
            _ => RemoteStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl StatusResponse {
    pub fn outcome(&self) -> RemoteStatus {
        RemoteStatus::parse(&self.status)
    }

    /// Server-provided failure reason, if it is non-blank.
    pub fn reason(&self) -> Option<&str> {
        self.error.as_deref().map(str::trim).filter(|r| !r.is_empty())
    }
}

/// Server-side job queue.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Uploads the artifact and returns the server-issued job id.
    async fn submit(&self, submission: Submission) -> Result<String, ApiError>;

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError>;
}

/// Source of the record list.
#[async_trait]
pub trait RecordSource<R>: Send + Sync {
    async fn fetch_records(&self) -> Result<Vec<R>, ApiError>;
}

/// Re-fetches the record list after a job changes server state.
#[async_trait]
pub trait Refresh: Send + Sync {
    /// Returns the number of records now held.
    async fn refresh(&self) -> Result<usize, ApiError>;
}
