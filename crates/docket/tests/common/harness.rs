//! Isolated tracker environment backed by a real SQLite file.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::broadcast;

use docket::api::{StatusResponse, Submission};
use docket::config::TrackerConfig;
use docket::{
    ApiError, JobApi, JobState, JobTracker, ProjectRecord, RecordCache, RecordSource,
    SqliteStore, TrackerEvent,
};

/// Job queue that issues `job-<n>` ids and answers status requests from a
/// per-job script, reporting `PENDING` once a script runs out.
#[derive(Default)]
pub struct FakeBackend {
    issued: AtomicUsize,
    scripts: Mutex<HashMap<String, VecDeque<StatusResponse>>>,
    rejected: Mutex<Vec<String>>,
    pub submissions: Mutex<Vec<Submission>>,
    pub status_calls: Mutex<Vec<String>>,
    pub records: Mutex<Vec<ProjectRecord>>,
    pub fetches: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues responses for `job_id`, e.g. `["PENDING", "SUCCESS"]`.
    pub fn script(&self, job_id: &str, statuses: &[&str]) {
        self.script_with_error(job_id, statuses, None);
    }

    /// Like `script`; the last response carries `error`.
    pub fn script_with_error(&self, job_id: &str, statuses: &[&str], error: Option<&str>) {
        let mut responses: VecDeque<StatusResponse> = statuses
            .iter()
            .map(|s| StatusResponse {
                status: s.to_string(),
                ..Default::default()
            })
            .collect();
        if let Some(last) = responses.back_mut() {
            last.error = error.map(str::to_string);
        }
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), responses);
    }

    /// Makes submissions for `record_id` fail with a 400.
    pub fn reject(&self, record_id: &str) {
        self.rejected.lock().unwrap().push(record_id.to_string());
    }

    pub fn set_records(&self, records: Vec<ProjectRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn status_calls_for(&self, job_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == job_id)
            .count()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl JobApi for FakeBackend {
    async fn submit(&self, submission: Submission) -> Result<String, ApiError> {
        if self.rejected.lock().unwrap().contains(&submission.record_id) {
            return Err(ApiError::Status {
                status: 400,
                body: "Missing website or business name in project data".to_string(),
            });
        }
        self.submissions.lock().unwrap().push(submission);
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("job-{}", n))
    }

    async fn status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        self.status_calls.lock().unwrap().push(job_id.to_string());
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(job_id)
            .and_then(VecDeque::pop_front);
        Ok(next.unwrap_or_else(|| StatusResponse {
            status: "PENDING".to_string(),
            ..Default::default()
        }))
    }
}

#[async_trait]
impl RecordSource<ProjectRecord> for FakeBackend {
    async fn fetch_records(&self) -> Result<Vec<ProjectRecord>, ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().clone())
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub db_path: PathBuf,
    pub backend: Arc<FakeBackend>,
    pub config: TrackerConfig,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("state").join("docket.db");
        Self {
            temp_dir,
            db_path,
            backend: FakeBackend::new(),
            config: TrackerConfig {
                poll_interval_ms: 3000,
                ..TrackerConfig::default()
            },
        }
    }

    /// A fresh store handle on the harness database, as a new process
    /// would open it.
    pub fn open_store(&self) -> SqliteStore {
        SqliteStore::open(&self.db_path).expect("Failed to open store")
    }

    pub fn record_cache(&self) -> Arc<RecordCache<ProjectRecord>> {
        Arc::new(RecordCache::<ProjectRecord>::new(self.backend.clone()))
    }

    /// A tracker as a freshly started process would build it.
    pub fn tracker(&self) -> Arc<JobTracker> {
        Arc::new(JobTracker::new(
            self.backend.clone(),
            Arc::new(self.open_store()),
            self.record_cache(),
            self.config.clone(),
        ))
    }
}

/// Collects events until every record in `records` reached a state that
/// ends its chain.
pub async fn wait_until_settled(
    events: &mut broadcast::Receiver<TrackerEvent>,
    records: &[&str],
) -> HashMap<String, TrackerEvent> {
    let mut settled: HashMap<String, TrackerEvent> = HashMap::new();
    while settled.len() < records.len() {
        let event = events.recv().await.expect("event channel closed");
        let ends_chain = matches!(
            event.state,
            JobState::Succeeded | JobState::Failed | JobState::Idle
        );
        if ends_chain && records.contains(&event.record_id.as_str()) {
            settled.insert(event.record_id.clone(), event);
        }
    }
    settled
}
