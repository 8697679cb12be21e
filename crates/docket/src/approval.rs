//! Facade used by front-ends: exports plus fire-and-forget approval.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::{HttpBackend, RecordCache};
use crate::composer::DocumentComposer;
use crate::config::Config;
use crate::error::{DocketError, ExportError, TrackerError};
use crate::record::ExportRecord;
use crate::store::SqliteStore;
use crate::tracker::{JobTracker, TrackerEvent};

pub struct ApprovalService<R> {
    composer: DocumentComposer,
    tracker: Arc<JobTracker>,
    records: Arc<RecordCache<R>>,
}

impl<R> ApprovalService<R>
where
    R: ExportRecord + Clone + Send + Sync + 'static,
{
    pub fn new(
        composer: DocumentComposer,
        tracker: Arc<JobTracker>,
        records: Arc<RecordCache<R>>,
    ) -> Self {
        Self {
            composer,
            tracker,
            records,
        }
    }

    /// Wires the HTTP backend, the SQLite store and the record cache from
    /// configuration.
    pub fn connect(config: &Config) -> Result<Self, DocketError>
    where
        R: DeserializeOwned,
    {
        let backend = Arc::new(HttpBackend::new(config.api.clone())?);
        let store = Arc::new(SqliteStore::open(&config.storage.resolved_path())?);
        let records = Arc::new(RecordCache::<R>::new(backend.clone()));
        let tracker = Arc::new(JobTracker::new(
            backend,
            store,
            records.clone(),
            config.tracker.clone(),
        ));
        let composer = DocumentComposer::new(config.layout.clone(), &config.export.sheet_name);

        Ok(Self::new(composer, tracker, records))
    }

    pub fn composer(&self) -> &DocumentComposer {
        &self.composer
    }

    pub fn tracker(&self) -> &Arc<JobTracker> {
        &self.tracker
    }

    pub fn records(&self) -> &Arc<RecordCache<R>> {
        &self.records
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.tracker.subscribe()
    }

    pub fn export_snapshot(&self, records: &[R]) -> Result<Vec<u8>, ExportError> {
        self.composer.to_snapshot(records)
    }

    /// XLSX workbook bytes.
    pub fn export_table(&self, records: &[R]) -> Result<Vec<u8>, ExportError> {
        self.composer.to_table(records)
    }

    /// PDF bytes.
    pub fn export_document(&self, records: &[R]) -> Result<Vec<u8>, ExportError> {
        self.composer.to_pdf(records)
    }

    /// Renders `record` as a single-record PDF and hands it to the tracker.
    ///
    /// Fails without rendering when the record already has a job. Returns
    /// once the artifact is rendered. Submission and polling run in the
    /// background; the handle resolves to the job id or the submission
    /// error and may be dropped.
    pub fn approve_and_track(
        &self,
        record: &R,
    ) -> Result<JoinHandle<Result<String, TrackerError>>, TrackerError> {
        let record_id = record.record_id();
        let _span = tracing::info_span!("approval.approve", record_id = %record_id).entered();

        if self.tracker.is_tracking(&record_id)? {
            return Err(TrackerError::AlreadyTracking { record_id });
        }

        let artifact = self.composer.to_pdf(std::slice::from_ref(record))?;
        tracing::debug!(bytes = artifact.len(), "Rendered approval artifact");

        let tracker = Arc::clone(&self.tracker);
        let group_key = record.group_key();
        Ok(tokio::spawn(async move {
            tracker.submit(&record_id, group_key, artifact).await
        }))
    }

    /// Resumes persisted jobs. Call once at startup.
    pub async fn recover_on_load(&self) -> Result<usize, TrackerError> {
        self.tracker.recover_on_load().await
    }

    pub fn shutdown(&self) {
        self.tracker.shutdown();
    }
}
