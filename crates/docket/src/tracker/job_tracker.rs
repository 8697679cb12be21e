//! Per-record approval job state machine.
//!
//! `Idle → Submitting → Polling → {Succeeded, Failed}`. A record owns at most
//! one poll chain at a time. Each chain is a tokio task that polls, waits a
//! fixed interval on pending, and stops on a terminal status, on
//! cancellation, or once the record's durable entry disappears.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::events::{EventBroadcaster, JobState, Notification, TrackerEvent};
use super::ledger::JobLedger;
use super::timer::{PollTimer, TokioTimer};
use crate::api::{JobApi, Refresh, RemoteStatus, Submission};
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::store::{KeyValueStore, StoreError};

const SUBMIT_FAILED_TITLE: &str = "Error approving PDF";
const SUBMIT_FAILED_DESCRIPTION: &str = "Failed to save the PDF.";
const QUEUED_TITLE: &str = "Processing PDF";
const QUEUED_DESCRIPTION: &str = "Your PDF is being processed in the queue...";
const SUCCEEDED_TITLE: &str = "PDF Generated";
const SUCCEEDED_DESCRIPTION: &str = "PDF has been successfully generated and saved.";
const FAILED_TITLE: &str = "Error Processing PDF";
const FAILED_DESCRIPTION: &str = "Failed to process the PDF.";

struct ActiveChain {
    id: u64,
    job_id: String,
    token: CancellationToken,
}

/// How a poll chain ended.
enum Halt {
    /// A terminal status was reported.
    Finished,
    Cancelled,
    /// The durable entry vanished or now names another job.
    Superseded,
}

pub struct JobTracker {
    api: Arc<dyn JobApi>,
    ledger: JobLedger,
    refresher: Arc<dyn Refresh>,
    timer: Arc<dyn PollTimer>,
    events: EventBroadcaster,
    config: TrackerConfig,
    states: Mutex<HashMap<String, JobState>>,
    chains: Mutex<HashMap<String, ActiveChain>>,
    next_chain: AtomicU64,
    root: CancellationToken,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Job tracker {} lock was poisoned, recovering", name);
            poisoned.into_inner()
        }
    }
}

impl JobTracker {
    pub fn new(
        api: Arc<dyn JobApi>,
        store: Arc<dyn KeyValueStore>,
        refresher: Arc<dyn Refresh>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            api,
            ledger: JobLedger::new(store),
            refresher,
            timer: Arc::new(TokioTimer),
            events: EventBroadcaster::new(config.event_capacity),
            config,
            states: Mutex::new(HashMap::new()),
            chains: Mutex::new(HashMap::new()),
            next_chain: AtomicU64::new(0),
            root: CancellationToken::new(),
        }
    }

    pub fn with_timer(mut self, timer: Arc<dyn PollTimer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }

    pub fn ledger(&self) -> &JobLedger {
        &self.ledger
    }

    /// Current state of `record_id`. Records whose job finished read as
    /// `Idle`; subscribe to the event stream for outcomes.
    pub fn state(&self, record_id: &str) -> JobState {
        lock(&self.states, "state")
            .get(record_id)
            .copied()
            .unwrap_or(JobState::Idle)
    }

    /// Records with a durable job entry.
    pub fn in_flight(&self) -> Result<Vec<String>, StoreError> {
        self.ledger.in_flight()
    }

    /// Number of running poll chains.
    pub fn active_chains(&self) -> usize {
        lock(&self.chains, "chain").len()
    }

    pub fn polling_job(&self, record_id: &str) -> Option<String> {
        lock(&self.chains, "chain")
            .get(record_id)
            .map(|chain| chain.job_id.clone())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    fn transition(
        &self,
        record_id: &str,
        job_id: Option<&str>,
        state: JobState,
        notification: Option<Notification>,
    ) {
        {
            let mut states = lock(&self.states, "state");
            if state.is_active() {
                states.insert(record_id.to_string(), state);
            } else {
                // Finished and idle records leave the tracked set; their
                // outcome lives on only in the published event.
                states.remove(record_id);
            }
        }

        tracing::debug!(record_id, job_id, %state, "Job state changed");

        let mut event = TrackerEvent::new(record_id, job_id, state);
        if let Some(notification) = notification {
            event = event.with_notification(notification);
        }
        self.events.send(event);
    }

    /// Number of records with a job in `Submitting` or `Polling`.
    pub fn tracked(&self) -> usize {
        lock(&self.states, "state").len()
    }

    fn has_job(
        &self,
        states: &HashMap<String, JobState>,
        record_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(states.get(record_id).is_some_and(|s| s.is_active())
            || lock(&self.chains, "chain").contains_key(record_id)
            || self.ledger.job_for(record_id)?.is_some())
    }

    /// Whether `record_id` is submitting, polling, or has a durable entry.
    pub fn is_tracking(&self, record_id: &str) -> Result<bool, StoreError> {
        let states = lock(&self.states, "state");
        self.has_job(&states, record_id)
    }

    /// Claims `record_id` for a new submission.
    fn begin_submission(&self, record_id: &str) -> Result<(), TrackerError> {
        let mut states = lock(&self.states, "state");

        if self.has_job(&states, record_id)? {
            tracing::warn!(record_id, "Rejecting submission, record already has a job");
            return Err(TrackerError::AlreadyTracking {
                record_id: record_id.to_string(),
            });
        }

        states.insert(record_id.to_string(), JobState::Submitting);
        drop(states);

        self.events
            .send(TrackerEvent::new(record_id, None, JobState::Submitting));
        Ok(())
    }

    /// Uploads an artifact for `record_id` and starts polling its job.
    ///
    /// The job id is persisted before the first poll is scheduled. On any
    /// error nothing is persisted and the record returns to `Idle`.
    pub async fn submit(
        self: &Arc<Self>,
        record_id: &str,
        group_key: Option<String>,
        artifact: Vec<u8>,
    ) -> Result<String, TrackerError> {
        self.begin_submission(record_id)?;

        let submission = Submission {
            record_id: record_id.to_string(),
            group_key,
            filename: format!("{}.pdf", record_id),
            artifact,
        };

        let job_id = match self.api.submit(submission).await {
            Ok(job_id) => job_id,
            Err(e) => {
                tracing::error!(record_id, error = %e, "Job submission failed");
                self.transition(
                    record_id,
                    None,
                    JobState::Idle,
                    Some(Notification::error(
                        SUBMIT_FAILED_TITLE,
                        SUBMIT_FAILED_DESCRIPTION,
                    )),
                );
                return Err(TrackerError::Submission(e));
            }
        };

        if let Err(e) = self.ledger.record(record_id, &job_id) {
            tracing::error!(record_id, job_id, error = %e, "Failed to persist job");
            self.transition(
                record_id,
                Some(&job_id),
                JobState::Idle,
                Some(Notification::error(SUBMIT_FAILED_TITLE, &e.to_string())),
            );
            return Err(e.into());
        }

        self.transition(
            record_id,
            Some(&job_id),
            JobState::Polling,
            Some(Notification::info(QUEUED_TITLE, QUEUED_DESCRIPTION)),
        );
        self.poll(record_id, &job_id);

        Ok(job_id)
    }

    /// Starts a poll chain for `record_id` unless one is already running.
    ///
    /// Returns whether a new chain was started.
    pub fn poll(self: &Arc<Self>, record_id: &str, job_id: &str) -> bool {
        let chain_id = self.next_chain.fetch_add(1, Ordering::Relaxed);
        let token = self.root.child_token();

        {
            let mut chains = lock(&self.chains, "chain");
            if let Some(existing) = chains.get(record_id) {
                tracing::debug!(
                    record_id,
                    job_id = %existing.job_id,
                    "Poll chain already running"
                );
                return false;
            }
            chains.insert(
                record_id.to_string(),
                ActiveChain {
                    id: chain_id,
                    job_id: job_id.to_string(),
                    token: token.clone(),
                },
            );
        }

        if self.state(record_id) != JobState::Polling {
            self.transition(record_id, Some(job_id), JobState::Polling, None);
        }

        let tracker = Arc::clone(self);
        let record_id = record_id.to_string();
        let job_id = job_id.to_string();
        let span = tracing::info_span!("tracker.poll", record_id = %record_id, job_id = %job_id);

        tokio::spawn(
            async move {
                tracker.run_chain(&record_id, &job_id, &token).await;
                tracker.end_chain(&record_id, chain_id);
            }
            .instrument(span),
        );

        true
    }

    fn end_chain(&self, record_id: &str, chain_id: u64) {
        let mut chains = lock(&self.chains, "chain");
        if chains.get(record_id).is_some_and(|c| c.id == chain_id) {
            chains.remove(record_id);
        }
    }

    /// Resumes polling for every job persisted by a previous process.
    pub async fn recover_on_load(self: &Arc<Self>) -> Result<usize, TrackerError> {
        self.ledger.store().init()?;
        let jobs = self.ledger.reconcile()?;

        let mut started = 0;
        for (record_id, job_id) in &jobs {
            if self.poll(record_id, job_id) {
                started += 1;
            }
        }

        tracing::info!(tracked = jobs.len(), started, "Recovered persisted jobs");
        Ok(started)
    }

    /// Drops the durable entry for `record_id` and stops its chain, if any.
    pub fn forget(&self, record_id: &str) -> Result<(), StoreError> {
        self.ledger.forget(record_id)?;
        if let Some(chain) = lock(&self.chains, "chain").remove(record_id) {
            chain.token.cancel();
        }
        self.transition(record_id, None, JobState::Idle, None);
        Ok(())
    }

    /// Cancels every running chain. Durable entries are kept so the next
    /// `recover_on_load` resumes them.
    pub fn shutdown(&self) {
        tracing::info!(chains = self.active_chains(), "Stopping poll chains");
        self.root.cancel();
    }

    async fn run_chain(&self, record_id: &str, job_id: &str, token: &CancellationToken) {
        match self.poll_until_terminal(record_id, job_id, token).await {
            Halt::Finished => {}
            Halt::Cancelled => {
                tracing::debug!("Poll chain cancelled");
            }
            Halt::Superseded => {
                tracing::info!("Job no longer tracked, stopping poll chain");
                self.transition(record_id, Some(job_id), JobState::Idle, None);
            }
        }
    }

    async fn poll_until_terminal(
        &self,
        record_id: &str,
        job_id: &str,
        token: &CancellationToken,
    ) -> Halt {
        let mut attempts: u32 = 0;

        loop {
            if token.is_cancelled() {
                return Halt::Cancelled;
            }

            match self.ledger.job_for(record_id) {
                Ok(Some(current)) if current == job_id => {}
                Ok(_) => return Halt::Superseded,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not read job ledger, polling anyway");
                }
            }

            attempts += 1;
            let response = tokio::select! {
                _ = token.cancelled() => return Halt::Cancelled,
                response = self.api.status(job_id) => response,
            };

            let status = match response {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(attempts, error = %e, "Status request failed");
                    self.fail(record_id, job_id, Some(&e.to_string()));
                    return Halt::Finished;
                }
            };

            match status.outcome() {
                RemoteStatus::Success => {
                    self.succeed(record_id, job_id).await;
                    return Halt::Finished;
                }
                RemoteStatus::Failure => {
                    self.fail(record_id, job_id, status.reason());
                    return Halt::Finished;
                }
                RemoteStatus::Pending => {
                    tracing::debug!(attempts, status = %status.status, "Job still pending");
                    if let Some(max) = self.config.max_poll_attempts {
                        if attempts >= max {
                            let reason = format!("polling gave up after {} attempts", attempts);
                            self.fail(record_id, job_id, Some(&reason));
                            return Halt::Finished;
                        }
                    }

                    tokio::select! {
                        _ = token.cancelled() => return Halt::Cancelled,
                        _ = self.timer.sleep(self.poll_interval()) => {}
                    }
                }
            }
        }
    }

    async fn succeed(&self, record_id: &str, job_id: &str) {
        if let Err(e) = self.ledger.forget(record_id) {
            tracing::error!(error = %e, "Failed to clear finished job");
        }

        if let Err(e) = self.refresher.refresh().await {
            tracing::warn!(error = %e, "Record refresh after approval failed");
        }

        tracing::info!("Job succeeded");
        self.transition(
            record_id,
            Some(job_id),
            JobState::Succeeded,
            Some(Notification::success(SUCCEEDED_TITLE, SUCCEEDED_DESCRIPTION)),
        );
    }

    fn fail(&self, record_id: &str, job_id: &str, reason: Option<&str>) {
        if let Err(e) = self.ledger.forget(record_id) {
            tracing::error!(error = %e, "Failed to clear failed job");
        }

        let description = reason.unwrap_or(FAILED_DESCRIPTION);
        tracing::warn!(reason = description, "Job failed");
        self.transition(
            record_id,
            Some(job_id),
            JobState::Failed,
            Some(Notification::error(FAILED_TITLE, description)),
        );
    }
}
