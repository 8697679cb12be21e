//! Tracker events for UI consumers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Per-record job state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Submitting,
    Polling,
    Succeeded,
    Failed,
}

impl JobState {
    /// True while a submission or poll chain owns the record.
    pub fn is_active(self) -> bool {
        matches!(self, JobState::Submitting | JobState::Polling)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Idle => write!(f, "Idle"),
            JobState::Submitting => write!(f, "Submitting"),
            JobState::Polling => write!(f, "Polling"),
            JobState::Succeeded => write!(f, "Succeeded"),
            JobState::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// A user-facing toast: title plus description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn info(title: &str, description: &str) -> Self {
        Self::new(NotificationLevel::Info, title, description)
    }

    pub fn success(title: &str, description: &str) -> Self {
        Self::new(NotificationLevel::Success, title, description)
    }

    pub fn error(title: &str, description: &str) -> Self {
        Self::new(NotificationLevel::Error, title, description)
    }

    fn new(level: NotificationLevel, title: &str, description: &str) -> Self {
        Self {
            level,
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}

/// State change of one record's job, optionally with a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerEvent {
    pub record_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    pub timestamp: DateTime<Utc>,
}

impl TrackerEvent {
    pub fn new(record_id: &str, job_id: Option<&str>, state: JobState) -> Self {
        Self {
            record_id: record_id.to_string(),
            job_id: job_id.map(str::to_string),
            state,
            notification: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_notification(mut self, notification: Notification) -> Self {
        self.notification = Some(notification);
        self
    }
}

/// Fans tracker events out to every subscriber.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<TrackerEvent>>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: TrackerEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
