//! Asynchronous approval job tracking.

pub mod events;
pub mod job_tracker;
pub mod ledger;
pub mod timer;

pub use events::{EventBroadcaster, JobState, Notification, NotificationLevel, TrackerEvent};
pub use job_tracker::JobTracker;
pub use ledger::{JobLedger, IN_FLIGHT_KEY, JOB_IDS_KEY};
pub use timer::{PollTimer, TokioTimer};
