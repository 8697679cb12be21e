pub mod api;
pub mod approval;
pub mod composer;
pub mod config;
pub mod error;
pub mod record;
pub mod sanitize;
pub mod store;
pub mod telemetry;
pub mod tracker;

pub use api::{HttpBackend, JobApi, RecordCache, RecordSource, Refresh, RemoteStatus};
pub use approval::ApprovalService;
pub use composer::{Document, DocumentComposer, Table};
pub use config::{load_config, Config};
pub use error::{ApiError, ConfigError, DocketError, ExportError, Result, StoreError, TrackerError};
pub use record::{BusinessRecord, ExportRecord, ProjectRecord};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use tracker::{JobLedger, JobState, JobTracker, Notification, TrackerEvent};
