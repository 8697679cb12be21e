use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            api: ApiConfig::default(),
            tracker: TrackerConfig::default(),
            layout: LayoutConfig::default(),
            export: ExportConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Backend endpoints. Paths are joined onto `base_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_records_path")]
    pub records_path: String,
    #[serde(default = "default_submit_path")]
    pub submit_path: String,
    #[serde(default = "default_status_path")]
    pub status_path: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/".to_string()
}

fn default_records_path() -> String {
    "projects/".to_string()
}

fn default_submit_path() -> String {
    "save-pdf-approved/".to_string()
}

fn default_status_path() -> String {
    "pdf-status/".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            records_path: default_records_path(),
            submit_path: default_submit_path(),
            status_path: default_status_path(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Polls per job before giving up. `None` polls until a terminal status.
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_event_capacity() -> usize {
    100
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: None,
            event_capacity: default_event_capacity(),
        }
    }
}

/// Page geometry and typography in PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    /// Lowest baseline a line may be drawn at. Defaults to `margin`.
    pub bottom_margin: Option<f64>,
    pub title_size: f64,
    pub heading_size: f64,
    pub body_size: f64,
    /// Line height as a multiple of `body_size`.
    pub line_height_factor: f64,
    pub heading_gap: f64,
    pub separator_gap: f64,
    /// Gap after a section body as a multiple of `body_size`.
    pub trailing_gap_factor: f64,
    /// A section starts on a new page when less than this multiple of
    /// `heading_size` remains.
    pub section_min_space_factor: f64,
    pub image_max_width: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 595.28,
            page_height: 841.89,
            margin: 60.0,
            bottom_margin: None,
            title_size: 20.0,
            heading_size: 16.0,
            body_size: 12.0,
            line_height_factor: 1.5,
            heading_gap: 8.0,
            separator_gap: 12.0,
            trailing_gap_factor: 2.0,
            section_min_space_factor: 20.0,
            image_max_width: 240.0,
        }
    }
}

impl LayoutConfig {
    pub fn content_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    pub fn top(&self) -> f64 {
        self.page_height - self.margin
    }

    pub fn bottom(&self) -> f64 {
        self.bottom_margin.unwrap_or(self.margin)
    }

    pub fn line_height(&self) -> f64 {
        self.body_size * self.line_height_factor
    }

    pub fn trailing_gap(&self) -> f64 {
        self.body_size * self.trailing_gap_factor
    }

    pub fn section_min_space(&self) -> f64 {
        self.heading_size * self.section_min_space_factor
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
}

fn default_sheet_name() -> String {
    "Records".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sheet_name: default_sheet_name(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding job-tracking state. Defaults to the platform data dir.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::store::default_store_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}
