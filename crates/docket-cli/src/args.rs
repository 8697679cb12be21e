//! Command-line surface for `docket`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "docket", version, about = "Export records and track approval jobs", long_about = None)]
pub struct Cli {
    /// JSON config file. Defaults apply when omitted.
    #[arg(long, global = true, env = "DOCKET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend base URL, overrides the config file
    #[arg(long, global = true, env = "DOCKET_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export records as a snapshot, table or paginated document
    Export(ExportArgs),
    /// Submit a project's report for approval and follow the job
    Approve {
        #[arg(long)]
        record_id: String,
        /// Return once the job is queued instead of waiting for it
        #[arg(long)]
        no_wait: bool,
    },
    /// Resume persisted jobs and wait for them to finish
    Recover,
    /// List jobs persisted in the local store
    Status,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long, value_enum, default_value_t = ExportFormat::Pdf)]
    pub format: ExportFormat,

    #[arg(long, value_enum, default_value_t = RecordKind::Json)]
    pub kind: RecordKind,

    /// Read records from a JSON array file instead of the backend
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Output file. Text formats go to stdout when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    /// Pretty-printed JSON
    Snapshot,
    /// Flattened XLSX workbook
    Xlsx,
    /// Flattened CSV
    Csv,
    /// Paginated PDF
    Pdf,
}

impl ExportFormat {
    pub fn is_binary(self) -> bool {
        matches!(self, ExportFormat::Xlsx | ExportFormat::Pdf)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    /// Competitor analysis records
    Business,
    /// Projects awaiting approval
    Project,
    /// Arbitrary JSON objects
    Json,
}
