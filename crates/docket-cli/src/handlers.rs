use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use docket::config::validate_config;
use docket::record::decode_records;
use docket::{
    load_config, ApprovalService, BusinessRecord, Config, DocumentComposer, ExportRecord,
    HttpBackend, JobLedger, JobState, ProjectRecord, RecordSource, SqliteStore, TrackerEvent,
};

use crate::args::{Cli, ExportArgs, ExportFormat, RecordKind};
use crate::error::CliError;
use crate::print::event_line;

/// Loads the config file (or defaults) and applies flag overrides.
pub fn load(cli: &Cli) -> Result<Config, CliError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.api.base_url = base_url.clone();
    }
    validate_config(&config)?;
    Ok(config)
}

pub async fn export(config: &Config, args: ExportArgs) -> Result<(), CliError> {
    match args.kind {
        RecordKind::Business => export_records::<BusinessRecord>(config, &args).await,
        RecordKind::Project => export_records::<ProjectRecord>(config, &args).await,
        RecordKind::Json => export_records::<Value>(config, &args).await,
    }
}

async fn export_records<R>(config: &Config, args: &ExportArgs) -> Result<(), CliError>
where
    R: ExportRecord + DeserializeOwned + Send + 'static,
{
    let records: Vec<R> = load_records(config, args.input.as_deref()).await?;
    let composer = DocumentComposer::new(config.layout.clone(), &config.export.sheet_name);

    let bytes = match args.format {
        ExportFormat::Snapshot => composer.to_snapshot(&records)?,
        ExportFormat::Xlsx => composer.to_table(&records)?,
        ExportFormat::Csv => composer.to_csv(&records).into_bytes(),
        ExportFormat::Pdf => composer.to_pdf(&records)?,
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, &bytes).map_err(|e| CliError::Io {
                path: path.clone(),
                source: e,
            })?;
            eprintln!(
                "Exported {} record(s) to {} ({} bytes)",
                records.len(),
                path.display(),
                bytes.len()
            );
        }
        None if args.format.is_binary() => {
            return Err(CliError::Input(
                "--output is required for xlsx and pdf exports".to_string(),
            ));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&bytes)
                .and_then(|_| stdout.flush())
                .map_err(|e| CliError::Io {
                    path: "<stdout>".into(),
                    source: e,
                })?;
        }
    }

    Ok(())
}

async fn load_records<R>(config: &Config, input: Option<&Path>) -> Result<Vec<R>, CliError>
where
    R: DeserializeOwned + Send + 'static,
{
    let Some(path) = input else {
        let backend = HttpBackend::new(config.api.clone())?;
        return Ok(<HttpBackend as RecordSource<R>>::fetch_records(&backend).await?);
    };

    let raw = std::fs::read_to_string(path).map_err(|e| CliError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| CliError::Input(format!("{}: {}", path.display(), e)))?;
    let Value::Array(values) = value else {
        return Err(CliError::Input(format!(
            "{} does not hold a JSON array",
            path.display()
        )));
    };
    Ok(decode_records(values))
}

pub async fn approve(config: &Config, record_id: &str, no_wait: bool) -> Result<(), CliError> {
    let service = ApprovalService::<ProjectRecord>::connect(config)?;
    let mut events = service.subscribe();

    service.records().reload().await?;
    let record = service
        .records()
        .find(record_id)
        .ok_or_else(|| CliError::RecordNotFound(record_id.to_string()))?;
    if record.approved {
        eprintln!("Project {} is already approved, submitting again", record_id);
    }

    let job_id = service.approve_and_track(&record)?.await??;
    println!("Queued job {} for {}", job_id, record_id);

    if no_wait {
        service.shutdown();
        return Ok(());
    }

    let failed = follow(&mut events, 1).await;
    service.shutdown();
    if failed > 0 {
        return Err(CliError::JobsFailed(failed));
    }
    Ok(())
}

pub async fn recover(config: &Config) -> Result<(), CliError> {
    let service = ApprovalService::<ProjectRecord>::connect(config)?;
    let mut events = service.subscribe();

    let resumed = service.recover_on_load().await?;
    if resumed == 0 {
        println!("No jobs to resume");
        return Ok(());
    }
    println!("Resumed {} job(s)", resumed);

    let failed = follow(&mut events, resumed).await;
    service.shutdown();
    if failed > 0 {
        return Err(CliError::JobsFailed(failed));
    }
    Ok(())
}

pub fn status(config: &Config) -> Result<(), CliError> {
    let store = SqliteStore::open(&config.storage.resolved_path())?;
    let ledger = JobLedger::new(Arc::new(store));
    let jobs = ledger.jobs()?;

    if jobs.is_empty() {
        println!("No tracked jobs");
        return Ok(());
    }
    for (record_id, job_id) in jobs {
        println!("{}\t{}", record_id, job_id);
    }
    Ok(())
}

/// Prints events until `chains` poll chains have ended. Returns how many
/// ended in failure.
async fn follow(events: &mut broadcast::Receiver<TrackerEvent>, chains: usize) -> usize {
    let mut remaining = chains;
    let mut failed = 0;

    while remaining > 0 {
        match events.recv().await {
            Ok(event) => {
                println!("{}", event_line(&event));
                match event.state {
                    JobState::Failed => {
                        failed += 1;
                        remaining -= 1;
                    }
                    JobState::Succeeded | JobState::Idle => remaining -= 1,
                    JobState::Submitting | JobState::Polling => {}
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Missed tracker events");
            }
            Err(RecvError::Closed) => break,
        }
    }

    failed
}
