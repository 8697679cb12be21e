//! docket: export records and follow approval jobs from a terminal.

mod args;
mod error;
mod handlers;
mod print;

use clap::Parser;

use args::{Cli, Commands};
use error::CliError;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config = handlers::load(&cli)?;
    docket::telemetry::init(&config.logging)?;

    match cli.command {
        Commands::Export(args) => handlers::export(&config, args).await?,
        Commands::Approve { record_id, no_wait } => {
            handlers::approve(&config, &record_id, no_wait).await?
        }
        Commands::Recover => handlers::recover(&config).await?,
        Commands::Status => handlers::status(&config)?,
    }

    Ok(())
}
