//! Mailshift - migrate IMAP mailboxes between servers

mod cli;
mod logging;
mod reporter;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use logging::init_logging;
use mailshift_core::{progress_channel, Config, Migrator};
use mailshift_imap::ImapConnector;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level())?;
    debug!("CLI arguments: {:?}", cli);

    match cli.command {
        Command::MigrateMailboxes => migrate_mailboxes().await,
    }
}

async fn migrate_mailboxes() -> Result<()> {
    let path = Config::default_path();
    let config = Config::load(&path).with_context(|| format!("Invalid configuration {}", path.display()))?;
    info!("Loaded {} mailboxes from {}", config.mailboxes.len(), path.display());

    let (progress, events) = progress_channel();
    let reporter = tokio::spawn(reporter::run(events));

    let report = Migrator::new(ImapConnector, &config).run(&progress).await;

    drop(progress);
    if let Err(e) = reporter.await {
        debug!("Reporter task ended abnormally: {}", e);
    }

    // partial failures are in the log, not in the exit status
    info!("Migration finished: {}", report);
    Ok(())
}
