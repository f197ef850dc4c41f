//! Turns migration events into log lines

use mailshift_core::{MigrationEvent, ProgressReceiver};
use tracing::{debug, error, info, warn, Level};

/// Log every event until the engine drops its sender
pub async fn run(mut events: ProgressReceiver) -> u32 {
    let mut count = 0;
    while let Some(event) = events.recv().await {
        count += 1;
        let (level, line) = describe(&event);
        match level {
            Level::ERROR => error!("{}", line),
            Level::WARN => warn!("{}", line),
            Level::INFO => info!("{}", line),
            _ => debug!("{}", line),
        }
    }
    count
}

/// Severity and text for one event
pub fn describe(event: &MigrationEvent) -> (Level, String) {
    match event {
        MigrationEvent::PairStarted { mailbox } => (Level::INFO, format!("[{}] started", mailbox)),
        MigrationEvent::PairSkipped { mailbox, error } => {
            (Level::ERROR, format!("[{}] skipped: {}", mailbox, error))
        }
        MigrationEvent::PairAborted { mailbox, error } => {
            (Level::ERROR, format!("[{}] aborted: {}", mailbox, error))
        }
        MigrationEvent::PairFinished {
            mailbox,
            copied,
            failed,
        } => (
            Level::INFO,
            format!("[{}] finished: {} copied, {} failed", mailbox, copied, failed),
        ),
        MigrationEvent::FolderDegraded { raw, fallback, error } => (
            Level::WARN,
            format!("Folder {:?} migrated as {} ({})", raw, fallback, error),
        ),
        MigrationEvent::FolderCreated { folder } => (Level::INFO, format!("Created {}", folder)),
        MigrationEvent::FolderCreationFailed { folder, error } => {
            (Level::WARN, format!("Could not create {}: {}", folder, error))
        }
        MigrationEvent::FolderStarted { folder, total } => {
            (Level::INFO, format!("{}: {} messages", folder, total))
        }
        MigrationEvent::FolderSkipped { folder, reason } => {
            (Level::WARN, format!("{}: skipped, {}", folder, reason))
        }
        MigrationEvent::MessageTransferred { uid, progress } => (
            Level::DEBUG,
            format!("{}: UID {} moved ({}/{})", progress.folder, uid, progress.processed, progress.total),
        ),
        MigrationEvent::MessageSkipped { uid, progress } => (
            Level::DEBUG,
            format!(
                "{}: UID {} already moved by an earlier run ({}/{})",
                progress.folder, uid, progress.processed, progress.total
            ),
        ),
        MigrationEvent::MessageFailed { uid, error, progress } => (
            Level::WARN,
            format!(
                "{}: UID {} left on source ({}/{}): {}",
                progress.folder, uid, progress.processed, progress.total, error
            ),
        ),
        MigrationEvent::FolderFinished { result } => {
            let mut line = format!(
                "{}: {} of {} copied, {} failed",
                result.folder, result.copied, result.total, result.failed
            );
            if result.skipped > 0 {
                line.push_str(&format!(", {} already moved", result.skipped));
            }
            if !result.expunged {
                line.push_str(", expunge failed");
            }
            let level = if result.failed > 0 || !result.expunged {
                Level::WARN
            } else {
                Level::INFO
            };
            (level, line)
        }
    }
}
