//! Progress events emitted while a migration runs

use crate::transfer::TransferResult;
use tokio::sync::mpsc;

/// Where the engine sends its events
pub type ProgressSender = mpsc::UnboundedSender<MigrationEvent>;

/// Receiving side of [`ProgressSender`]
pub type ProgressReceiver = mpsc::UnboundedReceiver<MigrationEvent>;

/// Per-folder message counter, reported after every message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    /// Source folder name
    pub folder: String,
    /// Messages handled so far, successful or not
    pub processed: u32,
    /// Messages found when the folder was opened
    pub total: u32,
}

/// Events sent from the migration engine to whoever reports progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    /// Work on a mailbox pair began
    PairStarted { mailbox: String },
    /// A side of the pair could not be authenticated; nothing was touched
    PairSkipped { mailbox: String, error: String },
    /// The pair stopped early because a session was lost
    PairAborted { mailbox: String, error: String },
    /// Work on a mailbox pair ended
    PairFinished {
        mailbox: String,
        copied: u32,
        failed: u32,
    },
    /// A source folder name did not decode and a sanitized name is used
    FolderDegraded {
        raw: String,
        fallback: String,
        error: String,
    },
    /// A destination folder was created
    FolderCreated { folder: String },
    /// A destination folder could not be created
    FolderCreationFailed { folder: String, error: String },
    /// Message transfer for a folder began
    FolderStarted { folder: String, total: u32 },
    /// A folder's messages were not transferred
    FolderSkipped { folder: String, reason: String },
    /// One message was copied and marked for deletion on the source
    MessageTransferred { uid: u32, progress: TransferProgress },
    /// One message was already marked deleted by an earlier run
    MessageSkipped { uid: u32, progress: TransferProgress },
    /// One message could not be migrated and stays on the source
    MessageFailed {
        uid: u32,
        error: String,
        progress: TransferProgress,
    },
    /// Message transfer for a folder ended
    FolderFinished { result: TransferResult },
}

/// Send an event, ignoring a receiver that went away
pub fn emit(progress: &ProgressSender, event: MigrationEvent) {
    let _ = progress.send(event);
}

/// Create the progress channel
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}
