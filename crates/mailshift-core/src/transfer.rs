//! Message transfer between one source folder and its destination folder

use crate::catalog::FolderDescriptor;
use crate::progress::{emit, MigrationEvent, ProgressSender, TransferProgress};
use crate::{CoreError, CoreResult};
use mailshift_imap::{MailSession, SEEN};
use std::fmt;
use tracing::{debug, warn};

/// One source message, held only while it is being transferred
#[derive(Debug, Clone)]
pub struct MessageHandle {
    pub uid: u32,
    /// Header block as stored, possibly ending in the blank separator line
    pub header: Vec<u8>,
    /// Body octets as stored
    pub body: Vec<u8>,
    /// `\Seen` was set before the transfer touched the message
    pub seen: bool,
}

impl MessageHandle {
    /// Header and body joined by a single blank line, bytes untouched otherwise
    pub fn to_raw(&self) -> Vec<u8> {
        let end = self
            .header
            .iter()
            .rposition(|b| *b != b'\r' && *b != b'\n')
            .map_or(0, |i| i + 1);

        let mut raw = Vec::with_capacity(end + 4 + self.body.len());
        raw.extend_from_slice(&self.header[..end]);
        raw.extend_from_slice(b"\r\n\r\n");
        raw.extend_from_slice(&self.body);
        raw
    }
}

/// Step at which a single message failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFailure {
    /// Flags, header or body could not be read; nothing was copied
    Fetch,
    /// The destination rejected the message
    Append,
    /// The copy exists but the source message could not be marked deleted
    DeleteMark,
}

impl fmt::Display for MessageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            MessageFailure::Fetch => "fetch",
            MessageFailure::Append => "append",
            MessageFailure::DeleteMark => "delete mark",
        };
        f.write_str(step)
    }
}

/// Outcome of transferring one folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferResult {
    /// Source folder name
    pub folder: String,
    /// Messages copied and marked deleted on the source
    pub copied: u32,
    /// Messages left on the source
    pub failed: u32,
    /// Messages already marked deleted on the source, not copied again
    pub skipped: u32,
    /// Messages found when the folder was opened
    pub total: u32,
    /// The closing expunge succeeded
    pub expunged: bool,
}

enum Moved {
    Copied,
    AlreadyDeleted,
}

struct StepError {
    kind: MessageFailure,
    error: CoreError,
}

impl StepError {
    fn new(kind: MessageFailure, error: CoreError) -> Self {
        Self { kind, error }
    }
}

/// Move every message of `descriptor` from `source` into its destination folder
///
/// Messages go in ascending UID order. Each copy is appended with the
/// source's `\Seen` state, and the source message is marked deleted only
/// once the append succeeded. Source messages that are already marked
/// deleted were copied by an earlier run and are skipped. Per-message
/// failures are counted and reported; the folder continues. The source
/// folder is expunged once at the end.
///
/// Errors are folder-level: [`CoreError::FolderOpen`] when either folder
/// cannot be selected, [`CoreError::ConnectionLost`] when a session dies.
/// If only the destination died, the source is still expunged before the
/// error is returned.
pub async fn transfer<S, D>(
    source: &mut S,
    dest: &mut D,
    descriptor: &mut FolderDescriptor,
    progress: &ProgressSender,
) -> CoreResult<TransferResult>
where
    S: MailSession + ?Sized,
    D: MailSession + ?Sized,
{
    let folder = descriptor.raw_name.clone();
    let target = descriptor.normalized_name.clone();

    let opened = source
        .select_folder(&folder)
        .await
        .map_err(|e| open_error(&folder, e))?;
    dest.select_folder(&target)
        .await
        .map_err(|e| open_error(&target, e))?;
    descriptor.message_count = opened.message_count;

    let mut uids = source
        .search_uids()
        .await
        .map_err(|e| open_error(&folder, e))?;
    uids.sort_unstable();
    uids.dedup();

    let total = uids.len() as u32;
    debug!("Transferring {} messages from {} to {}", total, folder, target);
    emit(
        progress,
        MigrationEvent::FolderStarted {
            folder: folder.clone(),
            total,
        },
    );

    let mut result = TransferResult {
        folder: folder.clone(),
        total,
        ..Default::default()
    };

    for (i, uid) in uids.into_iter().enumerate() {
        let outcome = transfer_message(source, dest, &target, uid).await;
        let counter = TransferProgress {
            folder: folder.clone(),
            processed: i as u32 + 1,
            total,
        };

        match outcome {
            Ok(Moved::Copied) => {
                result.copied += 1;
                emit(progress, MigrationEvent::MessageTransferred { uid, progress: counter });
            }
            Ok(Moved::AlreadyDeleted) => {
                result.skipped += 1;
                emit(progress, MigrationEvent::MessageSkipped { uid, progress: counter });
            }
            Err(StepError {
                kind,
                error: CoreError::ConnectionLost(reason),
            }) => {
                debug!("Connection lost at {} of UID {} in {}: {}", kind, uid, folder, reason);
                if kind == MessageFailure::Append {
                    // the source is still usable; commit what was already moved
                    if let Err(e) = source.expunge().await {
                        warn!("Expunge of {} after destination loss failed: {}", folder, e);
                    }
                }
                return Err(CoreError::ConnectionLost(reason));
            }
            Err(StepError { kind, error }) => {
                result.failed += 1;
                debug!("UID {} in {} failed at {}: {}", uid, folder, kind, error);
                emit(
                    progress,
                    MigrationEvent::MessageFailed {
                        uid,
                        error: error.to_string(),
                        progress: counter,
                    },
                );
            }
        }
    }

    result.expunged = match source.expunge().await {
        Ok(()) => true,
        Err(e) if e.is_connection_lost() => return Err(CoreError::ConnectionLost(e.to_string())),
        Err(e) => {
            debug!("Expunge of {} failed: {}", folder, e);
            false
        }
    };

    debug!(
        "Folder {} done: {} copied, {} skipped, {} failed of {}",
        folder, result.copied, result.skipped, result.failed, result.total
    );
    emit(progress, MigrationEvent::FolderFinished { result: result.clone() });
    Ok(result)
}

fn open_error(folder: &str, e: mailshift_imap::ImapError) -> CoreError {
    CoreError::from_transport(e, |reason| CoreError::FolderOpen {
        folder: folder.to_string(),
        reason,
    })
}

/// Fetch, append with flags, then mark the source deleted; stops at the first failing step
async fn transfer_message<S, D>(source: &mut S, dest: &mut D, target: &str, uid: u32) -> Result<Moved, StepError>
where
    S: MailSession + ?Sized,
    D: MailSession + ?Sized,
{
    let Some(message) = fetch_message(source, uid)
        .await
        .map_err(|e| StepError::new(MessageFailure::Fetch, e))?
    else {
        debug!("UID {} already marked deleted, not copied again", uid);
        return Ok(Moved::AlreadyDeleted);
    };

    let flags: &[&str] = if message.seen { &[SEEN] } else { &[] };
    dest.append(target, flags, &message.to_raw()).await.map_err(|e| {
        StepError::new(
            MessageFailure::Append,
            CoreError::from_transport(e, |reason| CoreError::MessageAppend { uid, reason }),
        )
    })?;
    debug!("UID {} appended to {}", uid, target);

    source.mark_deleted(uid).await.map_err(|e| {
        StepError::new(
            MessageFailure::DeleteMark,
            CoreError::from_transport(e, |reason| CoreError::MessageFlag { uid, reason }),
        )
    })?;
    Ok(Moved::Copied)
}

/// Read one message, or nothing if it is already marked deleted
async fn fetch_message<S: MailSession + ?Sized>(source: &mut S, uid: u32) -> CoreResult<Option<MessageHandle>> {
    let fetch_error = |e| CoreError::from_transport(e, |reason| CoreError::MessageFetch { uid, reason });

    let flags = source.fetch_flags(uid).await.map_err(fetch_error)?;
    if flags.deleted {
        return Ok(None);
    }
    let header = source.fetch_header(uid).await.map_err(fetch_error)?;
    let body = source.peek_text(uid).await.map_err(fetch_error)?;

    Ok(Some(MessageHandle {
        uid,
        header,
        body,
        seen: flags.seen,
    }))
}
