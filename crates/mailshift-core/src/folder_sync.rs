//! Destination folder synchronization

use crate::progress::{emit, MigrationEvent, ProgressSender};
use crate::{CoreError, CoreResult};
use mailshift_imap::{ImapError, MailSession};
use std::collections::HashSet;
use tracing::{debug, info};

/// A destination folder that could not be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderFailure {
    pub name: String,
    pub reason: String,
}

/// What [`ensure`] did to the destination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Folders created by this call, parents before children
    pub created: Vec<String>,
    /// Requested folders that were already there
    pub existing: Vec<String>,
    /// Folders whose creation failed
    pub failed: Vec<FolderFailure>,
}

impl SyncOutcome {
    /// Whether messages can be transferred into `name`
    pub fn is_available(&self, name: &str) -> bool {
        self.created.iter().chain(&self.existing).any(|n| n == name)
    }

    pub fn failure(&self, name: &str) -> Option<&FolderFailure> {
        self.failed.iter().find(|f| f.name == name)
    }
}

/// Make sure every name in `required` exists on `dest`
///
/// The destination is listed once and names are compared case-sensitively.
/// Names are created shallowest first so a parent never trails its child.
/// A create refused because the folder is already there counts as existing.
/// Any other refusal is recorded in [`SyncOutcome::failed`] and the remaining
/// names are still processed. Only a failed listing or a lost connection is
/// an error.
pub async fn ensure<S: MailSession + ?Sized>(
    dest: &mut S,
    required: &[String],
    delimiter: char,
    progress: &ProgressSender,
) -> CoreResult<SyncOutcome> {
    let present = list_names(dest).await?;

    let mut handled = HashSet::new();
    let mut pending: Vec<&String> = required
        .iter()
        .filter(|name| handled.insert(name.as_str()))
        .collect();
    pending.sort_by_key(|name| name.matches(delimiter).count());

    let mut outcome = SyncOutcome::default();

    for name in pending {
        if present.contains(name) {
            debug!("Folder {} already exists", name);
            outcome.existing.push(name.clone());
            continue;
        }

        let error = match dest.create_folder(name).await {
            Ok(()) => {
                debug!("Created folder {}", name);
                emit(progress, MigrationEvent::FolderCreated { folder: name.clone() });
                outcome.created.push(name.clone());
                continue;
            }
            Err(ImapError::AlreadyExists(text)) => {
                debug!("Folder {} appeared since listing: {}", name, text);
                outcome.existing.push(name.clone());
                continue;
            }
            Err(e) => e,
        };

        let e = CoreError::from_transport(error, |reason| CoreError::FolderCreation {
            folder: name.clone(),
            reason,
        });
        if let CoreError::ConnectionLost(_) = e {
            return Err(e);
        }

        // servers without RFC 5530 codes refuse duplicates with a bare NO
        if list_names(dest).await?.contains(name) {
            debug!("Folder {} exists despite: {}", name, e);
            outcome.existing.push(name.clone());
            continue;
        }

        debug!("{}", e);
        emit(
            progress,
            MigrationEvent::FolderCreationFailed {
                folder: name.clone(),
                error: e.to_string(),
            },
        );
        outcome.failed.push(FolderFailure {
            name: name.clone(),
            reason: e.to_string(),
        });
    }

    info!(
        "Folders: {} created, {} existing, {} failed",
        outcome.created.len(),
        outcome.existing.len(),
        outcome.failed.len()
    );
    Ok(outcome)
}

async fn list_names<S: MailSession + ?Sized>(dest: &mut S) -> CoreResult<HashSet<String>> {
    Ok(dest
        .list_folders()
        .await
        .map_err(|e| CoreError::from_transport(e, CoreError::FolderListing))?
        .into_iter()
        .map(|f| f.name)
        .collect())
}
