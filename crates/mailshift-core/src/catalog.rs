//! Source folder discovery

use crate::normalize::{NameCharset, NameNormalizer, SourceEncoding};
use crate::progress::{emit, MigrationEvent, ProgressSender};
use crate::{CoreError, CoreResult};
use mailshift_imap::MailSession;
use std::collections::HashSet;
use tracing::{debug, info};

/// One source folder and where it goes on the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderDescriptor {
    /// Name as the source server reports it
    pub raw_name: String,
    /// Destination wire name
    pub normalized_name: String,
    /// False for hierarchy-only containers (`\Noselect`)
    pub selectable: bool,
    /// Filled in once the folder is opened
    pub message_count: Option<u32>,
    /// Source hierarchy delimiter
    pub delimiter: Option<char>,
    /// The raw name was malformed and `normalized_name` is a sanitized fallback
    pub degraded: bool,
}

/// Source folders in declaration order, addressable by destination name
#[derive(Debug, Clone, Default)]
pub struct FolderCatalog {
    folders: Vec<FolderDescriptor>,
}

impl FolderCatalog {
    /// List the folders of `session` and compute their destination names
    pub async fn list<S: MailSession + ?Sized>(
        session: &mut S,
        normalizer: &NameNormalizer,
        charset: NameCharset,
        progress: &ProgressSender,
    ) -> CoreResult<Self> {
        let listed = session
            .list_folders()
            .await
            .map_err(|e| CoreError::from_transport(e, CoreError::FolderListing))?;

        let mut folders = Vec::with_capacity(listed.len());
        for folder in listed {
            let source = SourceEncoding {
                charset,
                delimiter: folder.delimiter,
            };
            let normalized = normalizer.normalize_or_sanitize(&folder.name, source);

            if normalized.degraded {
                emit(
                    progress,
                    MigrationEvent::FolderDegraded {
                        raw: folder.name.clone(),
                        fallback: normalized.name.clone(),
                        error: normalized.error.clone().unwrap_or_default(),
                    },
                );
            }

            debug!("Folder {} -> {}", folder.name, normalized.name);
            folders.push(FolderDescriptor {
                selectable: folder.is_selectable(),
                raw_name: folder.name,
                normalized_name: normalized.name,
                message_count: folder.message_count,
                delimiter: folder.delimiter,
                degraded: normalized.degraded,
            });
        }

        info!("Found {} source folders", folders.len());
        Ok(Self { folders })
    }

    pub fn iter(&self) -> impl Iterator<Item = &FolderDescriptor> {
        self.folders.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FolderDescriptor> {
        self.folders.iter_mut()
    }

    /// Every destination name, once, in first-declaration order
    ///
    /// Containers are included so the hierarchy exists on the destination.
    pub fn required_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.folders
            .iter()
            .filter(|f| seen.insert(f.normalized_name.as_str()))
            .map(|f| f.normalized_name.clone())
            .collect()
    }
}
