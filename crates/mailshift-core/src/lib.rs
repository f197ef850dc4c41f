//! Mailbox migration engine
//!
//! Maps source folder names onto the destination convention, creates the
//! destination folders and moves every message across, one mailbox pair at
//! a time.

mod catalog;
mod config;
mod error;
mod folder_sync;
mod migrate;
mod normalize;
mod progress;
mod transfer;

#[cfg(test)]
mod testing;

pub use catalog::{FolderCatalog, FolderDescriptor};
pub use config::{
    Config, Credentials, MailboxConfig, MailboxPair, NamingConfig, ServerConfig, Servers, CONFIG_ENV,
    DEFAULT_CONFIG_FILE,
};
pub use error::{CoreError, CoreResult};
pub use folder_sync::{ensure as ensure_folders, FolderFailure, SyncOutcome};
pub use migrate::{MigrationReport, Migrator, PairReport};
pub use normalize::{NameCharset, NameNormalizer, NamingConvention, NormalizedName, SourceEncoding};
pub use progress::{
    emit, progress_channel, MigrationEvent, ProgressReceiver, ProgressSender, TransferProgress,
};
pub use transfer::{transfer as transfer_folder, MessageFailure, MessageHandle, TransferResult};
