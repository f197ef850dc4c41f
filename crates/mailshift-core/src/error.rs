//! Error types for the migration engine

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while migrating a mailbox
#[derive(Debug, Error)]
pub enum CoreError {
    /// Login to one side of a mailbox pair failed
    #[error("Authentication error for {login}@{server}: {reason}")]
    Authentication {
        server: String,
        login: String,
        reason: String,
    },

    /// Destination folder could not be created
    #[error("Cannot create folder {folder}: {reason}")]
    FolderCreation { folder: String, reason: String },

    /// Folder could not be selected
    #[error("Cannot open folder {folder}: {reason}")]
    FolderOpen { folder: String, reason: String },

    /// Folder list could not be retrieved
    #[error("Cannot list folders: {0}")]
    FolderListing(String),

    /// Fetching part of a source message failed
    #[error("Cannot fetch message UID {uid}: {reason}")]
    MessageFetch { uid: u32, reason: String },

    /// Destination rejected a message
    #[error("Cannot append message UID {uid}: {reason}")]
    MessageAppend { uid: u32, reason: String },

    /// Flag update on an already copied message failed
    #[error("Cannot update flags of message UID {uid}: {reason}")]
    MessageFlag { uid: u32, reason: String },

    /// Folder name is not valid in its declared encoding
    #[error("Encoding error in folder name {name:?}: {reason}")]
    Encoding { name: String, reason: String },

    /// The session died mid-pair
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Configuration missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Map a transport error raised mid-pair, keeping connection loss distinct
    pub(crate) fn from_transport(e: mailshift_imap::ImapError, otherwise: impl FnOnce(String) -> CoreError) -> Self {
        if e.is_connection_lost() {
            CoreError::ConnectionLost(e.to_string())
        } else {
            otherwise(e.to_string())
        }
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(e: toml::de::Error) -> Self {
        CoreError::Config(e.to_string())
    }
}
