//! Error types for IMAP operations

use thiserror::Error;

/// Result type for IMAP operations
pub type ImapResult<T> = Result<T, ImapError>;

/// Errors that can occur during IMAP operations
#[derive(Debug, Error)]
pub enum ImapError {
    /// Connection failed
    #[error("Failed to connect to IMAP server: {0}")]
    ConnectionFailed(String),

    /// Connection dropped while a session was in use
    #[error("IMAP connection lost: {0}")]
    ConnectionLost(String),

    /// Authentication failed
    #[error("IMAP authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Server returned an error
    #[error("IMAP server error: {0}")]
    ServerError(String),

    /// Folder not found
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// Message not found
    #[error("Message not found: UID {0}")]
    MessageNotFound(u32),

    /// Parse error
    #[error("Failed to parse IMAP response: {0}")]
    ParseError(String),

    /// TLS error
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Destination already holds a folder of that name
    #[error("Folder already exists: {0}")]
    AlreadyExists(String),

    /// Session is not connected
    #[error("IMAP session is not connected")]
    NotConnected,
}

impl ImapError {
    /// Whether the session behind this error can no longer be used
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            ImapError::ConnectionLost(_) | ImapError::NotConnected
        )
    }

    /// Classify an async-imap error raised while a session is open
    pub(crate) fn from_session(e: async_imap::error::Error) -> Self {
        use async_imap::error::Error;

        match e {
            Error::Io(io) => ImapError::ConnectionLost(io.to_string()),
            Error::ConnectionLost => ImapError::ConnectionLost("server closed the connection".into()),
            Error::Parse(p) => ImapError::ParseError(p.to_string()),
            // RFC 5530 code; imap-proto has no variant for it, so it stays in the text
            Error::No(text) if text.to_ascii_uppercase().contains("ALREADYEXISTS") => {
                ImapError::AlreadyExists(text)
            }
            other => ImapError::ServerError(other.to_string()),
        }
    }
}
