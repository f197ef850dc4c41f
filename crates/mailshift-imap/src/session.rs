//! Transport-neutral session abstraction
//!
//! The migration engine only ever talks to a [`MailSession`]; [`crate::ImapClient`]
//! is the adapter for a real server.

use crate::{Folder, ImapResult, MessageFlags};
use async_trait::async_trait;
use std::fmt;

/// Default port for IMAP over implicit TLS
pub const IMAPS_PORT: u16 = 993;

/// Where to reach a mail server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    /// Hostname, also used for TLS certificate validation
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One authenticated mailbox session
///
/// Message-level operations act on the currently selected folder.
#[async_trait]
pub trait MailSession: Send {
    /// List every folder, in server order
    async fn list_folders(&mut self) -> ImapResult<Vec<Folder>>;

    /// Open a folder for message operations
    async fn select_folder(&mut self, name: &str) -> ImapResult<Folder>;

    /// Create a folder
    async fn create_folder(&mut self, name: &str) -> ImapResult<()>;

    /// All message UIDs of the selected folder, ascending
    async fn search_uids(&mut self) -> ImapResult<Vec<u32>>;

    /// Flags of one message
    async fn fetch_flags(&mut self, uid: u32) -> ImapResult<MessageFlags>;

    /// Raw header block of one message
    async fn fetch_header(&mut self, uid: u32) -> ImapResult<Vec<u8>>;

    /// Raw body octets of one message, leaving `\Seen` untouched
    async fn peek_text(&mut self, uid: u32) -> ImapResult<Vec<u8>>;

    /// Append a raw message to `folder` with the given initial flags
    async fn append(&mut self, folder: &str, flags: &[&str], raw: &[u8]) -> ImapResult<()>;

    /// Soft-delete one message; it disappears on the next expunge
    async fn mark_deleted(&mut self, uid: u32) -> ImapResult<()>;

    /// Permanently remove soft-deleted messages from the selected folder
    async fn expunge(&mut self) -> ImapResult<()>;

    /// Close the session
    async fn logout(&mut self) -> ImapResult<()>;
}

/// Acquires authenticated sessions
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: MailSession;

    async fn authenticate(
        &self,
        server: &ServerAddress,
        login: &str,
        password: &str,
    ) -> ImapResult<Self::Session>;
}
