//! IMAP transport for Mailshift
//!
//! Provides the [`MailSession`] abstraction the migration engine runs against,
//! the async-imap backed [`ImapClient`] adapter, and the modified UTF-7 folder
//! name codec.

mod client;
mod error;
mod folder;
mod message;
mod session;
mod utf7;

pub use client::{ImapClient, ImapConnector};
pub use error::{ImapError, ImapResult};
pub use folder::Folder;
pub use message::{MessageFlags, DELETED, SEEN};
pub use session::{Connector, MailSession, ServerAddress, IMAPS_PORT};
pub use utf7::{decode_modified_utf7, encode_modified_utf7, Utf7Error};
