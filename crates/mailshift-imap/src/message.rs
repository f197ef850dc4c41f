//! IMAP message types

use std::collections::HashSet;

/// Flag name for read messages
pub const SEEN: &str = "\\Seen";

/// Flag name for soft-deleted messages
pub const DELETED: &str = "\\Deleted";

/// Email message flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFlags {
    /// Message has been read
    pub seen: bool,
    /// Message has been answered
    pub answered: bool,
    /// Message is flagged/starred
    pub flagged: bool,
    /// Message is marked for deletion
    pub deleted: bool,
    /// Message is a draft
    pub draft: bool,
    /// Keywords and server-specific flags
    pub custom: HashSet<String>,
}

impl MessageFlags {
    /// Parse flags from IMAP FETCH response
    pub fn from_imap_flags(flags: &[&str]) -> Self {
        let mut result = MessageFlags::default();

        for flag in flags {
            match flag.to_lowercase().as_str() {
                "\\seen" => result.seen = true,
                "\\answered" => result.answered = true,
                "\\flagged" => result.flagged = true,
                "\\deleted" => result.deleted = true,
                "\\draft" => result.draft = true,
                "\\recent" => {}
                other => {
                    result.custom.insert(other.to_string());
                }
            }
        }

        result
    }
}
