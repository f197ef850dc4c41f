//! IMAP folder types

/// A folder as reported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    /// Full folder name exactly as it appears on the wire
    pub name: String,
    /// Hierarchy delimiter (e.g. '/' for Gmail, '.' for Courier/Dovecot)
    pub delimiter: Option<char>,
    /// LIST attributes, e.g. `\Noselect`, `\HasChildren`, `\Sent`
    pub attributes: Vec<String>,
    /// Number of messages, known once the folder has been selected
    pub message_count: Option<u32>,
}

impl Folder {
    /// Create a new folder from a LIST response
    pub fn new(name: impl Into<String>, delimiter: Option<char>, attributes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            delimiter,
            attributes,
            message_count: None,
        }
    }

    /// Check if this folder can be selected
    pub fn is_selectable(&self) -> bool {
        !self.attributes.iter().any(|a| {
            let lower = a.to_lowercase();
            lower == "\\noselect" || lower == "\\nonexistent"
        })
    }
}
