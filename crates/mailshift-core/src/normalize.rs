//! Folder name normalization between source and destination conventions

use crate::{CoreError, CoreResult};
use mailshift_imap::{decode_modified_utf7, encode_modified_utf7};
use serde::Deserialize;
use tracing::debug;

/// How source folder names are encoded on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameCharset {
    /// RFC 3501 modified UTF-7, what nearly every server sends
    #[default]
    ModifiedUtf7,
    /// Raw UTF-8 (servers with UTF8=ACCEPT enabled)
    Utf8,
}

/// Encoding of one source folder name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceEncoding {
    pub charset: NameCharset,
    /// Source hierarchy delimiter, if the server reported one
    pub delimiter: Option<char>,
}

/// Destination naming rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingConvention {
    /// Bracketed provider roots (e.g. `[Gmail]`) whose children move to the top level
    pub provider_roots: Vec<String>,
    /// Root folder every destination folder lives under
    pub inbox: String,
    /// Destination hierarchy delimiter
    pub delimiter: char,
}

impl Default for NamingConvention {
    fn default() -> Self {
        Self {
            provider_roots: vec!["[Gmail]".to_string(), "[Google Mail]".to_string()],
            inbox: "INBOX".to_string(),
            delimiter: '.',
        }
    }
}

/// Result of normalizing a name that may not decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    /// Destination wire name
    pub name: String,
    /// The raw name was malformed and `name` came from a sanitized copy
    pub degraded: bool,
    /// Why decoding failed
    pub error: Option<String>,
}

/// Maps source folder names to destination folder names
#[derive(Debug, Clone, Default)]
pub struct NameNormalizer {
    convention: NamingConvention,
}

impl NameNormalizer {
    pub fn new(convention: NamingConvention) -> Self {
        Self { convention }
    }

    pub fn convention(&self) -> &NamingConvention {
        &self.convention
    }

    /// Destination wire name for `raw`, or an encoding error
    pub fn normalize(&self, raw: &str, source: SourceEncoding) -> CoreResult<String> {
        let decoded = match source.charset {
            NameCharset::ModifiedUtf7 => decode_modified_utf7(raw).map_err(|e| CoreError::Encoding {
                name: raw.to_string(),
                reason: e.to_string(),
            })?,
            NameCharset::Utf8 => raw.to_string(),
        };

        let stripped = self.strip_provider_root(&decoded, source.delimiter);
        let ascii = transliterate(stripped, source.delimiter, self.convention.delimiter);
        Ok(self.finish(&ascii, source.delimiter))
    }

    /// Like [`normalize`](Self::normalize), but falls back to a sanitized copy
    /// of the raw name instead of failing
    pub fn normalize_or_sanitize(&self, raw: &str, source: SourceEncoding) -> NormalizedName {
        match self.normalize(raw, source) {
            Ok(name) => NormalizedName {
                name,
                degraded: false,
                error: None,
            },
            Err(e) => {
                let cleaned = sanitize(raw);
                let stripped = self.strip_provider_root(&cleaned, source.delimiter);
                let name = self.finish(stripped, source.delimiter);
                debug!("Folder name {:?} is malformed ({}), using {:?}", raw, e, name);
                NormalizedName {
                    name,
                    degraded: true,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Drop a `[Provider]<delim>` prefix; a bare provider root maps to the inbox
    fn strip_provider_root<'a>(&self, name: &'a str, delimiter: Option<char>) -> &'a str {
        let delimiter = delimiter.unwrap_or('/');

        for root in &self.convention.provider_roots {
            if name == root {
                return "";
            }
            if let Some(rest) = name.strip_prefix(root.as_str()) {
                if let Some(rest) = rest.strip_prefix(delimiter) {
                    return rest;
                }
            }
        }

        name
    }

    /// Translate the hierarchy delimiter, root under the inbox, encode for the wire
    fn finish(&self, name: &str, source_delimiter: Option<char>) -> String {
        let target = self.convention.delimiter;
        let name = match source_delimiter {
            Some(d) if d != target => name.replace(d, &target.to_string()),
            _ => name.to_string(),
        };

        encode_modified_utf7(&self.root_under_inbox(&name))
    }

    fn root_under_inbox(&self, name: &str) -> String {
        let inbox = self.convention.inbox.as_str();
        let delimiter = self.convention.delimiter;

        if name.is_empty() || name.eq_ignore_ascii_case(inbox) {
            return inbox.to_string();
        }

        if name.len() > inbox.len()
            && name.is_char_boundary(inbox.len())
            && name[..inbox.len()].eq_ignore_ascii_case(inbox)
            && name[inbox.len()..].starts_with(delimiter)
        {
            return format!("{}{}", inbox, &name[inbox.len()..]);
        }

        format!("{}{}{}", inbox, delimiter, name)
    }
}

/// ASCII transliteration; control characters become `_`
///
/// A transliteration never contributes a hierarchy delimiter, so `…` under a
/// `.` convention stays one segment.
fn transliterate(name: &str, source_delimiter: Option<char>, target_delimiter: char) -> String {
    let mut out = String::with_capacity(name.len());

    for c in name.chars() {
        if c.is_ascii() {
            out.push(if c.is_ascii_control() { '_' } else { c });
            continue;
        }
        match deunicode::deunicode_char(c) {
            Some(ascii) => out.extend(ascii.chars().map(|t| {
                if t.is_ascii_control() || t == target_delimiter || Some(t) == source_delimiter {
                    '_'
                } else {
                    t
                }
            })),
            None => out.push('_'),
        }
    }

    out
}

/// Keep printable ASCII except the shift character, replace the rest with `_`
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if (' '..='~').contains(&c) && c != '&' { c } else { '_' })
        .collect()
}
