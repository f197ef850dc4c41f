//! Typed migration configuration

use crate::normalize::{NameCharset, NamingConvention};
use crate::{CoreError, CoreResult};
use mailshift_imap::{ServerAddress, IMAPS_PORT};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "MAILSHIFT_CONFIG";

/// Configuration file used when [`CONFIG_ENV`] is not set
pub const DEFAULT_CONFIG_FILE: &str = "mailshift.toml";

/// Whole configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Source and destination servers shared by every mailbox
    pub server: Servers,
    /// Folder naming rules
    #[serde(default)]
    pub naming: NamingConfig,
    /// Mailboxes to migrate, in order
    pub mailboxes: Vec<MailboxConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Servers {
    pub source: ServerConfig,
    pub destination: ServerConfig,
}

/// IMAP server location
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> ServerAddress {
        ServerAddress::new(&self.host, self.port)
    }
}

fn default_port() -> u16 {
    IMAPS_PORT
}

/// Folder naming section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NamingConfig {
    /// Bracketed provider roots stripped from source names
    pub provider_roots: Vec<String>,
    /// Destination root folder
    pub inbox: String,
    /// Destination hierarchy delimiter, a single character
    pub delimiter: String,
    /// Wire encoding of source folder names
    pub source_charset: NameCharset,
}

impl Default for NamingConfig {
    fn default() -> Self {
        let convention = NamingConvention::default();
        Self {
            provider_roots: convention.provider_roots,
            inbox: convention.inbox,
            delimiter: convention.delimiter.to_string(),
            source_charset: NameCharset::ModifiedUtf7,
        }
    }
}

/// Login for one side of a mailbox
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One mailbox entry
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailboxConfig {
    /// Address used to identify the mailbox in logs
    pub address: String,
    pub source: Credentials,
    /// Destination login; the source login is reused when absent
    pub destination: Option<Credentials>,
}

/// Everything needed to migrate one mailbox, immutable for the run
#[derive(Debug, Clone)]
pub struct MailboxPair {
    pub address: String,
    pub source_server: ServerAddress,
    pub dest_server: ServerAddress,
    pub source: Credentials,
    pub destination: Credentials,
}

impl Config {
    /// Location of the configuration file
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Read, parse and validate a configuration file
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(text: &str) -> CoreResult<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the migration cannot run with
    pub fn validate(&self) -> CoreResult<()> {
        validate_server("server.source", &self.server.source)?;
        validate_server("server.destination", &self.server.destination)?;

        if self.naming.inbox.trim().is_empty() {
            return Err(CoreError::Config("naming.inbox must not be empty".into()));
        }
        if self.naming.delimiter.chars().count() != 1 {
            return Err(CoreError::Config(format!(
                "naming.delimiter must be a single character, got {:?}",
                self.naming.delimiter
            )));
        }

        if self.mailboxes.is_empty() {
            return Err(CoreError::Config("no mailboxes configured".into()));
        }

        let mut seen = HashSet::new();
        for (i, mailbox) in self.mailboxes.iter().enumerate() {
            if mailbox.address.trim().is_empty() {
                return Err(CoreError::Config(format!("mailboxes[{}].address must not be empty", i)));
            }
            if !seen.insert(mailbox.address.as_str()) {
                return Err(CoreError::Config(format!("duplicate mailbox {}", mailbox.address)));
            }
            let sides = [("source", Some(&mailbox.source)), ("destination", mailbox.destination.as_ref())];
            for (side, credentials) in sides {
                if let Some(credentials) = credentials {
                    if credentials.login.trim().is_empty() {
                        return Err(CoreError::Config(format!(
                            "mailbox {}: {} login must not be empty",
                            mailbox.address, side
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Folder naming rules for the destination
    pub fn naming_convention(&self) -> NamingConvention {
        NamingConvention {
            provider_roots: self.naming.provider_roots.clone(),
            inbox: self.naming.inbox.clone(),
            delimiter: self
                .naming
                .delimiter
                .chars()
                .next()
                .unwrap_or(NamingConvention::default().delimiter),
        }
    }

    /// Mailbox pairs in configuration order
    pub fn pairs(&self) -> Vec<MailboxPair> {
        self.mailboxes
            .iter()
            .map(|mailbox| MailboxPair {
                address: mailbox.address.clone(),
                source_server: self.server.source.address(),
                dest_server: self.server.destination.address(),
                source: mailbox.source.clone(),
                destination: mailbox
                    .destination
                    .clone()
                    .unwrap_or_else(|| mailbox.source.clone()),
            })
            .collect()
    }
}

fn validate_server(section: &str, server: &ServerConfig) -> CoreResult<()> {
    if server.host.trim().is_empty() {
        return Err(CoreError::Config(format!("{}.host must not be empty", section)));
    }
    if server.port == 0 {
        return Err(CoreError::Config(format!("{}.port must not be 0", section)));
    }
    Ok(())
}
