//! Runs the migration over every configured mailbox pair

use crate::catalog::FolderCatalog;
use crate::config::{Config, MailboxPair};
use crate::folder_sync::{self, FolderFailure, SyncOutcome};
use crate::normalize::{NameCharset, NameNormalizer};
use crate::progress::{emit, MigrationEvent, ProgressSender};
use crate::transfer::{self, TransferResult};
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use mailshift_imap::{Connector, MailSession, ServerAddress};
use std::fmt;
use tracing::{debug, info};

/// What happened to one mailbox pair
#[derive(Debug, Clone)]
pub struct PairReport {
    pub mailbox: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Authentication failed on either side; nothing was touched
    pub skipped: Option<String>,
    /// A session was lost or a folder listing failed part way through
    pub aborted: Option<String>,
    /// Raw names of source folders migrated under a sanitized name
    pub degraded: Vec<String>,
    pub sync: Option<SyncOutcome>,
    /// One entry per folder whose messages were transferred
    pub folders: Vec<TransferResult>,
    /// Source folders whose messages were not transferred
    pub folder_failures: Vec<FolderFailure>,
}

impl PairReport {
    fn new(mailbox: &str) -> Self {
        let now = Utc::now();
        Self {
            mailbox: mailbox.to_string(),
            started_at: now,
            finished_at: now,
            skipped: None,
            aborted: None,
            degraded: Vec::new(),
            sync: None,
            folders: Vec::new(),
            folder_failures: Vec::new(),
        }
    }

    pub fn copied(&self) -> u32 {
        self.folders.iter().map(|f| f.copied).sum()
    }

    pub fn failed(&self) -> u32 {
        self.folders.iter().map(|f| f.failed).sum()
    }

    /// Every unit of work in the pair succeeded
    pub fn is_clean(&self) -> bool {
        self.skipped.is_none()
            && self.aborted.is_none()
            && self.folder_failures.is_empty()
            && self.failed() == 0
            && self.sync.as_ref().map_or(true, |s| s.failed.is_empty())
    }
}

/// Totals for a whole run
#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub pairs: Vec<PairReport>,
}

impl MigrationReport {
    pub fn copied(&self) -> u32 {
        self.pairs.iter().map(PairReport::copied).sum()
    }

    pub fn failed(&self) -> u32 {
        self.pairs.iter().map(PairReport::failed).sum()
    }

    pub fn skipped_pairs(&self) -> usize {
        self.pairs.iter().filter(|p| p.skipped.is_some()).count()
    }

    pub fn aborted_pairs(&self) -> usize {
        self.pairs.iter().filter(|p| p.aborted.is_some()).count()
    }

    pub fn folder_failures(&self) -> usize {
        self.pairs.iter().map(|p| p.folder_failures.len()).sum()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        write!(
            f,
            "{} mailboxes ({} skipped, {} aborted): {} messages copied, {} failed, {} folders skipped in {}s",
            self.pairs.len(),
            self.skipped_pairs(),
            self.aborted_pairs(),
            self.copied(),
            self.failed(),
            self.folder_failures(),
            elapsed.num_seconds()
        )
    }
}

/// Sequential migration engine
pub struct Migrator<C> {
    connector: C,
    pairs: Vec<MailboxPair>,
    normalizer: NameNormalizer,
    charset: NameCharset,
}

impl<C: Connector> Migrator<C> {
    pub fn new(connector: C, config: &Config) -> Self {
        Self {
            connector,
            pairs: config.pairs(),
            normalizer: NameNormalizer::new(config.naming_convention()),
            charset: config.naming.source_charset,
        }
    }

    /// Migrate every pair in configuration order
    ///
    /// Always completes; failures are recorded in the report and sent as events.
    pub async fn run(&self, progress: &ProgressSender) -> MigrationReport {
        let started_at = Utc::now();
        info!("Migrating {} mailboxes", self.pairs.len());

        let mut pairs = Vec::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            pairs.push(self.migrate_pair(pair, progress).await);
        }

        MigrationReport {
            started_at,
            finished_at: Utc::now(),
            pairs,
        }
    }

    /// Migrate a single mailbox pair with its own pair of sessions
    pub async fn migrate_pair(&self, pair: &MailboxPair, progress: &ProgressSender) -> PairReport {
        let mut report = PairReport::new(&pair.address);
        debug!("Migrating mailbox {}", pair.address);
        emit(progress, MigrationEvent::PairStarted { mailbox: pair.address.clone() });

        let mut source = match self
            .login(&pair.source_server, &pair.source.login, &pair.source.password)
            .await
        {
            Ok(session) => session,
            Err(e) => return skip(report, e, progress),
        };
        let mut dest = match self
            .login(&pair.dest_server, &pair.destination.login, &pair.destination.password)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                logout(&mut source, "source").await;
                return skip(report, e, progress);
            }
        };

        if let Err(e) = self.migrate_sessions(&mut source, &mut dest, &mut report, progress).await {
            debug!("Mailbox {} aborted: {}", pair.address, e);
            emit(
                progress,
                MigrationEvent::PairAborted {
                    mailbox: pair.address.clone(),
                    error: e.to_string(),
                },
            );
            report.aborted = Some(e.to_string());
        }

        logout(&mut source, "source").await;
        logout(&mut dest, "destination").await;

        report.finished_at = Utc::now();
        debug!(
            "Mailbox {} done: {} copied, {} failed, clean: {}",
            pair.address,
            report.copied(),
            report.failed(),
            report.is_clean()
        );
        emit(
            progress,
            MigrationEvent::PairFinished {
                mailbox: pair.address.clone(),
                copied: report.copied(),
                failed: report.failed(),
            },
        );
        report
    }

    async fn login(&self, server: &ServerAddress, login: &str, password: &str) -> CoreResult<C::Session> {
        debug!("Authenticating {} at {}", login, server);
        self.connector
            .authenticate(server, login, password)
            .await
            .map_err(|e| CoreError::Authentication {
                server: server.to_string(),
                login: login.to_string(),
                reason: e.to_string(),
            })
    }

    /// Catalog, synchronize folders, then transfer every selectable folder
    async fn migrate_sessions(
        &self,
        source: &mut C::Session,
        dest: &mut C::Session,
        report: &mut PairReport,
        progress: &ProgressSender,
    ) -> CoreResult<()> {
        let mut catalog = FolderCatalog::list(source, &self.normalizer, self.charset, progress).await?;
        report.degraded = catalog
            .iter()
            .filter(|f| f.degraded)
            .map(|f| f.raw_name.clone())
            .collect();

        let required = catalog.required_names();
        let delimiter = self.normalizer.convention().delimiter;
        let outcome = folder_sync::ensure(dest, &required, delimiter, progress).await?;

        for descriptor in catalog.iter_mut().filter(|f| f.selectable) {
            if !outcome.is_available(&descriptor.normalized_name) {
                let reason = outcome
                    .failure(&descriptor.normalized_name)
                    .map(|f| f.reason.clone())
                    .unwrap_or_else(|| format!("destination folder {} unavailable", descriptor.normalized_name));
                skip_folder(report, &descriptor.raw_name, reason, progress);
                continue;
            }

            match transfer::transfer(source, dest, descriptor, progress).await {
                Ok(result) => report.folders.push(result),
                Err(CoreError::ConnectionLost(reason)) => {
                    report.sync = Some(outcome);
                    return Err(CoreError::ConnectionLost(reason));
                }
                Err(e) => {
                    debug!("{}", e);
                    skip_folder(report, &descriptor.raw_name, e.to_string(), progress);
                }
            }
        }

        report.sync = Some(outcome);
        Ok(())
    }
}

fn skip(mut report: PairReport, error: CoreError, progress: &ProgressSender) -> PairReport {
    debug!("Skipping mailbox {}: {}", report.mailbox, error);
    emit(
        progress,
        MigrationEvent::PairSkipped {
            mailbox: report.mailbox.clone(),
            error: error.to_string(),
        },
    );
    report.skipped = Some(error.to_string());
    report.finished_at = Utc::now();
    report
}

fn skip_folder(report: &mut PairReport, folder: &str, reason: String, progress: &ProgressSender) {
    emit(
        progress,
        MigrationEvent::FolderSkipped {
            folder: folder.to_string(),
            reason: reason.clone(),
        },
    );
    report.folder_failures.push(FolderFailure {
        name: folder.to_string(),
        reason,
    });
}

async fn logout<S: MailSession + ?Sized>(session: &mut S, side: &str) {
    if let Err(e) = session.logout().await {
        debug!("Logout from {} failed: {}", side, e);
    }
}
