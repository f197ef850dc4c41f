//! In-memory mail store used by the engine tests

use async_trait::async_trait;
use mailshift_imap::{
    Connector, Folder, ImapError, ImapResult, MailSession, MessageFlags, ServerAddress, SEEN,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Operations recorded across every account sharing a journal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Select { account: String, folder: String },
    Create { account: String, folder: String },
    PeekText { account: String, uid: u32 },
    Append { account: String, folder: String, uid: u32, subject: String, flags: Vec<String> },
    MarkDeleted { account: String, uid: u32 },
    Expunge { account: String, folder: String },
}

pub type Journal = Arc<Mutex<Vec<Op>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Clone)]
pub struct MemoryMessage {
    pub uid: u32,
    pub raw: Vec<u8>,
    pub flags: MessageFlags,
}

impl MemoryMessage {
    fn split(&self) -> (&[u8], &[u8]) {
        match self.raw.windows(4).position(|w| w == b"\r\n\r\n") {
            Some(pos) => (&self.raw[..pos + 4], &self.raw[pos + 4..]),
            None => (&self.raw, &[]),
        }
    }

    pub fn subject(&self) -> String {
        subject_of(&self.raw)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryFolder {
    pub name: String,
    pub attributes: Vec<String>,
    pub messages: Vec<MemoryMessage>,
    uid_next: u32,
}

/// Failures to inject into an account
#[derive(Debug, Default)]
pub struct Faults {
    pub create: HashSet<String>,
    pub select: HashSet<String>,
    pub fetch_header: HashSet<u32>,
    pub drop_connection_on_fetch: HashSet<u32>,
    /// Subjects whose APPEND kills the connection
    pub drop_connection_on_append: HashSet<String>,
    /// APPEND with initial flags is refused
    pub reject_flagged_append: bool,
    /// Existing folders refused with a bare NO instead of ALREADYEXISTS
    pub plain_create_conflict: bool,
    /// Names left out of the next LIST only
    pub stale_list: HashSet<String>,
    /// SEARCH answers in descending UID order
    pub unsorted_search: bool,
    pub list: bool,
}

/// One account on one server
#[derive(Debug)]
pub struct MemoryAccount {
    pub label: String,
    pub delimiter: char,
    pub folders: Vec<MemoryFolder>,
    pub faults: Faults,
    pub list_calls: u32,
    journal: Journal,
}

pub type SharedAccount = Arc<Mutex<MemoryAccount>>;

impl MemoryAccount {
    pub fn new(label: &str, delimiter: char, journal: &Journal) -> Self {
        Self {
            label: label.to_string(),
            delimiter,
            folders: Vec::new(),
            faults: Faults::default(),
            list_calls: 0,
            journal: journal.clone(),
        }
    }

    pub fn with_folder(mut self, name: &str, attributes: &[&str]) -> Self {
        self.folders.push(MemoryFolder {
            name: name.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            messages: Vec::new(),
            uid_next: 1,
        });
        self
    }

    /// Store a message, optionally read, in an existing folder
    pub fn with_message(self, folder: &str, raw: Vec<u8>, seen: bool) -> Self {
        let flags: &[&str] = if seen { &[SEEN] } else { &[] };
        self.with_flagged_message(folder, raw, flags)
    }

    pub fn with_flagged_message(mut self, folder: &str, raw: Vec<u8>, flags: &[&str]) -> Self {
        self.folder_mut(folder)
            .expect("folder must be added before its messages")
            .store(raw, MessageFlags::from_imap_flags(flags));
        self
    }

    pub fn shared(self) -> SharedAccount {
        Arc::new(Mutex::new(self))
    }

    pub fn folder(&self, name: &str) -> Option<&MemoryFolder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn folder_names(&self) -> Vec<String> {
        self.folders.iter().map(|f| f.name.clone()).collect()
    }

    fn folder_mut(&mut self, name: &str) -> Option<&mut MemoryFolder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }

    fn record(&self, op: Op) {
        self.journal.lock().unwrap().push(op);
    }
}

impl MemoryFolder {
    fn store(&mut self, raw: Vec<u8>, flags: MessageFlags) -> u32 {
        let uid = self.uid_next;
        self.uid_next += 1;
        self.messages.push(MemoryMessage { uid, raw, flags });
        uid
    }

    fn message_mut(&mut self, uid: u32) -> ImapResult<&mut MemoryMessage> {
        self.messages
            .iter_mut()
            .find(|m| m.uid == uid)
            .ok_or(ImapError::MessageNotFound(uid))
    }

    pub fn subjects(&self) -> Vec<String> {
        self.messages.iter().map(MemoryMessage::subject).collect()
    }
}

/// Build a small RFC 5322 message
pub fn message(subject: &str) -> Vec<u8> {
    format!(
        "From: sender@example.com\r\nSubject: {}\r\nContent-Type: text/plain; charset=iso-8859-2\r\n\r\nBody of {}\r\n",
        subject, subject
    )
    .into_bytes()
}

fn subject_of(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .lines()
        .find_map(|l| l.strip_prefix("Subject: ").map(str::to_string))
        .unwrap_or_default()
}

/// Reject header blocks with lines that are neither fields nor continuations
fn header_is_valid(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let header = text.split("\r\n\r\n").next().unwrap_or_default();
    header.split("\r\n").filter(|l| !l.is_empty()).all(|line| {
        line.starts_with(' ') || line.starts_with('\t') || line.split_once(':').map_or(false, |(name, _)| !name.is_empty() && !name.contains(' '))
    })
}

pub struct MemorySession {
    account: SharedAccount,
    selected: Option<String>,
}

impl MemorySession {
    pub fn new(account: &SharedAccount) -> Self {
        Self {
            account: account.clone(),
            selected: None,
        }
    }

    fn with_selected<T>(
        &self,
        f: impl FnOnce(&mut MemoryAccount, &str) -> ImapResult<T>,
    ) -> ImapResult<T> {
        let selected = self
            .selected
            .as_deref()
            .ok_or_else(|| ImapError::ServerError("BAD no folder selected".into()))?;
        let mut account = self.account.lock().unwrap();
        f(&mut *account, selected)
    }
}

#[async_trait]
impl MailSession for MemorySession {
    async fn list_folders(&mut self) -> ImapResult<Vec<Folder>> {
        let mut account = self.account.lock().unwrap();
        account.list_calls += 1;
        if account.faults.list {
            return Err(ImapError::ServerError("NO list unavailable".into()));
        }
        let hidden = std::mem::take(&mut account.faults.stale_list);
        Ok(account
            .folders
            .iter()
            .filter(|f| !hidden.contains(&f.name))
            .map(|f| Folder::new(&f.name, Some(account.delimiter), f.attributes.clone()))
            .collect())
    }

    async fn select_folder(&mut self, name: &str) -> ImapResult<Folder> {
        let account = self.account.lock().unwrap();
        account.record(Op::Select {
            account: account.label.clone(),
            folder: name.to_string(),
        });
        if account.faults.select.contains(name) {
            return Err(ImapError::FolderNotFound(name.to_string()));
        }
        let folder = account
            .folder(name)
            .filter(|f| !f.attributes.iter().any(|a| a == "\\Noselect"))
            .ok_or_else(|| ImapError::FolderNotFound(name.to_string()))?;
        let mut info = Folder::new(name, Some(account.delimiter), Vec::new());
        info.message_count = Some(folder.messages.len() as u32);
        drop(account);

        self.selected = Some(name.to_string());
        Ok(info)
    }

    async fn create_folder(&mut self, name: &str) -> ImapResult<()> {
        let mut account = self.account.lock().unwrap();
        account.record(Op::Create {
            account: account.label.clone(),
            folder: name.to_string(),
        });
        if account.faults.create.contains(name) {
            return Err(ImapError::ServerError(format!("NO cannot create {}", name)));
        }
        if account.folder(name).is_some() {
            if account.faults.plain_create_conflict {
                return Err(ImapError::ServerError(format!("NO cannot create {}", name)));
            }
            return Err(ImapError::AlreadyExists(format!("NO [ALREADYEXISTS] {}", name)));
        }
        // superiors are created implicitly, as RFC 3501 6.3.3 suggests
        let delimiter = account.delimiter;
        let mut path = String::new();
        for (i, segment) in name.split(delimiter).enumerate() {
            if i > 0 {
                path.push(delimiter);
            }
            path.push_str(segment);
            if account.folder(&path).is_none() {
                account.folders.push(MemoryFolder {
                    name: path.clone(),
                    attributes: Vec::new(),
                    messages: Vec::new(),
                    uid_next: 1,
                });
            }
        }
        Ok(())
    }

    async fn search_uids(&mut self) -> ImapResult<Vec<u32>> {
        self.with_selected(|account, selected| {
            let folder = account.folder(selected).ok_or(ImapError::NotConnected)?;
            let mut uids: Vec<u32> = folder.messages.iter().map(|m| m.uid).collect();
            uids.sort_unstable();
            if account.faults.unsorted_search {
                uids.reverse();
            }
            Ok(uids)
        })
    }

    async fn fetch_flags(&mut self, uid: u32) -> ImapResult<MessageFlags> {
        self.with_selected(|account, selected| {
            if account.faults.drop_connection_on_fetch.contains(&uid) {
                return Err(ImapError::ConnectionLost("socket closed".into()));
            }
            let folder = account.folder_mut(selected).ok_or(ImapError::NotConnected)?;
            Ok(folder.message_mut(uid)?.flags.clone())
        })
    }

    async fn fetch_header(&mut self, uid: u32) -> ImapResult<Vec<u8>> {
        self.with_selected(|account, selected| {
            if account.faults.fetch_header.contains(&uid) {
                return Err(ImapError::ServerError("NO message unavailable".into()));
            }
            let folder = account.folder_mut(selected).ok_or(ImapError::NotConnected)?;
            Ok(folder.message_mut(uid)?.split().0.to_vec())
        })
    }

    async fn peek_text(&mut self, uid: u32) -> ImapResult<Vec<u8>> {
        self.with_selected(|account, selected| {
            account.record(Op::PeekText {
                account: account.label.clone(),
                uid,
            });
            let folder = account.folder_mut(selected).ok_or(ImapError::NotConnected)?;
            Ok(folder.message_mut(uid)?.split().1.to_vec())
        })
    }

    async fn append(&mut self, folder: &str, flags: &[&str], raw: &[u8]) -> ImapResult<()> {
        let mut account = self.account.lock().unwrap();
        let subject = subject_of(raw);
        if account.faults.drop_connection_on_append.contains(&subject) {
            return Err(ImapError::ConnectionLost("socket closed".into()));
        }
        if account.faults.reject_flagged_append && !flags.is_empty() {
            return Err(ImapError::ServerError("NO flags not permitted on APPEND".into()));
        }
        if !header_is_valid(raw) {
            return Err(ImapError::ServerError("BAD malformed message header".into()));
        }
        let label = account.label.clone();
        let target = account
            .folder_mut(folder)
            .ok_or_else(|| ImapError::ServerError(format!("NO [TRYCREATE] {}", folder)))?;
        let uid = target.store(raw.to_vec(), MessageFlags::from_imap_flags(flags));
        account.record(Op::Append {
            account: label,
            folder: folder.to_string(),
            uid,
            subject,
            flags: flags.iter().map(|f| f.to_string()).collect(),
        });
        Ok(())
    }

    async fn mark_deleted(&mut self, uid: u32) -> ImapResult<()> {
        self.with_selected(|account, selected| {
            account.record(Op::MarkDeleted {
                account: account.label.clone(),
                uid,
            });
            let folder = account.folder_mut(selected).ok_or(ImapError::NotConnected)?;
            folder.message_mut(uid)?.flags.deleted = true;
            Ok(())
        })
    }

    async fn expunge(&mut self) -> ImapResult<()> {
        self.with_selected(|account, selected| {
            account.record(Op::Expunge {
                account: account.label.clone(),
                folder: selected.to_string(),
            });
            let folder = account.folder_mut(selected).ok_or(ImapError::NotConnected)?;
            folder.messages.retain(|m| !m.flags.deleted);
            Ok(())
        })
    }

    async fn logout(&mut self) -> ImapResult<()> {
        self.selected = None;
        Ok(())
    }
}

/// Hands out sessions for registered (server, login, password) triples
#[derive(Default)]
pub struct MemoryConnector {
    accounts: HashMap<(String, String), (String, SharedAccount)>,
}

impl MemoryConnector {
    pub fn register(&mut self, server: &ServerAddress, login: &str, password: &str, account: &SharedAccount) {
        self.accounts.insert(
            (server.to_string(), login.to_string()),
            (password.to_string(), account.clone()),
        );
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn authenticate(
        &self,
        server: &ServerAddress,
        login: &str,
        password: &str,
    ) -> ImapResult<MemorySession> {
        match self.accounts.get(&(server.to_string(), login.to_string())) {
            Some((expected, account)) if expected == password => Ok(MemorySession::new(account)),
            Some(_) => Err(ImapError::AuthenticationFailed("NO [AUTHENTICATIONFAILED] invalid credentials".into())),
            None => Err(ImapError::ConnectionFailed(format!("no route to {}", server))),
        }
    }
}
