//! IMAP client implementation

use crate::{
    Connector, Folder, ImapError, ImapResult, MailSession, MessageFlags, ServerAddress,
    DELETED,
};
use async_imap::types::{Fetch, Flag};
use async_imap::Session;
use async_native_tls::TlsStream;
use async_std::net::TcpStream;
use async_trait::async_trait;
use futures::TryStreamExt;
use imap_proto::types::NameAttribute;
use tracing::{debug, info};

// Type alias for our TLS stream
type ImapStream = TlsStream<TcpStream>;

/// IMAP client backed by async-imap over implicit TLS
pub struct ImapClient {
    session: Option<Session<ImapStream>>,
    host: String,
    port: u16,
}

impl ImapClient {
    /// Create a new IMAP client
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            session: None,
            host: host.into(),
            port,
        }
    }

    /// Open the TLS connection and greet the server
    async fn connect(&self) -> ImapResult<async_imap::Client<ImapStream>> {
        info!("Connecting to {}:{}", self.host, self.port);

        let tcp_stream = TcpStream::connect(format!("{}:{}", self.host, self.port))
            .await
            .map_err(|e| ImapError::ConnectionFailed(e.to_string()))?;

        let tls_connector = async_native_tls::TlsConnector::new();
        let tls_stream = tls_connector
            .connect(&self.host, tcp_stream)
            .await
            .map_err(|e| ImapError::TlsError(e.to_string()))?;

        debug!("TLS connection established");

        Ok(async_imap::Client::new(tls_stream))
    }

    /// Connect and authenticate using LOGIN (username/password)
    pub async fn authenticate_login(&mut self, username: &str, password: &str) -> ImapResult<()> {
        let client = self.connect().await?;

        info!("Authenticating with LOGIN for {}", username);

        let session = client
            .login(username, password)
            .await
            .map_err(|(e, _)| ImapError::AuthenticationFailed(e.to_string()))?;

        self.session = Some(session);
        info!("LOGIN authentication successful");
        Ok(())
    }

    /// Get the session, returning an error if not connected
    fn session_mut(&mut self) -> ImapResult<&mut Session<ImapStream>> {
        self.session.as_mut().ok_or(ImapError::NotConnected)
    }

    /// Run a UID FETCH for a single message and return its response
    async fn fetch_one(&mut self, uid: u32, query: &str) -> ImapResult<Fetch> {
        let session = self.session_mut()?;

        let fetches: Vec<Fetch> = session
            .uid_fetch(uid.to_string(), query)
            .await
            .map_err(ImapError::from_session)?
            .try_collect()
            .await
            .map_err(ImapError::from_session)?;

        fetches
            .into_iter()
            .find(|f| f.uid.map_or(true, |u| u == uid))
            .ok_or(ImapError::MessageNotFound(uid))
    }

    async fn store(&mut self, uid: u32, query: String) -> ImapResult<()> {
        let session = self.session_mut()?;

        session
            .uid_store(uid.to_string(), query)
            .await
            .map_err(ImapError::from_session)?
            .try_collect::<Vec<_>>()
            .await
            .map_err(ImapError::from_session)?;

        Ok(())
    }
}

#[async_trait]
impl MailSession for ImapClient {
    async fn list_folders(&mut self) -> ImapResult<Vec<Folder>> {
        let session = self.session_mut()?;

        let names: Vec<_> = session
            .list(Some(""), Some("*"))
            .await
            .map_err(ImapError::from_session)?
            .try_collect()
            .await
            .map_err(ImapError::from_session)?;

        let folders: Vec<Folder> = names
            .iter()
            .map(|mailbox| {
                let delimiter = mailbox.delimiter().and_then(|d| d.chars().next());
                let attributes = mailbox.attributes().iter().map(attribute_name).collect();
                Folder::new(mailbox.name(), delimiter, attributes)
            })
            .collect();

        debug!("Found {} folders", folders.len());
        Ok(folders)
    }

    async fn select_folder(&mut self, name: &str) -> ImapResult<Folder> {
        let session = self.session_mut()?;

        let mailbox = session.select(name).await.map_err(|e| match e {
            async_imap::error::Error::No(msg) | async_imap::error::Error::Bad(msg) => {
                ImapError::FolderNotFound(format!("{}: {}", name, msg))
            }
            other => ImapError::from_session(other),
        })?;

        debug!("Selected folder {} with {} messages", name, mailbox.exists);

        Ok(Folder {
            name: name.to_string(),
            delimiter: None,
            attributes: Vec::new(),
            message_count: Some(mailbox.exists),
        })
    }

    async fn create_folder(&mut self, name: &str) -> ImapResult<()> {
        let session = self.session_mut()?;
        session.create(name).await.map_err(ImapError::from_session)?;
        debug!("Created folder {}", name);
        Ok(())
    }

    async fn search_uids(&mut self) -> ImapResult<Vec<u32>> {
        let session = self.session_mut()?;

        let found = session
            .uid_search("ALL")
            .await
            .map_err(ImapError::from_session)?;

        let mut uids: Vec<u32> = found.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    async fn fetch_flags(&mut self, uid: u32) -> ImapResult<MessageFlags> {
        let fetch = self.fetch_one(uid, "FLAGS").await?;
        let names: Vec<String> = fetch.flags().map(|f| flag_name(&f)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        Ok(MessageFlags::from_imap_flags(&refs))
    }

    async fn fetch_header(&mut self, uid: u32) -> ImapResult<Vec<u8>> {
        let fetch = self.fetch_one(uid, "BODY.PEEK[HEADER]").await?;
        fetch
            .header()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ImapError::ParseError(format!("no header section for UID {}", uid)))
    }

    async fn peek_text(&mut self, uid: u32) -> ImapResult<Vec<u8>> {
        let fetch = self.fetch_one(uid, "BODY.PEEK[TEXT]").await?;
        // An empty body comes back as a zero-length literal, or NIL on some servers
        Ok(fetch.text().map(<[u8]>::to_vec).unwrap_or_default())
    }

    async fn append(&mut self, folder: &str, flags: &[&str], raw: &[u8]) -> ImapResult<()> {
        let flag_list = append_flags(flags);
        let session = self.session_mut()?;

        session
            .append(folder, flag_list.as_deref(), None, raw)
            .await
            .map_err(ImapError::from_session)?;

        debug!("Appended {} bytes to {}", raw.len(), folder);
        Ok(())
    }

    async fn mark_deleted(&mut self, uid: u32) -> ImapResult<()> {
        self.store(uid, format!("+FLAGS ({})", DELETED)).await
    }

    async fn expunge(&mut self) -> ImapResult<()> {
        let session = self.session_mut()?;

        let removed = session
            .expunge()
            .await
            .map_err(ImapError::from_session)?
            .try_collect::<Vec<_>>()
            .await
            .map_err(ImapError::from_session)?;

        debug!("Expunged {} messages", removed.len());
        Ok(())
    }

    async fn logout(&mut self) -> ImapResult<()> {
        if let Some(mut session) = self.session.take() {
            session.logout().await.map_err(ImapError::from_session)?;
        }
        Ok(())
    }
}

/// Opens [`ImapClient`] sessions with username/password LOGIN
#[derive(Debug, Clone, Default)]
pub struct ImapConnector;

#[async_trait]
impl Connector for ImapConnector {
    type Session = ImapClient;

    async fn authenticate(
        &self,
        server: &ServerAddress,
        login: &str,
        password: &str,
    ) -> ImapResult<ImapClient> {
        let mut client = ImapClient::new(&server.host, server.port);
        client.authenticate_login(login, password).await?;
        Ok(client)
    }
}

/// Parenthesized flag list for APPEND, or none at all
fn append_flags(flags: &[&str]) -> Option<String> {
    if flags.is_empty() {
        None
    } else {
        Some(format!("({})", flags.join(" ")))
    }
}

fn attribute_name(attr: &NameAttribute<'_>) -> String {
    match attr {
        NameAttribute::NoInferiors => "\\Noinferiors".to_string(),
        NameAttribute::NoSelect => "\\Noselect".to_string(),
        NameAttribute::Marked => "\\Marked".to_string(),
        NameAttribute::Unmarked => "\\Unmarked".to_string(),
        NameAttribute::All => "\\All".to_string(),
        NameAttribute::Archive => "\\Archive".to_string(),
        NameAttribute::Drafts => "\\Drafts".to_string(),
        NameAttribute::Flagged => "\\Flagged".to_string(),
        NameAttribute::Junk => "\\Junk".to_string(),
        NameAttribute::Sent => "\\Sent".to_string(),
        NameAttribute::Trash => "\\Trash".to_string(),
        NameAttribute::Extension(name) => name.to_string(),
        #[allow(unreachable_patterns)]
        other => format!("{:?}", other),
    }
}

fn flag_name(flag: &Flag<'_>) -> String {
    match flag {
        Flag::Seen => "\\Seen".to_string(),
        Flag::Answered => "\\Answered".to_string(),
        Flag::Flagged => "\\Flagged".to_string(),
        Flag::Deleted => "\\Deleted".to_string(),
        Flag::Draft => "\\Draft".to_string(),
        Flag::Recent => "\\Recent".to_string(),
        Flag::MayCreate => "\\*".to_string(),
        Flag::Custom(name) => name.to_string(),
        #[allow(unreachable_patterns)]
        other => format!("{:?}", other),
    }
}
