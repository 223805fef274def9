//! IMAP over TLS, backed by the `imap` and `native-tls` crates.

use std::net::TcpStream;

use native_tls::{TlsConnector, TlsStream};
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::model::message::MessageId;

use super::{MailConnector, MailSession};

/// The only mailbox ever archived.
const INBOX: &str = "INBOX";

/// Connects to one IMAPS server.
#[derive(Debug, Clone)]
pub struct ImapConnector {
    host: String,
    port: u16,
}

impl ImapConnector {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl MailConnector for ImapConnector {
    type Session = ImapSession;

    fn authenticate(&self, account_id: &str, credential: &str) -> Result<ImapSession> {
        let connect_err = |reason: String| ArchiveError::Connect {
            host: self.host.clone(),
            port: self.port,
            reason,
        };

        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| connect_err(e.to_string()))?;
        let client = imap::connect((self.host.as_str(), self.port), self.host.as_str(), &tls)
            .map_err(|e| connect_err(e.to_string()))?;
        debug!(host = %self.host, port = self.port, "Connected");

        let session = client
            .login(account_id, credential)
            .map_err(|(e, _client)| ArchiveError::Auth {
                account: account_id.to_string(),
                reason: e.to_string(),
            })?;
        debug!(account = account_id, "Logged in");

        Ok(ImapSession {
            account: account_id.to_string(),
            host: self.host.clone(),
            port: self.port,
            inner: session,
        })
    }
}

/// A logged-in IMAP session.
pub struct ImapSession {
    account: String,
    host: String,
    port: u16,
    inner: imap::Session<TlsStream<TcpStream>>,
}

impl MailSession for ImapSession {
    fn list_all_message_ids(&mut self) -> Result<Vec<MessageId>> {
        let list_err = |e: imap::Error| ArchiveError::List {
            account: self.account.clone(),
            reason: e.to_string(),
        };

        let mailbox = self.inner.select(INBOX).map_err(list_err)?;
        debug!(exists = mailbox.exists, "Selected {INBOX}");

        let found = self.inner.search("ALL").map_err(|e| ArchiveError::List {
            account: self.account.clone(),
            reason: e.to_string(),
        })?;

        // SEARCH answers with a set; sequence numbers restore server order.
        let mut ids: Vec<MessageId> = found.into_iter().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>> {
        let fetches = self
            .inner
            .fetch(id.to_string(), "RFC822")
            .map_err(|e| ArchiveError::Fetch {
                id,
                reason: e.to_string(),
            })?;

        fetches
            .iter()
            .find_map(|f| f.body())
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ArchiveError::Fetch {
                id,
                reason: "server returned no message body".to_string(),
            })
    }

    fn logout(&mut self) -> Result<()> {
        self.inner.logout().map_err(|e| ArchiveError::Connect {
            host: self.host.clone(),
            port: self.port,
            reason: format!("logout failed: {e}"),
        })
    }
}
