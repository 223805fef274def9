//! Mail sessions: where raw messages come from.
//!
//! The archive pipeline only needs three capabilities: authenticate, list
//! every message id, fetch one message's raw bytes. [`imap`] provides them
//! over IMAPS; [`eml`] provides them over a list of local `.eml` files.

pub mod eml;
pub mod imap;

use crate::error::Result;
use crate::model::message::MessageId;

/// Opens authenticated sessions.
pub trait MailConnector {
    type Session: MailSession;

    /// Connect and log in. Fails with `Connect` or `Auth`.
    fn authenticate(&self, account_id: &str, credential: &str) -> Result<Self::Session>;
}

/// An authenticated view of one inbox.
pub trait MailSession {
    /// Ids of every message in the inbox, in listing order. Fails with `List`.
    fn list_all_message_ids(&mut self) -> Result<Vec<MessageId>>;

    /// Raw RFC 5322 bytes of one message. Fails with `Fetch`.
    fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>>;

    /// End the session. The default does nothing.
    fn logout(&mut self) -> Result<()> {
        Ok(())
    }
}
