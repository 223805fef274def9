//! Per-account orchestration: log in, list the inbox, fetch, decode and
//! archive every message in listing order.
//!
//! Failures that concern a whole account (connection, login, listing) are
//! reported to the [`ProgressObserver`] and end that account only. Failures
//! that concern one message are logged, counted and skipped.

use tracing::{debug, error, info, warn};

use crate::error::ArchiveError;
use crate::export::archive::ArchiveWriter;
use crate::model::account::{local_part, Account};
use crate::model::message::MessageId;
use crate::parser::mime::decode_message;
use crate::session::{MailConnector, MailSession};

/// Where the processor is in handling the current account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Idle,
    Connecting,
    Authenticated,
    Listing,
    ProcessingMessage { ordinal: u32 },
    Done,
    AuthFailed,
    ListFailed,
}

/// How an account ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Outcome {
    #[default]
    Completed,
    AuthFailed,
    ListFailed,
}

/// Counters for one processed account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountReport {
    pub account: String,
    pub outcome: Outcome,
    /// Messages the server listed.
    pub listed: usize,
    /// Messages whose folder and files were fully written.
    pub archived: usize,
    /// Messages that could not be fetched or written.
    pub failed: usize,
    /// Attachment files written.
    pub attachments: usize,
    pub bytes_written: u64,
}

impl AccountReport {
    fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            ..Default::default()
        }
    }
}

/// Receives progress and diagnostics. Every method defaults to doing nothing.
pub trait ProgressObserver {
    /// The inbox was listed with `count` messages.
    fn listed(&mut self, _account: &str, _count: usize) {}

    /// One listed message was handled (successfully or not).
    fn message_done(&mut self, _account: &str, _id: MessageId) {}

    /// Connecting or logging in failed; the account is skipped.
    fn auth_failed(&mut self, _account: &str, _error: &ArchiveError) {}

    /// The inbox could not be listed; the account is skipped.
    fn list_failed(&mut self, _account: &str, _error: &ArchiveError) {}

    /// Every listed message was handled.
    fn finished(&mut self, _report: &AccountReport) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct SilentObserver;

impl ProgressObserver for SilentObserver {}

/// Archives accounts one after another through a [`MailConnector`].
pub struct AccountProcessor<C, O> {
    connector: C,
    writer: ArchiveWriter,
    observer: O,
    state: AccountState,
    /// Ordinal for the next archived message of the current account.
    next_ordinal: u32,
}

impl<C: MailConnector, O: ProgressObserver> AccountProcessor<C, O> {
    pub fn new(connector: C, writer: ArchiveWriter, observer: O) -> Self {
        Self {
            connector,
            writer,
            observer,
            state: AccountState::Idle,
            next_ordinal: 1,
        }
    }

    pub fn state(&self) -> AccountState {
        self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Process every account in order; one account's failure never stops the batch.
    pub fn process_all(&mut self, accounts: &[Account]) -> Vec<AccountReport> {
        accounts
            .iter()
            .map(|a| self.process(&a.id, &a.credential))
            .collect()
    }

    /// Archive the whole inbox of one account.
    pub fn process(&mut self, account_id: &str, credential: &str) -> AccountReport {
        let mut report = AccountReport::new(account_id);
        self.next_ordinal = 1;

        self.transition(AccountState::Connecting);
        let mut session = match self.connector.authenticate(account_id, credential) {
            Ok(session) => session,
            Err(e) => {
                self.transition(AccountState::AuthFailed);
                warn!(account = account_id, error = %e, "Authentication failed");
                self.observer.auth_failed(account_id, &e);
                report.outcome = Outcome::AuthFailed;
                return report;
            }
        };
        self.transition(AccountState::Authenticated);

        self.transition(AccountState::Listing);
        let ids = match session.list_all_message_ids() {
            Ok(ids) => ids,
            Err(e) => {
                self.transition(AccountState::ListFailed);
                warn!(account = account_id, error = %e, "Listing failed");
                self.observer.list_failed(account_id, &e);
                close(&mut session, account_id);
                report.outcome = Outcome::ListFailed;
                return report;
            }
        };

        report.listed = ids.len();
        self.observer.listed(account_id, ids.len());

        let local = local_part(account_id);
        for id in ids {
            self.archive_one(&mut session, local, id, &mut report);
            self.observer.message_done(account_id, id);
        }

        close(&mut session, account_id);
        self.transition(AccountState::Done);
        info!(
            account = account_id,
            archived = report.archived,
            failed = report.failed,
            "Account done"
        );
        self.observer.finished(&report);
        report
    }

    fn archive_one(
        &mut self,
        session: &mut C::Session,
        local: &str,
        id: MessageId,
        report: &mut AccountReport,
    ) {
        let raw = match session.fetch_raw(id) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(id, error = %e, "Skipping message");
                report.failed += 1;
                return;
            }
        };

        let ordinal = self.next_ordinal;
        self.transition(AccountState::ProcessingMessage { ordinal });

        let decoded = decode_message(&raw);
        let written = self.writer.write(local, ordinal, &decoded);
        // The ordinal is spent even if writing failed part-way.
        self.next_ordinal += 1;

        match written {
            Ok(archived) => {
                report.archived += 1;
                report.attachments += archived.attachment_paths.len();
                report.bytes_written += archived.bytes_written;
            }
            Err(e) => {
                error!(id, ordinal, error = %e, "Failed to archive message, partial output left on disk");
                report.failed += 1;
            }
        }
    }

    fn transition(&mut self, next: AccountState) {
        debug!(from = ?self.state, to = ?next, "Account state");
        self.state = next;
    }
}

fn close(session: &mut impl MailSession, account_id: &str) {
    if let Err(e) = session.logout() {
        debug!(account = account_id, error = %e, "Logout failed");
    }
}
