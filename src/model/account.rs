//! Mailbox accounts and the credential list they are read from.
//!
//! The list is a plain text file with one `{account};{credential}` pair per
//! line. When the file is missing or holds no usable line, a single account is
//! asked for interactively.

use std::io::{BufRead, Write};
use std::path::Path;

use crate::error::{ArchiveError, Result};
use crate::i18n;

/// One mailbox to archive.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// Login, usually a full address (`bob@example.com`).
    pub id: String,
    /// Password or application password.
    pub credential: String,
}

impl Account {
    pub fn new(id: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            credential: credential.into(),
        }
    }

    /// The part of the id before `@`, used as the per-account directory name.
    pub fn local_part(&self) -> &str {
        local_part(&self.id)
    }
}

// Never print credentials, not even in debug logs.
impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("credential", &"***")
            .finish()
    }
}

/// The portion of an account id before its domain separator.
pub fn local_part(account_id: &str) -> &str {
    account_id.split('@').next().unwrap_or(account_id)
}

/// Parse the credential list format.
///
/// Blank lines are ignored. Lines without `;` are logged and skipped. The
/// credential is everything after the first `;`.
pub fn parse_account_list(text: &str) -> Vec<Account> {
    let mut accounts = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(';') {
            Some((id, credential)) if !id.trim().is_empty() => {
                accounts.push(Account::new(id.trim(), credential.trim()));
            }
            _ => {
                tracing::warn!(line = line_no + 1, "Skipping malformed credential line");
            }
        }
    }
    accounts
}

/// Load accounts from `path`.
///
/// A missing file yields an empty list; any other read failure is an error.
pub fn load_accounts(path: &Path) -> Result<Vec<Account>> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let accounts = parse_account_list(&text);
            tracing::info!(path = %path.display(), count = accounts.len(), "Loaded accounts");
            Ok(accounts)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No credential file");
            Ok(Vec::new())
        }
        Err(e) => Err(ArchiveError::Credentials(format!("{}: {e}", path.display()))),
    }
}

/// Ask for a single account on `input`, writing prompts to `output`.
pub fn prompt_account(input: &mut impl BufRead, output: &mut impl Write) -> Result<Account> {
    let id = prompt_line(input, output, i18n::prompt_email())?;
    let credential = prompt_line(input, output, i18n::prompt_password())?;
    if id.is_empty() {
        return Err(ArchiveError::Credentials(i18n::err_no_account().to_string()));
    }
    Ok(Account::new(id, credential))
}

fn prompt_line(input: &mut impl BufRead, output: &mut impl Write, prompt: &str) -> Result<String> {
    let io_err = |e: std::io::Error| ArchiveError::Credentials(e.to_string());
    write!(output, "{prompt} ").map_err(io_err)?;
    output.flush().map_err(io_err)?;
    let mut line = String::new();
    input.read_line(&mut line).map_err(io_err)?;
    Ok(line.trim().to_string())
}
