//! A mailbox made of local `.eml` files (RFC 5322 messages, optionally with
//! an MBOX `From ` line in front).
//!
//! Message ids are 1-based positions in the file list, so files are archived
//! in exactly the order given.

use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, Result};
use crate::model::message::MessageId;

use super::{MailConnector, MailSession};

/// Hands out sessions over a fixed list of files. Credentials are ignored.
#[derive(Debug, Clone)]
pub struct EmlConnector {
    files: Vec<PathBuf>,
}

impl EmlConnector {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Expand `paths`: files are kept as given, directories contribute their
    /// `*.eml` entries sorted by name.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                let mut found: Vec<PathBuf> = std::fs::read_dir(path)
                    .map_err(|e| ArchiveError::io(path, e))?
                    .filter_map(|entry| entry.ok().map(|e| e.path()))
                    .filter(|p| is_eml(p))
                    .collect();
                found.sort();
                files.extend(found);
            } else {
                files.push(path.clone());
            }
        }
        Ok(Self::new(files))
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl MailConnector for EmlConnector {
    type Session = EmlSession;

    fn authenticate(&self, _account_id: &str, _credential: &str) -> Result<EmlSession> {
        Ok(EmlSession {
            files: self.files.clone(),
        })
    }
}

/// Session over local files.
#[derive(Debug)]
pub struct EmlSession {
    files: Vec<PathBuf>,
}

impl MailSession for EmlSession {
    fn list_all_message_ids(&mut self) -> Result<Vec<MessageId>> {
        Ok((1..=self.files.len() as MessageId).collect())
    }

    fn fetch_raw(&mut self, id: MessageId) -> Result<Vec<u8>> {
        let path = id
            .checked_sub(1)
            .and_then(|i| self.files.get(i as usize))
            .ok_or_else(|| ArchiveError::Fetch {
                id,
                reason: "no such message".to_string(),
            })?;

        let data = std::fs::read(path).map_err(|e| ArchiveError::Fetch {
            id,
            reason: format!("{}: {e}", path.display()),
        })?;

        Ok(skip_from_line(&data).to_vec())
    }
}

fn is_eml(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("eml"))
}

/// Skip a UTF-8 BOM and the `From ` separator line of MBOX exports.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
