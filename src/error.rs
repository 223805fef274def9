//! Centralized error types for imapdump.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the imapdump library.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O error with the associated file path.
    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The TCP or TLS connection to the mail server could not be established.
    #[error("Cannot connect to {host}:{port}: {reason}")]
    Connect {
        host: String,
        port: u16,
        reason: String,
    },

    /// The server rejected the credentials (or client access is disabled).
    #[error("Authentication failed for '{account}': {reason}")]
    Auth { account: String, reason: String },

    /// The inbox could not be selected or enumerated.
    #[error("Cannot list messages for '{account}': {reason}")]
    List { account: String, reason: String },

    /// A single message could not be fetched.
    #[error("Cannot fetch message {id}: {reason}")]
    Fetch { id: u32, reason: String },

    /// The credential list could not be read.
    #[error("Cannot read credentials: {0}")]
    Credentials(String),

    /// The configuration file is invalid.
    #[error("Invalid configuration '{path}': {reason}")]
    Config { path: PathBuf, reason: String },
}

/// Convenience alias for `Result<T, ArchiveError>`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
