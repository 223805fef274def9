//! `imapdump` — archive whole IMAP inboxes to per-message folders.
//!
//! This crate provides the core library: MIME decoding with body selection
//! and attachment extraction, safe file naming, the archive writer, and the
//! per-account processor driving a mail session.

pub mod config;
pub mod error;
pub mod export;
pub mod i18n;
pub mod model;
pub mod parser;
pub mod processor;
pub mod session;
