//! Core data model types: accounts, decoded messages, bodies and attachments.

pub mod account;
pub mod message;
