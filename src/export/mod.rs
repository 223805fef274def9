//! Writing decoded messages to the archive tree.

pub mod archive;
