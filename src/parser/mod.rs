//! Message decoding: charset fallbacks, header decoding, MIME handling and file naming.

pub mod charset;
pub mod header;
pub mod mime;
pub mod sanitize;
