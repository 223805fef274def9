//! Payload text decoding with an ordered fallback chain.
//!
//! Body payloads carry no trustworthy charset for our purposes: they are tried
//! as UTF-8 first and, failing that, as Latin-1. Latin-1 maps every byte to a
//! code point, so the chain always terminates with a result.

use std::borrow::Cow;

/// A single candidate decoder in the fallback chain.
pub trait PayloadDecoder {
    /// Short label used in log output.
    fn name(&self) -> &'static str;

    /// Decode `bytes`, or return `None` if they are not valid in this charset.
    fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>>;
}

/// Strict UTF-8.
pub struct Utf8;

impl PayloadDecoder for Utf8 {
    fn name(&self) -> &'static str {
        "utf-8"
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        std::str::from_utf8(bytes).ok().map(Cow::Borrowed)
    }
}

/// ISO-8859-1: byte `b` is code point `U+00b`. Never fails.
pub struct Latin1;

impl PayloadDecoder for Latin1 {
    fn name(&self) -> &'static str {
        "iso-8859-1"
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        Some(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()))
    }
}

/// Charset labels that mean ISO-8859-1 (or its ASCII subset).
const LATIN1_LABELS: &[&str] = &[
    "iso-8859-1",
    "iso8859-1",
    "iso_8859-1",
    "latin1",
    "l1",
    "us-ascii",
    "ascii",
];

/// The default body chain: UTF-8, then Latin-1.
pub const BODY_CHAIN: &[&dyn PayloadDecoder] = &[&Utf8, &Latin1];

/// Decode `bytes` with the first decoder in `chain` that accepts them.
///
/// Returns an empty string only if every decoder rejects the input, which
/// cannot happen for [`BODY_CHAIN`].
pub fn decode_with_chain(bytes: &[u8], chain: &[&dyn PayloadDecoder]) -> String {
    for decoder in chain {
        if let Some(text) = decoder.decode(bytes) {
            tracing::trace!(charset = decoder.name(), len = bytes.len(), "Decoded payload");
            return text.into_owned();
        }
    }
    String::new()
}

/// Decode a body payload: UTF-8, falling back to Latin-1.
pub fn decode_payload(bytes: &[u8]) -> String {
    decode_with_chain(bytes, BODY_CHAIN)
}

/// Decode `bytes` in the charset named `label`, silently dropping undecodable bytes.
///
/// Unknown labels are treated as UTF-8. ISO-8859-1 and US-ASCII are decoded
/// as true Latin-1; `encoding_rs` would map them to windows-1252.
pub fn decode_lossy_ignore(label: &str, bytes: &[u8]) -> String {
    let label = label.trim();
    if LATIN1_LABELS.iter().any(|l| l.eq_ignore_ascii_case(label)) {
        return decode_with_chain(bytes, &[&Latin1]);
    }

    let encoding = encoding_rs::Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
        tracing::warn!(charset = label, "Unknown charset, decoding as UTF-8");
        encoding_rs::UTF_8
    });

    if encoding == encoding_rs::UTF_8 {
        return utf8_ignore(bytes);
    }

    match encoding.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text.into_owned(),
        None => {
            let (text, _) = encoding.decode_without_bom_handling(bytes);
            text.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect()
        }
    }
}

/// UTF-8 decoding that skips invalid sequences instead of replacing them.
fn utf8_ignore(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
