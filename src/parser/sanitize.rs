//! Turning decoded header text into safe path segments.

/// Maximum number of characters kept from a subject in a folder name.
pub const SUBJECT_MAX_CHARS: usize = 50;

/// Marker appended to a subject that was cut at [`SUBJECT_MAX_CHARS`].
const TRUNCATION_MARKER: &str = "!!!";

/// Characters that are illegal (or dangerous) in file names on common filesystems.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '\r', '\n', '\t'];

/// Normalize arbitrary text into a single filesystem path segment.
///
/// The input is percent-decoded first (so `..%2F..%2Fetc` cannot smuggle a
/// separator through), then NUL characters are dropped, forbidden characters
/// become `_`, runs of `_` are collapsed and leading/trailing `_` trimmed.
///
/// Malformed `%` escapes are kept as literal text. There is no length limit.
pub fn sanitize(raw: &str) -> String {
    let decoded = urlencoding::decode_binary(raw.as_bytes());
    let text = String::from_utf8_lossy(&decoded);

    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        let ch = match ch {
            '\0' => continue,
            c if FORBIDDEN.contains(&c) => '_',
            c => c,
        };
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }

    out.trim_matches('_').to_string()
}

/// Cut a subject to `max_chars` characters, flagging the cut with `!!!`.
///
/// Subjects of `max_chars` characters or fewer are returned unchanged.
pub fn shorten_subject(subject: &str, max_chars: usize) -> String {
    match subject.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut short = subject[..cut].trim_end().to_string();
            short.push_str(TRUNCATION_MARKER);
            short
        }
        None => subject.to_string(),
    }
}

/// Build the subject part of a message folder name.
///
/// The subject is sanitized and shortened, then spaces become `_` so the
/// folder name is a single shell word (`Invoice Q3` -> `Invoice_Q3`).
pub fn folder_subject(subject: &str) -> String {
    let safe = sanitize(subject);
    let short = shorten_subject(safe.trim_end(), SUBJECT_MAX_CHARS);

    let mut out = String::with_capacity(short.len());
    for ch in short.chars() {
        let ch = if ch == ' ' { '_' } else { ch };
        if ch == '_' && out.ends_with('_') {
            continue;
        }
        out.push(ch);
    }
    out
}
