//! RFC 2047 header decoding: encoded-words in Subject, From, To and file names.

use base64::{engine::general_purpose, Engine as _};

use super::charset::decode_lossy_ignore;

/// Decode an optional header value into plain text.
///
/// An absent header decodes to the empty string.
pub fn decode_header(value: Option<&str>) -> String {
    value.map(decode_encoded_words).unwrap_or_default()
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// Each word is decoded with its declared charset; bytes that charset cannot
/// represent are dropped. Tokens that are not well-formed encoded words are
/// kept verbatim.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two encoded words is not part of the text (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some(decoded) = try_decode_one_word(after_start) {
            result.push_str(&decoded.text);
            remaining = &after_start[decoded.consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

struct DecodedWord {
    text: String,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

fn try_decode_one_word(s: &str) -> Option<DecodedWord> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];
    if charset.is_empty() || charset.contains(char::is_whitespace) {
        return None;
    }

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => decode_b_encoding(encoded_text)?,
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    // RFC 2231 language suffix: "utf-8*en"
    let charset = charset.split('*').next().unwrap_or(charset);

    Some(DecodedWord {
        text: decode_lossy_ignore(charset, &bytes),
        consumed,
    })
}

/// Decode B-encoding (base64), tolerating missing padding.
fn decode_b_encoding(input: &str) -> Option<Vec<u8>> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    general_purpose::STANDARD
        .decode(&compact)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(compact.trim_end_matches('=')))
        .ok()
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                match hex_byte(bytes[i + 1], bytes[i + 2]) {
                    Some(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    None => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

fn hex_byte(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_absent_header() {
        assert_eq!(decode_header(None), "");
    }

    #[test]
    fn test_decode_plain_header() {
        assert_eq!(decode_header(Some("Invoice Q3")), "Invoice Q3");
    }

    #[test]
    fn test_decode_base64_encoded_word() {
        let input = "=?UTF-8?B?SG9sYSBtdW5kbw==?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        let input = "=?ISO-8859-1?Q?caf=E9?=";
        assert_eq!(decode_encoded_words(input), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_encoded_words(input), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_charsets() {
        // "Счёт" in KOI8-R (Q) followed by " café" in UTF-8 (B)
        let input = "=?KOI8-R?Q?=F3=DE=A3=D4?= =?UTF-8?B?IGNhZsOp?=";
        assert_eq!(decode_encoded_words(input), "Счёт café");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Hola there");
    }

    #[test]
    fn test_decode_drops_undecodable_bytes() {
        // 0xFF is never valid UTF-8
        let input = "=?UTF-8?Q?ab=FFcd?=";
        assert_eq!(decode_encoded_words(input), "abcd");
    }

    #[test]
    fn test_decode_unpadded_base64() {
        let input = "=?utf-8?b?SG9sYQ?=";
        assert_eq!(decode_encoded_words(input), "Hola");
    }

    #[test]
    fn test_malformed_word_is_kept() {
        assert_eq!(decode_encoded_words("=?broken"), "=?broken");
        assert_eq!(decode_encoded_words("a =?UTF-8?X?abc?= b"), "a =?UTF-8?X?abc?= b");
    }

    #[test]
    fn test_decode_utf8_base64_cyrillic() {
        // Тест
        let input = "=?UTF-8?B?0KLQtdGB0YI=?=";
        assert_eq!(decode_encoded_words(input), "Тест");
    }
}
