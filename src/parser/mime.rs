//! MIME message decoding: part tree, body selection and attachment listing.

use mailparse::{DispositionType, MailHeader, MailHeaderMap, ParsedMail};
use tracing::{debug, warn};

use crate::model::message::{Attachment, BodyKind, BodyPart, DecodedHeaders, DecodedMessage};

use super::charset::decode_payload;
use super::header::decode_header;
use super::sanitize::{folder_subject, sanitize};

/// Maximum depth for recursive multipart parsing (to prevent stack overflow on adversarial input).
const MAX_DEPTH: usize = 32;

/// Content type of a forwarded message carried as a part.
const EMBEDDED_MESSAGE: &str = "message/rfc822";

/// How a part declares itself through `Content-Disposition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
    Other,
}

/// One node of a message's MIME structure.
///
/// Leaves hold their transfer-decoded payload; `multipart/*` nodes hold
/// their children in document order and an empty payload. A
/// `message/rfc822` part keeps its payload and also holds the parsed
/// forwarded message as its only child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePart {
    /// Lowercase `type/subtype`.
    pub mimetype: String,
    /// `None` when the part has no `Content-Disposition` header at all.
    pub disposition: Option<Disposition>,
    /// Undecoded file name (`filename` disposition parameter, else `name`).
    pub file_name: Option<String>,
    pub payload: Vec<u8>,
    pub children: Vec<MimePart>,
}

impl MimePart {
    /// Build the tree from a `mailparse` parse result.
    pub fn from_parsed(mail: &ParsedMail<'_>) -> Self {
        Self::from_parsed_at(mail, 0)
    }

    fn from_parsed_at(mail: &ParsedMail<'_>, depth: usize) -> Self {
        let mimetype = mail.ctype.mimetype.to_ascii_lowercase();

        let disposition = mail
            .headers
            .get_first_header("Content-Disposition")
            .map(|_| match mail.get_content_disposition().disposition {
                DispositionType::Inline => Disposition::Inline,
                DispositionType::Attachment => Disposition::Attachment,
                _ => Disposition::Other,
            });

        let file_name = mail
            .get_content_disposition()
            .params
            .get("filename")
            .or_else(|| mail.ctype.params.get("name"))
            .cloned();

        let is_multipart = mimetype.starts_with("multipart/");
        let is_embedded = mimetype == EMBEDDED_MESSAGE;

        let payload = if is_multipart {
            Vec::new()
        } else {
            mail.get_body_raw().unwrap_or_else(|e| {
                warn!(mimetype = %mimetype, error = %e, "Undecodable payload, treating as empty");
                Vec::new()
            })
        };

        let children = if (is_multipart || is_embedded) && depth >= MAX_DEPTH {
            warn!(depth, "MIME nesting too deep, ignoring sub-parts");
            Vec::new()
        } else if is_multipart {
            mail.subparts
                .iter()
                .map(|sub| Self::from_parsed_at(sub, depth + 1))
                .collect()
        } else if is_embedded {
            // mailparse leaves forwarded messages unsplit.
            match mailparse::parse_mail(&payload) {
                Ok(inner) => vec![Self::from_parsed_at(&inner, depth + 1)],
                Err(e) => {
                    debug!(error = %e, "Embedded message does not parse, keeping it opaque");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Self {
            mimetype,
            disposition,
            file_name,
            payload,
            children,
        }
    }

    /// `true` for `multipart/*` containers.
    pub fn is_multipart(&self) -> bool {
        self.mimetype.starts_with("multipart/")
    }

    /// Text part that is not explicitly marked as an attachment.
    pub fn is_body_candidate(&self) -> bool {
        matches!(self.mimetype.as_str(), "text/plain" | "text/html")
            && self.disposition != Some(Disposition::Attachment)
    }

    /// Non-container part that declares any disposition (attachment or inline).
    pub fn is_attachment_candidate(&self) -> bool {
        !self.is_multipart() && self.disposition.is_some()
    }

    /// All parts, depth-first in document order, starting with `self`.
    pub fn walk(&self) -> Vec<&MimePart> {
        let mut order = Vec::new();
        let mut stack = vec![self];
        while let Some(part) = stack.pop() {
            order.push(part);
            // Reverse so the first child is popped first.
            stack.extend(part.children.iter().rev());
        }
        order
    }
}

/// Decode a complete raw message (headers + body).
///
/// Never fails: a message `mailparse` rejects outright becomes a plain-text
/// body holding the whole input, with empty headers and no attachments.
pub fn decode_message(raw: &[u8]) -> DecodedMessage {
    let parsed = match mailparse::parse_mail(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, len = raw.len(), "Unparseable message, keeping raw text");
            return unparsed_message(raw);
        }
    };

    let headers = DecodedHeaders {
        subject: decode_header(raw_header(&parsed.headers, "Subject").as_deref()),
        from: decode_header(raw_header(&parsed.headers, "From").as_deref()),
        to: decode_header(raw_header(&parsed.headers, "To").as_deref()),
    };

    let tree = MimePart::from_parsed(&parsed);
    let body = select_body(&tree);
    let attachments = collect_attachments(&tree);

    debug!(
        subject = %headers.subject,
        body = ?body.kind,
        attachments = attachments.len(),
        "Decoded message"
    );

    DecodedMessage {
        safe_subject: folder_subject(&headers.subject),
        headers,
        body,
        attachments,
    }
}

/// Pick the single body that represents a message.
///
/// A non-multipart root is its own body. Otherwise the first body candidate
/// in document order is kept, unless an HTML candidate turns up: the first
/// HTML candidate wins outright and ends the scan. No candidate at all gives
/// an empty plain-text body.
pub fn select_body(root: &MimePart) -> BodyPart {
    if !root.is_multipart() {
        return BodyPart {
            kind: BodyKind::from_mimetype(&root.mimetype),
            text: decode_payload(&root.payload),
        };
    }

    let mut best: Option<BodyPart> = None;
    for part in root.walk() {
        if !part.is_body_candidate() {
            continue;
        }
        let kind = BodyKind::from_mimetype(&part.mimetype);
        if kind == BodyKind::Html {
            return BodyPart {
                kind,
                text: decode_payload(&part.payload),
            };
        }
        if best.is_none() {
            best = Some(BodyPart {
                kind,
                text: decode_payload(&part.payload),
            });
        }
    }

    best.unwrap_or_default()
}

/// Every non-container part with a disposition header and a usable file name.
pub fn collect_attachments(root: &MimePart) -> Vec<Attachment> {
    let mut attachments = Vec::new();
    for part in root.walk() {
        if !part.is_attachment_candidate() {
            continue;
        }
        let file_name = sanitize(&decode_header(part.file_name.as_deref()));
        // "." and ".." would name the files directory or the message folder.
        if file_name.is_empty() || file_name == "." || file_name == ".." {
            debug!(mimetype = %part.mimetype, "Skipping attachment without a file name");
            continue;
        }
        attachments.push(Attachment {
            file_name,
            content_type: part.mimetype.clone(),
            bytes: part.payload.clone(),
        });
    }
    attachments
}

/// First value of header `name`, as text with folding removed.
fn raw_header(headers: &[MailHeader<'_>], name: &str) -> Option<String> {
    headers
        .get_first_header(name)
        .map(|h| unfold(&decode_payload(h.get_value_raw())))
}

/// Undo RFC 5322 folding: a line break followed by whitespace is just the whitespace.
fn unfold(value: &str) -> String {
    value.replace(['\r', '\n'], "").trim().to_string()
}

fn unparsed_message(raw: &[u8]) -> DecodedMessage {
    DecodedMessage {
        headers: DecodedHeaders::default(),
        safe_subject: String::new(),
        body: BodyPart {
            kind: BodyKind::PlainText,
            text: decode_payload(raw),
        },
        attachments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(mimetype: &str, disposition: Option<Disposition>, payload: &[u8]) -> MimePart {
        MimePart {
            mimetype: mimetype.to_string(),
            disposition,
            file_name: None,
            payload: payload.to_vec(),
            children: Vec::new(),
        }
    }

    fn container(children: Vec<MimePart>) -> MimePart {
        MimePart {
            mimetype: "multipart/mixed".to_string(),
            disposition: None,
            file_name: None,
            payload: Vec::new(),
            children,
        }
    }

    #[test]
    fn test_walk_is_depth_first_document_order() {
        let tree = container(vec![
            container(vec![leaf("text/plain", None, b"a"), leaf("text/html", None, b"b")]),
            leaf("image/png", None, b"c"),
        ]);
        let order: Vec<&str> = tree.walk().iter().map(|p| p.mimetype.as_str()).collect();
        assert_eq!(
            order,
            ["multipart/mixed", "multipart/mixed", "text/plain", "text/html", "image/png"]
        );
    }

    #[test]
    fn test_select_body_prefers_html() {
        let tree = container(vec![
            leaf("text/plain", None, b"plain"),
            leaf("text/html", None, b"<b>html</b>"),
        ]);
        let body = select_body(&tree);
        assert_eq!(body.kind, BodyKind::Html);
        assert_eq!(body.text, "<b>html</b>");
    }

    #[test]
    fn test_select_body_first_html_wins() {
        let tree = container(vec![
            leaf("text/html", None, b""),
            leaf("text/plain", None, b"plain"),
            leaf("text/html", None, b"second"),
        ]);
        let body = select_body(&tree);
        assert_eq!(body.kind, BodyKind::Html);
        assert_eq!(body.text, "");
    }

    #[test]
    fn test_select_body_first_plain_kept() {
        let tree = container(vec![
            leaf("text/plain", None, b"one"),
            leaf("text/plain", None, b"two"),
        ]);
        let body = select_body(&tree);
        assert_eq!(body.kind, BodyKind::PlainText);
        assert_eq!(body.text, "one");
    }

    #[test]
    fn test_select_body_skips_attachment_disposition() {
        let tree = container(vec![
            leaf("text/plain", None, b"body"),
            leaf("text/html", Some(Disposition::Attachment), b"<p>file</p>"),
        ]);
        let body = select_body(&tree);
        assert_eq!(body.kind, BodyKind::PlainText);
        assert_eq!(body.text, "body");
    }

    #[test]
    fn test_select_body_none_is_empty() {
        let tree = container(vec![leaf("image/png", Some(Disposition::Attachment), b"x")]);
        assert_eq!(select_body(&tree), BodyPart::default());
    }

    #[test]
    fn test_collect_attachments_skips_nameless() {
        let mut named = leaf("application/pdf", Some(Disposition::Attachment), b"%PDF");
        named.file_name = Some("report.pdf".into());
        let nameless = leaf("application/pdf", Some(Disposition::Attachment), b"%PDF");
        let mut unsafe_name = leaf("text/plain", Some(Disposition::Inline), b"x");
        unsafe_name.file_name = Some("???".into());
        // Decodes to two invalid UTF-8 bytes, which are dropped.
        let mut empty_word = leaf("application/pdf", Some(Disposition::Attachment), b"%PDF");
        empty_word.file_name = Some("=?UTF-8?B?//8=?=".into());

        let attachments = collect_attachments(&container(vec![
            named,
            nameless,
            unsafe_name,
            empty_word,
        ]));
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].file_name, "report.pdf");
        assert_eq!(attachments[0].content_type, "application/pdf");
        assert_eq!(attachments[0].bytes, b"%PDF");
    }

    #[test]
    fn test_collect_attachments_skips_dot_names() {
        let named = |name: &str| {
            let mut part = leaf("application/octet-stream", Some(Disposition::Attachment), b"x");
            part.file_name = Some(name.to_string());
            part
        };
        let tree = container(vec![named("%2E%2E"), named(".."), named("."), named("real.pdf")]);

        let names: Vec<String> = collect_attachments(&tree)
            .into_iter()
            .map(|a| a.file_name)
            .collect();
        assert_eq!(names, ["real.pdf"]);
    }

    #[test]
    fn test_decode_walks_forwarded_message() {
        let raw = b"Subject: Fwd: report\n\
Content-Type: multipart/mixed; boundary=outer\n\
\n\
--outer\n\
Content-Type: text/plain\n\
\n\
see below\n\
--outer\n\
Content-Type: message/rfc822\n\
\n\
Subject: report\n\
Content-Type: application/pdf\n\
Content-Disposition: attachment; filename=\"nested.pdf\"\n\
\n\
%PDF\n\
--outer--\n";
        let msg = decode_message(raw);
        assert_eq!(msg.body.text.trim_end(), "see below");
        let names: Vec<&str> = msg.attachments.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, ["nested.pdf"]);
        assert_eq!(msg.attachments[0].bytes.trim_ascii_end(), b"%PDF");
    }

    #[test]
    fn test_forwarded_message_with_disposition_is_also_saved() {
        let raw = b"Subject: Fwd\n\
Content-Type: multipart/mixed; boundary=b\n\
\n\
--b\n\
Content-Type: message/rfc822\n\
Content-Disposition: attachment; filename=\"original.eml\"\n\
\n\
Subject: inner\n\
Content-Type: text/plain\n\
\n\
inner text\n\
--b--\n";
        let msg = decode_message(raw);
        let names: Vec<&str> = msg.attachments.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, ["original.eml"]);
        // The forwarded text is the only body candidate.
        assert_eq!(msg.body.text.trim_end(), "inner text");
    }

    #[test]
    fn test_decode_multipart_alternative() {
        let raw = b"From: Alice <alice@example.com>\r\n\
To: bob@example.com\r\n\
Subject: Hello\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"XX\"\r\n\
\r\n\
--XX\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
plain text\r\n\
--XX\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>html text</p>\r\n\
--XX--\r\n";
        let msg = decode_message(raw);
        assert_eq!(msg.headers.subject, "Hello");
        assert_eq!(msg.headers.from, "Alice <alice@example.com>");
        assert_eq!(msg.headers.to, "bob@example.com");
        assert_eq!(msg.body.kind, BodyKind::Html);
        assert!(msg.body.text.contains("<p>html text</p>"));
        assert!(msg.attachments.is_empty());
    }

    #[test]
    fn test_decode_plain_only_multipart() {
        let raw = b"Subject: Only plain\n\
Content-Type: multipart/mixed; boundary=b1\n\
\n\
--b1\n\
Content-Type: text/plain\n\
\n\
just text\n\
--b1--\n";
        let msg = decode_message(raw);
        assert_eq!(msg.body.kind, BodyKind::PlainText);
        assert_eq!(msg.body.kind.extension(), "txt");
        assert!(msg.body.text.starts_with("just text"));
    }

    #[test]
    fn test_decode_single_part_html() {
        let raw = b"Subject: Page\nContent-Type: text/html\n\n<h1>Hi</h1>\n";
        let msg = decode_message(raw);
        assert_eq!(msg.body.kind, BodyKind::Html);
        assert!(msg.body.text.starts_with("<h1>Hi</h1>"));
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let raw = b"Subject: Menu\nContent-Type: text/plain; charset=iso-8859-1\nContent-Transfer-Encoding: 8bit\n\ncaf\xe9 cr\xe8me\n";
        let msg = decode_message(raw);
        assert!(msg.body.text.starts_with("café crème"), "{:?}", msg.body.text);
    }

    #[test]
    fn test_decode_encoded_subject_and_folding() {
        let raw = b"Subject: =?UTF-8?B?0KLQtdGB0YI=?=\n =?UTF-8?Q?_=D0=BF=D0=B8=D1=81=D1=8C=D0=BC=D0=B0?=\n\nbody\n";
        let msg = decode_message(raw);
        assert_eq!(msg.headers.subject, "Тест письма");
        assert_eq!(msg.safe_subject, "Тест_письма");
    }

    #[test]
    fn test_decode_attachments() {
        let raw = b"Subject: Files\n\
Content-Type: multipart/mixed; boundary=zz\n\
\n\
--zz\n\
Content-Type: text/plain\n\
\n\
see attached\n\
--zz\n\
Content-Type: application/octet-stream\n\
Content-Disposition: attachment; filename=\"a:b.bin\"\n\
Content-Transfer-Encoding: base64\n\
\n\
AAECAw==\n\
--zz\n\
Content-Type: image/png\n\
Content-Disposition: inline; filename=\"logo.png\"\n\
\n\
PNG\n\
--zz\n\
Content-Type: application/octet-stream\n\
Content-Disposition: attachment\n\
\n\
nameless\n\
--zz--\n";
        let msg = decode_message(raw);
        assert_eq!(msg.body.text.trim_end(), "see attached");
        let names: Vec<&str> = msg.attachments.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(names, ["a_b.bin", "logo.png"]);
        assert_eq!(msg.attachments[0].bytes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_decode_missing_headers() {
        let msg = decode_message(b"\nbody only\n");
        assert_eq!(msg.headers, DecodedHeaders::default());
        assert_eq!(msg.safe_subject, "");
        assert!(msg.body.text.contains("body only"));
    }

    #[test]
    fn test_unparsed_message_keeps_text() {
        let msg = unparsed_message(b"raw \xff bytes");
        assert_eq!(msg.body.text, "raw \u{ff} bytes");
        assert!(msg.attachments.is_empty());
    }
}
