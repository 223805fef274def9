//! Decoded message types.
//!
//! These are produced by [`crate::parser::mime::decode_message`] and consumed
//! by [`crate::export::archive::ArchiveWriter`]. Nothing here is persisted
//! except through the archive layout.

/// Sequence number of a message within one listing.
pub type MessageId = u32;

/// Plain-text headers after encoded-word decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedHeaders {
    pub subject: String,
    pub from: String,
    pub to: String,
}

/// Which flavour of text the selected body is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyKind {
    #[default]
    PlainText,
    Html,
}

impl BodyKind {
    /// Classify a lowercase `type/subtype` MIME type.
    pub fn from_mimetype(mimetype: &str) -> Self {
        if mimetype.eq_ignore_ascii_case("text/html") {
            Self::Html
        } else {
            Self::PlainText
        }
    }

    /// File extension of the body file (`html` or `txt`).
    pub fn extension(self) -> &'static str {
        match self {
            Self::PlainText => "txt",
            Self::Html => "html",
        }
    }
}

/// The single body selected to represent a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyPart {
    pub kind: BodyKind,
    pub text: String,
}

/// An attachment with a non-empty, already sanitized file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Safe file name (output of [`crate::parser::sanitize::sanitize`]).
    pub file_name: String,

    /// MIME content type (e.g. `"image/jpeg"`), informational only.
    pub content_type: String,

    /// Transfer-decoded payload.
    pub bytes: Vec<u8>,
}

/// Everything the archive writer needs to know about one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMessage {
    pub headers: DecodedHeaders,

    /// Sanitized, shortened subject used in the folder name.
    pub safe_subject: String,

    pub body: BodyPart,

    pub attachments: Vec<Attachment>,
}

impl DecodedMessage {
    /// Name of the per-message folder: `{ordinal}_{safe_subject}`.
    pub fn folder_name(&self, ordinal: u32) -> String {
        format!("{ordinal}_{}", self.safe_subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_kind_from_mimetype() {
        assert_eq!(BodyKind::from_mimetype("text/html"), BodyKind::Html);
        assert_eq!(BodyKind::from_mimetype("TEXT/HTML"), BodyKind::Html);
        assert_eq!(BodyKind::from_mimetype("text/plain"), BodyKind::PlainText);
        assert_eq!(BodyKind::from_mimetype("application/pdf"), BodyKind::PlainText);
    }

    #[test]
    fn test_extension() {
        assert_eq!(BodyKind::Html.extension(), "html");
        assert_eq!(BodyKind::PlainText.extension(), "txt");
    }

    #[test]
    fn test_folder_name() {
        let msg = DecodedMessage {
            safe_subject: "Invoice_Q3".into(),
            ..Default::default()
        };
        assert_eq!(msg.folder_name(7), "7_Invoice_Q3");
    }
}
