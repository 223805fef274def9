//! Per-message archive folders.
//!
//! Layout: `{root}/{account}/{ordinal}_{subject}/message.{txt|html}` plus
//! `files/{attachment}` for every attachment. Existing folders are reused and
//! existing files overwritten; nothing is ever deleted.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::model::message::{BodyKind, DecodedMessage};

/// Line between the header block and the body.
const SEPARATOR: &str = "--------------------------------------------------";

/// Subdirectory of a message folder holding its attachments.
const FILES_DIR: &str = "files";

/// What one [`ArchiveWriter::write`] call put on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchivedMessage {
    pub folder: PathBuf,
    pub body_path: PathBuf,
    pub attachment_paths: Vec<PathBuf>,
    /// Body plus attachment bytes written.
    pub bytes_written: u64,
}

/// Writes decoded messages under a root directory (`emails` by default).
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
    root: PathBuf,
}

impl ArchiveWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Folder path for message `ordinal` of account `local_part`.
    pub fn folder_path(&self, local_part: &str, ordinal: u32, msg: &DecodedMessage) -> PathBuf {
        self.root.join(local_part).join(msg.folder_name(ordinal))
    }

    /// Create the message folder (and its ancestors) if needed.
    pub fn create_folder(&self, local_part: &str, ordinal: u32, msg: &DecodedMessage) -> Result<PathBuf> {
        let folder = self.folder_path(local_part, ordinal, msg);
        std::fs::create_dir_all(&folder).map_err(|e| ArchiveError::io(&folder, e))?;
        Ok(folder)
    }

    /// Write the folder, the body file and every attachment.
    ///
    /// A failure part-way leaves whatever was already written in place.
    pub fn write(&self, local_part: &str, ordinal: u32, msg: &DecodedMessage) -> Result<ArchivedMessage> {
        let folder = self.create_folder(local_part, ordinal, msg)?;

        let body_path = folder.join(format!("message.{}", msg.body.kind.extension()));
        let content = render_body(msg);
        std::fs::write(&body_path, &content).map_err(|e| ArchiveError::io(&body_path, e))?;
        let mut bytes_written = content.len() as u64;

        let mut attachment_paths = Vec::with_capacity(msg.attachments.len());
        if !msg.attachments.is_empty() {
            let files_dir = folder.join(FILES_DIR);
            std::fs::create_dir_all(&files_dir).map_err(|e| ArchiveError::io(&files_dir, e))?;

            for att in &msg.attachments {
                let path = files_dir.join(&att.file_name);
                std::fs::write(&path, &att.bytes).map_err(|e| ArchiveError::io(&path, e))?;
                debug!(
                    file = %att.file_name,
                    content_type = %att.content_type,
                    bytes = att.bytes.len(),
                    "Wrote attachment"
                );
                bytes_written += att.bytes.len() as u64;
                attachment_paths.push(path);
            }
        }

        debug!(
            folder = %folder.display(),
            attachments = attachment_paths.len(),
            bytes = bytes_written,
            "Archived message"
        );

        Ok(ArchivedMessage {
            folder,
            body_path,
            attachment_paths,
            bytes_written,
        })
    }
}

/// Body file content: a `From`/`To` header block, a separator, then the body.
///
/// HTML bodies get `<br>` before each following line so the header block
/// still reads as separate lines when the file is opened in a browser.
pub fn render_body(msg: &DecodedMessage) -> String {
    let h = &msg.headers;
    match msg.body.kind {
        BodyKind::Html => format!(
            "From: {}\n<br>To: {}\n<br>{SEPARATOR}\n<br>{}",
            h.from, h.to, msg.body.text
        ),
        BodyKind::PlainText => format!(
            "From: {}\nTo: {}\n{SEPARATOR}\n{}",
            h.from, h.to, msg.body.text
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::{Attachment, BodyPart, DecodedHeaders};

    fn message(kind: BodyKind, text: &str) -> DecodedMessage {
        DecodedMessage {
            headers: DecodedHeaders {
                subject: "Invoice Q3".into(),
                from: "alice@example.com".into(),
                to: "bob@example.com".into(),
            },
            safe_subject: "Invoice_Q3".into(),
            body: BodyPart {
                kind,
                text: text.into(),
            },
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_render_plain() {
        let rendered = render_body(&message(BodyKind::PlainText, "Thanks"));
        assert_eq!(
            rendered,
            format!("From: alice@example.com\nTo: bob@example.com\n{SEPARATOR}\nThanks")
        );
    }

    #[test]
    fn test_render_html() {
        let rendered = render_body(&message(BodyKind::Html, "<p>Thanks</p>"));
        assert_eq!(
            rendered,
            format!("From: alice@example.com\n<br>To: bob@example.com\n<br>{SEPARATOR}\n<br><p>Thanks</p>")
        );
    }

    #[test]
    fn test_write_plain_message() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::new(dir.path().join("emails"));
        let written = writer.write("bob", 1, &message(BodyKind::PlainText, "Thanks")).unwrap();

        let expected = dir.path().join("emails").join("bob").join("1_Invoice_Q3");
        assert_eq!(written.folder, expected);
        assert_eq!(written.body_path, expected.join("message.txt"));
        assert!(written.attachment_paths.is_empty());
        assert!(!expected.join(FILES_DIR).exists());

        let content = std::fs::read_to_string(expected.join("message.txt")).unwrap();
        assert!(content.ends_with("\nThanks"));
    }

    #[test]
    fn test_write_html_and_attachments() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::new(dir.path());
        let mut msg = message(BodyKind::Html, "<p>x</p>");
        msg.attachments.push(Attachment {
            file_name: "a.bin".into(),
            content_type: "application/octet-stream".into(),
            bytes: vec![1, 2, 3],
        });

        let written = writer.write("bob", 4, &msg).unwrap();
        assert!(written.body_path.ends_with("message.html"));
        assert_eq!(written.attachment_paths.len(), 1);
        assert_eq!(std::fs::read(&written.attachment_paths[0]).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_write_reuses_folder_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::new(dir.path());
        let mut msg = message(BodyKind::PlainText, "first");
        msg.attachments.push(Attachment {
            file_name: "same.txt".into(),
            content_type: "text/plain".into(),
            bytes: b"old".to_vec(),
        });
        writer.write("bob", 1, &msg).unwrap();

        msg.body.text = "second".into();
        msg.attachments[0].bytes = b"new".to_vec();
        let written = writer.write("bob", 1, &msg).unwrap();

        let body = std::fs::read_to_string(&written.body_path).unwrap();
        assert!(body.ends_with("second"));
        assert_eq!(std::fs::read(&written.attachment_paths[0]).unwrap(), b"new");
    }

    #[test]
    fn test_write_fails_with_path_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("emails");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let writer = ArchiveWriter::new(&blocker);
        let err = writer
            .write("bob", 1, &message(BodyKind::PlainText, "x"))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Io { .. }));
    }
}
