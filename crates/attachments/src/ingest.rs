//! Attachment ingestion.
//!
//! `ingest` enforces the size ceiling before looking at content, then routes
//! by mime type:
//! - raster images and PDFs → base64 inline payload
//! - `.docx` → plain text via the [`TextExtractor`]
//! - anything else → [`AttachmentError::UnsupportedFormat`]

use crate::docx::{DocxTextExtractor, TextExtractor};
use crate::preview::{PreviewHandle, PreviewRegistry};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use mathtutor_core::error::AttachmentError;
use mathtutor_core::message::AttachmentSummary;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Largest file accepted: 5 MiB.
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const PDF_MIME_TYPE: &str = "application/pdf";

/// A file as selected by the user, before ingestion.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            bytes,
        }
    }

    /// Read a file from disk, guessing its mime type from the extension.
    ///
    /// Oversized files are rejected from metadata alone, without reading
    /// their content.
    pub async fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let read_err = |e: std::io::Error| AttachmentError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let metadata = tokio::fs::metadata(path).await.map_err(read_err)?;
        if !metadata.is_file() {
            return Err(AttachmentError::Read {
                path: path.to_path_buf(),
                reason: "not a regular file".into(),
            });
        }
        if metadata.len() > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentError::TooLarge {
                name,
                size_bytes: metadata.len(),
                limit_bytes: MAX_ATTACHMENT_BYTES,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(read_err)?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            name,
            mime_type,
            size_bytes: bytes.len() as u64,
            bytes,
        })
    }
}

/// What gets sent to the model. Exactly one form per attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentPayload {
    /// Base64-encoded file content sent as inline data.
    Inline { mime_type: String, data: String },
    /// Plain text extracted from a document.
    ExtractedText(String),
}

/// A pending attachment. Dropping it (sent or discarded) releases the preview.
#[derive(Debug)]
pub struct Attachment {
    name: String,
    mime_type: String,
    payload: AttachmentPayload,
    preview: PreviewHandle,
}

impl Attachment {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn payload(&self) -> &AttachmentPayload {
        &self.payload
    }

    pub fn preview_reference(&self) -> &str {
        self.preview.reference()
    }

    /// Display summary. Only raster images carry a preview reference.
    pub fn summary(&self) -> AttachmentSummary {
        AttachmentSummary {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            preview_reference: is_raster_image(&self.mime_type)
                .then(|| self.preview.reference().to_string()),
        }
    }

    /// Consume the attachment for sending. The preview is released here.
    pub fn into_payload(self) -> (AttachmentSummary, AttachmentPayload) {
        let summary = self.summary();
        (summary, self.payload)
    }

    /// Cancel the attachment. The preview is released here.
    pub fn discard(self) {
        debug!(name = %self.name, "Attachment discarded");
    }
}

/// Normalizes user files into attachments.
#[derive(Clone)]
pub struct AttachmentIngestor {
    extractor: Arc<dyn TextExtractor>,
    previews: PreviewRegistry,
}

impl AttachmentIngestor {
    pub fn new(extractor: Arc<dyn TextExtractor>, previews: PreviewRegistry) -> Self {
        Self {
            extractor,
            previews,
        }
    }

    /// Ingestor with the built-in `.docx` extractor and a fresh registry.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(DocxTextExtractor::new()), PreviewRegistry::new())
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub async fn ingest(&self, file: IncomingFile) -> Result<Attachment, AttachmentError> {
        if file.size_bytes > MAX_ATTACHMENT_BYTES {
            warn!(name = %file.name, size = file.size_bytes, "Attachment too large");
            return Err(AttachmentError::TooLarge {
                name: file.name,
                size_bytes: file.size_bytes,
                limit_bytes: MAX_ATTACHMENT_BYTES,
            });
        }

        let mime_type = normalize_mime(&file.mime_type);

        let payload = if is_raster_image(&mime_type) || mime_type == PDF_MIME_TYPE {
            AttachmentPayload::Inline {
                mime_type: mime_type.clone(),
                data: STANDARD.encode(&file.bytes),
            }
        } else if mime_type == DOCX_MIME_TYPE {
            let text = self
                .extractor
                .extract(file.bytes.clone())
                .await
                .map_err(|reason| {
                    warn!(name = %file.name, extractor = self.extractor.name(), reason = %reason, "Text extraction failed");
                    AttachmentError::ExtractionFailed {
                        name: file.name.clone(),
                        reason,
                    }
                })?;
            AttachmentPayload::ExtractedText(text)
        } else {
            return Err(AttachmentError::UnsupportedFormat {
                name: file.name,
                mime_type,
            });
        };

        let preview = self.previews.register(&mime_type, Arc::from(file.bytes));
        info!(
            name = %file.name,
            mime_type = %mime_type,
            size = file.size_bytes,
            inline = matches!(payload, AttachmentPayload::Inline { .. }),
            "Attachment ingested"
        );

        Ok(Attachment {
            name: file.name,
            mime_type,
            payload,
            preview,
        })
    }
}

fn normalize_mime(raw: &str) -> String {
    raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

fn is_raster_image(mime_type: &str) -> bool {
    mime_type.starts_with("image/") && mime_type != "image/svg+xml"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::tests::docx_with_paragraphs;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Extractor that records calls and returns a fixed outcome.
    struct MockExtractor {
        outcome: Result<String, String>,
        calls: Mutex<usize>,
    }

    impl MockExtractor {
        fn new(outcome: Result<String, String>) -> Self {
            Self {
                outcome,
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TextExtractor for MockExtractor {
        fn name(&self) -> &str {
            "mock"
        }

        async fn extract(&self, _bytes: Vec<u8>) -> Result<String, String> {
            *self.calls.lock().unwrap() += 1;
            self.outcome.clone()
        }
    }

    fn ingestor_with(extractor: Arc<MockExtractor>) -> AttachmentIngestor {
        AttachmentIngestor::new(extractor, PreviewRegistry::new())
    }

    #[tokio::test]
    async fn image_becomes_inline_payload() {
        let ingestor = AttachmentIngestor::with_defaults();
        let file = IncomingFile::new("triangle.png", "image/png", vec![0x89, b'P', b'N', b'G']);

        let attachment = ingestor.ingest(file).await.unwrap();
        match attachment.payload() {
            AttachmentPayload::Inline { mime_type, data } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(data, &STANDARD.encode([0x89, b'P', b'N', b'G']));
            }
            other => panic!("Expected inline payload, got: {other:?}"),
        }
        let summary = attachment.summary();
        assert_eq!(summary.preview_reference.as_deref(), Some(attachment.preview_reference()));
        assert_eq!(ingestor.previews().live_count(), 1);
    }

    #[tokio::test]
    async fn pdf_is_inline_without_display_preview() {
        let ingestor = AttachmentIngestor::with_defaults();
        let file = IncomingFile::new("worksheet.pdf", "application/pdf", b"%PDF-1.4".to_vec());

        let attachment = ingestor.ingest(file).await.unwrap();
        assert!(matches!(attachment.payload(), AttachmentPayload::Inline { .. }));
        assert!(attachment.summary().preview_reference.is_none());
        assert!(ingestor.previews().resolve(attachment.preview_reference()).is_some());
    }

    #[tokio::test]
    async fn docx_becomes_extracted_text() {
        let ingestor = AttachmentIngestor::with_defaults();
        let file = IncomingFile::new(
            "homework.docx",
            DOCX_MIME_TYPE,
            docx_with_paragraphs(&["Find the area of a circle with radius 3."]),
        );

        let attachment = ingestor.ingest(file).await.unwrap();
        assert_eq!(
            attachment.payload(),
            &AttachmentPayload::ExtractedText("Find the area of a circle with radius 3.".into())
        );
    }

    #[tokio::test]
    async fn mime_parameters_and_case_are_ignored() {
        let ingestor = AttachmentIngestor::with_defaults();
        let file = IncomingFile::new("photo.JPG", "Image/JPEG; charset=binary", vec![1, 2]);
        let attachment = ingestor.ingest(file).await.unwrap();
        assert_eq!(attachment.mime_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn oversize_is_rejected_for_every_mime_type() {
        for mime in ["image/png", "application/pdf", DOCX_MIME_TYPE, "text/plain"] {
            let extractor = Arc::new(MockExtractor::new(Ok("text".into())));
            let ingestor = ingestor_with(extractor.clone());
            let file = IncomingFile {
                name: "big".into(),
                mime_type: mime.into(),
                size_bytes: MAX_ATTACHMENT_BYTES + 1,
                bytes: Vec::new(),
            };

            let err = ingestor.ingest(file).await.unwrap_err();
            assert!(matches!(err, AttachmentError::TooLarge { .. }), "{mime}: {err:?}");
            assert_eq!(extractor.call_count(), 0);
            assert_eq!(ingestor.previews().live_count(), 0);
        }
    }

    #[tokio::test]
    async fn exactly_at_limit_is_accepted() {
        let ingestor = AttachmentIngestor::with_defaults();
        let file = IncomingFile::new("edge.png", "image/png", vec![0u8; MAX_ATTACHMENT_BYTES as usize]);
        assert!(ingestor.ingest(file).await.is_ok());
    }

    #[tokio::test]
    async fn supported_types_yield_exactly_one_payload_form() {
        let extractor = Arc::new(MockExtractor::new(Ok("extracted".into())));
        let ingestor = ingestor_with(extractor.clone());

        for (mime, inline) in [
            ("image/png", true),
            ("image/jpeg", true),
            ("image/webp", true),
            ("application/pdf", true),
            (DOCX_MIME_TYPE, false),
        ] {
            let attachment = ingestor
                .ingest(IncomingFile::new("f", mime, vec![7; 16]))
                .await
                .unwrap();
            match attachment.payload() {
                AttachmentPayload::Inline { .. } => assert!(inline, "{mime}"),
                AttachmentPayload::ExtractedText(_) => assert!(!inline, "{mime}"),
            }
        }
        assert_eq!(extractor.call_count(), 1);
    }

    #[tokio::test]
    async fn unsupported_format_creates_nothing() {
        let extractor = Arc::new(MockExtractor::new(Ok("never".into())));
        let ingestor = ingestor_with(extractor.clone());

        for mime in ["text/plain", "image/svg+xml", "application/zip", "application/msword"] {
            let err = ingestor
                .ingest(IncomingFile::new("notes", mime, b"x".to_vec()))
                .await
                .unwrap_err();
            assert!(matches!(err, AttachmentError::UnsupportedFormat { .. }), "{mime}");
        }
        assert_eq!(extractor.call_count(), 0);
        assert_eq!(ingestor.previews().live_count(), 0);
    }

    #[tokio::test]
    async fn extraction_failure_creates_nothing() {
        let extractor = Arc::new(MockExtractor::new(Err("corrupt".into())));
        let ingestor = ingestor_with(extractor.clone());

        let err = ingestor
            .ingest(IncomingFile::new("broken.docx", DOCX_MIME_TYPE, vec![1, 2, 3]))
            .await
            .unwrap_err();
        match err {
            AttachmentError::ExtractionFailed { name, reason } => {
                assert_eq!(name, "broken.docx");
                assert_eq!(reason, "corrupt");
            }
            other => panic!("Expected ExtractionFailed, got: {other:?}"),
        }
        assert_eq!(ingestor.previews().live_count(), 0);
    }

    #[tokio::test]
    async fn send_and_discard_both_release_preview() {
        let ingestor = AttachmentIngestor::with_defaults();

        let sent = ingestor
            .ingest(IncomingFile::new("a.png", "image/png", vec![1]))
            .await
            .unwrap();
        let discarded = ingestor
            .ingest(IncomingFile::new("b.png", "image/png", vec![2]))
            .await
            .unwrap();
        let sent_ref = sent.preview_reference().to_string();
        assert_eq!(ingestor.previews().live_count(), 2);

        let (summary, _payload) = sent.into_payload();
        assert_eq!(summary.name, "a.png");
        assert!(ingestor.previews().resolve(&sent_ref).is_none());
        assert_eq!(ingestor.previews().live_count(), 1);

        discarded.discard();
        assert_eq!(ingestor.previews().live_count(), 0);
    }

    #[tokio::test]
    async fn from_path_reads_and_guesses_mime() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graph.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let file = IncomingFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "graph.png");
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.size_bytes, 3);
    }

    #[tokio::test]
    async fn from_path_rejects_oversize_before_reading() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("huge.pdf");
        let f = std::fs::File::create(&path).unwrap();
        f.set_len(MAX_ATTACHMENT_BYTES + 1).unwrap();

        let err = IncomingFile::from_path(&path).await.unwrap_err();
        assert!(matches!(err, AttachmentError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn from_path_missing_file_is_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = IncomingFile::from_path(&dir.path().join("absent.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Read { .. }));
    }
}
