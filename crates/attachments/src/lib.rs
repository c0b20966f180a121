//! # MathTutor Attachments
//!
//! Turns a user-selected file into something the model can consume:
//! raster images and PDFs become an inline base64 payload, Word documents
//! become extracted plain text. Every attachment holds a preview handle that
//! is released when the attachment is sent or discarded.

pub mod docx;
pub mod ingest;
pub mod preview;

pub use docx::{DocxTextExtractor, TextExtractor};
pub use ingest::{
    Attachment, AttachmentIngestor, AttachmentPayload, IncomingFile, DOCX_MIME_TYPE,
    MAX_ATTACHMENT_BYTES,
};
pub use preview::{Preview, PreviewHandle, PreviewRegistry};
