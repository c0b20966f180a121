//! Word document text extraction.
//!
//! A `.docx` file is a zip archive; the body lives in `word/document.xml`.
//! Text runs (`w:t`) are concatenated, paragraphs (`w:p`) end with a newline,
//! and `w:tab` / `w:br` become a tab and a newline. Formatting, tables and
//! embedded objects are ignored: the result is best-effort plain text.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};

/// Turns raw document bytes into plain text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extractor name (for logging).
    fn name(&self) -> &str;

    /// Extract plain text. The error string is a human-readable reason.
    async fn extract(&self, bytes: Vec<u8>) -> Result<String, String>;
}

/// Extracts text from Office Open XML word-processing documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxTextExtractor;

impl DocxTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for DocxTextExtractor {
    fn name(&self) -> &str {
        "docx"
    }

    async fn extract(&self, bytes: Vec<u8>) -> Result<String, String> {
        // Decompression and XML parsing are CPU-bound
        tokio::task::spawn_blocking(move || extract_docx_text(&bytes))
            .await
            .map_err(|e| format!("extraction task failed: {e}"))?
    }
}

/// Upper bound on the decompressed `word/document.xml`.
pub const MAX_DOCUMENT_XML_BYTES: u64 = 32 * 1024 * 1024;

/// Synchronous extraction over an in-memory `.docx`.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, String> {
    extract_with_limit(bytes, MAX_DOCUMENT_XML_BYTES)
}

fn extract_with_limit(bytes: &[u8], limit: u64) -> Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a valid .docx archive: {e}"))?;

    let body = archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing document body: {e}"))?;

    // One byte past the limit tells an oversized body from one that fits exactly
    let mut xml = String::new();
    body.take(limit + 1)
        .read_to_string(&mut xml)
        .map_err(|e| format!("unreadable document body: {e}"))?;
    if xml.len() as u64 > limit {
        return Err(format!("document body expands beyond {limit} bytes"));
    }

    document_xml_to_text(&xml)
}

fn document_xml_to_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => out.push('\t'),
                b"w:br" | b"w:cr" => out.push('\n'),
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => out.push_str(&String::from_utf8_lossy(&t)),
            Ok(Event::GeneralRef(r)) if in_text_run => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(&r)) {
                    out.push_str(&resolved);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "malformed document XML at position {}: {e}",
                    reader.error_position()
                ));
            }
        }
    }

    Ok(out.trim_end().to_string())
}

fn resolve_entity(name: &str) -> Option<String> {
    let named = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    };
    if let Some(c) = named {
        return Some(c.to_string());
    }

    let code = name.strip_prefix('#')?;
    let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => code.parse::<u32>().ok()?,
    };
    char::from_u32(value).map(String::from)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build a minimal `.docx` with one paragraph per entry.
    pub(crate) fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_paragraphs() {
        let bytes = docx_with_paragraphs(&["Solve for x:", "2x + 3 = 11"]);
        let text = extract_docx_text(&bytes).unwrap();
        assert_eq!(text, "Solve for x:\n2x + 3 = 11");
    }

    #[test]
    fn joins_runs_and_resolves_entities() {
        let xml = "<w:document><w:body><w:p>\
                   <w:r><w:t>a &lt; b</w:t></w:r><w:r><w:tab/><w:t>&#8730;9</w:t></w:r>\
                   </w:p></w:body></w:document>";
        assert_eq!(document_xml_to_text(xml).unwrap(), "a < b\t\u{221A}9");
    }

    #[test]
    fn ignores_text_outside_runs() {
        let xml = "<w:document><w:body><w:p><w:instrText>PAGE</w:instrText>\
                   <w:r><w:t>kept</w:t></w:r></w:p></w:body></w:document>";
        assert_eq!(document_xml_to_text(xml).unwrap(), "kept");
    }

    #[test]
    fn rejects_non_zip_bytes() {
        let err = extract_docx_text(b"plain text, not a zip").unwrap_err();
        assert!(err.contains("not a valid .docx"));
    }

    #[test]
    fn rejects_body_expanding_past_limit() {
        let bytes = docx_with_paragraphs(&["a fairly long paragraph about fractions"]);
        let err = extract_with_limit(&bytes, 64).unwrap_err();
        assert!(err.contains("expands beyond 64 bytes"), "{err}");

        // Generous limit still extracts
        let text = extract_with_limit(&bytes, 64 * 1024).unwrap();
        assert_eq!(text, "a fairly long paragraph about fractions");
    }

    #[test]
    fn rejects_archive_without_body() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_docx_text(&bytes).unwrap_err();
        assert!(err.contains("missing document body"));
    }

    #[tokio::test]
    async fn async_extractor_runs_off_thread() {
        let extractor = DocxTextExtractor::new();
        let text = extractor
            .extract(docx_with_paragraphs(&["What is 3/4 of 20?"]))
            .await
            .unwrap();
        assert_eq!(text, "What is 3/4 of 20?");
    }
}
