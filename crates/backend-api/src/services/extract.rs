//! Plain-text extraction for uploaded documents.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use supportdesk_database::DocumentType;
use thiserror::Error;

/// Largest decompressed `word/document.xml` accepted from a DOCX archive.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
const DOCX_BODY_ENTRY: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub content: String,
    pub page_count: Option<i64>,
    pub word_count: i64,
}

pub fn extract_text(bytes: &[u8], file_type: DocumentType) -> Result<ExtractedText, ExtractError> {
    let (content, page_count) = match file_type {
        DocumentType::Pdf => extract_pdf(bytes)?,
        DocumentType::Docx => (extract_docx(bytes)?, None),
        DocumentType::Txt | DocumentType::Md => (String::from_utf8_lossy(bytes).into_owned(), None),
    };

    Ok(ExtractedText {
        word_count: word_count(&content),
        content,
        page_count,
    })
}

/// Number of whitespace separated tokens.
pub fn word_count(text: &str) -> i64 {
    text.split_whitespace().count() as i64
}

fn extract_pdf(bytes: &[u8]) -> Result<(String, Option<i64>), ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let pages = lopdf::Document::load_mem(bytes)
        .map(|document| document.get_pages().len() as i64)
        .ok();
    Ok((text, pages))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let entry = archive
        .by_name(DOCX_BODY_ENTRY)
        .map_err(|_| ExtractError::Docx(format!("{DOCX_BODY_ENTRY} not found")))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Docx(format!(
            "{DOCX_BODY_ENTRY} exceeds size limit"
        )));
    }

    docx_paragraphs(&xml)
}

/// Concatenate `<w:t>` runs, one line per `<w:p>` paragraph.
fn docx_paragraphs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(text)) if in_text => {
                let text = text
                    .unescape()
                    .map_err(|e| ExtractError::Docx(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file(DOCX_BODY_ENTRY, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn plain_text_is_counted_by_whitespace() {
        let extracted = extract_text(b"Refunds are issued\nwithin  30 days.", DocumentType::Txt).unwrap();
        assert_eq!(extracted.word_count, 6);
        assert_eq!(extracted.page_count, None);
    }

    #[test]
    fn markdown_with_invalid_utf8_is_decoded_lossily() {
        let extracted = extract_text(b"# Title \xff body", DocumentType::Md).unwrap();
        assert!(extracted.content.starts_with("# Title"));
        assert_eq!(extracted.word_count, 4);
    }

    #[test]
    fn docx_runs_are_joined_per_paragraph() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Reset your</w:t></w:r><w:r><w:t xml:space="preserve"> password</w:t></w:r></w:p>
    <w:p><w:r><w:t>Billing &amp; refunds</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let extracted = extract_text(&docx_with_body(xml), DocumentType::Docx).unwrap();
        assert_eq!(extracted.content, "Reset your password\nBilling & refunds");
        assert_eq!(extracted.word_count, 6);
    }

    #[test]
    fn invalid_inputs_return_errors() {
        assert!(matches!(
            extract_text(b"not a pdf", DocumentType::Pdf),
            Err(ExtractError::Pdf(_))
        ));
        assert!(matches!(
            extract_text(b"not a zip", DocumentType::Docx),
            Err(ExtractError::Docx(_))
        ));
    }
}
