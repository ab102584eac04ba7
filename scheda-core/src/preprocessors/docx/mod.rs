//! DOCX Reader
//!
//! Reads Office Open XML word-processing files. The container is a ZIP
//! archive; the body lives in `word/document.xml` and hyperlink targets in
//! `word/_rels/document.xml.rels`.

pub mod xml_parser;

use crate::error::ReadError;
use crate::preprocessors::traits::{DocumentMarkup, DocumentReader};
use crate::types::*;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxReader;

impl DocxReader {
    pub fn new() -> Self {
        Self
    }
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    part: &'static str,
) -> Result<Option<String>, ReadError> {
    let mut file = match archive.by_name(part) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

impl DocumentReader for DocxReader {
    /// Step 1: Unzip the container and pull out the XML parts
    fn read_markup(&self, bytes: &[u8]) -> Result<DocumentMarkup, ReadError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let body = read_part(&mut archive, DOCUMENT_PART)?
            .ok_or(ReadError::MissingPart(DOCUMENT_PART))?;
        let relationships = read_part(&mut archive, RELS_PART)?;

        Ok(DocumentMarkup {
            body,
            relationships,
        })
    }

    /// Step 2: Parse the XML parts into paragraphs and relationships
    fn parse_markup(&self, markup: &DocumentMarkup) -> Result<RichDocument, ReadError> {
        let paragraphs = xml_parser::parse_document_xml(&markup.body)?;
        let relationships = match &markup.relationships {
            Some(xml) => xml_parser::parse_relationships(xml)?,
            None => Default::default(),
        };

        Ok(RichDocument {
            paragraphs,
            relationships,
        })
    }

    fn name(&self) -> &str {
        "DocxReader"
    }

    /// `.doc` is accepted here so legacy files surface as per-document read
    /// errors instead of silently disappearing from a batch
    fn supports_file_type(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_lowercase().as_str(), "docx" | "doc"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn build_docx(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const BODY: &str = r#"<w:document xmlns:w="w" xmlns:r="r"><w:body><w:p><w:hyperlink r:id="rId9"><w:r><w:t>Pico della Mirandola</w:t></w:r></w:hyperlink></w:p></w:body></w:document>"#;
    const RELS: &str = r#"<Relationships><Relationship Id="rId9" Type="hyperlink" Target="https://example.org/p" TargetMode="External"/></Relationships>"#;

    #[test]
    fn test_read_full_container() {
        let bytes = build_docx(&[(DOCUMENT_PART, BODY), (RELS_PART, RELS)]);
        let doc = DocxReader::new().read(&bytes).unwrap();

        assert_eq!(doc.paragraphs.len(), 1);
        assert_eq!(doc.paragraphs[0].text(), "Pico della Mirandola");
        assert_eq!(doc.relationships["rId9"].target, "https://example.org/p");
    }

    #[test]
    fn test_missing_rels_gives_empty_table() {
        let bytes = build_docx(&[(DOCUMENT_PART, BODY)]);
        let doc = DocxReader::new().read(&bytes).unwrap();
        assert!(doc.relationships.is_empty());
        assert_eq!(doc.paragraphs.len(), 1);
    }

    #[test]
    fn test_missing_document_part() {
        let bytes = build_docx(&[("word/styles.xml", "<w:styles/>")]);
        let result = DocxReader::new().read(&bytes);
        assert!(matches!(result, Err(ReadError::MissingPart(DOCUMENT_PART))));
    }

    #[test]
    fn test_not_a_zip() {
        // Legacy .doc files are OLE compound documents, not ZIP
        let bytes = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0, 0, 0];
        let result = DocxReader::new().read(&bytes);
        assert!(matches!(result, Err(ReadError::Container(_))));
    }

    #[test]
    fn test_supports_file_type() {
        let reader = DocxReader::new();
        assert!(reader.supports_file_type(Path::new("Scheda descrittiva_5A1_VERIFICATA.docx")));
        assert!(reader.supports_file_type(Path::new("old.DOC")));
        assert!(!reader.supports_file_type(Path::new("notes.pdf")));
        assert!(!reader.supports_file_type(Path::new("README")));
    }
}
