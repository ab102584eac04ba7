//! WordprocessingML parser
//!
//! Turns `word/document.xml` into body-level paragraphs of runs and
//! `word/_rels/document.xml.rels` into a relationship table.
//!
//! Only paragraphs that are direct children of `w:body` are kept, in document
//! order. A run is collected when it sits directly in the paragraph or one
//! level down inside `w:hyperlink`, `w:ins` or `w:smartTag`. Runs inside a
//! hyperlink carry its `r:id`.

use crate::error::ReadError;
use crate::types::*;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;

const DOCUMENT_PART: &str = "word/document.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";

/// Extract an attribute value by qualified key from an element
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
}

fn xml_error(part: &'static str, e: impl std::fmt::Display) -> ReadError {
    ReadError::Xml {
        part,
        message: e.to_string(),
    }
}

/// Accumulates one body-level paragraph while its subtree is being read.
/// Depths are element-stack lengths: the paragraph itself sits at `depth`.
struct ParagraphBuilder {
    depth: usize,
    runs: Vec<Run>,
    link: Option<(HyperlinkRef, usize)>,
    run: Option<(Run, usize)>,
}

impl ParagraphBuilder {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            runs: Vec::new(),
            link: None,
            run: None,
        }
    }

    /// `len` is the stack length before the element is pushed, i.e. its own depth
    fn start(&mut self, name: &[u8], e: &BytesStart, parent: &[u8], len: usize) {
        match name {
            b"w:hyperlink" if len == self.depth + 1 => {
                self.link = Some((
                    HyperlinkRef {
                        rel_id: get_attr(e, b"r:id"),
                    },
                    len,
                ));
            }
            b"w:r" if self.run.is_none() => {
                let direct = len == self.depth + 1;
                let wrapped = len == self.depth + 2
                    && matches!(parent, b"w:hyperlink" | b"w:ins" | b"w:smartTag");
                if direct || wrapped {
                    let hyperlink = match (&self.link, parent) {
                        (Some((link, _)), b"w:hyperlink") => Some(link.clone()),
                        _ => None,
                    };
                    self.run = Some((
                        Run {
                            text: String::new(),
                            hyperlink,
                        },
                        len,
                    ));
                }
            }
            _ => {}
        }
    }

    fn empty(&mut self, name: &[u8], len: usize) {
        if let Some((run, run_depth)) = self.run.as_mut() {
            if len != *run_depth + 1 {
                return;
            }
            match name {
                b"w:tab" => run.text.push('\t'),
                b"w:br" | b"w:cr" => run.text.push('\n'),
                _ => {}
            }
        }
    }

    /// Text events are only taken from `w:t` directly inside the current run
    fn text(&mut self, text: &str, parent: &[u8], len: usize) {
        if let Some((run, run_depth)) = self.run.as_mut() {
            if parent == b"w:t" && len == *run_depth + 2 {
                run.text.push_str(text);
            }
        }
    }

    /// `len` is the stack length after the element was popped
    fn end(&mut self, name: &[u8], len: usize) {
        match name {
            b"w:r" if matches!(self.run, Some((_, d)) if d == len) => {
                if let Some((run, _)) = self.run.take() {
                    self.runs.push(run);
                }
            }
            b"w:hyperlink" if matches!(self.link, Some((_, d)) if d == len) => {
                self.link = None;
            }
            _ => {}
        }
    }

    fn finish(self) -> Paragraph {
        Paragraph { runs: self.runs }
    }
}

/// Parse `word/document.xml` into body-level paragraphs
pub fn parse_document_xml(xml: &str) -> Result<Vec<Paragraph>, ReadError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<ParagraphBuilder> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                let parent = stack.last().map(Vec::as_slice).unwrap_or_default();
                match current.as_mut() {
                    Some(builder) => builder.start(&name, &e, parent, stack.len()),
                    None if name == b"w:p" && parent == b"w:body" => {
                        current = Some(ParagraphBuilder::new(stack.len()));
                    }
                    None => {}
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let parent = stack.last().map(Vec::as_slice).unwrap_or_default();
                match current.as_mut() {
                    Some(builder) => builder.empty(name.as_ref(), stack.len()),
                    // <w:p/> is a blank paragraph
                    None if name.as_ref() == b"w:p" && parent == b"w:body" => {
                        paragraphs.push(Paragraph::default());
                    }
                    None => {}
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(builder) = current.as_mut() {
                    let text = t.unescape().map_err(|e| xml_error(DOCUMENT_PART, e))?;
                    let parent = stack.last().map(Vec::as_slice).unwrap_or_default();
                    builder.text(&text, parent, stack.len());
                }
            }
            Ok(Event::End(e)) => {
                stack.pop();
                if let Some(builder) = current.as_mut() {
                    if stack.len() == builder.depth {
                        if let Some(done) = current.take() {
                            paragraphs.push(done.finish());
                        }
                    } else {
                        builder.end(e.name().as_ref(), stack.len());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(DOCUMENT_PART, e)),
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Parse `word/_rels/document.xml.rels` into an id -> relationship table
pub fn parse_relationships(xml: &str) -> Result<HashMap<String, Relationship>, ReadError> {
    let mut reader = Reader::from_str(xml);
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let id = get_attr(&e, b"Id");
                let target = get_attr(&e, b"Target");
                if let (Some(id), Some(target)) = (id, target) {
                    relationships.insert(id, Relationship { target });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(RELS_PART, e)),
            _ => {}
        }
    }

    Ok(relationships)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<w:body>
<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t xml:space="preserve">Autore: </w:t></w:r><w:hyperlink r:id="rId5"><w:r><w:rPr><w:rStyle w:val="Hyperlink"/></w:rPr><w:t>Pico della Mirandola</w:t></w:r></w:hyperlink><w:r><w:t>.</w:t></w:r></w:p>
<w:p/>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>in a table</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>Titolo:</w:t><w:tab/><w:t>De &amp; Civitate</w:t></w:r><w:r><w:instrText> PAGE </w:instrText></w:r></w:p>
<w:sectPr/>
</w:body>
</w:document>"#;

    #[test]
    fn test_body_paragraphs_in_order() {
        let paragraphs = parse_document_xml(DOC).unwrap();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0].text(), "Autore: Pico della Mirandola.");
        assert_eq!(paragraphs[1].text(), "");
        assert_eq!(paragraphs[2].text(), "Titolo:\tDe & Civitate");
    }

    #[test]
    fn test_hyperlink_runs_carry_rel_id() {
        let paragraphs = parse_document_xml(DOC).unwrap();
        let runs = &paragraphs[0].runs;
        assert_eq!(runs.len(), 3);
        assert!(runs[0].hyperlink.is_none());
        assert_eq!(
            runs[1].hyperlink,
            Some(HyperlinkRef {
                rel_id: Some("rId5".to_string())
            })
        );
        assert!(runs[2].hyperlink.is_none());
    }

    #[test]
    fn test_anchor_hyperlink_without_rel_id() {
        let xml = r##"<w:document><w:body><w:p><w:hyperlink w:anchor="_Toc1"><w:r><w:t>see above</w:t></w:r></w:hyperlink></w:p></w:body></w:document>"##;
        let paragraphs = parse_document_xml(xml).unwrap();
        assert_eq!(paragraphs[0].runs[0].hyperlink, Some(HyperlinkRef { rel_id: None }));
    }

    #[test]
    fn test_relationships() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.org/p?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;
        let rels = parse_relationships(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels["rId5"].target, "https://example.org/p?a=1&b=2");
        assert_eq!(rels["rId1"].target, "styles.xml");
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        let result = parse_document_xml("<w:document><w:body><w:p></w:body>");
        assert!(matches!(result, Err(ReadError::Xml { .. })));
    }
}
