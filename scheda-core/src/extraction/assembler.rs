use crate::types::*;

/// The two text renderings of one write-up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledText {
    /// Hyperlinked runs rendered as inline anchors, one line per paragraph
    pub linked: String,
    /// Markup-free fallback: trimmed paragraph texts joined by newlines
    pub plain: String,
}

/// Rebuilds linear text from the paragraph/run model.
///
/// Blank paragraphs are dropped from both renderings. A run becomes an anchor
/// only when its relationship resolves to a non-empty target and its text is
/// not blank; anything else degrades to the raw run text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextAssembler;

impl TextAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&self, document: &RichDocument) -> AssembledText {
        let mut linked = String::new();
        let mut plain_lines: Vec<String> = Vec::new();

        for paragraph in &document.paragraphs {
            let plain = paragraph.text();
            let trimmed = plain.trim();
            if trimmed.is_empty() {
                continue;
            }

            match self.render_with_links(paragraph, document) {
                Some(rendered) => linked.push_str(&rendered),
                None => linked.push_str(trimmed),
            }
            linked.push('\n');
            plain_lines.push(trimmed.to_string());
        }

        AssembledText {
            linked,
            plain: plain_lines.join("\n"),
        }
    }

    /// Render a paragraph with anchors; `None` when no run produced one
    fn render_with_links(&self, paragraph: &Paragraph, document: &RichDocument) -> Option<String> {
        let mut out = String::new();
        let mut has_anchor = false;

        for run in &paragraph.runs {
            match resolve_target(run, document) {
                Some(url) if !run.text.trim().is_empty() => {
                    out.push_str(&format!(r#"<a href="{}" target="_blank">{}</a>"#, url, run.text));
                    has_anchor = true;
                }
                _ => out.push_str(&run.text),
            }
        }

        has_anchor.then_some(out)
    }
}

fn resolve_target<'a>(run: &Run, document: &'a RichDocument) -> Option<&'a str> {
    let rel_id = run.hyperlink.as_ref()?.rel_id.as_deref()?;
    document
        .relationships
        .get(rel_id)
        .map(|r| r.target.as_str())
        .filter(|t| !t.trim().is_empty())
}
