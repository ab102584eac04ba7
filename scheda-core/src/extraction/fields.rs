use crate::extraction::assembler::AssembledText;
use crate::types::*;
use regex::Regex;
use std::sync::LazyLock;

/// `Label:` occurrence for every field, case-insensitive, anchored at a word boundary
static LABEL_PATTERNS: LazyLock<Vec<(Field, Regex)>> = LazyLock::new(|| {
    Field::ALL
        .into_iter()
        .map(|field| {
            let pattern = format!(r"(?i)\b{}:", regex::escape(field.label()));
            (field, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Start of the next labeled line: newline, capitalised label-like token, colon
static NEXT_LABEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*[A-ZÀ-Ý][A-Za-zÀ-ÿ ]+:").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static EMPTY_ANCHOR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a\s+href="[^"]*"[^>]*>\s*</a>"#).unwrap());

/// Segments assembled text into `{field: value}` pairs.
///
/// A value runs from the label's colon to the next labeled line or the end
/// of text. The hyperlink-aware rendering is searched first and the plain
/// rendering only for labels it did not yield.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    fields: Vec<Field>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self {
            fields: Field::ALL.to_vec(),
        }
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict extraction to a subset of the vocabulary
    pub fn with_fields(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn extract(&self, text: &AssembledText) -> FieldMap {
        let mut map = FieldMap::new();

        for &field in &self.fields {
            let value = extract_field(field, &text.linked)
                .or_else(|| extract_field(field, &text.plain));
            if let Some(value) = value {
                map.insert(field, value);
            }
        }

        map
    }
}

/// First non-empty value for `field` in `text`
pub fn extract_field(field: Field, text: &str) -> Option<String> {
    let (_, label) = LABEL_PATTERNS.iter().find(|(f, _)| *f == field)?;

    label.find_iter(text).find_map(|m| {
        let rest = &text[m.end()..];
        let end = NEXT_LABEL_REGEX
            .find(rest)
            .map(|b| b.start())
            .unwrap_or(rest.len());
        let value = clean_value(&rest[..end]);
        (!value.is_empty()).then_some(value)
    })
}

/// Drop empty anchors, collapse whitespace runs to one space, trim
fn clean_value(raw: &str) -> String {
    let without_empty = EMPTY_ANCHOR_REGEX.replace_all(raw, "");
    WHITESPACE_REGEX
        .replace_all(&without_empty, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both(text: &str) -> AssembledText {
        AssembledText {
            linked: text.to_string(),
            plain: text.to_string(),
        }
    }

    #[test]
    fn test_field_boundary_respected() {
        let map = FieldExtractor::new().extract(&both("Autore: Jane Doe\nTitolo: De Civitate\n"));
        assert_eq!(map.get(Field::Author), Some("Jane Doe"));
        assert_eq!(map.get(Field::Title), Some("De Civitate"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_anchor_markup_preserved() {
        let text = both(
            "Autore: <a href=\"https://example.org/p\" target=\"_blank\">Pico della Mirandola</a>\nTitolo: Opera\n",
        );
        let map = FieldExtractor::new().extract(&text);
        assert_eq!(
            map.get(Field::Author),
            Some("<a href=\"https://example.org/p\" target=\"_blank\">Pico della Mirandola</a>")
        );
    }

    #[test]
    fn test_multiline_value_collapsed() {
        let text = both("Descrizione fisica: cc. [10],\n   legatura   in pelle\n\tcon fermagli\nLingua: latino");
        let map = FieldExtractor::new().extract(&text);
        assert_eq!(
            map.get(Field::PhysicalDescription),
            Some("cc. [10], legatura in pelle con fermagli")
        );
        assert_eq!(map.get(Field::LanguageInfo), Some("latino"));
    }

    #[test]
    fn test_empty_anchor_removed() {
        let text = both("Segnatura: a-c⁸ <a href=\"https://x.org\" target=\"_blank\"> </a> d⁴\n");
        let map = FieldExtractor::new().extract(&text);
        assert_eq!(map.get(Field::Signature), Some("a-c⁸ d⁴"));
    }

    #[test]
    fn test_secondary_author_not_confused() {
        let map = FieldExtractor::new().extract(&both("Autore secondario: B\nAutore: A\n"));
        assert_eq!(map.get(Field::Author), Some("A"));
        assert_eq!(map.get(Field::SecondAuthor), Some("B"));
    }

    #[test]
    fn test_case_insensitive_label() {
        let map = FieldExtractor::new().extract(&both("AUTORE: Anonimo"));
        assert_eq!(map.get(Field::Author), Some("Anonimo"));
    }

    #[test]
    fn test_empty_value_tries_next_occurrence() {
        let map = FieldExtractor::new().extract(&both("Autore:\nTitolo: X\nAutore: Y"));
        assert_eq!(map.get(Field::Author), Some("Y"));
        assert_eq!(map.get(Field::Title), Some("X"));
    }

    #[test]
    fn test_blank_label_is_absent() {
        let map = FieldExtractor::new().extract(&both("Autore:   \nTitolo: X"));
        assert!(!map.contains(Field::Author));
    }

    #[test]
    fn test_plain_fallback() {
        let text = AssembledText {
            linked: "Decorazione <a href=\"u\" target=\"_blank\">iniziali</a>".to_string(),
            plain: "Decorazione: iniziali".to_string(),
        };
        let map = FieldExtractor::new().extract(&text);
        assert_eq!(map.get(Field::Decoration), Some("iniziali"));
    }

    #[test]
    fn test_value_on_following_line() {
        let map = FieldExtractor::new().extract(&both("Titolo:\nDe Civitate Dei\nAutore: Agostino"));
        assert_eq!(map.get(Field::Title), Some("De Civitate Dei"));
    }

    #[test]
    fn test_lowercase_line_continues_value() {
        // Only capitalised labels end a value; the label itself still matches case-insensitively
        let map = FieldExtractor::new().extract(&both("Descrizione fisica: cc. 10\nlegatura: pelle"));
        assert_eq!(map.get(Field::PhysicalDescription), Some("cc. 10 legatura: pelle"));
        assert_eq!(map.get(Field::Binding), Some("pelle"));
    }

    #[test]
    fn test_unknown_labels_not_captured() {
        let map = FieldExtractor::new().extract(&both("Note: qualcosa\nTitolo: T\nProvenienza: X"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(Field::Title), Some("T"));
    }

    #[test]
    fn test_no_labels_is_empty() {
        let map = FieldExtractor::new().extract(&both("Testo libero senza etichette."));
        assert!(map.is_empty());
    }

    #[test]
    fn test_restricted_vocabulary() {
        let extractor = FieldExtractor::with_fields([Field::Title]);
        let map = extractor.extract(&both("Autore: A\nTitolo: T"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(Field::Title), Some("T"));
    }
}
