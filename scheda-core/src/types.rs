use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

pub type ItemId = i64;
pub type CollectionId = i64;

// ===== RICH DOCUMENT MODEL =====
// Produced by a DocumentReader, consumed read-only by the TextAssembler.

/// A parsed write-up: body-level paragraphs in document order plus the
/// relationship table that hyperlink references resolve against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RichDocument {
    pub paragraphs: Vec<Paragraph>,
    pub relationships: HashMap<String, Relationship>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Plain concatenation of run texts, no markup
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    /// Set when the run is enclosed by a hyperlink annotation
    pub hyperlink: Option<HyperlinkRef>,
}

/// Reference from a run to its enclosing hyperlink. Internal bookmarks
/// carry no relationship id and never resolve to a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HyperlinkRef {
    pub rel_id: Option<String>,
}

impl Run {
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            hyperlink: None,
        }
    }

    pub fn linked(text: &str, rel_id: &str) -> Self {
        Self {
            text: text.to_string(),
            hyperlink: Some(HyperlinkRef {
                rel_id: Some(rel_id.to_string()),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub target: String,
}

// ===== FIELD VOCABULARY =====

/// The closed set of bibliographic fields recognised in a write-up.
/// Declaration order is the extraction order and the column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Author,
    SecondAuthor,
    Title,
    Publication,
    Dimensions,
    Weight,
    Thickness,
    Location,
    Signature,
    Imprint,
    TextLayout,
    Lines,
    Requests,
    Binding,
    LanguageInfo,
    SignificantNames,
    ConditionInfo,
    Decoration,
    PhysicalDescription,
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::Author,
        Field::SecondAuthor,
        Field::Title,
        Field::Publication,
        Field::Dimensions,
        Field::Weight,
        Field::Thickness,
        Field::Location,
        Field::Signature,
        Field::Imprint,
        Field::TextLayout,
        Field::Lines,
        Field::Requests,
        Field::Binding,
        Field::LanguageInfo,
        Field::SignificantNames,
        Field::ConditionInfo,
        Field::Decoration,
        Field::PhysicalDescription,
    ];

    /// Italian label as written in the source documents
    pub fn label(self) -> &'static str {
        match self {
            Field::Author => "Autore",
            Field::SecondAuthor => "Autore secondario",
            Field::Title => "Titolo",
            Field::Publication => "Pubblicazione",
            Field::Dimensions => "Dimensioni",
            Field::Weight => "Peso",
            Field::Thickness => "Spessore dei fogli",
            Field::Location => "Collocazione",
            Field::Signature => "Segnatura",
            Field::Imprint => "Impronta",
            Field::TextLayout => "Disposizione del testo",
            Field::Lines => "Righe",
            Field::Requests => "Richiami",
            Field::Binding => "Legatura",
            Field::LanguageInfo => "Lingua",
            Field::SignificantNames => "Nomi significativi",
            Field::ConditionInfo => "Stato di conservazione",
            Field::Decoration => "Decorazione",
            Field::PhysicalDescription => "Descrizione fisica",
        }
    }

    /// Storage column in the `descriptions` table
    pub fn column(self) -> &'static str {
        match self {
            Field::Author => "author",
            Field::SecondAuthor => "second_author",
            Field::Title => "title",
            Field::Publication => "publication",
            Field::Dimensions => "dimensions",
            Field::Weight => "weight",
            Field::Thickness => "thickness",
            Field::Location => "location",
            Field::Signature => "signature",
            Field::Imprint => "imprint",
            Field::TextLayout => "text_layout",
            Field::Lines => "lines",
            Field::Requests => "requests",
            Field::Binding => "binding",
            Field::LanguageInfo => "language_info",
            Field::SignificantNames => "significant_names",
            Field::ConditionInfo => "condition_info",
            Field::Decoration => "decoration",
            Field::PhysicalDescription => "physical_description",
        }
    }
}

/// Extracted `{field: value}` pairs for one document.
/// Keys can only come from the closed `Field` vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap {
    entries: BTreeMap<Field, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, value: impl Into<String>) -> Option<String> {
        self.entries.insert(field, value.into())
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.entries.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.entries.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.entries.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ===== CATALOG =====

/// A top-level grouping of catalog items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub id: CollectionId,
}

/// Result of classifying a write-up's filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub collection: Collection,
    /// Uppercased call number token as it appears in the filename
    pub call_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_id: ItemId,
    pub collection_id: CollectionId,
    pub call_number: String,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Description {
    pub description_id: i64,
    pub item_id: ItemId,
    pub collection_id: CollectionId,
    pub call_number: String,
    pub language: String,
    pub fields: FieldMap,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Found,
    Created,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    Matched {
        item: CatalogItem,
        status: MatchStatus,
    },
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Inserted,
    Updated,
    NoChanges,
}

// ===== BATCH SUMMARY =====

/// Aggregated outcome of one batch run, returned to callers and printed by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Documents that reached the reconcile step (successfully or not)
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub books_created: usize,
    pub not_found: usize,
    /// Filenames that did not classify
    pub skipped: usize,
    /// Documents with no recognised label
    pub empty: usize,
    pub errors: Vec<String>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            processed: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            books_created: 0,
            not_found: 0,
            skipped: 0,
            empty: 0,
            errors: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn record_action(&mut self, action: ReconcileAction) {
        match action {
            ReconcileAction::Inserted => self.inserted += 1,
            ReconcileAction::Updated => self.updated += 1,
            ReconcileAction::NoChanges => self.unchanged += 1,
        }
    }

    /// Fold another run's counts into this one (used when several folders are processed)
    pub fn merge(&mut self, other: BatchSummary) {
        self.processed += other.processed;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.books_created += other.books_created;
        self.not_found += other.not_found;
        self.skipped += other.skipped;
        self.empty += other.empty;
        self.errors.extend(other.errors);
        if other.finished_at > self.finished_at {
            self.finished_at = other.finished_at;
        }
    }
}

impl Default for BatchSummary {
    fn default() -> Self {
        Self::new()
    }
}
