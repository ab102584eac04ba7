use crate::config::CollectionRule;
use crate::types::*;
use regex::Regex;
use std::sync::LazyLock;

static SCHEDA_FILENAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Scheda descrittiva_([A-Za-z0-9()]+)_VERIFICATA").unwrap()
});

/// Derives a write-up's collection from the call number encoded in its filename.
///
/// The collection is picked by the call number's leading digit through a
/// fixed lookup table; adding a collection means adding a table row.
pub struct CollectionClassifier {
    rules: Vec<CollectionRule>,
}

impl Default for CollectionClassifier {
    fn default() -> Self {
        Self::new(crate::config::SyncConfig::default().collections)
    }
}

impl CollectionClassifier {
    pub fn new(rules: Vec<CollectionRule>) -> Self {
        Self { rules }
    }

    /// Call number token between the marker prefix and the verification suffix, uppercased
    pub fn extract_call_number(filename: &str) -> Option<String> {
        SCHEDA_FILENAME_REGEX
            .captures(filename)
            .map(|caps| caps[1].to_uppercase())
    }

    /// Classify a filename; `None` when the marker pattern is absent or the
    /// leading digit is not in the table
    pub fn classify(&self, filename: &str) -> Option<Classification> {
        let call_number = Self::extract_call_number(filename)?;
        let leading = call_number.chars().next()?;

        let rule = self.rules.iter().find(|r| r.leading_digit == leading)?;

        Some(Classification {
            collection: rule.collection(),
            call_number,
        })
    }

    pub fn collections(&self) -> impl Iterator<Item = Collection> + '_ {
        self.rules.iter().map(CollectionRule::collection)
    }
}
