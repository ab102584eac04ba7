use crate::catalog::store::CatalogStore;
use crate::normalize::same_call_number;
use crate::types::*;
use tracing::{debug, info};

pub const DEFAULT_AUTHOR: &str = "Unknown";

/// Finds the catalog item a call number identifies, creating it when allowed.
///
/// Lookup order: exact (case-insensitive) match, then a linear scan of the
/// collection comparing normalized call numbers. The first pass always wins.
pub struct CatalogMatcher<'a> {
    store: &'a dyn CatalogStore,
    create_missing: bool,
    default_author: String,
}

impl<'a> CatalogMatcher<'a> {
    pub fn new(store: &'a dyn CatalogStore, create_missing: bool) -> Self {
        Self {
            store,
            create_missing,
            default_author: DEFAULT_AUTHOR.to_string(),
        }
    }

    pub fn with_default_author(mut self, author: impl Into<String>) -> Self {
        self.default_author = author.into();
        self
    }

    pub fn match_or_create(
        &self,
        call_number: &str,
        collection_id: CollectionId,
        default_author: Option<&str>,
    ) -> rusqlite::Result<MatchOutcome> {
        if let Some(item) = self.store.find_item_exact(collection_id, call_number)? {
            return Ok(MatchOutcome::Matched {
                item,
                status: MatchStatus::Found,
            });
        }

        let normalized_hit = self
            .store
            .list_items(collection_id)?
            .into_iter()
            .find(|item| same_call_number(&item.call_number, call_number));

        if let Some(item) = normalized_hit {
            debug!(
                "Matched {} to stored call number {} (item {})",
                call_number, item.call_number, item.item_id
            );
            return Ok(MatchOutcome::Matched {
                item,
                status: MatchStatus::Found,
            });
        }

        if !self.create_missing {
            return Ok(MatchOutcome::NotFound);
        }

        let author = default_author.unwrap_or(&self.default_author);
        let item = self.store.insert_item(collection_id, call_number, author)?;
        info!(
            "Created catalog item {} for {} in collection {}",
            item.item_id, call_number, collection_id
        );

        Ok(MatchOutcome::Matched {
            item,
            status: MatchStatus::Created,
        })
    }
}
