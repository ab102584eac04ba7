use crate::catalog::store::CatalogStore;
use crate::config::UpdatePolicy;
use crate::types::*;
use tracing::debug;

pub const DEFAULT_LANGUAGE: &str = "it";

/// Upserts an extracted field map into the `(item, language)` description row
pub struct DescriptionReconciler<'a> {
    store: &'a dyn CatalogStore,
    policy: UpdatePolicy,
}

impl<'a> DescriptionReconciler<'a> {
    pub fn new(store: &'a dyn CatalogStore, policy: UpdatePolicy) -> Self {
        Self { store, policy }
    }

    pub fn reconcile(
        &self,
        item_id: ItemId,
        collection_id: CollectionId,
        call_number: &str,
        fields: &FieldMap,
        language: &str,
    ) -> rusqlite::Result<ReconcileAction> {
        let Some(existing) = self.store.find_description(item_id, language)? else {
            self.store
                .insert_description(item_id, collection_id, call_number, language, fields)?;
            return Ok(ReconcileAction::Inserted);
        };

        let changes = self.changes(&existing, fields);
        if changes.is_empty() {
            debug!("No changes for {} ({})", call_number, language);
            return Ok(ReconcileAction::NoChanges);
        }

        self.store
            .update_description(existing.description_id, &changes)?;
        Ok(ReconcileAction::Updated)
    }

    /// Columns to write for an existing row under the configured policy
    fn changes(&self, existing: &Description, fields: &FieldMap) -> FieldMap {
        match self.policy {
            UpdatePolicy::Overwrite => fields.clone(),
            UpdatePolicy::NonEmptyOnly => {
                let mut changes = FieldMap::new();
                for (field, value) in fields.iter() {
                    if !value.trim().is_empty() && existing.fields.get(field) != Some(value) {
                        changes.insert(field, value);
                    }
                }
                changes
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{schema, SqliteCatalog};
    use rusqlite::Connection;

    fn catalog_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        schema::bootstrap(&conn).unwrap();
        conn
    }

    fn fields(pairs: &[(Field, &str)]) -> FieldMap {
        let mut map = FieldMap::new();
        for (field, value) in pairs {
            map.insert(*field, *value);
        }
        map
    }

    fn description_rows(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM descriptions", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_overwrite_insert_then_update() {
        let conn = catalog_db();
        let store = SqliteCatalog::new(&conn);
        let item = store.insert_item(4, "5A1", "Unknown").unwrap();
        let reconciler = DescriptionReconciler::new(&store, UpdatePolicy::Overwrite);
        let map = fields(&[(Field::Author, "Jane Doe"), (Field::Title, "De Civitate")]);

        let first = reconciler.reconcile(item.item_id, 4, "5A1", &map, "it").unwrap();
        let second = reconciler.reconcile(item.item_id, 4, "5A1", &map, "it").unwrap();

        assert_eq!(first, ReconcileAction::Inserted);
        assert_eq!(second, ReconcileAction::Updated);
        assert_eq!(description_rows(&conn), 1);
    }

    #[test]
    fn test_non_empty_only_insert_then_no_changes() {
        let conn = catalog_db();
        let store = SqliteCatalog::new(&conn);
        let item = store.insert_item(4, "5A1", "Unknown").unwrap();
        let reconciler = DescriptionReconciler::new(&store, UpdatePolicy::NonEmptyOnly);
        let map = fields(&[(Field::Author, "Jane Doe"), (Field::Title, "De Civitate")]);

        let first = reconciler.reconcile(item.item_id, 4, "5A1", &map, "it").unwrap();
        let second = reconciler.reconcile(item.item_id, 4, "5A1", &map, "it").unwrap();

        assert_eq!(first, ReconcileAction::Inserted);
        assert_eq!(second, ReconcileAction::NoChanges);
        assert_eq!(description_rows(&conn), 1);
    }

    #[test]
    fn test_non_empty_only_keeps_stored_value() {
        let conn = catalog_db();
        let store = SqliteCatalog::new(&conn);
        let item = store.insert_item(4, "5A1", "Unknown").unwrap();
        let reconciler = DescriptionReconciler::new(&store, UpdatePolicy::NonEmptyOnly);

        reconciler
            .reconcile(item.item_id, 4, "5A1", &fields(&[(Field::Title, "De Civitate")]), "it")
            .unwrap();
        let action = reconciler
            .reconcile(
                item.item_id,
                4,
                "5A1",
                &fields(&[(Field::Title, "  "), (Field::Binding, "pergamena")]),
                "it",
            )
            .unwrap();

        assert_eq!(action, ReconcileAction::Updated);
        let stored = store.find_description(item.item_id, "it").unwrap().unwrap();
        assert_eq!(stored.fields.get(Field::Title), Some("De Civitate"));
        assert_eq!(stored.fields.get(Field::Binding), Some("pergamena"));
    }

    #[test]
    fn test_overwrite_replaces_values() {
        let conn = catalog_db();
        let store = SqliteCatalog::new(&conn);
        let item = store.insert_item(4, "5A1", "Unknown").unwrap();
        let reconciler = DescriptionReconciler::new(&store, UpdatePolicy::Overwrite);

        reconciler
            .reconcile(item.item_id, 4, "5A1", &fields(&[(Field::Title, "Old"), (Field::Author, "A")]), "it")
            .unwrap();
        reconciler
            .reconcile(item.item_id, 4, "5A1", &fields(&[(Field::Title, "New")]), "it")
            .unwrap();

        let stored = store.find_description(item.item_id, "it").unwrap().unwrap();
        assert_eq!(stored.fields.get(Field::Title), Some("New"));
        // Columns absent from the map are left alone
        assert_eq!(stored.fields.get(Field::Author), Some("A"));
    }

    #[test]
    fn test_languages_are_separate_rows() {
        let conn = catalog_db();
        let store = SqliteCatalog::new(&conn);
        let item = store.insert_item(4, "5A1", "Unknown").unwrap();
        let reconciler = DescriptionReconciler::new(&store, UpdatePolicy::Overwrite);
        let map = fields(&[(Field::Title, "T")]);

        assert_eq!(
            reconciler.reconcile(item.item_id, 4, "5A1", &map, "it").unwrap(),
            ReconcileAction::Inserted
        );
        assert_eq!(
            reconciler.reconcile(item.item_id, 4, "5A1", &map, "en").unwrap(),
            ReconcileAction::Inserted
        );
        assert_eq!(description_rows(&conn), 2);
    }
}
