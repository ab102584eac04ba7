use crate::catalog::schema;
use crate::types::*;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

/// Storage abstraction for the item catalog and its descriptions
pub trait CatalogStore {
    // Items
    fn find_item_exact(
        &self,
        collection_id: CollectionId,
        call_number: &str,
    ) -> rusqlite::Result<Option<CatalogItem>>;
    fn list_items(&self, collection_id: CollectionId) -> rusqlite::Result<Vec<CatalogItem>>;
    fn insert_item(
        &self,
        collection_id: CollectionId,
        call_number: &str,
        author: &str,
    ) -> rusqlite::Result<CatalogItem>;

    // Descriptions
    fn find_description(
        &self,
        item_id: ItemId,
        language: &str,
    ) -> rusqlite::Result<Option<Description>>;
    fn insert_description(
        &self,
        item_id: ItemId,
        collection_id: CollectionId,
        call_number: &str,
        language: &str,
        fields: &FieldMap,
    ) -> rusqlite::Result<i64>;
    /// Set exactly the columns in `fields` and refresh `updated_at`
    fn update_description(&self, description_id: i64, fields: &FieldMap) -> rusqlite::Result<()>;

    // Introspection
    fn count_descriptions(&self) -> rusqlite::Result<Vec<(CollectionId, usize)>>;
}

/// SQLite-backed catalog over a borrowed connection (or transaction)
pub struct SqliteCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCatalog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

fn item_from_row(row: &Row) -> rusqlite::Result<CatalogItem> {
    Ok(CatalogItem {
        item_id: row.get(0)?,
        collection_id: row.get(1)?,
        call_number: row.get(2)?,
        author: row.get(3)?,
    })
}

const DESCRIPTION_IDENTITY_COLUMNS: &str =
    "description_id, item_id, collection_id, call_number, language, created_at, updated_at";

fn description_from_row(row: &Row) -> rusqlite::Result<Description> {
    let mut fields = FieldMap::new();
    for (i, field) in Field::ALL.iter().enumerate() {
        if let Some(value) = row.get::<_, Option<String>>(7 + i)? {
            fields.insert(*field, value);
        }
    }

    Ok(Description {
        description_id: row.get(0)?,
        item_id: row.get(1)?,
        collection_id: row.get(2)?,
        call_number: row.get(3)?,
        language: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        fields,
    })
}

impl CatalogStore for SqliteCatalog<'_> {
    fn find_item_exact(
        &self,
        collection_id: CollectionId,
        call_number: &str,
    ) -> rusqlite::Result<Option<CatalogItem>> {
        self.conn
            .query_row(
                "SELECT item_id, collection_id, call_number, author FROM items
                 WHERE collection_id = ?1 AND UPPER(call_number) = UPPER(?2)
                 ORDER BY item_id LIMIT 1",
                params![collection_id, call_number],
                item_from_row,
            )
            .optional()
    }

    fn list_items(&self, collection_id: CollectionId) -> rusqlite::Result<Vec<CatalogItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, collection_id, call_number, author FROM items
             WHERE collection_id = ?1 ORDER BY item_id",
        )?;
        let items = stmt
            .query_map(params![collection_id], item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    fn insert_item(
        &self,
        collection_id: CollectionId,
        call_number: &str,
        author: &str,
    ) -> rusqlite::Result<CatalogItem> {
        self.conn.execute(
            "INSERT INTO items (collection_id, call_number, author) VALUES (?1, ?2, ?3)",
            params![collection_id, call_number, author],
        )?;

        Ok(CatalogItem {
            item_id: self.conn.last_insert_rowid(),
            collection_id,
            call_number: call_number.to_string(),
            author: Some(author.to_string()),
        })
    }

    fn find_description(
        &self,
        item_id: ItemId,
        language: &str,
    ) -> rusqlite::Result<Option<Description>> {
        let field_columns: Vec<&str> = Field::ALL.iter().map(|f| f.column()).collect();
        let sql = format!(
            "SELECT {DESCRIPTION_IDENTITY_COLUMNS}, {} FROM descriptions
             WHERE item_id = ?1 AND language = ?2",
            field_columns.join(", ")
        );

        self.conn
            .query_row(&sql, params![item_id, language], description_from_row)
            .optional()
    }

    fn insert_description(
        &self,
        item_id: ItemId,
        collection_id: CollectionId,
        call_number: &str,
        language: &str,
        fields: &FieldMap,
    ) -> rusqlite::Result<i64> {
        let mut columns = vec!["item_id", "collection_id", "call_number", "language"];
        let mut values = vec![
            Value::Integer(item_id),
            Value::Integer(collection_id),
            Value::Text(call_number.to_string()),
            Value::Text(language.to_string()),
        ];
        for (field, value) in fields.iter() {
            columns.push(field.column());
            values.push(Value::Text(value.to_string()));
        }

        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO descriptions ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_description(&self, description_id: i64, fields: &FieldMap) -> rusqlite::Result<()> {
        let mut assignments = Vec::with_capacity(fields.len() + 1);
        let mut values = Vec::with_capacity(fields.len() + 1);
        for (i, (field, value)) in fields.iter().enumerate() {
            assignments.push(format!("{} = ?{}", field.column(), i + 1));
            values.push(Value::Text(value.to_string()));
        }
        assignments.push("updated_at = CURRENT_TIMESTAMP".to_string());
        values.push(Value::Integer(description_id));

        let sql = format!(
            "UPDATE descriptions SET {} WHERE description_id = ?{}",
            assignments.join(", "),
            values.len()
        );

        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    fn count_descriptions(&self) -> rusqlite::Result<Vec<(CollectionId, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection_id, COUNT(*) FROM descriptions
             GROUP BY collection_id ORDER BY collection_id",
        )?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(counts)
    }
}
