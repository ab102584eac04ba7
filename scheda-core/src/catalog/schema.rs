//! Catalog schema: opening, precondition check, and the bootstrap migration.
//!
//! The sync engine itself never creates tables. `bootstrap` is the separate
//! migration step run by `scheda migrate`.

use crate::error::SyncError;
use crate::types::Field;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

pub const ITEMS_TABLE: &str = "items";
pub const DESCRIPTIONS_TABLE: &str = "descriptions";

const ITEMS_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS items (
    item_id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection_id INTEGER NOT NULL,
    call_number TEXT NOT NULL,
    author TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_items_collection_call_number
    ON items(collection_id, UPPER(call_number));
";

const DESCRIPTIONS_INDEXES: &str = r"
CREATE INDEX IF NOT EXISTS idx_descriptions_item_id ON descriptions(item_id);
CREATE INDEX IF NOT EXISTS idx_descriptions_collection_id ON descriptions(collection_id);
CREATE INDEX IF NOT EXISTS idx_descriptions_call_number ON descriptions(call_number);
";

/// `CREATE TABLE` for descriptions, one TEXT column per vocabulary field
fn descriptions_schema() -> String {
    let field_columns: String = Field::ALL
        .iter()
        .map(|f| format!("    {} TEXT,\n", f.column()))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS descriptions (
    description_id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL,
    collection_id INTEGER NOT NULL,
    call_number TEXT NOT NULL,
    language TEXT NOT NULL DEFAULT 'it',
{field_columns}    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (item_id) REFERENCES items(item_id) ON DELETE CASCADE,
    UNIQUE(item_id, language)
);
"
    )
}

/// What the bootstrap migration did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub created_items: bool,
    pub created_descriptions: bool,
    /// Column names of `descriptions` after the migration
    pub description_columns: Vec<String>,
}

/// Open a catalog with foreign keys enforced.
///
/// With `create == false` a missing database file is an open error rather
/// than a fresh empty file.
pub fn open_catalog(path: &Path, create: bool) -> Result<Connection, SyncError> {
    let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    if create {
        flags |= OpenFlags::SQLITE_OPEN_CREATE;
    }

    let open_error = |source| SyncError::Open {
        database: path.to_path_buf(),
        source,
    };

    let conn = Connection::open_with_flags(path, flags).map_err(open_error)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(open_error)?;
    Ok(conn)
}

pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
}

/// Fail with `SchemaMissing` unless the descriptions table is present
pub fn ensure_schema(conn: &Connection, database: &Path) -> Result<(), SyncError> {
    if table_exists(conn, DESCRIPTIONS_TABLE)? {
        Ok(())
    } else {
        Err(SyncError::SchemaMissing {
            table: DESCRIPTIONS_TABLE.to_string(),
            database: database.to_path_buf(),
        })
    }
}

fn column_names(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Create whichever catalog tables are missing. Existing tables are left as they are.
pub fn bootstrap(conn: &Connection) -> rusqlite::Result<MigrationReport> {
    let mut report = MigrationReport::default();

    if !table_exists(conn, ITEMS_TABLE)? {
        conn.execute_batch(ITEMS_SCHEMA)?;
        report.created_items = true;
    }

    if !table_exists(conn, DESCRIPTIONS_TABLE)? {
        conn.execute_batch(&descriptions_schema())?;
        report.created_descriptions = true;
    }
    conn.execute_batch(DESCRIPTIONS_INDEXES)?;

    report.description_columns = column_names(conn, DESCRIPTIONS_TABLE)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_fresh_database() {
        let conn = Connection::open_in_memory().unwrap();
        let report = bootstrap(&conn).unwrap();

        assert!(report.created_items);
        assert!(report.created_descriptions);
        for field in Field::ALL {
            assert!(
                report.description_columns.iter().any(|c| c == field.column()),
                "missing column {}",
                field.column()
            );
        }
        assert_eq!(report.description_columns.len(), 5 + Field::ALL.len() + 2);
    }

    #[test]
    fn test_bootstrap_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        bootstrap(&conn).unwrap();
        let second = bootstrap(&conn).unwrap();
        assert!(!second.created_items);
        assert!(!second.created_descriptions);
    }

    #[test]
    fn test_ensure_schema() {
        let conn = Connection::open_in_memory().unwrap();
        let missing = ensure_schema(&conn, Path::new("catalog.db"));
        assert!(matches!(
            missing,
            Err(SyncError::SchemaMissing { ref table, .. }) if table == "descriptions"
        ));

        bootstrap(&conn).unwrap();
        assert!(ensure_schema(&conn, Path::new("catalog.db")).is_ok());
    }

    #[test]
    fn test_open_without_create_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        assert!(matches!(open_catalog(&path, false), Err(SyncError::Open { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_unique_call_number_per_collection() {
        let conn = Connection::open_in_memory().unwrap();
        bootstrap(&conn).unwrap();
        conn.execute(
            "INSERT INTO items (collection_id, call_number) VALUES (4, '5A1')",
            [],
        )
        .unwrap();
        let duplicate = conn.execute(
            "INSERT INTO items (collection_id, call_number) VALUES (4, '5a1')",
            [],
        );
        assert!(duplicate.is_err());
    }
}
