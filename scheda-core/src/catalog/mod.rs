//! Item catalog
//!
//! SQLite persistence (`store`), the schema precondition and bootstrap
//! (`schema`), item lookup/creation (`matcher`) and description upserts
//! (`reconciler`).

pub mod matcher;
pub mod reconciler;
pub mod schema;
pub mod store;

pub use matcher::{CatalogMatcher, DEFAULT_AUTHOR};
pub use reconciler::{DescriptionReconciler, DEFAULT_LANGUAGE};
pub use schema::{bootstrap, ensure_schema, open_catalog, MigrationReport};
pub use store::{CatalogStore, SqliteCatalog};
