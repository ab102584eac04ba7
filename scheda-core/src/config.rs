use crate::catalog::DEFAULT_LANGUAGE;
use crate::types::Collection;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_author() -> String {
    "Unknown".to_string()
}

fn default_descriptions_folder() -> PathBuf {
    PathBuf::from("descriptions")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("public/data/collections.db")
}

fn default_items_root() -> PathBuf {
    PathBuf::from("books")
}

fn default_collections() -> Vec<CollectionRule> {
    vec![
        CollectionRule {
            leading_digit: '5',
            name: "cinquecentine".to_string(),
            collection_id: 4,
        },
        CollectionRule {
            leading_digit: '4',
            name: "incunaboli".to_string(),
            collection_id: 3,
        },
    ]
}

/// Runtime configuration for a sync run. Passed explicitly into every
/// entry point; nothing here is held in process-wide state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Folder holding the `Scheda descrittiva_*_VERIFICATA.docx` write-ups
    #[serde(default = "default_descriptions_folder")]
    pub descriptions_folder: PathBuf,
    /// SQLite catalog file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    /// Parent folder of per-item folders (watched for new directories)
    #[serde(default = "default_items_root")]
    pub items_root: PathBuf,
    /// Language tag of the description rows written by this run
    #[serde(default = "default_language")]
    pub language: String,
    /// Create catalog items that no existing call number matches
    #[serde(default = "default_true")]
    pub create_missing_items: bool,
    /// Author stored on items created by the matcher
    #[serde(default = "default_author")]
    pub default_author: String,
    /// How existing description rows are updated
    #[serde(default)]
    pub update_policy: UpdatePolicy,
    /// Leading-digit table used to classify filenames into collections
    #[serde(default = "default_collections")]
    pub collections: Vec<CollectionRule>,
    /// Log per-stage timings for every document
    #[serde(default)]
    pub profile: bool,
}

/// One row of the leading-digit classification table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRule {
    pub leading_digit: char,
    pub name: String,
    pub collection_id: i64,
}

impl CollectionRule {
    pub fn collection(&self) -> Collection {
        Collection {
            name: self.name.clone(),
            id: self.collection_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Every extracted column is written on update
    #[default]
    Overwrite,
    /// Only non-empty values that differ from the stored value are written
    NonEmptyOnly,
}

impl SyncConfig {
    /// Load config from file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SyncConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}, using defaults", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Copy of this config pointed at a different folder and catalog
    pub fn with_paths(&self, folder: impl Into<PathBuf>, database: impl Into<PathBuf>) -> Self {
        Self {
            descriptions_folder: folder.into(),
            database_path: database.into(),
            ..self.clone()
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            descriptions_folder: default_descriptions_folder(),
            database_path: default_database_path(),
            items_root: default_items_root(),
            language: default_language(),
            create_missing_items: true,
            default_author: default_author(),
            update_policy: UpdatePolicy::default(),
            collections: default_collections(),
            profile: false,
        }
    }
}
