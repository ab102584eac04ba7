use crate::catalog::{
    ensure_schema, open_catalog, CatalogMatcher, CatalogStore, DescriptionReconciler,
    SqliteCatalog,
};
use crate::classifier::CollectionClassifier;
use crate::config::SyncConfig;
use crate::error::{DocumentError, ReadError, SyncError};
use crate::extraction::{extract_field, AssembledText, FieldExtractor, TextAssembler};
use crate::preprocessors::{DocumentReader, DocxReader};
use crate::types::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Intermediate outputs of reading one write-up.
/// Used by diagnostics and tests to inspect each boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedDocument {
    pub linked_text: String,
    pub plain_text: String,
    pub fields: FieldMap,
}

/// Simple profiler that accumulates timings per pipeline step across a batch
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        debug!("{}: {}µs", step_name, elapsed.as_micros());
        match self.timings.iter_mut().find(|(name, _)| name == step_name) {
            Some((_, total)) => *total += elapsed,
            None => self.timings.push((step_name.to_string(), elapsed)),
        }

        result
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                "{:.<30} {}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        info!("{:.<30} {}ms", "Total", total.as_millis());
    }
}

/// Batch driver: classify → match → read/extract → reconcile, for every
/// write-up in a folder, inside one catalog transaction.
pub struct DescriptionProcessor {
    reader: Box<dyn DocumentReader + Send + Sync>,
    assembler: TextAssembler,
    extractor: FieldExtractor,
}

impl Default for DescriptionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptionProcessor {
    /// Processor with the DOCX reader
    pub fn new() -> Self {
        Self::new_with_dependencies(Box::new(DocxReader::new()))
    }

    /// Create DescriptionProcessor with an injected reader
    pub fn new_with_dependencies(reader: Box<dyn DocumentReader + Send + Sync>) -> Self {
        Self {
            reader,
            assembler: TextAssembler::new(),
            extractor: FieldExtractor::new(),
        }
    }

    /// Read one write-up and run it through assembly and field extraction
    pub fn extract_file(&self, path: &Path) -> Result<ExtractedDocument, ReadError> {
        self.extract_file_with_profiler(path, &mut StepProfiler::new(false))
    }

    fn extract_file_with_profiler(
        &self,
        path: &Path,
        profiler: &mut StepProfiler,
    ) -> Result<ExtractedDocument, ReadError> {
        let bytes = std::fs::read(path)?;
        let markup = profiler.time_step("1. Container → Markup", || self.reader.read_markup(&bytes))?;
        let document =
            profiler.time_step("2. Markup → Paragraphs", || self.reader.parse_markup(&markup))?;
        let assembled = profiler.time_step("3. Text Assembly", || self.assembler.assemble(&document));
        let fields = profiler.time_step("4. Field Extraction", || self.extractor.extract(&assembled));

        let AssembledText { linked, plain } = assembled;
        Ok(ExtractedDocument {
            linked_text: linked,
            plain_text: plain,
            fields,
        })
    }

    /// Write-ups in `folder` the reader accepts, in file name order
    pub fn list_documents(&self, folder: &Path) -> Result<Vec<PathBuf>, SyncError> {
        let folder_error = |source| SyncError::Folder {
            folder: folder.to_path_buf(),
            source,
        };

        let mut documents = Vec::new();
        for entry in std::fs::read_dir(folder).map_err(folder_error)? {
            let path = entry.map_err(folder_error)?.path();
            let is_lock_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("~$"))
                .unwrap_or(false);
            if path.is_file() && !is_lock_file && self.reader.supports_file_type(&path) {
                documents.push(path);
            }
        }
        documents.sort();
        Ok(documents)
    }

    /// Sync every write-up in `config.descriptions_folder` into `config.database_path`
    pub fn process_folder(&self, config: &SyncConfig) -> Result<BatchSummary, SyncError> {
        let mut summary = BatchSummary::new();
        let database = config.database_path.as_path();

        let mut conn = open_catalog(database, false)?;
        ensure_schema(&conn, database)?;

        let classifier = CollectionClassifier::new(config.collections.clone());
        let documents = self.list_documents(&config.descriptions_folder)?;
        info!(
            "Syncing {} write-ups from {} into {} with {} reader (run {})",
            documents.len(),
            config.descriptions_folder.display(),
            database.display(),
            self.reader.name(),
            summary.run_id
        );

        let tx = conn.transaction()?;
        {
            let catalog = SqliteCatalog::new(&tx);
            log_collection_counts(&catalog, &classifier)?;

            let mut profiler = StepProfiler::new(config.profile);
            for path in &documents {
                self.process_document(path, &classifier, &catalog, config, &mut profiler, &mut summary);
            }
            profiler.log_summary();
        }
        tx.commit()?;

        summary.finish();
        info!(
            "Run {} done: {} processed, {} inserted, {} updated, {} unchanged, {} items created, {} not found, {} skipped, {} empty, {} errors",
            summary.run_id,
            summary.processed,
            summary.inserted,
            summary.updated,
            summary.unchanged,
            summary.books_created,
            summary.not_found,
            summary.skipped,
            summary.empty,
            summary.errors.len()
        );
        Ok(summary)
    }

    /// Run `process_folder` on every immediate subdirectory of `config.items_root`
    pub fn process_item_folders(&self, config: &SyncConfig) -> Result<BatchSummary, SyncError> {
        let root = config.items_root.as_path();
        let folder_error = |source| SyncError::Folder {
            folder: root.to_path_buf(),
            source,
        };

        let mut folders = Vec::new();
        for entry in std::fs::read_dir(root).map_err(folder_error)? {
            let path = entry.map_err(folder_error)?.path();
            if path.is_dir() {
                folders.push(path);
            }
        }
        folders.sort();

        let mut total = BatchSummary::new();
        for folder in folders {
            let folder_config = config.with_paths(&folder, &config.database_path);
            total.merge(self.process_folder(&folder_config)?);
        }
        total.finish();
        Ok(total)
    }

    /// One document; every failure lands on the summary instead of aborting the run
    fn process_document(
        &self,
        path: &Path,
        classifier: &CollectionClassifier,
        catalog: &dyn CatalogStore,
        config: &SyncConfig,
        profiler: &mut StepProfiler,
        summary: &mut BatchSummary,
    ) {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(classification) = classifier.classify(&filename) else {
            let err = DocumentError::Unclassified {
                filename: filename.clone(),
            };
            warn!("{}", err);
            summary.skipped += 1;
            summary.errors.push(err.to_string());
            return;
        };
        let collection = &classification.collection;
        info!(
            "Processing {} ({} #{}, call number {})",
            filename, collection.name, collection.id, classification.call_number
        );

        // Read before matching so unusable write-ups never create items
        let extracted = match self.extract_file_with_profiler(path, profiler) {
            Ok(extracted) => extracted,
            Err(source) => {
                let err = DocumentError::Read {
                    filename: filename.clone(),
                    source,
                };
                error!("{}", err);
                summary.errors.push(err.to_string());
                return;
            }
        };

        if extracted.fields.is_empty() {
            warn!("No metadata extracted from {}", filename);
            summary.empty += 1;
            return;
        }

        // New items take the write-up's author, without anchor markup
        let author = extract_field(Field::Author, &extracted.plain_text);
        let matcher = CatalogMatcher::new(catalog, config.create_missing_items)
            .with_default_author(config.default_author.clone());
        let outcome = profiler.time_step("5. Catalog Match", || {
            matcher.match_or_create(&classification.call_number, collection.id, author.as_deref())
        });
        let item = match outcome {
            Ok(MatchOutcome::Matched { item, status }) => {
                if status == MatchStatus::Created {
                    summary.books_created += 1;
                }
                item
            }
            Ok(MatchOutcome::NotFound) => {
                warn!(
                    "No item in {} for call number {}",
                    collection.name, classification.call_number
                );
                summary.not_found += 1;
                return;
            }
            Err(source) => {
                let err = DocumentError::Store {
                    call_number: classification.call_number.clone(),
                    source,
                };
                error!("{}", err);
                summary.errors.push(err.to_string());
                return;
            }
        };

        let reconciler = DescriptionReconciler::new(catalog, config.update_policy);
        let action = profiler.time_step("6. Reconcile", || {
            reconciler.reconcile(
                item.item_id,
                collection.id,
                &item.call_number,
                &extracted.fields,
                &config.language,
            )
        });
        match action {
            Ok(action) => {
                info!("{:?} description for {} (item {})", action, item.call_number, item.item_id);
                summary.record_action(action);
            }
            Err(source) => {
                let err = DocumentError::Store {
                    call_number: item.call_number.clone(),
                    source,
                };
                error!("{}", err);
                summary.errors.push(err.to_string());
            }
        }
        summary.processed += 1;
    }
}

fn log_collection_counts(
    catalog: &dyn CatalogStore,
    classifier: &CollectionClassifier,
) -> rusqlite::Result<()> {
    let counts = catalog.count_descriptions()?;
    for collection in classifier.collections() {
        let count = counts
            .iter()
            .find(|(id, _)| *id == collection.id)
            .map(|(_, n)| *n)
            .unwrap_or(0);
        info!(
            "{} descriptions in {} (collection {})",
            count, collection.name, collection.id
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiler_accumulates_by_step() {
        let mut profiler = StepProfiler::new(true);
        profiler.time_step("a", || ());
        profiler.time_step("b", || ());
        profiler.time_step("a", || ());
        assert_eq!(profiler.timings.len(), 2);
        assert_eq!(profiler.timings[0].0, "a");
    }

    #[test]
    fn test_disabled_profiler_records_nothing() {
        let mut profiler = StepProfiler::new(false);
        let value = profiler.time_step("a", || 42);
        assert_eq!(value, 42);
        assert!(profiler.timings.is_empty());
    }

    #[test]
    fn test_list_documents_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "Scheda descrittiva_5B1_VERIFICATA.docx",
            "Scheda descrittiva_5A1_VERIFICATA.doc",
            "~$heda descrittiva_5A1_VERIFICATA.docx",
            "notes.txt",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.docx")).unwrap();

        let documents = DescriptionProcessor::new().list_documents(dir.path()).unwrap();
        let names: Vec<_> = documents
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "Scheda descrittiva_5A1_VERIFICATA.doc",
                "Scheda descrittiva_5B1_VERIFICATA.docx",
            ]
        );
    }

    #[test]
    fn test_missing_folder_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = DescriptionProcessor::new().list_documents(&dir.path().join("absent"));
        assert!(matches!(result, Err(SyncError::Folder { .. })));
    }
}
