//! Items-root watcher
//!
//! Every directory created directly under the items root becomes a
//! `ProcessItemFolder` job on the queue.

use crate::worker::{Job, JobQueue};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Keeps the underlying watcher alive; dropping it stops watching
pub struct FolderWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FolderWatcher {
    pub fn start(root: &Path, queue: JobQueue) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Cannot watch {}", root.display()))?;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for job in folder_jobs(&event) {
                    info!("New item folder detected: {:?}", job);
                    if let Err(e) = queue.enqueue(job) {
                        error!("Dropping watcher event: {}", e);
                    }
                }
            }
            Err(e) => error!("Watch error: {}", e),
        })?;
        watcher.watch(&root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Jobs for the directories an event created
pub fn folder_jobs(event: &Event) -> Vec<Job> {
    if !matches!(event.kind, EventKind::Create(_)) {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|p| p.is_dir())
        .map(|p| Job::ProcessItemFolder(p.clone()))
        .collect()
}
