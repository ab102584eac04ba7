//! Single-consumer job queue
//!
//! The watcher and the tool server never run a sync themselves: they submit
//! jobs here and one worker thread drains them in order. Within this process
//! no two runs write the catalog at the same time.

use anyhow::{anyhow, Result};
use scheda_core::{BatchSummary, DescriptionProcessor, SyncConfig, SyncError};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Sync one folder of write-ups into one catalog
    UpdateDescriptions { folder: PathBuf, database: PathBuf },
    /// Sync every item folder under the configured items root
    ProcessItems,
    /// Sync a single (usually newly created) item folder
    ProcessItemFolder(PathBuf),
}

pub type JobResult = std::result::Result<BatchSummary, SyncError>;

struct Envelope {
    job: Job,
    reply: Option<mpsc::Sender<JobResult>>,
}

/// Sending side of the queue. Cheap to clone; the worker exits once every
/// clone has been dropped.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Envelope>,
}

impl JobQueue {
    /// Spawn the worker thread and return the queue feeding it
    pub fn start(config: SyncConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<Envelope>();

        let handle = std::thread::spawn(move || {
            let processor = DescriptionProcessor::new();
            for envelope in rx {
                let result = execute(&processor, &config, &envelope.job);
                match &result {
                    Ok(summary) => info!(
                        "{:?} finished: {} processed, {} errors",
                        envelope.job,
                        summary.processed,
                        summary.errors.len()
                    ),
                    Err(e) => error!("{:?} failed: {}", envelope.job, e),
                }
                if let Some(reply) = envelope.reply {
                    // Caller may have given up waiting
                    let _ = reply.send(result);
                }
            }
            info!("Job queue closed, worker exiting");
        });

        (Self { tx }, handle)
    }

    /// Fire and forget
    pub fn enqueue(&self, job: Job) -> Result<()> {
        self.tx
            .send(Envelope { job, reply: None })
            .map_err(|_| anyhow!("job worker has stopped"))
    }

    /// Submit a job and get a receiver for its result
    pub fn submit(&self, job: Job) -> Result<mpsc::Receiver<JobResult>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(Envelope {
                job,
                reply: Some(reply_tx),
            })
            .map_err(|_| anyhow!("job worker has stopped"))?;
        Ok(reply_rx)
    }

    /// Submit a job and block until the worker has run it
    pub fn run(&self, job: Job) -> Result<JobResult> {
        self.submit(job)?
            .recv()
            .map_err(|_| anyhow!("job worker stopped before replying"))
    }
}

fn execute(processor: &DescriptionProcessor, config: &SyncConfig, job: &Job) -> JobResult {
    match job {
        Job::UpdateDescriptions { folder, database } => {
            processor.process_folder(&config.with_paths(folder, database))
        }
        Job::ProcessItems => processor.process_item_folders(config),
        Job::ProcessItemFolder(folder) => {
            processor.process_folder(&config.with_paths(folder, &config.database_path))
        }
    }
}
