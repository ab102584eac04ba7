// All catalog processing lives in scheda-core
// This crate adds the long-running front ends around it

// CLI-specific modules
pub mod rpc;
pub mod watcher;
pub mod worker;

// Re-export core types for convenience
pub use scheda_core::*;

// Re-export CLI utilities
pub use rpc::ToolServer;
pub use watcher::FolderWatcher;
pub use worker::{Job, JobQueue, JobResult};
