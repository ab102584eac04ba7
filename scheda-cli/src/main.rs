use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

// Import from scheda-core
use scheda_core::catalog::{bootstrap, open_catalog};
use scheda_core::{BatchSummary, DescriptionProcessor, SyncConfig, UpdatePolicy};

// Import CLI utilities
use scheda_cli::{FolderWatcher, Job, JobQueue, ToolServer};

#[derive(Parser)]
#[command(name = "scheda")]
#[command(about = "Sync catalog write-ups (DOCX) into the SQLite item catalog")]
struct Args {
    /// Path to config file (YAML format)
    /// Defaults to <config dir>/scheda/config.yaml when that file exists
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log per-stage timings for every document
    #[arg(long, global = true)]
    profile: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync one folder of write-ups into a catalog
    Update {
        /// Folder holding the DOCX write-ups
        #[arg(short, long)]
        folder: Option<PathBuf>,

        /// SQLite catalog file
        #[arg(short, long)]
        database: Option<PathBuf>,

        #[command(flatten)]
        policy: PolicyFlags,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sync every item folder under the items root
    ProcessItems {
        /// Directory whose subfolders each hold one item's write-ups
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// SQLite catalog file
        #[arg(short, long)]
        database: Option<PathBuf>,

        #[command(flatten)]
        policy: PolicyFlags,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch the items root and sync new item folders as they appear
    Watch {
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Serve the sync operations as JSON-RPC tools on stdin/stdout
    Serve,

    /// Create the catalog tables if they are missing
    Migrate {
        #[arg(short, long)]
        database: Option<PathBuf>,
    },

    /// Print the text and fields read from a single write-up
    Extract {
        /// DOCX file to read
        #[arg(short, long)]
        file: PathBuf,
    },
}

/// Update-policy overrides shared by the sync commands
#[derive(clap::Args, Debug, Default)]
struct PolicyFlags {
    /// Only write non-empty values that differ from the stored ones
    #[arg(long)]
    non_empty_only: bool,

    /// Do not create catalog items for unknown call numbers
    #[arg(long)]
    no_create: bool,
}

impl PolicyFlags {
    fn apply(&self, config: &mut SyncConfig) {
        if self.non_empty_only {
            config.update_policy = UpdatePolicy::NonEmptyOnly;
        }
        if self.no_create {
            config.create_missing_items = false;
        }
    }
}

fn main() -> Result<()> {
    // stdout belongs to the tool protocol in serve mode
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = SyncConfig::load_with_fallback(config_path.as_deref());
    if args.profile {
        config.profile = true;
    }

    if !matches!(args.command, Command::Serve) {
        println!("🦀 Scheda Catalog Sync");
        if let Some(path) = &config_path {
            println!("📋 Loaded config from: {}", path);
        } else {
            println!("📋 Using default config");
        }
    }

    match args.command {
        Command::Update {
            folder,
            database,
            policy,
            json,
        } => {
            let mut config = config.with_paths(
                folder.unwrap_or_else(|| config.descriptions_folder.clone()),
                database.unwrap_or_else(|| config.database_path.clone()),
            );
            policy.apply(&mut config);

            println!("📂 Folder: {}", config.descriptions_folder.display());
            println!("🗄️  Catalog: {}", config.database_path.display());

            let processor = DescriptionProcessor::new();
            match processor.process_folder(&config) {
                Ok(summary) => report(&summary, json)?,
                Err(e) => fail(&e),
            }
        }

        Command::ProcessItems {
            root,
            database,
            policy,
            json,
        } => {
            if let Some(root) = root {
                config.items_root = root;
            }
            if let Some(database) = database {
                config.database_path = database;
            }
            policy.apply(&mut config);

            println!("📂 Items root: {}", config.items_root.display());

            let processor = DescriptionProcessor::new();
            match processor.process_item_folders(&config) {
                Ok(summary) => report(&summary, json)?,
                Err(e) => fail(&e),
            }
        }

        Command::Watch { root } => {
            if let Some(root) = root {
                config.items_root = root;
            }

            let (queue, handle) = JobQueue::start(config.clone());
            let _watcher = match FolderWatcher::start(&config.items_root, queue.clone()) {
                Ok(w) => w,
                Err(e) => fail(&format!("{e:#}")),
            };
            println!("👀 Watching: {}", config.items_root.display());
            println!("   New item folders are synced into {}", config.database_path.display());

            // Existing folders first, then whatever appears
            queue.enqueue(Job::ProcessItems)?;

            // Worker runs until the process is killed
            if handle.join().is_err() {
                error!("Job worker panicked, stopping watch");
                fail(&"job worker panicked");
            }
        }

        Command::Migrate { database } => {
            let database = database.unwrap_or_else(|| config.database_path.clone());
            let conn = match open_catalog(&database, true) {
                Ok(c) => c,
                Err(e) => fail(&e),
            };
            let report = bootstrap(&conn)?;

            println!("🗄️  Catalog: {}", database.display());
            println!(
                "   - items table: {}",
                if report.created_items { "created" } else { "present" }
            );
            println!(
                "   - descriptions table: {}",
                if report.created_descriptions { "created" } else { "present" }
            );
            println!("   - description columns: {}", report.description_columns.len());
            for column in &report.description_columns {
                println!("       {}", column);
            }
        }

        Command::Extract { file } => {
            let processor = DescriptionProcessor::new();
            match processor.extract_file(&file) {
                Ok(extracted) => {
                    println!("📄 {}", file.display());
                    println!("{}", serde_json::to_string_pretty(&extracted)?);
                }
                Err(e) => fail(&e),
            }
        }

        Command::Serve => serve(config)?,
    }

    Ok(())
}

fn serve(config: SyncConfig) -> Result<()> {
    let (queue, _handle) = JobQueue::start(config.clone());
    let mut server = ToolServer::new(queue, config);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    server.serve(stdin.lock(), stdout.lock())
}

fn default_config_path() -> Option<String> {
    let path = dirs::config_dir()?.join("scheda").join("config.yaml");
    path.exists().then(|| path.to_string_lossy().into_owned())
}

fn report(summary: &BatchSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("✅ Sync finished");
    println!("📊 Summary:");
    println!("   - Documents processed: {}", summary.processed);
    println!("   - Descriptions inserted: {}", summary.inserted);
    println!("   - Descriptions updated: {}", summary.updated);
    println!("   - Unchanged: {}", summary.unchanged);
    println!("   - Items created: {}", summary.books_created);
    println!("   - Items not found: {}", summary.not_found);
    println!("   - Skipped (unrecognised filename): {}", summary.skipped);
    println!("   - Empty (no labelled fields): {}", summary.empty);

    if !summary.errors.is_empty() {
        println!("⚠️  {} error(s):", summary.errors.len());
        for error in &summary.errors {
            println!("   - {}", error);
        }
    }
    Ok(())
}

fn fail(error: &dyn std::fmt::Display) -> ! {
    eprintln!("❌ {}", error);
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_process_items_accepts_policy_flags() {
        let args = parse(&["scheda", "process-items", "--non-empty-only", "--no-create"]);
        let Command::ProcessItems { policy, .. } = args.command else {
            panic!("expected process-items");
        };

        let mut config = SyncConfig::default();
        policy.apply(&mut config);
        assert_eq!(config.update_policy, UpdatePolicy::NonEmptyOnly);
        assert!(!config.create_missing_items);
    }

    #[test]
    fn test_update_without_flags_keeps_config() {
        let args = parse(&["scheda", "update", "--folder", "f", "--database", "d.db"]);
        let Command::Update { policy, .. } = args.command else {
            panic!("expected update");
        };

        let mut config = SyncConfig::default();
        policy.apply(&mut config);
        assert_eq!(config.update_policy, UpdatePolicy::Overwrite);
        assert!(config.create_missing_items);
    }
}
