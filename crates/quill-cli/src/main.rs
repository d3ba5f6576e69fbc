//! quill CLI: organize documents into collections

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use quill_core::ingest::ProgressEvent;
use quill_core::{Config, DocumentId, DocumentRecord, DocumentStore, QUILL_DIR, discover};

/// Reply shown for every question until answering is implemented
const ASK_PLACEHOLDER: &str = "I'm processing your question... (AI integration coming soon!)";

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Organize documents into collections", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new quill library in the current directory
    Init {
        /// Collection to create (repeatable; default: the standard set)
        #[arg(short, long = "collection")]
        collections: Vec<String>,
    },

    /// List collections and their document counts
    Collections,

    /// List documents in a collection
    #[command(alias = "ls")]
    List {
        /// Collection name
        collection: String,
    },

    /// Copy documents into a collection
    Add {
        /// Target collection
        collection: String,

        /// Files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete a document by id
    Rm {
        /// Document id
        id: String,
    },

    /// Sync the ledger with the collection directories and show what changed
    Reconcile,

    /// Ask a question about your documents
    Ask {
        /// The question
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { collections } => cmd_init(collections)?,
        Commands::Collections => cmd_collections()?,
        Commands::List { collection } => cmd_list(&collection)?,
        Commands::Add { collection, files } => cmd_add(&collection, files)?,
        Commands::Rm { id } => cmd_rm(id)?,
        Commands::Reconcile => cmd_reconcile()?,
        Commands::Ask { question } => cmd_ask(&question.join(" ")),
    }

    Ok(())
}

fn open_store() -> Result<DocumentStore> {
    let cwd = std::env::current_dir()?;
    let root = discover::find_quill_root(&cwd)
        .context("Not in a quill library. Run 'quill init' first.")?;

    DocumentStore::open(&root).with_context(|| format!("Failed to open {}", root.display()))
}

fn cmd_init(collections: Vec<String>) -> Result<()> {
    let cwd = std::env::current_dir()?;

    let mut config = Config::default();
    if !collections.is_empty() {
        config.collections = collections;
    }

    let store = DocumentStore::init(&cwd, config)?;

    println!(
        "Initialized quill library in {}",
        store.root().join(QUILL_DIR).display()
    );
    for name in store.collections() {
        println!("  📚 {}", name);
    }
    if !store.records().is_empty() {
        println!("Found {} existing document(s).", store.records().len());
    }

    Ok(())
}

fn cmd_collections() -> Result<()> {
    let store = open_store()?;

    for name in store.collections() {
        let count = store.list_by_collection(name)?.len();
        println!("📚 {:<24} {:>4} document(s)", name, count);
    }

    Ok(())
}

fn cmd_list(collection: &str) -> Result<()> {
    let store = open_store()?;
    let records = store.list_by_collection(collection)?;

    println!("📚 {}\n", collection);

    if records.is_empty() {
        println!("No documents in this collection. Run 'quill add' to add some!");
        return Ok(());
    }

    for record in &records {
        print_record(record);
    }

    Ok(())
}

fn cmd_add(collection: &str, files: Vec<PathBuf>) -> Result<()> {
    let mut store = open_store()?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );

    store.set_progress_callback(Box::new({
        let pb = pb.clone();
        move |event| match event {
            ProgressEvent::Copying {
                current,
                total,
                path,
            } => {
                pb.set_length(total as u64);
                pb.set_position(current as u64);
                pb.set_message(path.to_string_lossy().to_string());
            }
        }
    }));

    let report = store.ingest(&files, collection)?;

    pb.finish_and_clear();

    println!("✓ Added {} document(s) to {}", report.added.len(), collection);
    for record in &report.added {
        print_record(record);
    }
    for (path, reason) in &report.rejected {
        println!("  ✗ {} ({})", path.display(), reason);
    }
    for (path, failure) in &report.failed {
        println!("  ✗ {} ({})", path.display(), failure);
    }

    Ok(())
}

fn cmd_rm(id: String) -> Result<()> {
    let mut store = open_store()?;
    let record = store.delete(&DocumentId::from(id))?;

    println!("✓ Deleted {} from {}", record.name, record.collection);

    Ok(())
}

fn cmd_reconcile() -> Result<()> {
    // opening the store runs reconciliation
    let store = open_store()?;
    let report = store.startup_report();

    println!("✓ Reconciled {}:", store.root().display());
    println!("  Kept:    {}", report.kept);
    println!("  Dropped: {}", report.dropped);
    println!("  Adopted: {}", report.adopted);

    Ok(())
}

fn cmd_ask(question: &str) {
    println!("You: {}\n", question);
    println!("Quill: {}", ASK_PLACEHOLDER);
}

fn print_record(record: &DocumentRecord) {
    println!("  📄 {}  \x1b[2m{}\x1b[0m", record.name, record.id);
}
