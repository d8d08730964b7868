//! LearnPath command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto core use-cases for one vault directory.
//! - Watch a vault and feed change notifications to the propagator.
//!
//! # Invariants
//! - Notifications are handled one at a time on the main thread.
//! - Document bodies are never printed except through `report`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use learnpath_core::{
    init_logging, load_settings, ChangePropagator, DocumentId, DocumentStore, FsDocumentStore,
    ReportService, Resolution, TemplateService, TrackerSettings, SETTINGS_FILE_NAME,
};
use log::warn;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "learnpath")]
#[command(about = "Track topic and subtopic progress in a markdown vault", long_about = None)]
#[command(version)]
struct Cli {
    /// Vault root directory
    #[arg(short, long, default_value = ".")]
    vault: PathBuf,

    /// Settings file (defaults to `learnpath.toml` in the vault root)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log to stderr at this level, overriding the settings file
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List topics with their live progress
    Topics {
        /// Print tab-separated rows instead of a table
        #[arg(long)]
        plain: bool,
    },
    /// Toggle a subtopic's completion and refresh its topic
    Toggle {
        /// Subtopic id (vault-relative path) or name
        subtopic: String,
    },
    /// Print a progress report for a topic or subtopic
    Report {
        /// Document id (vault-relative path) or name
        document: String,
    },
    /// Process a change notification for one document
    Sync {
        /// Document id (vault-relative path) or name
        document: String,
    },
    /// Recompute every topic in the vault
    Rescan,
    /// Create a topic from the built-in template
    NewTopic { name: String },
    /// Create a subtopic and link it into its topic
    NewSubtopic {
        /// Name of the existing topic
        topic: String,
        name: String,
    },
    /// Watch the vault and propagate changes until interrupted
    Watch,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = cli
        .vault
        .canonicalize()
        .with_context(|| format!("vault `{}` is not accessible", cli.vault.display()))?;
    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(|| root.join(SETTINGS_FILE_NAME));
    let mut settings = load_settings(&settings_path)
        .with_context(|| format!("failed to load `{}`", settings_path.display()))?;
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
        settings.logging.stderr = true;
    }
    init_logging(&settings.logging).map_err(anyhow::Error::msg)?;

    let store = FsDocumentStore::open(root.as_path())?;
    run(cli.command, &store, &settings)
}

fn run(command: Commands, store: &FsDocumentStore, settings: &TrackerSettings) -> Result<()> {
    match command {
        Commands::Topics { plain } => {
            let rows = ReportService::new(store, settings).topics_with_progress()?;
            if rows.is_empty() {
                println!("No topics found.");
            }
            for row in rows {
                if plain {
                    println!(
                        "{}\t{}\t{}\t{}",
                        row.id,
                        row.progress_text(),
                        row.completed_count,
                        row.total_count
                    );
                } else {
                    println!(
                        "{:<32} {:>4}%  {}/{}",
                        row.name,
                        row.percent(),
                        row.completed_count,
                        row.total_count
                    );
                }
            }
        }
        Commands::Toggle { subtopic } => {
            let id = resolve_argument(store, &subtopic)?;
            let today = chrono::Local::now().date_naive();
            let outcome = ChangePropagator::new(store, settings).toggle_completion(&id, today)?;
            let state = if outcome.completed {
                "completed"
            } else {
                "reopened"
            };
            println!("{} {state}", outcome.subtopic);
            if let Some(parent) = outcome.parent {
                println!(
                    "{}: {}% ({}/{})",
                    parent.topic,
                    parent.state.percent(),
                    parent.state.completed_count,
                    parent.state.total_count
                );
            }
        }
        Commands::Report { document } => {
            let id = resolve_argument(store, &document)?;
            print!("{}", ReportService::new(store, settings).generate_report(&id)?);
        }
        Commands::Sync { document } => {
            let id = resolve_argument(store, &document)?;
            match ChangePropagator::new(store, settings).on_changed(&id)? {
                Some(refresh) if refresh.changed => println!("{} updated", refresh.topic),
                Some(refresh) => println!("{} unchanged", refresh.topic),
                None => println!("{id} ignored"),
            }
        }
        Commands::Rescan => {
            let summary = ChangePropagator::new(store, settings).rescan_all()?;
            for id in &summary.updated {
                println!("updated {id}");
            }
            for (id, error) in &summary.failures {
                println!("failed {id}: {error}");
            }
            println!(
                "{} updated, {} unchanged, {} failed",
                summary.updated.len(),
                summary.unchanged,
                summary.failures.len()
            );
            if !summary.failures.is_empty() {
                bail!("rescan finished with failures");
            }
        }
        Commands::NewTopic { name } => {
            let id = TemplateService::new(store, settings).create_topic(&name)?;
            println!("created {id}");
        }
        Commands::NewSubtopic { topic, name } => {
            let id = TemplateService::new(store, settings).create_subtopic(&topic, &name)?;
            println!("created {id}");
        }
        Commands::Watch => watch(store, settings)?,
    }
    Ok(())
}

/// Accepts a vault-relative id (`Topics/AWS.md`) or a document name (`AWS`).
fn resolve_argument(store: &FsDocumentStore, argument: &str) -> Result<DocumentId> {
    let candidate = DocumentId::new(argument.trim().replace('\\', "/"));
    if candidate.as_str().ends_with(".md") {
        return Ok(candidate);
    }
    match store.resolve_by_name(argument)? {
        Resolution::Resolved(id) => Ok(id),
        Resolution::Dangling(name) => bail!("no document named `{name}`"),
    }
}

fn watch(store: &FsDocumentStore, settings: &TrackerSettings) -> Result<()> {
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(tx).context("failed to start file watcher")?;
    watcher
        .watch(store.root(), RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch `{}`", store.root().display()))?;
    println!("watching {} (Ctrl+C to stop)", store.root().display());

    let propagator = ChangePropagator::new(store, settings);
    for event in rx {
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                warn!("event=watch module=cli status=error error={err}");
                continue;
            }
        };
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }
        for path in &event.paths {
            handle_path(store, &propagator, path);
        }
    }
    Ok(())
}

fn handle_path(
    store: &FsDocumentStore,
    propagator: &ChangePropagator<'_, FsDocumentStore>,
    path: &Path,
) {
    let Some(id) = store.id_for_path(path) else {
        return;
    };
    match propagator.on_changed(&id) {
        Ok(Some(refresh)) if refresh.changed => println!(
            "{} -> {} {}%",
            id,
            refresh.topic,
            refresh.state.percent()
        ),
        Ok(_) => {}
        Err(err) => warn!("event=watch module=cli status=error id={id} error={err}"),
    }
}
