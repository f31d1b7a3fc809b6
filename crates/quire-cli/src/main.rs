//! quire: replay a scripted editing session against an in-memory chapter.
//!
//! Usage:
//!   quire --chapter chapter.json --script steps.json
//!   quire --chapter chapter.json --script steps.json --config editor.ron --decline
//!
//! The final chapter is printed to stdout as JSON. Logs go to stderr; set
//! `RUST_LOG` to override the default filter.

mod script;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use quire_session::{
    AlwaysConfirm, Clipboard, Collaborators, Confirmation, EditingStore, EditorConfig,
    MemoryWorld, NeverConfirm,
};
use quire_types::Chapter;

use crate::script::Runner;

const DEFAULT_FILTER: &str = "quire_session=debug,quire_cli=info,warn";

/// Replay an editing script against a chapter.
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(about = "Headless block editing session driver")]
struct Args {
    /// Chapter JSON (`{ "id", "title", "blocks": [...] }`)
    #[arg(long)]
    chapter: PathBuf,

    /// Script JSON (array of steps)
    #[arg(long)]
    script: PathBuf,

    /// Editor configuration (RON). Missing file means defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Answer every confirmation with "no"
    #[arg(long)]
    decline: bool,

    /// Make every save fail, to exercise the failure path
    #[arg(long)]
    fail_saves: bool,
}

fn load_chapter(path: &Path) -> Result<Chapter> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading chapter {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing chapter {}", path.display()))
}

/// The desktop clipboard when built with `system-clipboard`, else the in-memory one.
#[cfg(feature = "system-clipboard")]
fn clipboard(_world: &MemoryWorld) -> Arc<dyn Clipboard> {
    Arc::new(quire_session::SystemClipboard)
}

#[cfg(not(feature = "system-clipboard"))]
fn clipboard(world: &MemoryWorld) -> Arc<dyn Clipboard> {
    world.clipboard.clone()
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => EditorConfig::load_or_default(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    let chapter = load_chapter(&args.chapter)?;
    let steps = script::parse(
        &std::fs::read_to_string(&args.script)
            .with_context(|| format!("reading script {}", args.script.display()))?,
    )?;

    tracing::info!(
        chapter = %chapter.id,
        blocks = chapter.blocks.len(),
        steps = steps.len(),
        "replaying script"
    );

    let confirm: Arc<dyn Confirmation> = if args.decline {
        Arc::new(NeverConfirm)
    } else {
        Arc::new(AlwaysConfirm)
    };
    let world = MemoryWorld::new(chapter.clone());
    let deps = Collaborators {
        clipboard: clipboard(&world),
        ..world.collaborators(confirm)
    };
    let store = Arc::new(EditingStore::new(chapter.id.clone(), deps, config));

    let notifications = Arc::new(AtomicUsize::new(0));
    {
        let notifications = notifications.clone();
        let observed = Arc::downgrade(&store);
        store.subscribe(move || {
            notifications.fetch_add(1, Ordering::Relaxed);
            if let Some(store) = observed.upgrade() {
                tracing::debug!(
                    block = ?store.active_block_id(),
                    dirty = store.has_pending_changes(),
                    saving = store.is_update_pending(),
                    deleting = store.is_delete_pending(),
                    "store changed"
                );
            }
        });
    }

    let mut runner = Runner::new(store.clone(), world.clone(), args.fail_saves);
    runner.run(&steps).await;

    for error in world.notifier.errors() {
        tracing::warn!(%error, "reported failure");
    }
    tracing::info!(
        notifications = notifications.load(Ordering::Relaxed),
        failures = world.notifier.len(),
        "script finished"
    );

    println!("{}", serde_json::to_string_pretty(&world.cache.snapshot())?);
    Ok(())
}
