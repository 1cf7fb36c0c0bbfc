//! # Quill - A Multi-Tab Editing Session
//!
//! Tabs, their content and the remaining edit quota persist between runs,
//! so each invocation picks up where the previous one stopped.
//!
//! ## Quick Start
//!
//! ```bash
//! # List tabs
//! cargo run -- tabs
//!
//! # Replace a tab's content from a file
//! cargo run -- write file1.js --file src/app.js
//!
//! # Interactive shell with plugins
//! cargo run -- shell
//! ```

mod shell;
mod workbench;

use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill_core::{Config, FileStore, MemoryStore, SessionStore};

use crate::workbench::Workbench;

/// Quill - a multi-tab editing session with an edit quota
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Session file (overrides `storage.path`)
    #[arg(short, long, value_name = "FILE", global = true)]
    store: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tabs
    Tabs,
    /// Open a new tab and make it active
    Add,
    /// Close a tab
    Close { name: String },
    /// Make a tab active
    Select { name: String },
    /// Replace a tab's content, reading stdin unless --file is given
    Write {
        name: String,
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Print the active tab
    Show,
    /// Regex replace-all in the active tab
    Replace { pattern: String, replacement: String },
    /// Show the remaining quota
    Quota,
    /// Dump the session state as JSON
    State,
    /// Discard the session and start over
    Reset,
    /// Interactive shell
    Shell,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Quill v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load_from(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {}: {}", path.display(), e);
            Config::default()
        }),
        None => Config::load(),
    };

    let mut workbench = Workbench::open(open_store(&args, &config), &config);
    let mut out = io::stdout().lock();

    match args.command.unwrap_or(Command::Tabs) {
        Command::Tabs => shell::print_tabs(&workbench, &mut out)?,
        Command::Add => {
            let tab = workbench.add_tab()?;
            writeln!(out, "{}", tab.name)?;
        }
        Command::Close { name } => {
            if !workbench.close_tab(&name)? {
                anyhow::bail!("No such tab: {name}");
            }
        }
        Command::Select { name } => workbench.select_tab(&name)?,
        Command::Write { name, file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut text = String::new();
                    io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            workbench.select_tab(&name)?;
            workbench.write_all(&text)?;
            writeln!(
                out,
                "{} tokens remaining",
                workbench.session().remaining_quota()
            )?;
        }
        Command::Show => {
            if let Some(text) = workbench.session().active_content() {
                write!(out, "{text}")?;
            }
        }
        Command::Replace {
            pattern,
            replacement,
        } => {
            if !workbench.replace_all(&pattern, &replacement)? {
                tracing::warn!("Nothing to replace");
            }
        }
        Command::Quota => {
            let session = workbench.session();
            writeln!(out, "{}", session.remaining_quota())?;
            if session.is_read_only() {
                tracing::warn!("Quota exhausted, editing is disabled");
            }
        }
        Command::State => {
            let state = workbench.session().snapshot();
            writeln!(out, "{}", serde_json::to_string_pretty(&state)?)?;
        }
        Command::Reset => workbench.reset()?,
        Command::Shell => {
            drop(out);
            shell::run(&mut workbench, io::stdin().lock(), io::stdout())?;
        }
    }

    Ok(())
}

/// Opens the session file, falling back to an in-memory store so the
/// session still works (without persistence) when the file is unusable.
fn open_store(args: &Args, config: &Config) -> Box<dyn SessionStore> {
    let path = match &args.store {
        Some(path) => Ok(path.clone()),
        None => config.storage.resolve_path(),
    };

    match path.map_err(anyhow::Error::from).and_then(|path| {
        FileStore::open(&path)
            .with_context(|| format!("Failed to open session file {}", path.display()))
    }) {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!("{:#}; changes will not be saved", e);
            Box::new(MemoryStore::new())
        }
    }
}
