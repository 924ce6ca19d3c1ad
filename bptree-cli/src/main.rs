//! `bptreectl` — a narrow inspection tool for index files: create an empty
//! index, insert a single `(key, locator)` row, or scan a key range. It is
//! not a query language front end; there is no command loop and no
//! expression parser beyond what `clap` gives the three subcommands below.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use bptree_index::page::{FilePageStore, OpenMode};
use bptree_index::tree::TreeIndex;
use bptree_index::TupleLocator;

#[derive(Parser)]
#[command(name = "bptreectl", about = "Inspect bptree-index files")]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh index file (zeroed header page).
    Create { path: PathBuf },
    /// Insert one key/locator pair, printing the resulting tree height.
    Insert {
        path: PathBuf,
        key: i32,
        /// Tuple locator as `<page>:<slot>`.
        locator: String,
    },
    /// Locate and forward-scan the index, printing `key -> (page, slot)`.
    Scan {
        path: PathBuf,
        #[arg(long)]
        min: Option<i32>,
        #[arg(long)]
        max: Option<i32>,
    },
}

fn parse_locator(raw: &str) -> Result<TupleLocator> {
    let (page, slot) = raw
        .split_once(':')
        .with_context(|| format!("expected <page>:<slot>, got `{raw}`"))?;
    let page_id: i32 = page
        .parse()
        .with_context(|| format!("invalid page id `{page}`"))?;
    let slot_id: i32 = slot
        .parse()
        .with_context(|| format!("invalid slot id `{slot}`"))?;
    Ok(TupleLocator::new(page_id, slot_id))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Create { path } => {
            let tree = TreeIndex::<FilePageStore>::open(&path, OpenMode::Write)
                .with_context(|| format!("creating index file {}", path.display()))?;
            tree.close()?;
            println!("created {}", path.display());
        }

        Command::Insert { path, key, locator } => {
            let locator = parse_locator(&locator)?;
            let mut tree = TreeIndex::<FilePageStore>::open(&path, OpenMode::Write)
                .with_context(|| format!("opening index file {}", path.display()))?;

            tree.insert(key, locator)?;
            let height = tree.height();
            tree.close()?;
            println!("{height}");
        }

        Command::Scan { path, min, max } => {
            let mut tree = TreeIndex::<FilePageStore>::open(&path, OpenMode::Read)
                .with_context(|| format!("opening index file {}", path.display()))?;

            let mut cursor = tree.locate(min.unwrap_or(i32::MIN))?;
            while let Some((key, locator)) = tree.read_forward(&mut cursor)? {
                if let Some(max) = max {
                    if key > max {
                        break;
                    }
                }
                println!("{key} -> ({}, {})", locator.page_id, locator.slot_id);
            }
        }
    }

    Ok(())
}
