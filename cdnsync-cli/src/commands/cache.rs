//! `cdnsync cache`: inspect or reset the persisted digest cache.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use cdnsync_sync::{CacheStore, FileBackend};

use crate::paths;

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List every cached key with its digest.
    Show(ShowArgs),
    /// Remove the cache file; the next sync uploads everything.
    Clear(ClearArgs),
    /// Print the cache file location.
    Path(PathArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Cache file (defaults to the platform cache directory).
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ClearArgs {
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    #[arg(long)]
    pub cache_file: Option<PathBuf>,
}

#[derive(Tabled)]
struct CacheRow {
    #[tabled(rename = "key")]
    key: String,
    #[tabled(rename = "digest")]
    digest: String,
}

pub fn run(command: CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Show(args) => show(args),
        CacheCommand::Clear(args) => clear(args),
        CacheCommand::Path(args) => {
            println!("{}", paths::resolve_cache_path(args.cache_file.as_deref())?.display());
            Ok(())
        }
    }
}

fn show(args: ShowArgs) -> Result<()> {
    let path = paths::resolve_cache_path(args.cache_file.as_deref())?;
    let snapshot = CacheStore::new(FileBackend::new(path.clone())).load();

    if args.json {
        let json = serde_json::to_string_pretty(&snapshot).context("failed to encode cache")?;
        println!("{json}");
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("{} cache is empty ({})", "·".dimmed(), path.display());
        return Ok(());
    }

    let rows: Vec<CacheRow> = snapshot
        .iter()
        .map(|(key, digest)| CacheRow {
            key: key.to_string(),
            digest: digest.to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} entries in {}", snapshot.len(), path.display());
    Ok(())
}

fn clear(args: ClearArgs) -> Result<()> {
    let path = paths::resolve_cache_path(args.cache_file.as_deref())?;
    match std::fs::remove_file(&path) {
        Ok(()) => {
            println!("{} removed {}", "✓".green(), path.display());
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            println!("{} no cache at {}", "·".dimmed(), path.display());
            Ok(())
        }
        Err(err) => Err(err).with_context(|| format!("failed to remove '{}'", path.display())),
    }
}
