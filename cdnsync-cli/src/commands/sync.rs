//! `cdnsync sync`: push changed build output to the bucket and CDN.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use cdnsync_core::{RawOptions, SyncOptions};
use cdnsync_sync::{
    CacheStore, Credentials, FileBackend, MemoryBackend, Phase, Progress, SyncEngine, SyncError,
    SyncReport, SyncState,
};

use crate::qiniu::{Endpoints, QiniuClient};
use crate::{assets, paths};

/// Arguments for `cdnsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// YAML options file.
    #[arg(long, short, default_value = paths::DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Build output directory; every file under it is a candidate.
    #[arg(long, conflicts_with = "manifest")]
    pub dir: Option<PathBuf>,

    /// JSON manifest of emitted assets (`[{name, localPath, emitted}]`).
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Cache file (defaults to the platform cache directory).
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Access key; overrides `accessKey` from the options file.
    #[arg(long, env = "CDNSYNC_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Secret key; overrides `secretKey` from the options file.
    #[arg(long, env = "CDNSYNC_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Delete remote objects that are no longer produced.
    #[arg(long)]
    pub delete: bool,

    /// Invalidate CDN urls of changed files.
    #[arg(long)]
    pub refresh: bool,

    /// Report what would change without touching the remote or the cache.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub async fn run(self) -> Result<()> {
        let options = self.options()?;
        let assets = assets::load(self.dir.as_deref(), self.manifest.as_deref())?;

        let store = if options.dry_run {
            CacheStore::new(dry_run_backend(self.cache_file.as_deref())?)
        } else {
            let backend = FileBackend::new(paths::resolve_cache_path(self.cache_file.as_deref())?);
            tracing::debug!(path = %backend.path().display(), "using cache file");
            CacheStore::new(backend)
        };

        let client = QiniuClient::new(
            Credentials::new(&options.access_key, &options.secret_key),
            Endpoints::for_zone(options.zone),
            options.timeout,
        )
        .context("failed to build http client")?;

        let mut engine = SyncEngine::new(options, Arc::new(client), store)
            .with_progress(Arc::new(ConsoleProgress));

        match engine.run(assets).await {
            Ok(report) => {
                print_report(&report);
                Ok(())
            }
            Err(err) => {
                let phase = match engine.state() {
                    SyncState::Failed(phase) => Some(phase),
                    _ => err.phase(),
                };
                print_failure(&err, phase, engine.options().dry_run);
                Err(anyhow::Error::new(err).context("sync failed"))
            }
        }
    }

    fn options(&self) -> Result<SyncOptions> {
        let mut raw = RawOptions::load_at(&self.config)
            .with_context(|| format!("failed to load options '{}'", self.config.display()))?;
        if let Some(key) = &self.access_key {
            raw.access_key = Some(key.clone());
        }
        if let Some(key) = &self.secret_key {
            raw.secret_key = Some(key.clone());
        }
        raw.delete |= self.delete;
        raw.refresh |= self.refresh;
        raw.dry_run |= self.dry_run;
        raw.validate().context("invalid options")
    }
}

/// A dry run reads the real cache but never writes it back.
fn dry_run_backend(explicit: Option<&std::path::Path>) -> Result<MemoryBackend> {
    let path = paths::resolve_cache_path(explicit)?;
    match std::fs::read(&path) {
        Ok(bytes) => Ok(MemoryBackend::with_bytes(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(MemoryBackend::new()),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "cache unreadable, treating every file as changed");
            Ok(MemoryBackend::new())
        }
    }
}

struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn advance(&self, completed: usize, total: usize) {
        eprintln!("  {} uploaded {completed}/{total}", "↑".cyan());
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let upload_mark = if report.dry_run { "~" } else { "✎" };

    if report.uploaded.is_empty() && report.deleted.is_empty() && report.refreshed.is_empty() {
        println!(
            "{prefix}{} nothing to do ({} unchanged)",
            "✓".green(),
            report.unchanged
        );
        return;
    }

    println!(
        "{prefix}{} synced ({} uploaded, {} unchanged, {} deleted, {} refreshed)",
        "✓".green(),
        report.uploaded.len(),
        report.unchanged,
        report.deleted.len(),
        report.refreshed.len()
    );
    for key in &report.uploaded {
        println!("  {}  {key}", upload_mark.yellow());
    }
    for key in &report.deleted {
        println!("  {}  {key}", "✗".red());
    }
    for url in &report.refreshed {
        println!("  {}  {url}", "⟳".cyan());
    }
}

fn print_failure(err: &SyncError, phase: Option<Phase>, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let phase = phase
        .map(|p| p.to_string())
        .unwrap_or_else(|| "setup".to_owned());
    eprintln!("{prefix}{} {} phase failed", "✗".red(), phase.bold());
    if let SyncError::Upload { failures } = err {
        for key in failures {
            eprintln!("  {}  {key}", "✗".red());
        }
    }
    eprintln!("  cache not updated; re-run to retry");
}
