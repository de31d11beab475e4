//! cdnsync: incremental build output sync to an object store and its CDN.
//!
//! # Usage
//!
//! ```text
//! cdnsync sync --dir dist [--config cdnsync.yaml] [--delete] [--refresh] [--dry-run]
//! cdnsync sync --manifest manifest.json [--cache-file <path>]
//! cdnsync cache show [--json]
//! cdnsync cache clear
//! cdnsync cache path
//! ```

mod assets;
mod commands;
mod paths;
mod qiniu;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{cache::CacheCommand, sync::SyncArgs};

#[derive(Parser, Debug)]
#[command(
    name = "cdnsync",
    version,
    about = "Upload changed build output, prune stale objects and refresh the CDN",
    long_about = None,
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync build output against the last recorded cache.
    Sync(SyncArgs),

    /// Inspect or reset the digest cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Commands::Sync(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start tokio runtime")?;
            runtime.block_on(args.run())
        }
        Commands::Cache { command } => commands::cache::run(command),
    }
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
