//! tablesync — reconcile a remote Airtable table with a CSV export.
//!
//! # Usage
//!
//! ```text
//! tablesync                                   # same as `tablesync sync`
//! tablesync sync [--dry-run] [--json] [--env-dir <dir>]
//! tablesync diff [--json] [--env-dir <dir>]
//! ```
//!
//! Settings come from `.env.shared`, `.env` and the process environment, in
//! increasing precedence. Logs go to stderr (`RUST_LOG`, default `info`).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{diff::DiffArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tablesync",
    version,
    about = "Reconcile an Airtable table with a CSV export",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update differing records, create missing ones, report the rest.
    Sync(SyncArgs),

    /// Show what sync would change without writing anything.
    Diff(DiffArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        None => SyncArgs::default().run(),
        Some(Commands::Sync(args)) => args.run(),
        Some(Commands::Diff(args)) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
