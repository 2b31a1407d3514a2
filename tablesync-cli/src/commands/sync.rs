//! `tablesync sync` — reconcile the remote table with the CSV export.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tablesync_core::Settings;
use tablesync_remote::ExportFetcher;
use tablesync_sync::{pipeline, SyncReport, WriteOutcome};

use super::SettingsArgs;

/// Arguments for `tablesync sync`.
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Show what would be written without issuing any remote write.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.settings.load()?;
        let client = super::client(&settings)?;

        let report = pipeline::run(&settings, &client, &ExportFetcher::new(), self.dry_run)
            .with_context(|| format!("sync failed for table '{}'", settings.table_name))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report JSON")?
            );
            return Ok(());
        }

        print_report(&settings, &report);
        Ok(())
    }
}

fn print_report(settings: &Settings, report: &SyncReport) {
    let table_name = &settings.table_name;
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    println!(
        "{prefix}Found {} records in remote table, {} in CSV export",
        report.remote_records, report.export_records
    );

    if report.updates.is_empty() && report.creates.is_empty() {
        println!("{prefix}✓ '{table_name}' — nothing to do");
    } else {
        println!(
            "{prefix}✓ '{table_name}' synced ({} updated, {} created, {} failed)",
            report.updated(),
            report.created(),
            report.failed()
        );
    }

    for outcome in report.updates.iter().chain(report.creates.iter()) {
        match outcome {
            WriteOutcome::Updated { pivot, id } => println!("  ✎  {pivot} ({id})"),
            WriteOutcome::WouldUpdate { pivot, id } => println!("  ~  {pivot} ({id})"),
            WriteOutcome::Created { pivot, id } => match id {
                Some(id) => println!("  +  {pivot} ({id})"),
                None => println!("  +  {pivot}"),
            },
            WriteOutcome::WouldCreate { pivot } => println!("  +  {pivot} (would create)"),
            WriteOutcome::Failed {
                action,
                pivot,
                reason,
                ..
            } => println!(
                "  {}  {pivot} {}",
                "✗".red().bold(),
                format!("{action:?} failed: {reason}").red()
            ),
        }
    }

    for dup in &report.remote_duplicates {
        println!("  {} duplicate pivot '{dup}' in remote table", "!".yellow());
    }
    for dup in &report.export_duplicates {
        println!("  {} duplicate pivot '{dup}' in CSV export", "!".yellow());
    }
    if report.skipped() > 0 {
        println!(
            "  {} skipped records without a pivot value ({} in remote table, {} in CSV export)",
            "!".yellow(),
            report.skipped_remote,
            report.skipped_export
        );
    }

    super::print_missing(&report.missing_in_export, &settings.compared_fields);
    println!("Synchronization completed! ({} ms)", report.duration_ms());
}
