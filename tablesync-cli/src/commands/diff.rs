//! `tablesync diff` — show what sync would change, without writing.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use tablesync_core::FieldValue;
use tablesync_remote::ExportFetcher;
use tablesync_sync::pipeline;

use super::SettingsArgs;

/// Arguments for `tablesync diff`.
#[derive(Args, Debug, Default)]
pub struct DiffArgs {
    /// Emit the plan as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let settings = self.settings.load()?;
        let client = super::client(&settings)?;

        let preview = pipeline::preview(&settings, &client, &ExportFetcher::new())
            .with_context(|| format!("diff failed for table '{}'", settings.table_name))?;
        let plan = preview.plan;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("failed to serialize plan JSON")?
            );
            return Ok(());
        }

        if plan.is_noop() && plan.missing_in_export.is_empty() {
            println!("No differences for '{}'.", settings.table_name);
            return Ok(());
        }

        for update in &plan.updates {
            println!("~ {} ({})", update.pivot, update.id);
            for change in &update.changes {
                println!(
                    "{}",
                    format!("-   {}: {}", change.field, show(change.remote.as_ref())).red()
                );
                println!(
                    "{}",
                    format!("+   {}: {}", change.field, show(change.export.as_ref())).green()
                );
            }
        }

        for create in &plan.creates {
            println!("{}", format!("+ {}", create.pivot).green());
            for (field, value) in &create.fields {
                println!("{}", format!("+   {field}: {}", show(Some(value))).green());
            }
        }

        super::print_missing(&plan.missing_in_export, &settings.compared_fields);
        Ok(())
    }
}

fn show(value: Option<&FieldValue>) -> String {
    match value.and_then(FieldValue::canonical) {
        Some(s) => s,
        None => "(empty)".to_string(),
    }
}
