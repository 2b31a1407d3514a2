//! Subcommand implementations.

pub mod diff;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{builder::Builder, settings::Style};

use tablesync_core::{FieldValue, Settings};
use tablesync_remote::AirtableClient;
use tablesync_sync::MissingRecord;

/// Options shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Directory holding `.env.shared` and `.env` (defaults to the current directory).
    #[arg(long, value_name = "DIR")]
    pub env_dir: Option<PathBuf>,
}

impl SettingsArgs {
    pub fn load(&self) -> Result<Settings> {
        let dir = self.env_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        let settings = Settings::load_at(&dir, std::env::vars())
            .with_context(|| format!("failed to load settings from '{}'", dir.display()))?;
        tracing::debug!(
            dir = %dir.display(),
            table = %settings.table_name,
            pivot = %settings.pivot_field,
            compared = ?settings.compared_fields,
            "loaded settings"
        );
        Ok(settings)
    }
}

pub fn client(settings: &Settings) -> Result<AirtableClient> {
    AirtableClient::new(settings).context("failed to build remote table client")
}

/// Print remote records absent from the export, with their compared field
/// values. They are never deleted.
pub fn print_missing(missing: &[MissingRecord], compared: &[String]) {
    if missing.is_empty() {
        return;
    }
    println!(
        "{} {} record(s) missing in CSV export (not deleted):",
        "!".yellow().bold(),
        missing.len()
    );

    let header = ["pivot".to_string(), "record id".to_string()]
        .into_iter()
        .chain(compared.iter().cloned())
        .collect::<Vec<_>>();
    let rows = missing.iter().map(|m| {
        [
            m.pivot.to_string(),
            m.id.as_ref().map(ToString::to_string).unwrap_or_default(),
        ]
        .into_iter()
        .chain(compared.iter().map(|field| cell(m.fields.get(field))))
        .collect::<Vec<_>>()
    });

    let mut table = Builder::from_iter(std::iter::once(header).chain(rows)).build();
    table.with(Style::rounded());
    println!("{table}");
}

fn cell(value: Option<&FieldValue>) -> String {
    value.and_then(FieldValue::canonical).unwrap_or_default()
}
