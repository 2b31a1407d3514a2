//! Layered settings.
//!
//! # Resolution order
//!
//! ```text
//! built-in defaults  <  .env.shared  <  .env  <  process environment
//! ```
//!
//! Later layers override earlier ones. Missing dotenv files are skipped.
//!
//! # API pattern
//!
//! - `load_at(dir, env)` — explicit directory and environment; used in tests
//! - `load()` — current directory and `std::env::vars()`, delegates to `load_at`
//!
//! Tests must NEVER call the no-arg wrapper; always use `_at`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

pub const ACCESS_TOKEN: &str = "AIRTABLE_ACCESS_TOKEN";
pub const BASE_ID: &str = "AIRTABLE_BASE_ID";
pub const TABLE_NAME: &str = "AIRTABLE_TABLE_NAME";
pub const API_URL: &str = "AIRTABLE_API_URL";
pub const EXPORT_URL: &str = "CSV_EXPORT_URL";
pub const PIVOT_COLUMN: &str = "PIVOT_COLUMN";
pub const COLUMNS_TO_CHECK: &str = "COLUMNS_TO_CHECK";

/// Shared, non-secret values (checked in).
pub const SHARED_FILE: &str = ".env.shared";
/// Secrets (never checked in).
pub const SECRET_FILE: &str = ".env";

pub const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";

// ---------------------------------------------------------------------------
// Raw key/value layers
// ---------------------------------------------------------------------------

/// Flat key → value map produced by merging configuration layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfig(BTreeMap<String, String>);

impl RawConfig {
    /// Built-in defaults, the lowest layer.
    pub fn defaults() -> Self {
        let mut raw = Self::default();
        raw.set(API_URL, DEFAULT_API_URL);
        raw
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Overlay `layer` on top of `self`; keys in `layer` win.
    pub fn merge<I, K, V>(&mut self, layer: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in layer {
            self.set(k, v);
        }
    }

    /// Overlay the dotenv file at `path`, if it exists.
    pub fn merge_dotenv(&mut self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "dotenv layer absent, skipping");
            return Ok(());
        }
        let dotenv_err = |source| ConfigError::Dotenv {
            path: path.to_path_buf(),
            source,
        };
        let iter = dotenvy::from_path_iter(path).map_err(dotenv_err)?;
        for item in iter {
            let (key, value) = item.map_err(dotenv_err)?;
            self.set(key, value);
        }
        tracing::debug!(path = %path.display(), "merged dotenv layer");
        Ok(())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        let value = self.get(key).ok_or(ConfigError::MissingKey { key })?;
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::EmptyValue { key });
        }
        Ok(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Resolved settings
// ---------------------------------------------------------------------------

/// Everything a run needs, resolved once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct Settings {
    pub access_token: SecretString,
    pub base_id: String,
    pub table_name: String,
    /// API root, e.g. `https://api.airtable.com/v0`.
    pub api_url: String,
    pub export_url: String,
    /// Join key present in both tables.
    pub pivot_field: String,
    /// Fields compared (and written) for matched records.
    pub compared_fields: Vec<String>,
}

impl Settings {
    /// Resolve settings from an already merged [`RawConfig`].
    pub fn from_raw(raw: &RawConfig) -> Result<Self, ConfigError> {
        let compared_fields = parse_field_list(&raw.required(COLUMNS_TO_CHECK)?);
        if compared_fields.is_empty() {
            return Err(ConfigError::EmptyValue {
                key: COLUMNS_TO_CHECK,
            });
        }

        Ok(Self {
            access_token: SecretString::new(raw.required(ACCESS_TOKEN)?),
            base_id: raw.required(BASE_ID)?,
            table_name: raw.required(TABLE_NAME)?,
            api_url: raw
                .required(API_URL)?
                .trim_end_matches('/')
                .to_string(),
            export_url: raw.required(EXPORT_URL)?,
            pivot_field: raw.required(PIVOT_COLUMN)?,
            compared_fields,
        })
    }

    /// Load defaults, `<dir>/.env.shared`, `<dir>/.env`, then `env`.
    pub fn load_at<I>(dir: &Path, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut raw = RawConfig::defaults();
        raw.merge_dotenv(&dir.join(SHARED_FILE))?;
        raw.merge_dotenv(&dir.join(SECRET_FILE))?;
        raw.merge(env);
        Self::from_raw(&raw)
    }

    /// `load_at` convenience wrapper: current directory and process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_at(&PathBuf::from("."), std::env::vars())
    }

    pub fn token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Fields copied into created records: the pivot first, then the
    /// compared fields (pivot not repeated).
    pub fn create_fields(&self) -> Vec<&str> {
        let mut out = vec![self.pivot_field.as_str()];
        for field in &self.compared_fields {
            if field != &self.pivot_field {
                out.push(field.as_str());
            }
        }
        out
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> RawConfig {
        let mut raw = RawConfig::defaults();
        raw.merge([
            (ACCESS_TOKEN, "pat123"),
            (BASE_ID, "appXYZ"),
            (TABLE_NAME, "Patients"),
            (EXPORT_URL, "https://pcrs.example/export.csv"),
            (PIVOT_COLUMN, "pcrs_id"),
            (COLUMNS_TO_CHECK, "status, name,,ward "),
        ]);
        raw
    }

    #[test]
    fn field_list_is_trimmed() {
        assert_eq!(parse_field_list(" a, b ,,c"), vec!["a", "b", "c"]);
        assert!(parse_field_list(" , ").is_empty());
    }

    #[test]
    fn resolves_complete_config() {
        let settings = Settings::from_raw(&complete()).expect("settings");
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.compared_fields, vec!["status", "name", "ward"]);
        assert_eq!(settings.token(), "pat123");
    }

    #[test]
    fn missing_key_is_named() {
        let mut raw = complete();
        raw.0.remove(PIVOT_COLUMN);
        let err = Settings::from_raw(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: PIVOT_COLUMN }));
        assert!(err.to_string().contains("PIVOT_COLUMN"));
    }

    #[test]
    fn blank_compared_list_is_rejected() {
        let mut raw = complete();
        raw.set(COLUMNS_TO_CHECK, " , ");
        let err = Settings::from_raw(&raw).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue { key: COLUMNS_TO_CHECK }));
    }

    #[test]
    fn api_url_trailing_slash_trimmed() {
        let mut raw = complete();
        raw.set(API_URL, "http://127.0.0.1:9000/v0/");
        let settings = Settings::from_raw(&raw).expect("settings");
        assert_eq!(settings.api_url, "http://127.0.0.1:9000/v0");
    }

    #[test]
    fn create_fields_puts_pivot_first_without_repeat() {
        let mut raw = complete();
        raw.set(COLUMNS_TO_CHECK, "status,pcrs_id");
        let settings = Settings::from_raw(&raw).expect("settings");
        assert_eq!(settings.create_fields(), vec!["pcrs_id", "status"]);
    }

    #[test]
    fn debug_output_redacts_token() {
        let settings = Settings::from_raw(&complete()).expect("settings");
        assert!(!format!("{settings:?}").contains("pat123"));
    }
}
