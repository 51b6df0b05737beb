//! Settings domain types and validation.
//!
//! Settings describe where models are persisted, how the connection pool is
//! sized, the log filter and where localization resources live. They can be
//! built from defaults, merged from partial updates, or read from the
//! environment (`MEMENTO_*` variables, optionally from a `.env` file).

use serde::{Deserialize, Serialize};

/// Default database URL (a SQLite file in the working directory).
pub const DEFAULT_DATABASE_URL: &str = "sqlite://memento.db";

/// Default number of pooled database connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

pub const DATABASE_URL_VAR: &str = "MEMENTO_DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "MEMENTO_MAX_CONNECTIONS";
pub const LOG_VAR: &str = "MEMENTO_LOG";
pub const RESOURCES_PATH_VAR: &str = "MEMENTO_RESOURCES_PATH";

/// Application settings structure.
///
/// All fields are optional to support partial updates and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Database connection URL (e.g. `sqlite://memento.db`, `sqlite::memory:`).
    pub database_url: Option<String>,

    /// Maximum number of pooled connections (1-100).
    pub max_connections: Option<u32>,

    /// `tracing` filter directive (e.g. `info`, `memento_db=debug`).
    pub log_filter: Option<String>,

    /// Path of the JSON file holding localized strings.
    pub resources_path: Option<String>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            database_url: Some(DEFAULT_DATABASE_URL.to_string()),
            max_connections: Some(DEFAULT_MAX_CONNECTIONS),
            log_filter: Some(DEFAULT_LOG_FILTER.to_string()),
            resources_path: None,
        }
    }

    /// Read settings from the process environment.
    ///
    /// Loads `.env` first when present. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// The result is validated before it is returned.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let mut settings = Self::with_defaults();

        if let Some(url) = lookup(DATABASE_URL_VAR) {
            settings.database_url = Some(url);
        }
        if let Some(raw) = lookup(MAX_CONNECTIONS_VAR) {
            let max = raw
                .trim()
                .parse()
                .map_err(|_| SettingsError::InvalidEnvValue {
                    key: MAX_CONNECTIONS_VAR,
                    value: raw.clone(),
                })?;
            settings.max_connections = Some(max);
        }
        if let Some(filter) = lookup(LOG_VAR) {
            settings.log_filter = Some(filter);
        }
        if let Some(path) = lookup(RESOURCES_PATH_VAR) {
            settings.resources_path = Some(path);
        }

        validate_settings(&settings)?;
        Ok(settings)
    }

    /// Get the effective database URL (with default fallback).
    #[must_use]
    pub fn effective_database_url(&self) -> &str {
        self.database_url.as_deref().unwrap_or(DEFAULT_DATABASE_URL)
    }

    /// Get the effective pool size (with default fallback).
    #[must_use]
    pub const fn effective_max_connections(&self) -> u32 {
        match self.max_connections {
            Some(max) => max,
            None => DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Get the effective log filter (with default fallback).
    #[must_use]
    pub fn effective_log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref url) = other.database_url {
            self.database_url.clone_from(url);
        }
        if let Some(ref max) = other.max_connections {
            self.max_connections = *max;
        }
        if let Some(ref filter) = other.log_filter {
            self.log_filter.clone_from(filter);
        }
        if let Some(ref path) = other.resources_path {
            self.resources_path.clone_from(path);
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = set field to None/null
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub database_url: Option<Option<String>>,
    pub max_connections: Option<Option<u32>>,
    pub log_filter: Option<Option<String>>,
    pub resources_path: Option<Option<String>>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Database URL cannot be empty")]
    EmptyDatabaseUrl,

    #[error("Max connections must be between 1 and 100, got {0}")]
    InvalidMaxConnections(u32),

    #[error("Log filter cannot be empty")]
    EmptyLogFilter,

    #[error("Resources path cannot be empty")]
    EmptyResourcesPath,

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnvValue { key: &'static str, value: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if settings
        .database_url
        .as_ref()
        .is_some_and(|url| url.trim().is_empty())
    {
        return Err(SettingsError::EmptyDatabaseUrl);
    }

    if let Some(max) = settings.max_connections {
        if !(1..=100).contains(&max) {
            return Err(SettingsError::InvalidMaxConnections(max));
        }
    }

    if settings
        .log_filter
        .as_ref()
        .is_some_and(|filter| filter.trim().is_empty())
    {
        return Err(SettingsError::EmptyLogFilter);
    }

    if settings
        .resources_path
        .as_ref()
        .is_some_and(|path| path.trim().is_empty())
    {
        return Err(SettingsError::EmptyResourcesPath);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::with_defaults();
        assert_eq!(settings.database_url.as_deref(), Some(DEFAULT_DATABASE_URL));
        assert_eq!(settings.max_connections, Some(DEFAULT_MAX_CONNECTIONS));
        assert_eq!(settings.log_filter.as_deref(), Some("info"));
        assert_eq!(settings.resources_path, None);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_validate_empty_database_url() {
        let settings = Settings {
            database_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyDatabaseUrl)
        ));
    }

    #[test]
    fn test_validate_max_connections() {
        for bad in [0, 101] {
            let settings = Settings {
                max_connections: Some(bad),
                ..Default::default()
            };
            assert!(matches!(
                validate_settings(&settings),
                Err(SettingsError::InvalidMaxConnections(n)) if n == bad
            ));
        }
    }

    #[test]
    fn test_validate_empty_log_filter() {
        let settings = Settings {
            log_filter: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyLogFilter)
        ));
    }

    #[test]
    fn test_merge_settings() {
        let mut settings = Settings::with_defaults();
        let update = SettingsUpdate {
            max_connections: Some(Some(12)),
            log_filter: Some(None),
            ..Default::default()
        };
        settings.merge(&update);

        assert_eq!(settings.max_connections, Some(12));
        assert_eq!(settings.log_filter, None);
        assert_eq!(settings.effective_log_filter(), DEFAULT_LOG_FILTER);
        assert_eq!(settings.database_url.as_deref(), Some(DEFAULT_DATABASE_URL));
    }

    #[test]
    fn test_from_lookup_overrides_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            (DATABASE_URL_VAR, "sqlite::memory:"),
            (MAX_CONNECTIONS_VAR, " 3 "),
            (LOG_VAR, "memento_db=debug"),
            (RESOURCES_PATH_VAR, "resources/en.json"),
        ]))
        .unwrap();

        assert_eq!(settings.effective_database_url(), "sqlite::memory:");
        assert_eq!(settings.effective_max_connections(), 3);
        assert_eq!(settings.effective_log_filter(), "memento_db=debug");
        assert_eq!(settings.resources_path.as_deref(), Some("resources/en.json"));
    }

    #[test]
    fn test_from_lookup_without_variables() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, Settings::with_defaults());
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = Settings::from_lookup(lookup(&[(MAX_CONNECTIONS_VAR, "many")])).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidEnvValue { key: MAX_CONNECTIONS_VAR, .. }
        ));

        let err = Settings::from_lookup(lookup(&[(MAX_CONNECTIONS_VAR, "0")])).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidMaxConnections(0)));
    }

    #[test]
    fn test_settings_json_defaults_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"max_connections": 2}"#).unwrap();
        assert_eq!(settings.max_connections, Some(2));
        assert_eq!(settings.database_url, None);
        assert_eq!(settings.effective_database_url(), DEFAULT_DATABASE_URL);
    }
}
