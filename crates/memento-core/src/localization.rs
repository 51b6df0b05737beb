//! Resource-backed localizer.
//!
//! Strings are loaded from a flat JSON object mapping keys to templates:
//!
//! ```text
//! {
//!   "DoesNotExist": "The '{0}' does not exist.",
//!   "Note.HasDuplicateField": "Another note already uses this {1}."
//! }
//! ```
//!
//! Scoped lookups (`"{scope}.{key}"`) fall back to the unscoped key, then
//! to the scoped key itself.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::ports::{Localizer, format_template};
use crate::services::{DOES_NOT_EXIST_KEY, HAS_DUPLICATE_FIELD_KEY, HAS_INVALID_FIELD_KEY};
use crate::settings::Settings;

/// Localizer shared by every repository, backed by an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct SharedLocalizer {
    strings: HashMap<String, String>,
}

impl SharedLocalizer {
    /// Empty localizer; every lookup falls back to its key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Localizer with English templates for the repository messages.
    pub fn with_defaults() -> Self {
        let mut localizer = Self::new();
        localizer.insert(DOES_NOT_EXIST_KEY, "The '{0}' does not exist.");
        localizer.insert(HAS_DUPLICATE_FIELD_KEY, "The '{0}' has a duplicate '{1}'.");
        localizer.insert(HAS_INVALID_FIELD_KEY, "The '{0}' has an invalid '{1}'.");
        localizer
    }

    /// Parse templates from a flat JSON object.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let strings: HashMap<String, String> =
            serde_json::from_str(json).context("Failed to parse localization resources")?;
        Ok(Self { strings })
    }

    /// Load templates from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read localization resources {}", path.display()))?;
        let localizer = Self::from_json_str(&json)?;
        debug!(path = %path.display(), strings = localizer.len(), "Loaded localization resources");
        Ok(localizer)
    }

    /// Default templates, overridden by the resource file named in the
    /// settings when one is configured.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut localizer = Self::with_defaults();
        if let Some(path) = settings.resources_path.as_deref() {
            localizer.extend(Self::from_file(path)?);
        }
        Ok(localizer)
    }

    /// Add or replace a template.
    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.strings.insert(key.into(), template.into());
    }

    /// Add every template from `other`, replacing existing keys.
    pub fn extend(&mut self, other: Self) {
        self.strings.extend(other.strings);
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Localizer for SharedLocalizer {
    fn get_string(&self, key: &str, args: &[&str]) -> String {
        let template = self.strings.get(key).map_or(key, String::as_str);
        format_template(template, args)
    }

    fn get_scoped_string(&self, scope: &str, key: &str, args: &[&str]) -> String {
        let scoped = format!("{scope}.{key}");
        let template = self
            .strings
            .get(&scoped)
            .or_else(|| self.strings.get(key))
            .map_or(scoped.as_str(), String::as_str);
        format_template(template, args)
    }
}
