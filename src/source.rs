//! Override value sources: interchangeable backends behind one trait.
//!
//! Hosts that look override values up by name do not care where the value
//! comes from. [`select_source`] picks a backend from an external preference
//! flag: the curated [`BuiltinTable`] or a [`ConfiguredTable`] loaded from a
//! JSON object. An unknown preference surfaces immediately as
//! [`SourceError::InvalidPreference`](crate::error::SourceError).

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{OverscopeResult, SourceError};

/// A backend that resolves value names to override values.
pub trait OverrideSource: std::fmt::Debug + Send + Sync {
    /// Short backend identifier for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Resolve a value name (case-insensitive) to its value.
    fn named_value(&self, name: &str) -> Option<String>;
}

/// Curated built-in name → value table.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTable;

const BUILTIN_VALUES: &[(&str, &str)] = &[
    ("black", "#111111"),
    ("blue", "#4169e1"),
    ("brown", "#8b4513"),
    ("green", "#228b22"),
    ("red", "#b22222"),
    ("white", "#f8f8ff"),
];

impl OverrideSource for BuiltinTable {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn named_value(&self, name: &str) -> Option<String> {
        let normalized = name.to_lowercase();
        BUILTIN_VALUES
            .iter()
            .find(|(key, _)| *key == normalized)
            .map(|(_, value)| (*value).to_string())
    }
}

/// User-supplied name → value table, loaded from a JSON object.
///
/// Keys are normalized to lowercase for case-insensitive lookup.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredTable {
    entries: HashMap<String, String>,
}

impl ConfiguredTable {
    /// Parse a table from a JSON object of string values.
    pub fn from_json(raw: &str) -> OverscopeResult<Self> {
        let parsed: HashMap<String, String> =
            serde_json::from_str(raw).map_err(|e| SourceError::InvalidTable {
                message: e.to_string(),
            })?;
        let mut table = Self::default();
        for (name, value) in parsed {
            table.insert(name, value);
        }
        Ok(table)
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into().to_lowercase(), value.into());
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OverrideSource for ConfiguredTable {
    fn name(&self) -> &'static str {
        "configured"
    }

    fn named_value(&self, name: &str) -> Option<String> {
        self.entries.get(&name.to_lowercase()).cloned()
    }
}

/// External preference flag selecting a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePreference {
    Builtin,
    Configured,
}

impl FromStr for SourcePreference {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "builtin" => Ok(SourcePreference::Builtin),
            "configured" => Ok(SourcePreference::Configured),
            other => Err(SourceError::InvalidPreference {
                preference: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for SourcePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourcePreference::Builtin => write!(f, "builtin"),
            SourcePreference::Configured => write!(f, "configured"),
        }
    }
}

/// Select a backend from a preference flag.
///
/// `configured` supplies the table used when the preference asks for one;
/// omitting it yields an empty table. Callers do not branch on the result —
/// both backends sit behind [`OverrideSource`].
pub fn select_source(
    preference: &str,
    configured: Option<ConfiguredTable>,
) -> OverscopeResult<Box<dyn OverrideSource>> {
    let preference: SourcePreference = preference.parse()?;
    tracing::debug!(%preference, "selected override source");
    match preference {
        SourcePreference::Builtin => Ok(Box::new(BuiltinTable)),
        SourcePreference::Configured => Ok(Box::new(configured.unwrap_or_default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_is_case_insensitive() {
        let source = BuiltinTable;
        assert_eq!(source.named_value("brown").unwrap(), "#8b4513");
        assert_eq!(source.named_value("BROWN").unwrap(), "#8b4513");
        assert!(source.named_value("chartreuse").is_none());
    }

    #[test]
    fn configured_table_from_json() {
        let table =
            ConfiguredTable::from_json(r##"{"Ochre": "#cc7722", "teal": "#008080"}"##).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.named_value("ochre").unwrap(), "#cc7722");
        assert_eq!(table.named_value("TEAL").unwrap(), "#008080");
    }

    #[test]
    fn configured_table_rejects_non_object_json() {
        assert!(ConfiguredTable::from_json("[1, 2, 3]").is_err());
        assert!(ConfiguredTable::from_json(r#"{"red": 7}"#).is_err());
    }

    #[test]
    fn select_source_by_preference() {
        let source = select_source("builtin", None).unwrap();
        assert_eq!(source.name(), "builtin");
        assert!(source.named_value("red").is_some());

        let mut table = ConfiguredTable::default();
        table.insert("red", "#ff0000");
        let source = select_source("configured", Some(table)).unwrap();
        assert_eq!(source.name(), "configured");
        assert_eq!(source.named_value("red").unwrap(), "#ff0000");
    }

    #[test]
    fn preference_can_change_between_selections() {
        // The caller flips the external flag; the call site stays the same.
        for (preference, expected) in [("builtin", "#b22222"), ("configured", "#ff0000")] {
            let mut table = ConfiguredTable::default();
            table.insert("red", "#ff0000");
            let source = select_source(preference, Some(table)).unwrap();
            assert_eq!(source.named_value("red").unwrap(), expected);
        }
    }

    #[test]
    fn invalid_preference_errors() {
        let err = select_source("cause_an_error", None).unwrap_err();
        assert!(format!("{err}").contains("cause_an_error"));
    }

    #[test]
    fn empty_configured_table_resolves_nothing() {
        let source = select_source("configured", None).unwrap();
        assert!(source.named_value("red").is_none());
    }
}
