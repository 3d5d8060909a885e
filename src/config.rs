//! Registry configuration, persisted as TOML.
//!
//! A [`RegistryConfig`] selects the access policy, the override-source
//! preference, and the families to declare up front. Family manifests come in
//! two flavors: [`FamilyManifest`] rejects unknown fields outright, while
//! [`FamilyManifestLoose`] preserves them in an extras map for hosts that
//! attach their own metadata.

use std::collections::BTreeMap;
use std::collections::HashSet;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::AccessPolicy;
use crate::family::validate_family_name;
use crate::source::SourcePreference;

/// Errors from configuration handling.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(overscope::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(overscope::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(overscope::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(overscope::config::invalid),
        help("Check the RegistryConfig fields. {message}")
    )]
    Invalid { message: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Registry configuration, persisted as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Access policy applied to every entity in the registry.
    #[serde(default = "default_policy")]
    pub policy: AccessPolicy,
    /// Which override-source backend to select ("builtin" or "configured").
    #[serde(default = "default_source_preference")]
    pub source_preference: String,
    /// Families to declare when the registry is built.
    #[serde(default)]
    pub families: Vec<FamilyManifest>,
}

fn default_policy() -> AccessPolicy {
    AccessPolicy::Fallback
}
fn default_source_preference() -> String {
    "builtin".into()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            source_preference: default_source_preference(),
            families: Vec::new(),
        }
    }
}

impl RegistryConfig {
    /// Create a config with a specific policy (other fields default).
    pub fn with_policy(policy: AccessPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Load from a TOML file.
    pub fn load(path: &std::path::Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &std::path::Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Check the config for problems that would surface later as registry or
    /// source errors: invalid or duplicate family names, unknown preference.
    pub fn validate(&self) -> ConfigResult<()> {
        self.source_preference
            .parse::<SourcePreference>()
            .map_err(|e| ConfigError::Invalid {
                message: e.to_string(),
            })?;

        let mut seen = HashSet::new();
        for manifest in &self.families {
            validate_family_name(&manifest.name).map_err(|e| ConfigError::Invalid {
                message: e.to_string(),
            })?;
            if !seen.insert(manifest.name.as_str()) {
                return Err(ConfigError::Invalid {
                    message: format!("family \"{}\" is listed twice", manifest.name),
                });
            }
        }
        Ok(())
    }
}

/// A family declaration. Unknown fields are rejected so typos surface at
/// parse time rather than as silently ignored keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FamilyManifest {
    /// Family name; doubles as the lookup key.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FamilyManifest {
    /// Create a manifest with just a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            note: None,
        }
    }
}

/// A permissive family declaration: unknown fields are kept in `extras`
/// instead of being rejected, for hosts that carry their own metadata
/// alongside the declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyManifestLoose {
    /// Family name; doubles as the lookup key.
    pub name: String,
    /// Everything else in the table, preserved verbatim.
    #[serde(flatten)]
    pub extras: BTreeMap<String, toml::Value>,
}

impl From<FamilyManifestLoose> for FamilyManifest {
    fn from(loose: FamilyManifestLoose) -> Self {
        FamilyManifest::new(loose.name)
    }
}
