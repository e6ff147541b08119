//! Configuration for the `mapverify` tool.
//!
//! Everything is optional: an empty (or missing) TOML file yields [`VerifierConfig::default`].
//! Command-line flags are applied on top of the loaded file by the binary.
//!
//! ```toml
//! tasks = ["accesslevels", "overridenames"]
//! override_strategy = "closure"
//!
//! [naming]
//! method_prefixes = ["func_", "m_"]
//! unnamed_marker = "C_"
//!
//! [logging]
//! level = "info,mapverify_hierarchy=debug"
//! json = false
//! ```

mod logging;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::logging::{init_tracing, LoggingConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    /// Task names to run. Empty means the default set.
    #[serde(default)]
    pub tasks: Vec<String>,

    #[serde(default)]
    pub override_strategy: OverrideStrategy,

    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the override-name check groups methods that must share a mapped name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideStrategy {
    /// Merged-exposure closure over every class. Authoritative.
    #[default]
    Closure,
    /// Direct ancestor walk plus the interface closure. Cheaper, may miss bridge-linked groups.
    Quick,
}

/// Conventions of the mapped names: placeholder prefixes and the class naming rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamingConfig {
    #[serde(default = "NamingConfig::default_method_prefixes")]
    pub method_prefixes: Vec<String>,

    #[serde(default = "NamingConfig::default_field_prefixes")]
    pub field_prefixes: Vec<String>,

    /// Substring marking a class that has not been given a real name yet.
    #[serde(default = "NamingConfig::default_unnamed_marker")]
    pub unnamed_marker: String,

    /// Classes allowed to look like interfaces (`I` + uppercase) without being one.
    #[serde(default = "NamingConfig::default_fake_interface_allowlist")]
    pub fake_interface_allowlist: Vec<String>,

    /// Mapped package prefixes where underscores in class names are expected.
    #[serde(default = "NamingConfig::default_underscore_exempt")]
    pub underscore_exempt: Vec<String>,
}

impl NamingConfig {
    fn default_method_prefixes() -> Vec<String> {
        vec!["func_".to_owned(), "m_".to_owned()]
    }

    fn default_field_prefixes() -> Vec<String> {
        vec!["field_".to_owned(), "f_".to_owned()]
    }

    fn default_unnamed_marker() -> String {
        "C_".to_owned()
    }

    fn default_fake_interface_allowlist() -> Vec<String> {
        ["IPBanList", "IPBanEntry", "IOWorker"]
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    fn default_underscore_exempt() -> Vec<String> {
        vec!["net/minecraft/util/datafix/versions/".to_owned()]
    }

    /// Numeric id of a method placeholder name such as `func_1234_a` or `m_1234_`.
    pub fn method_id(&self, name: &str) -> Option<u64> {
        placeholder_id(name, &self.method_prefixes)
    }

    /// Numeric id of a field placeholder name such as `field_1234_a` or `f_1234_`.
    pub fn field_id(&self, name: &str) -> Option<u64> {
        placeholder_id(name, &self.field_prefixes)
    }

    pub fn is_method_placeholder(&self, name: &str) -> bool {
        self.method_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            method_prefixes: Self::default_method_prefixes(),
            field_prefixes: Self::default_field_prefixes(),
            unnamed_marker: Self::default_unnamed_marker(),
            fake_interface_allowlist: Self::default_fake_interface_allowlist(),
            underscore_exempt: Self::default_underscore_exempt(),
        }
    }
}

fn placeholder_id(name: &str, prefixes: &[String]) -> Option<u64> {
    let rest = prefixes
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix.as_str()))?;
    let digits = rest.split('_').next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // Keep the message only; the default `Display` embeds a source snippet.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl VerifierConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
