//! Datastore configuration
//!
//! The configuration is resolved by the caller (flags, environment, files)
//! and handed to `open` as a plain value.

use super::error::{DatabaseError, Result};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Environment variable holding the datastore URL
pub const ENV_URL: &str = "DB_URL";
/// Environment variable holding the driver name
pub const ENV_DRIVER: &str = "DB_DRIVER";
/// Environment variable holding the comma-separated extension paths
pub const ENV_EXTENSIONS: &str = "DB_EXTENSIONS";
/// Driver used when none is configured
pub const DEFAULT_DRIVER: &str = "sqlite3";

/// Resolved datastore configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL, e.g. `file:data.sqlite3`
    pub url: String,
    /// Base driver name, e.g. `sqlite3`
    #[serde(default = "default_driver")]
    pub driver_name: String,
    /// Native extension modules loaded into every physical connection
    #[serde(default, deserialize_with = "deserialize_extensions")]
    pub extension_paths: Vec<PathBuf>,
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

impl DatabaseConfig {
    /// Create a configuration without extensions
    pub fn new(url: impl Into<String>, driver_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            driver_name: driver_name.into(),
            extension_paths: Vec::new(),
        }
    }

    /// Set the extension paths from a comma-separated list
    pub fn with_extensions(mut self, extension_list: &str) -> Self {
        self.extension_paths = split_extensions(extension_list)
            .into_iter()
            .map(PathBuf::from)
            .collect();
        self
    }

    /// Set the extension paths from a sequence
    pub fn with_extension_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.extension_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Load the configuration from `DB_URL`, `DB_DRIVER` and `DB_EXTENSIONS`
    ///
    /// The result is not validated; call [`DatabaseConfig::validate`] or let
    /// `open` do it.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(ENV_URL).unwrap_or_default();
        let driver_name = lookup(ENV_DRIVER).unwrap_or_else(default_driver);
        let extensions = lookup(ENV_EXTENSIONS).unwrap_or_default();

        Self::new(url, driver_name).with_extensions(&extensions)
    }

    /// Check that the configuration can be used to open a connection
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the URL or the driver name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(DatabaseError::configuration(
                "datastore url is not set in the configuration",
            ));
        }
        if self.driver_name.is_empty() {
            return Err(DatabaseError::configuration(
                "datastore driver is not set in the configuration",
            ));
        }
        Ok(())
    }

    /// Check if extension modules are configured
    pub fn has_extensions(&self) -> bool {
        !self.extension_paths.is_empty()
    }
}

/// Split a comma-separated extension list
///
/// Entries are trimmed; entries that are empty after trimming are dropped.
///
/// ```
/// use dbx::core::config::split_extensions;
///
/// assert_eq!(split_extensions(" a , b ,c "), ["a", "b", "c"]);
/// assert!(split_extensions("").is_empty());
/// ```
pub fn split_extensions(extension_list: &str) -> Vec<String> {
    extension_list
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn deserialize_extensions<'de, D>(deserializer: D) -> std::result::Result<Vec<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Extensions {
        List(Vec<PathBuf>),
        Joined(String),
    }

    Ok(match Extensions::deserialize(deserializer)? {
        Extensions::List(paths) => paths,
        Extensions::Joined(list) => split_extensions(&list)
            .into_iter()
            .map(PathBuf::from)
            .collect(),
    })
}
