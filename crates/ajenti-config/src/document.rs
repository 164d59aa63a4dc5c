//! Config file discovery and loading.
//!
//! The requested path wins when it exists. Otherwise a `config.json` in the
//! working directory is used. When neither exists the resolved path is empty
//! and loading reports it as not found, the same way a missing file is
//! reported.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::defaults::LOCAL_CONFIG_NAME;

/// Errors raised while locating or reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the requested file nor a local fallback exists.
    #[error("Config file \"{path}\" not found")]
    NotFound {
        /// Resolved path, empty when nothing was found.
        path: Utf8PathBuf,
    },
    /// The file exists but could not be read.
    #[error("failed to read config file \"{path}\": {source}")]
    Read {
        /// Path that failed to read.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file is not valid JSON.
    #[error("failed to parse config file \"{path}\": {source}")]
    Parse {
        /// Path that failed to parse.
        path: Utf8PathBuf,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The file parsed but its top level is not an object.
    #[error("config file \"{path}\" must contain a JSON object")]
    NotAnObject {
        /// Offending path.
        path: Utf8PathBuf,
    },
}

/// Picks the config file to load.
///
/// Returns `requested` when it exists, `cwd/config.json` when that exists, and
/// an empty path otherwise.
#[must_use]
pub fn resolve_config_path(requested: &Utf8Path, cwd: &Utf8Path) -> Utf8PathBuf {
    if !requested.as_str().is_empty() && requested.exists() {
        return requested.to_path_buf();
    }
    let local = cwd.join(LOCAL_CONFIG_NAME);
    if local.exists() {
        return local;
    }
    Utf8PathBuf::new()
}

/// Parsed contents of the configuration file.
///
/// Values are kept as raw JSON; interpreting them is the service's concern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    values: Map<String, Value>,
}

impl ConfigDocument {
    /// Loads and parses the file at `path`.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if path.as_str().is_empty() || !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Parses already-read file contents.
    pub fn parse(path: &Utf8Path, text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        match value {
            Value::Object(values) => Ok(Self { values }),
            _ => Err(ConfigError::NotAnObject {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Looks up a top-level key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Number of top-level keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the document has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
