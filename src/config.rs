//! Persistent service options.
//!
//! Options are stored as JSON in the user's configuration directory
//! (`$XDG_CONFIG_HOME/gocomplete/config.json` on Linux). A missing file
//! means every option is at its default.
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `goroot` | Go installation root; default `$GOROOT`, then the `go` on `PATH` |
//! | `goos` | Target OS of the package archives; default `$GOOS`, then the host |
//! | `goarch` | Target architecture; default `$GOARCH`, then the host |
//! | `lib-path` | Extra archive directories searched before `GOROOT`, separated like `PATH` |

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every recognised option key, in display order.
pub const KEYS: &[&str] = &["goroot", "goos", "goarch", "lib-path"];

/// Errors reading, writing or updating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown option '{key}' (expected one of: {})", KEYS.join(", "))]
    UnknownKey { key: String },

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("cannot access config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Service options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goroot: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goarch: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lib_path: Vec<PathBuf>,
}

impl Config {
    /// `<config dir>/gocomplete/config.json`, if the platform has a
    /// configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gocomplete").join("config.json"))
    }

    /// Read a config file. A file that does not exist yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the config file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json + "\n").map_err(io_error)
    }

    /// Set an option from its string form. An empty value resets the
    /// option to its default.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());
        match key {
            "goroot" => self.goroot = text.map(PathBuf::from),
            "goos" => self.goos = text,
            "goarch" => self.goarch = text,
            "lib-path" => {
                self.lib_path = env::split_paths(value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// The string form of an option, or `None` when it is unset.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let value = match key {
            "goroot" => self.goroot.as_ref().map(|p| p.display().to_string()),
            "goos" => self.goos.clone(),
            "goarch" => self.goarch.clone(),
            "lib-path" => {
                if self.lib_path.is_empty() {
                    None
                } else {
                    let joined = env::join_paths(&self.lib_path).map_err(|err| {
                        ConfigError::InvalidValue {
                            key: key.to_string(),
                            reason: err.to_string(),
                        }
                    })?;
                    Some(joined.to_string_lossy().into_owned())
                }
            }
            _ => {
                return Err(ConfigError::UnknownKey {
                    key: key.to_string(),
                })
            }
        };
        Ok(value)
    }

    /// Every option with its current string form.
    pub fn entries(&self) -> Vec<(&'static str, Option<String>)> {
        KEYS.iter()
            .map(|&key| (key, self.get(key).ok().flatten()))
            .collect()
    }
}
