//! Error types and exit codes for gocomplete.
//!
//! Every subsystem error is bridged into [`GocompleteError`] before it is
//! rendered as a JSON error response. The numeric codes double as process
//! exit codes:
//! - `2`: invalid arguments (bad request, unknown option)
//! - `3`: resolution errors (source file not found)
//! - `4`: archive errors (malformed package export data)
//! - `5`: environment errors (no GOROOT, unreadable config)
//! - `10`: internal errors

use std::fmt;

use thiserror::Error;

use gocomplete_core::LoadError;

use crate::config::ConfigError;
use crate::env::EnvError;
use crate::service::ServiceError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes for JSON output and exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// A named file could not be found or read.
    ResolutionError = 3,
    /// A package archive is malformed.
    ArchiveError = 4,
    /// The Go environment or the configuration is unusable.
    EnvironmentError = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI and daemon output.
#[derive(Debug, Error)]
pub enum GocompleteError {
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    #[error("file not found: {path}")]
    FileNotFound { path: String },

    #[error("bad package archive {path}: {message}")]
    Archive { path: String, message: String },

    #[error("environment error: {message}")]
    Environment { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl GocompleteError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        GocompleteError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        GocompleteError::Internal {
            message: message.into(),
        }
    }
}

impl From<&GocompleteError> for OutputErrorCode {
    fn from(err: &GocompleteError) -> Self {
        match err {
            GocompleteError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            GocompleteError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            GocompleteError::Archive { .. } => OutputErrorCode::ArchiveError,
            GocompleteError::Environment { .. } => OutputErrorCode::EnvironmentError,
            GocompleteError::Config { .. } => OutputErrorCode::EnvironmentError,
            GocompleteError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<LoadError> for GocompleteError {
    fn from(err: LoadError) -> Self {
        let (path, message) = match err {
            LoadError::MissingStartMarker { path } => {
                (path, "export data start marker not found".to_string())
            }
            LoadError::MissingEndMarker { path } => {
                (path, "export data end marker not found".to_string())
            }
            LoadError::MissingPackageClause { path } => {
                (path, "export data has no package clause".to_string())
            }
            LoadError::Parse {
                path,
                package,
                source,
            } => (path, format!("declarations of package {}: {}", package, source)),
        };
        GocompleteError::Archive {
            path: path.display().to_string(),
            message,
        }
    }
}

impl From<ConfigError> for GocompleteError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownKey { .. } | ConfigError::InvalidValue { .. } => {
                GocompleteError::InvalidArguments {
                    message: err.to_string(),
                }
            }
            ConfigError::Io { .. } | ConfigError::Json { .. } => GocompleteError::Config {
                message: err.to_string(),
            },
        }
    }
}

impl From<EnvError> for GocompleteError {
    fn from(err: EnvError) -> Self {
        GocompleteError::Environment {
            message: err.to_string(),
        }
    }
}

impl From<ServiceError> for GocompleteError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotStarted => GocompleteError::internal(err.to_string()),
            ServiceError::Env(e) => e.into(),
            ServiceError::Load(e) => e.into(),
            ServiceError::Config(e) => e.into(),
        }
    }
}
