//! Response types and encoding for CLI and daemon output.
//!
//! Every JSON response carries `status` first (`"ok"` or `"error"`) and
//! the schema version. Completion results can also be printed as plain
//! text, one `display,,insert` line per candidate.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use gocomplete_core::Completions;

use crate::env::GoEnvironment;
use crate::error::{GocompleteError, OutputErrorCode};
use crate::service::ServiceStatus;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Candidates
// ============================================================================

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Rendered declaration, e.g. `func Add(q geom.Point) geom.Point`.
    pub display: String,
    /// Text to insert at the cursor.
    pub insert: String,
}

impl Candidate {
    pub fn from_completions(out: &Completions) -> Vec<Candidate> {
        out.iter()
            .map(|(display, insert)| Candidate {
                display: display.to_string(),
                insert: insert.to_string(),
            })
            .collect()
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub status: String,
    pub schema_version: String,
    /// Request id, echoed by the daemon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// The dotted path that was completed.
    pub query: String,
    pub candidates: Vec<Candidate>,
}

impl CompleteResponse {
    pub fn new(query: impl Into<String>, out: &Completions) -> Self {
        CompleteResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            id: None,
            query: query.into(),
            candidates: Candidate::from_completions(out),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub service: ServiceStatus,
}

impl StatusResponse {
    pub fn new(service: ServiceStatus) -> Self {
        StatusResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            id: None,
            service,
        }
    }
}

/// One option and its value; `null` when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub key: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub status: String,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub options: Vec<OptionEntry>,
}

impl ConfigResponse {
    pub fn new<K: Into<String>>(entries: impl IntoIterator<Item = (K, Option<String>)>) -> Self {
        ConfigResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            id: None,
            options: entries
                .into_iter()
                .map(|(key, value)| OptionEntry {
                    key: key.into(),
                    value,
                })
                .collect(),
        }
    }
}

/// The resolved Go environment, as reported by `gocomplete env`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvResponse {
    pub status: String,
    pub schema_version: String,
    pub goroot: String,
    pub goos: String,
    pub goarch: String,
    pub pkg_dir: String,
    pub pkg_dir_exists: bool,
    pub lib_path: Vec<String>,
}

impl EnvResponse {
    pub fn new(env: &GoEnvironment) -> Self {
        let pkg_dir = env.pkg_dir();
        EnvResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            goroot: env.goroot.display().to_string(),
            goos: env.goos.clone(),
            goarch: env.goarch.clone(),
            pkg_dir_exists: pkg_dir.is_dir(),
            pkg_dir: pkg_dir.display().to_string(),
            lib_path: env.lib_path.iter().map(|p| p.display().to_string()).collect(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the CLI exit status.
    pub code: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    pub fn from_error(err: &GocompleteError) -> Self {
        let details = match err {
            GocompleteError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            GocompleteError::Archive { path, .. } => Some(serde_json::json!({ "archive": path })),
            _ => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &GocompleteError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            id: None,
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emitters
// ============================================================================

/// Emit a response as pretty-printed JSON.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit a response as compact JSON on a single line.
pub fn emit_response_compact<T: Serialize>(
    response: &T,
    writer: &mut impl Write,
) -> io::Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

/// Emit candidates as `display,,insert` lines.
pub fn emit_text(out: &Completions, writer: &mut impl Write) -> io::Result<()> {
    for (display, insert) in out.iter() {
        writeln!(writer, "{},,{}", display, insert)?;
    }
    Ok(())
}
