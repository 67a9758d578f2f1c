//! Binary entry point for the gocomplete CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Complete the dotted path at byte offset 120 of main.go
//! gocomplete complete --file main.go --cursor 120
//!
//! # Complete an explicit query, one `display,,insert` line per candidate
//! gocomplete complete --file main.go --query fmt.Pr --format text
//!
//! # Keep the package cache warm: one JSON request per stdin line
//! gocomplete serve
//!
//! # Options
//! gocomplete config set goarch arm64
//! gocomplete config list
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use gocomplete::config::Config;
use gocomplete::env::GoEnvironment;
use gocomplete::error::{GocompleteError, OutputErrorCode};
use gocomplete::output::{
    emit_response, emit_text, CompleteResponse, ConfigResponse, EnvResponse, ErrorResponse,
};
use gocomplete::server::serve;
use gocomplete::service::Service;

// ============================================================================
// CLI Structure
// ============================================================================

/// Code completion for Go, driven by compiled package archives.
#[derive(Parser, Debug)]
#[command(name = "gocomplete", version, about = "Code completion for Go source")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output (overridden by RUST_LOG).
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Config file (default: <config dir>/gocomplete/config.json).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Output format for completion results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum CompleteFormat {
    /// JSON response (default).
    #[default]
    Json,
    /// One `display,,insert` line per candidate.
    Text,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Complete the dotted identifier path in a Go source file.
    ///
    /// Without --query or --cursor, the path at the end of the source is
    /// completed.
    Complete {
        /// Source file; read from stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
        /// Dotted path to complete, e.g. `fmt.Pr`.
        #[arg(long, conflicts_with = "cursor")]
        query: Option<String>,
        /// Byte offset of the cursor in the source.
        #[arg(long)]
        cursor: Option<usize>,
        /// Output format.
        #[arg(long, value_enum, default_value = "json")]
        format: CompleteFormat,
    },
    /// Serve JSON requests from stdin, one per line.
    Serve,
    /// Read or change options.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show the resolved Go environment.
    Env,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print one option.
    Get { key: String },
    /// Set one option; an empty value restores the default.
    Set { key: String, value: String },
    /// Print every option.
    List,
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON, like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<(), GocompleteError> {
    let config_path = cli.global.config.clone().or_else(Config::default_path);
    let config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    debug!(config = ?config_path, "options loaded");

    match cli.command {
        Command::Complete {
            file,
            query,
            cursor,
            format,
        } => execute_complete(config, file.as_deref(), query, cursor, format),
        Command::Serve => {
            let service = Service::new(config, config_path);
            let stdin = io::stdin();
            serve(&service, stdin.lock(), &mut io::stdout())
        }
        Command::Config { action } => execute_config(config, config_path.as_deref(), action),
        Command::Env => {
            let env = GoEnvironment::discover(&config)?;
            emit(&EnvResponse::new(&env))
        }
    }
}

// ============================================================================
// Command Executors
// ============================================================================

fn execute_complete(
    config: Config,
    file: Option<&Path>,
    query: Option<String>,
    cursor: Option<usize>,
    format: CompleteFormat,
) -> Result<(), GocompleteError> {
    let source = read_source(file)?;
    let service = Service::new(config, None);
    service.start()?;
    let result = match query {
        Some(query) => service.complete(&source, &query).map(|out| (query, out)),
        None => {
            let cursor = cursor.unwrap_or(source.len());
            let query = gocomplete::query_at_cursor(&source, cursor).to_string();
            service.auto_complete(&source, cursor).map(|out| (query, out))
        }
    };
    service.stop();
    let (query, out) = result?;

    match format {
        CompleteFormat::Json => emit(&CompleteResponse::new(query, &out)),
        CompleteFormat::Text => {
            let mut stdout = io::stdout();
            emit_text(&out, &mut stdout).map_err(|e| GocompleteError::internal(e.to_string()))?;
            let _ = stdout.flush();
            Ok(())
        }
    }
}

fn execute_config(
    mut config: Config,
    config_path: Option<&Path>,
    action: ConfigAction,
) -> Result<(), GocompleteError> {
    match action {
        ConfigAction::Get { key } => {
            let value = config.get(&key)?;
            emit(&ConfigResponse::new([(key, value)]))
        }
        ConfigAction::Set { key, value } => {
            let path = config_path.ok_or_else(|| {
                GocompleteError::invalid_arguments("no config directory; pass --config")
            })?;
            config.set(&key, &value)?;
            config.save(path)?;
            let value = config.get(&key)?;
            emit(&ConfigResponse::new([(key, value)]))
        }
        ConfigAction::List => emit(&ConfigResponse::new(config.entries())),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn read_source(file: Option<&Path>) -> Result<String, GocompleteError> {
    match file {
        Some(path) => fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => GocompleteError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => GocompleteError::internal(format!("cannot read {}: {}", path.display(), e)),
        }),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|e| GocompleteError::internal(format!("cannot read stdin: {}", e)))?;
            Ok(source)
        }
    }
}

fn emit<T: serde::Serialize>(response: &T) -> Result<(), GocompleteError> {
    emit_response(response, &mut io::stdout())
        .map_err(|e| GocompleteError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_conflicts_with_cursor() {
        let parsed = Cli::try_parse_from([
            "gocomplete", "complete", "--query", "fmt.", "--cursor", "3",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gocomplete",
            "config",
            "list",
            "--log-level",
            "debug",
            "--config",
            "/tmp/c.json",
        ])
        .unwrap();
        assert_eq!(cli.global.log_level, LogLevel::Debug);
        assert_eq!(cli.global.config, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::List
            }
        ));
    }

    #[test]
    fn test_complete_defaults() {
        let cli = Cli::try_parse_from(["gocomplete", "complete", "--file", "main.go"]).unwrap();
        match cli.command {
            Command::Complete {
                file,
                query,
                cursor,
                format,
            } => {
                assert_eq!(file, Some(PathBuf::from("main.go")));
                assert_eq!(query, None);
                assert_eq!(cursor, None);
                assert_eq!(format, CompleteFormat::Json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
