//! Line-oriented JSON daemon.
//!
//! `gocomplete serve` reads one request object per input line and writes
//! one compact response object per output line. The package cache lives
//! for the whole session, so only the first query touching a package pays
//! for loading it.
//!
//! ```text
//! {"id":1,"command":"complete","source":"package main\nimport \"fmt\"\n","query":"fmt.Pr"}
//! {"id":2,"command":"complete","source":"...","cursor":120}
//! {"id":3,"command":"status"}
//! {"id":4,"command":"set-option","key":"goarch","value":"arm64"}
//! {"id":5,"command":"options"}
//! ```

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gocomplete_core::query_at_cursor;

use crate::config::KEYS;
use crate::error::GocompleteError;
use crate::output::{
    emit_response_compact, CompleteResponse, ConfigResponse, ErrorResponse, StatusResponse,
};
use crate::service::Service;

/// One daemon request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Request {
    /// Echoed in the response.
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    /// Complete `query`, or the path ending at `cursor`, or the path at the
    /// end of `source` when neither is given.
    Complete {
        source: String,
        #[serde(default)]
        query: Option<String>,
        #[serde(default)]
        cursor: Option<usize>,
    },
    Status,
    SetOption {
        key: String,
        value: String,
    },
    Options,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Complete(CompleteResponse),
    Status(StatusResponse),
    Config(ConfigResponse),
    Error(ErrorResponse),
}

impl Response {
    fn with_id(mut self, id: Option<u64>) -> Self {
        match &mut self {
            Response::Complete(r) => r.id = id,
            Response::Status(r) => r.id = id,
            Response::Config(r) => r.id = id,
            Response::Error(r) => r.id = id,
        }
        self
    }
}

/// Answer one request.
pub fn handle(service: &Service, command: Command) -> Result<Response, GocompleteError> {
    match command {
        Command::Complete {
            source,
            query,
            cursor,
        } => {
            if query.is_some() && cursor.is_some() {
                return Err(GocompleteError::invalid_arguments(
                    "give either 'query' or 'cursor', not both",
                ));
            }
            let query = match (query, cursor) {
                (Some(query), _) => query,
                (None, cursor) => {
                    query_at_cursor(&source, cursor.unwrap_or(source.len())).to_string()
                }
            };
            let out = service.complete(&source, &query)?;
            Ok(Response::Complete(CompleteResponse::new(query, &out)))
        }
        Command::Status => Ok(Response::Status(StatusResponse::new(service.status()))),
        Command::SetOption { key, value } => {
            service.set_option(&key, &value)?;
            let value = service.option(&key)?;
            Ok(Response::Config(ConfigResponse::new([(key, value)])))
        }
        Command::Options => {
            let mut entries = Vec::with_capacity(KEYS.len());
            for key in KEYS {
                entries.push((*key, service.option(key)?));
            }
            Ok(Response::Config(ConfigResponse::new(entries)))
        }
    }
}

/// Parse and answer one input line.
pub fn respond(service: &Service, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "malformed request");
            let err = GocompleteError::invalid_arguments(format!("malformed request: {}", err));
            return Response::Error(ErrorResponse::from_error(&err));
        }
    };
    debug!(id = ?request.id, command = request.command_name(), "request");
    let id = request.id;
    let response = match handle(service, request.command) {
        Ok(response) => response,
        Err(err) => Response::Error(ErrorResponse::from_error(&err)),
    };
    response.with_id(id)
}

impl Request {
    fn command_name(&self) -> &'static str {
        match self.command {
            Command::Complete { .. } => "complete",
            Command::Status => "status",
            Command::SetOption { .. } => "set-option",
            Command::Options => "options",
        }
    }
}

/// Serve requests from `reader` until end of input.
///
/// The session holds one client reference on the service for its whole
/// duration.
pub fn serve(
    service: &Service,
    reader: impl BufRead,
    writer: &mut impl Write,
) -> Result<(), GocompleteError> {
    service.start()?;
    info!("serving requests");
    let result = serve_lines(service, reader, writer);
    service.stop();
    result.map_err(|err| GocompleteError::internal(format!("i/o error: {}", err)))
}

fn serve_lines(service: &Service, reader: impl BufRead, writer: &mut impl Write) -> io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = respond(service, &line);
        emit_response_compact(&response, writer)?;
        writer.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn service(goroot: &TempDir) -> Service {
        let pkg = goroot.path().join("pkg").join("linux_amd64");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(
            pkg.join("strings.a"),
            "import\n$$\npackage strings\n\
\tfunc \"strings\".HasPrefix (s string, prefix string) (? bool)\n\
\tfunc \"strings\".HasSuffix (s string, suffix string) (? bool)\n\
\tfunc \"strings\".Index (s string, substr string) (? int)\n\
$$\n",
        )
        .unwrap();
        let mut config = Config::default();
        config
            .set("goroot", &goroot.path().display().to_string())
            .unwrap();
        config.set("goos", "linux").unwrap();
        config.set("goarch", "amd64").unwrap();
        Service::new(config, None)
    }

    fn run(service: &Service, input: &str) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        serve(service, Cursor::new(input.to_string()), &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_parse_requests() {
        let request: Request =
            serde_json::from_str(r#"{"id":7,"command":"set-option","key":"goos","value":"linux"}"#)
                .unwrap();
        assert_eq!(request.id, Some(7));
        assert_eq!(
            request.command,
            Command::SetOption {
                key: "goos".to_string(),
                value: "linux".to_string()
            }
        );
        let request: Request = serde_json::from_str(r#"{"command":"status"}"#).unwrap();
        assert_eq!(request.id, None);
        assert_eq!(request.command, Command::Status);
    }

    #[test]
    fn test_session() {
        let goroot = TempDir::new().unwrap();
        let service = service(&goroot);
        let source = "package main\\nimport \\\"strings\\\"\\nvar ok = strings.Has";
        let input = format!(
            "{{\"id\":1,\"command\":\"complete\",\"source\":\"{source}\"}}\n\
             \n\
             {{\"id\":2,\"command\":\"complete\",\"source\":\"{source}\",\"query\":\"strings.I\"}}\n\
             {{\"id\":3,\"command\":\"status\"}}\n\
             not json\n"
        );
        let responses = run(&service, &input);
        assert_eq!(responses.len(), 4);

        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["query"], "strings.Has");
        assert_eq!(responses[0]["candidates"][0]["insert"], "Prefix");
        assert_eq!(responses[0]["candidates"][1]["insert"], "Suffix");
        assert_eq!(
            responses[0]["candidates"][0]["display"],
            "func HasPrefix(s string, prefix string) bool"
        );

        assert_eq!(responses[1]["candidates"][0]["insert"], "ndex");

        assert_eq!(responses[2]["service"]["running"], true);
        assert_eq!(responses[2]["service"]["modules"][0], "strings");
        assert_eq!(responses[2]["service"]["loaded_files"], 1);

        assert_eq!(responses[3]["status"], "error");
        assert_eq!(responses[3]["error"]["code"], 2);

        assert_eq!(service.clients(), 0);
        assert!(!service.status().running);
    }

    #[test]
    fn test_query_and_cursor_conflict() {
        let goroot = TempDir::new().unwrap();
        let service = service(&goroot);
        let responses = run(
            &service,
            "{\"id\":9,\"command\":\"complete\",\"source\":\"x\",\"query\":\"x\",\"cursor\":1}\n",
        );
        assert_eq!(responses[0]["id"], 9);
        assert_eq!(responses[0]["status"], "error");
    }

    #[test]
    fn test_options() {
        let goroot = TempDir::new().unwrap();
        let service = service(&goroot);
        let responses = run(
            &service,
            "{\"command\":\"set-option\",\"key\":\"goarch\",\"value\":\"arm64\"}\n\
             {\"command\":\"options\"}\n\
             {\"command\":\"set-option\",\"key\":\"bogus\",\"value\":\"1\"}\n",
        );
        assert_eq!(responses[0]["options"][0]["value"], "arm64");
        let keys: Vec<&str> = responses[1]["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, KEYS);
        assert_eq!(responses[2]["error"]["code"], 2);
    }
}
