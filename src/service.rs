//! Shared completion service.
//!
//! A [`Service`] owns the single [`Context`] of a process together with
//! the options it was built from. Clients bracket their use with
//! [`Service::start`] and [`Service::stop`]; the context and its package
//! cache live while at least one client is attached. All access goes
//! through one mutex, so queries from different threads never overlap.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use gocomplete_core::{query_at_cursor, Completions, Context, LoadError};

use crate::config::{Config, ConfigError};
use crate::env::{EnvError, GoEnvironment};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("completion service is not started")]
    NotStarted,

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// What [`Service::status`] reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub clients: usize,
    /// Canonical import paths of the cached packages.
    pub modules: Vec<String>,
    pub loaded_files: usize,
}

struct Inner {
    config: Config,
    /// Where option changes are persisted, if anywhere.
    config_path: Option<PathBuf>,
    context: Option<Context>,
    clients: usize,
}

pub struct Service {
    inner: Mutex<Inner>,
}

impl Service {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        Service {
            inner: Mutex::new(Inner {
                config,
                config_path,
                context: None,
                clients: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a client, creating the context on first use.
    pub fn start(&self) -> Result<(), ServiceError> {
        let mut inner = self.lock();
        if inner.context.is_none() {
            let env = GoEnvironment::discover(&inner.config)?;
            info!(pkg_dir = %env.pkg_dir().display(), "starting completion context");
            inner.context = Some(Context::new(env));
        }
        inner.clients += 1;
        debug!(clients = inner.clients, "client attached");
        Ok(())
    }

    /// Detach a client. The last one out drops the context and its cache.
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.clients = inner.clients.saturating_sub(1);
        if inner.clients == 0 && inner.context.take().is_some() {
            info!("completion context dropped");
        }
    }

    pub fn clients(&self) -> usize {
        self.lock().clients
    }

    /// Change one option and persist it. A running context switches to the
    /// new archive locations immediately and keeps its cache.
    pub fn set_option(&self, key: &str, value: &str) -> Result<(), ServiceError> {
        let mut inner = self.lock();
        let mut config = inner.config.clone();
        config.set(key, value)?;
        if inner.context.is_some() {
            let env = GoEnvironment::discover(&config)?;
            if let Some(ctx) = inner.context.as_mut() {
                ctx.set_locator(env);
            }
        }
        if let Some(path) = &inner.config_path {
            config.save(path)?;
        }
        debug!(key, value, "option set");
        inner.config = config;
        Ok(())
    }

    pub fn option(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.lock().config.get(key)?)
    }

    /// Complete the dotted path ending at byte offset `cursor` of `source`.
    pub fn auto_complete(&self, source: &str, cursor: usize) -> Result<Completions, ServiceError> {
        let query = query_at_cursor(source, cursor);
        self.complete(source, query)
    }

    /// Complete `query` against the buffer `source`.
    pub fn complete(&self, source: &str, query: &str) -> Result<Completions, ServiceError> {
        let mut inner = self.lock();
        let ctx = inner.context.as_mut().ok_or(ServiceError::NotStarted)?;
        Ok(ctx.complete(source, query)?)
    }

    pub fn status(&self) -> ServiceStatus {
        let inner = self.lock();
        match &inner.context {
            Some(ctx) => {
                let status = ctx.status();
                ServiceStatus {
                    running: true,
                    clients: inner.clients,
                    modules: status.modules,
                    loaded_files: status.loaded_files,
                }
            }
            None => ServiceStatus {
                running: false,
                clients: inner.clients,
                modules: Vec::new(),
                loaded_files: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FMT: &str = "import\n$$\npackage fmt\n\
\tfunc \"fmt\".Println (a ...interface {}) (n int, err error)\n\
\tfunc \"fmt\".Printf (format string, a ...interface {}) (n int, err error)\n\
$$\n";

    struct Fixture {
        goroot: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let goroot = TempDir::new().unwrap();
            let pkg = goroot.path().join("pkg").join("linux_amd64");
            fs::create_dir_all(&pkg).unwrap();
            fs::write(pkg.join("fmt.a"), FMT).unwrap();
            Fixture { goroot }
        }

        fn config(&self) -> Config {
            let mut config = Config::default();
            config
                .set("goroot", &self.goroot.path().display().to_string())
                .unwrap();
            config.set("goos", "linux").unwrap();
            config.set("goarch", "amd64").unwrap();
            config
        }
    }

    const BUFFER: &str = "package main\nimport \"fmt\"\nfunc main() {\n\tfmt.Pr";

    #[test]
    fn test_complete_requires_start() {
        let fixture = Fixture::new();
        let service = Service::new(fixture.config(), None);
        assert!(matches!(
            service.complete(BUFFER, "fmt."),
            Err(ServiceError::NotStarted)
        ));
        assert!(!service.status().running);
    }

    #[test]
    fn test_auto_complete_at_cursor() {
        let fixture = Fixture::new();
        let service = Service::new(fixture.config(), None);
        service.start().unwrap();
        let out = service.auto_complete(BUFFER, BUFFER.len()).unwrap();
        assert_eq!(out.raw, vec!["intf", "intln"]);
        assert_eq!(
            out.display[1],
            "func Println(a ...interface{}) (n int, err error)"
        );
    }

    #[test]
    fn test_reference_counting_drops_cache() {
        let fixture = Fixture::new();
        let service = Service::new(fixture.config(), None);
        service.start().unwrap();
        service.start().unwrap();
        service.complete(BUFFER, "fmt.").unwrap();
        assert_eq!(service.status().modules, vec!["fmt"]);

        service.stop();
        assert_eq!(service.clients(), 1);
        assert!(service.status().running);

        service.stop();
        let status = service.status();
        assert!(!status.running);
        assert!(status.modules.is_empty());
        service.stop();
        assert_eq!(service.clients(), 0);
    }

    #[test]
    fn test_set_option_switches_locator_and_persists() {
        let fixture = Fixture::new();
        let extra = TempDir::new().unwrap();
        fs::write(
            extra.path().join("geom.a"),
            "import\n$$\npackage geom\n\tconst \"geom\".Pi = 3\n$$\n",
        )
        .unwrap();
        let config_dir = TempDir::new().unwrap();
        let config_path = config_dir.path().join("config.json");

        let service = Service::new(fixture.config(), Some(config_path.clone()));
        service.start().unwrap();
        let src = "package main\nimport \"geom\"\n";
        assert!(service.complete(src, "geom.").unwrap().is_empty());

        service
            .set_option("lib-path", &extra.path().display().to_string())
            .unwrap();
        let out = service.complete(src, "geom.").unwrap();
        assert_eq!(out.display, vec!["const Pi"]);

        let saved = Config::load(&config_path).unwrap();
        assert_eq!(saved.lib_path, vec![extra.path().to_path_buf()]);
        assert_eq!(
            service.option("lib-path").unwrap(),
            Some(extra.path().display().to_string())
        );
    }

    #[test]
    fn test_set_option_rejects_unknown_key() {
        let fixture = Fixture::new();
        let service = Service::new(fixture.config(), None);
        assert!(matches!(
            service.set_option("gopath", "/x"),
            Err(ServiceError::Config(ConfigError::UnknownKey { .. }))
        ));
    }
}
