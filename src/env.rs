//! Locating package archives in a Go installation.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use gocomplete_core::Locator;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("cannot determine GOROOT: set the 'goroot' option or $GOROOT, or put `go` on PATH")]
    GorootNotFound,
}

/// Where archives live for one GOROOT and target platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoEnvironment {
    pub goroot: PathBuf,
    pub goos: String,
    pub goarch: String,
    pub lib_path: Vec<PathBuf>,
}

impl GoEnvironment {
    /// Resolve the environment from config, then environment variables,
    /// then the host.
    pub fn discover(config: &Config) -> Result<Self, EnvError> {
        let goroot = config
            .goroot
            .clone()
            .or_else(|| env_path("GOROOT"))
            .or_else(goroot_from_path)
            .ok_or(EnvError::GorootNotFound)?;
        let goos = config
            .goos
            .clone()
            .or_else(|| env_string("GOOS"))
            .unwrap_or_else(|| host_goos().to_string());
        let goarch = config
            .goarch
            .clone()
            .or_else(|| env_string("GOARCH"))
            .unwrap_or_else(|| host_goarch().to_string());
        let found = GoEnvironment {
            goroot,
            goos,
            goarch,
            lib_path: config.lib_path.clone(),
        };
        debug!(
            goroot = %found.goroot.display(),
            goos = %found.goos,
            goarch = %found.goarch,
            "go environment"
        );
        Ok(found)
    }

    /// `$GOROOT/pkg/<goos>_<goarch>`.
    pub fn pkg_dir(&self) -> PathBuf {
        self.goroot
            .join("pkg")
            .join(format!("{}_{}", self.goos, self.goarch))
    }

    /// The archive for `import_path`: the lib-path directories in order,
    /// then the GOROOT package directory. Only existing files count.
    pub fn archive_path(&self, import_path: &str) -> Option<PathBuf> {
        let file = format!("{}.a", import_path);
        let found = self
            .lib_path
            .iter()
            .map(|dir| dir.join(&file))
            .chain(std::iter::once(self.pkg_dir().join(&file)))
            .find(|candidate| candidate.is_file());
        if found.is_none() {
            trace!(import_path, "no archive");
        }
        found
    }
}

impl Locator for GoEnvironment {
    fn locate(&self, import_path: &str) -> Option<PathBuf> {
        self.archive_path(import_path)
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// `<goroot>/bin/go` found on PATH, symlinks resolved.
fn goroot_from_path() -> Option<PathBuf> {
    let go = which::which("go").ok()?;
    let go = fs::canonicalize(&go).unwrap_or(go);
    goroot_of_binary(&go)
}

fn goroot_of_binary(go: &Path) -> Option<PathBuf> {
    go.parent()?.parent().map(Path::to_path_buf)
}

/// The host OS under its Go name.
pub fn host_goos() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// The host architecture under its Go name.
pub fn host_goarch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "powerpc64" => "ppc64",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn environment(root: &Path) -> GoEnvironment {
        GoEnvironment {
            goroot: root.to_path_buf(),
            goos: "linux".to_string(),
            goarch: "amd64".to_string(),
            lib_path: Vec::new(),
        }
    }

    #[test]
    fn test_pkg_dir() {
        let env = environment(Path::new("/usr/local/go"));
        assert_eq!(
            env.pkg_dir(),
            PathBuf::from("/usr/local/go/pkg/linux_amd64")
        );
    }

    #[test]
    fn test_archive_path_requires_existing_file() {
        let dir = TempDir::new().unwrap();
        let env = environment(dir.path());
        assert_eq!(env.archive_path("strings"), None);

        let pkg = env.pkg_dir().join("encoding");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("json.a"), "").unwrap();
        assert_eq!(env.locate("encoding/json"), Some(pkg.join("json.a")));
    }

    #[test]
    fn test_lib_path_searched_first() {
        let goroot = TempDir::new().unwrap();
        let extra = TempDir::new().unwrap();
        let mut env = environment(goroot.path());
        fs::create_dir_all(env.pkg_dir()).unwrap();
        fs::write(env.pkg_dir().join("geom.a"), "").unwrap();
        fs::write(extra.path().join("geom.a"), "").unwrap();

        assert_eq!(env.archive_path("geom"), Some(env.pkg_dir().join("geom.a")));
        env.lib_path.push(extra.path().to_path_buf());
        assert_eq!(env.archive_path("geom"), Some(extra.path().join("geom.a")));
    }

    #[test]
    fn test_config_wins_over_environment() {
        let mut config = Config::default();
        config.set("goroot", "/opt/go").unwrap();
        config.set("goos", "plan9").unwrap();
        config.set("goarch", "arm").unwrap();
        let env = GoEnvironment::discover(&config).unwrap();
        assert_eq!(env.goroot, PathBuf::from("/opt/go"));
        assert_eq!(env.goos, "plan9");
        assert_eq!(env.goarch, "arm");
    }

    #[test]
    fn test_goroot_of_binary() {
        assert_eq!(
            goroot_of_binary(Path::new("/usr/local/go/bin/go")),
            Some(PathBuf::from("/usr/local/go"))
        );
    }

    #[test]
    fn test_host_names_use_go_spelling() {
        assert_ne!(host_goos(), "macos");
        assert_ne!(host_goarch(), "x86_64");
        assert_ne!(host_goarch(), "aarch64");
    }
}
