//! The symbol table.
//!
//! A [`Context`] caches every package loaded during its lifetime and holds
//! the declarations and import aliases of the buffer being completed. The
//! package cache persists across queries; the buffer scope is rebuilt by
//! every query.
//!
//! A context is not reentrant. Callers that share one between threads
//! serialize access themselves.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::archive::{parse_export_data, LoadError};
use crate::decl::{add_decls, Decl, DeclMap, Visibility};
use crate::export::display_name;
use crate::syntax::ast::{self, ImportSpec};

// ============================================================================
// Locator
// ============================================================================

/// Finds the archive file holding the export data of an import path.
pub trait Locator: Send {
    fn locate(&self, import_path: &str) -> Option<PathBuf>;
}

impl<F> Locator for F
where
    F: Fn(&str) -> Option<PathBuf> + Send,
{
    fn locate(&self, import_path: &str) -> Option<PathBuf> {
        self(import_path)
    }
}

// ============================================================================
// Context
// ============================================================================

/// Package cache plus the scope of the buffer being completed.
pub struct Context {
    /// Module declarations by canonical import path.
    modules: IndexMap<String, Decl>,
    /// Top-level declarations of the current buffer.
    locals: DeclMap,
    /// Import name used in the current buffer -> canonical import path.
    aliases: HashMap<String, String>,
    loaded_files: HashSet<PathBuf>,
    locator: Box<dyn Locator>,
}

/// Summary of what a context has cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Canonical import paths of every cached module.
    pub modules: Vec<String>,
    /// Number of archive files read.
    pub loaded_files: usize,
}

impl Context {
    pub fn new(locator: impl Locator + 'static) -> Self {
        Context {
            modules: IndexMap::new(),
            locals: DeclMap::new(),
            aliases: HashMap::new(),
            loaded_files: HashSet::new(),
            locator: Box::new(locator),
        }
    }

    /// Replace the archive locator. Cached packages are kept.
    pub fn set_locator(&mut self, locator: impl Locator + 'static) {
        self.locator = Box::new(locator);
    }

    pub fn modules(&self) -> &IndexMap<String, Decl> {
        &self.modules
    }

    pub fn module(&self, canonical: &str) -> Option<&Decl> {
        self.modules.get(canonical)
    }

    pub fn locals(&self) -> &DeclMap {
        &self.locals
    }

    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    /// The module an import name of the current buffer refers to.
    pub fn module_for_alias(&self, alias: &str) -> Option<&Decl> {
        self.aliases
            .get(alias)
            .and_then(|canonical| self.modules.get(canonical))
    }

    /// A cached module by its display name, for package references that
    /// were shortened to their last path segment in export data.
    pub fn module_by_display_name(&self, name: &str) -> Option<&Decl> {
        self.modules.values().find(|module| module.name == name)
    }

    pub fn status(&self) -> Status {
        Status {
            modules: self.modules.keys().cloned().collect(),
            loaded_files: self.loaded_files.len(),
        }
    }

    /// Forget the buffer scope: its declarations and import aliases.
    pub(crate) fn reset_file_scope(&mut self) {
        self.locals.clear();
        self.aliases.clear();
    }

    pub(crate) fn add_local_decls(&mut self, decls: &[ast::Decl]) {
        add_decls(&mut self.locals, decls, Visibility::All);
    }

    /// Load the package an import spec names and register its alias.
    /// Packages the locator cannot find are skipped.
    pub fn import(&mut self, spec: &ImportSpec) -> Result<(), LoadError> {
        match self.locator.locate(&spec.path) {
            Some(file) => self.load_package(&file, &spec.path, spec.alias.as_deref()),
            None => {
                warn!(import = %spec.path, "no archive found for import");
                Ok(())
            }
        }
    }

    /// Load an archive's export data as the module `canonical` and make it
    /// reachable as `alias` (default: the package name).
    ///
    /// An archive is read once per context; later loads only register the
    /// alias. An unreadable file is logged and leaves the package
    /// unresolved.
    pub fn load_package(
        &mut self,
        file: &Path,
        canonical: &str,
        alias: Option<&str>,
    ) -> Result<(), LoadError> {
        if self.loaded_files.contains(file) {
            if let Some(module) = self.modules.get(canonical) {
                let alias = alias.unwrap_or(&module.name).to_string();
                self.aliases.insert(alias, canonical.to_string());
            }
            return Ok(());
        }

        let data = match std::fs::read(file) {
            Ok(data) => data,
            Err(err) => {
                warn!(file = %file.display(), error = %err, "cannot read archive");
                return Ok(());
            }
        };
        let export = parse_export_data(file, &data, canonical)?;
        debug!(
            package = %canonical,
            name = %export.package_name,
            groups = export.groups.len(),
            "loaded archive"
        );

        self.modules
            .entry(canonical.to_string())
            .or_insert_with(|| Decl::module(export.package_name.as_str()));
        for (package, decls) in &export.groups {
            let module = self.modules.entry(package.clone()).or_insert_with(|| {
                Decl::module(display_name(package))
            });
            add_decls(&mut module.children, decls, Visibility::Exported);
        }

        self.loaded_files.insert(file.to_path_buf());
        let alias = alias.unwrap_or(&export.package_name).to_string();
        self.aliases.insert(alias, canonical.to_string());
        Ok(())
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .field("locals", &self.locals.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .field("loaded_files", &self.loaded_files)
            .finish_non_exhaustive()
    }
}
