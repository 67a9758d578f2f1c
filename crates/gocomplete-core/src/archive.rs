//! Export data extraction from compiled package archives.
//!
//! An archive carries its export data as a text block:
//!
//! ```text
//! import
//! $$
//! package geom
//!     type "geom".Point struct { X int; Y int }
//!     func (p *"geom".Point) Add (q "geom".Point) ("geom".Point)
//! $$
//! ```
//!
//! Every line is rewritten by [`preprocess`](crate::export::preprocess),
//! the results are grouped by owning package, and each group is parsed as
//! one declaration list. A declaration may belong to another package than
//! the archive's own, for instance a type used in an exported signature.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use memchr::memmem;
use thiserror::Error;
use tracing::debug;

use crate::export::preprocess;
use crate::syntax::{ast, parse_decl_list, SyntaxError};

/// Marks the start of the export data block.
pub const START_MARKER: &[u8] = b"import\n$$\n";

/// Marks the end of the export data block.
pub const END_MARKER: &[u8] = b"$$\n";

/// A malformed archive. These indicate a broken installation rather than
/// a problem with the query, so loading stops.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{}: export data start marker not found", path.display())]
    MissingStartMarker { path: PathBuf },

    #[error("{}: export data end marker not found", path.display())]
    MissingEndMarker { path: PathBuf },

    #[error("{}: export data has no package clause", path.display())]
    MissingPackageClause { path: PathBuf },

    #[error("{}: export data for package {package} does not parse: {source}", path.display())]
    Parse {
        path: PathBuf,
        package: String,
        #[source]
        source: SyntaxError,
    },
}

/// Parsed export data of one archive.
#[derive(Debug, Clone)]
pub struct ExportData {
    /// Name from the block's `package` clause.
    pub package_name: String,
    /// Declarations grouped by owning package import path, in order of
    /// first appearance.
    pub groups: IndexMap<String, Vec<ast::Decl>>,
}

/// Extract and parse the export data block of an archive.
///
/// Declarations that name no owning package belong to `canonical`, the
/// import path the archive was loaded for.
pub fn parse_export_data(
    path: &Path,
    data: &[u8],
    canonical: &str,
) -> Result<ExportData, LoadError> {
    let start = memmem::find(data, START_MARKER).ok_or_else(|| LoadError::MissingStartMarker {
        path: path.to_path_buf(),
    })? + START_MARKER.len();
    let len = memmem::find(&data[start..], END_MARKER).ok_or_else(|| {
        LoadError::MissingEndMarker {
            path: path.to_path_buf(),
        }
    })?;
    let block = String::from_utf8_lossy(&data[start..start + len]);

    let mut lines = block.lines();
    let package_name = lines
        .next()
        .and_then(|line| line.trim().strip_prefix("package "))
        .and_then(|rest| rest.split_whitespace().next())
        .ok_or_else(|| LoadError::MissingPackageClause {
            path: path.to_path_buf(),
        })?
        .to_string();

    let mut sources: IndexMap<String, String> = IndexMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(export) = preprocess(line) else {
            continue;
        };
        let package = export.package.unwrap_or_else(|| canonical.to_string());
        let source = sources.entry(package).or_default();
        source.push_str(&export.text);
        source.push('\n');
    }

    let mut groups = IndexMap::with_capacity(sources.len());
    for (package, source) in sources {
        let decls = parse_decl_list(&source).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            package: package.clone(),
            source,
        })?;
        debug!(package = %package, decls = decls.len(), "parsed export group");
        groups.insert(package, decls);
    }

    Ok(ExportData {
        package_name,
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARCHIVE: &str = "!<arch>\n__.PKGDEF\ngo object linux amd64\nimport\n$$\npackage geom\n\
        \timport strconv \"strconv\"\n\
        \ttype \"geom\".Point struct { X int; Y int }\n\
        \n\
        \tfunc (p *\"geom\".Point) Add (q \"geom\".Point) (\"geom\".Point)\n\
        \tfunc \"geom\".init·1 ()\n\
        \ttype \"image/color\".Color interface { RGBA () (r uint32, g uint32, b uint32, a uint32) }\n\
        \tvar \"\".local int\n\
        $$\nbinary tail";

    fn parse(data: &str) -> Result<ExportData, LoadError> {
        parse_export_data(Path::new("geom.a"), data.as_bytes(), "example.com/geom")
    }

    #[test]
    fn test_groups_by_owning_package() {
        let data = parse(ARCHIVE).unwrap();
        assert_eq!(data.package_name, "geom");
        let packages: Vec<&str> = data.groups.keys().map(String::as_str).collect();
        assert_eq!(packages, vec!["geom", "image/color", "example.com/geom"]);
        assert_eq!(data.groups["geom"].len(), 2);
        assert_eq!(data.groups["image/color"].len(), 1);
    }

    #[test]
    fn test_missing_start_marker() {
        let err = parse("package geom\n$$\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingStartMarker { .. }));
    }

    #[test]
    fn test_missing_end_marker() {
        let err = parse("import\n$$\npackage geom\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingEndMarker { .. }));
    }

    #[test]
    fn test_missing_package_clause() {
        let err = parse("import\n$$\n\ttype \"geom\".T int\n$$\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingPackageClause { .. }));
    }

    #[test]
    fn test_unparseable_group_is_fatal() {
        let err = parse("import\n$$\npackage geom\n\ttype \"geom\".T struct {\n$$\n").unwrap_err();
        match err {
            LoadError::Parse { package, .. } => assert_eq!(package, "geom"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
