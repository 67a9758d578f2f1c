//! Completion queries.
//!
//! A query is the dotted identifier path being typed, such as `Fo` or
//! `geom.Po`. The text before the first dot selects what to enumerate (an
//! imported package, or the type of a buffer variable); the rest is a
//! prefix the candidates must start with.

use serde::Serialize;
use tracing::{debug, trace};

use crate::archive::LoadError;
use crate::context::Context;
use crate::decl::{DeclKind, DeclMap};
use crate::infer::Scope;
use crate::syntax::{ast, parse_file};

/// Candidates of one query as two parallel lists, sorted by insert text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Completions {
    /// Rendered candidates: `func Add(q geom.Point) geom.Point`.
    pub display: Vec<String>,
    /// What to insert: the candidate name minus the typed prefix.
    pub raw: Vec<String>,
}

impl Completions {
    pub fn len(&self) -> usize {
        self.display.len()
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_empty()
    }

    /// `(display, raw)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.display
            .iter()
            .map(String::as_str)
            .zip(self.raw.iter().map(String::as_str))
    }

    fn push(&mut self, display: String, name: &str, prefix: &str) {
        self.display.push(display);
        self.raw.push(name[prefix.len()..].to_string());
    }

    /// Sort both lists together, or empty both if either came out empty.
    fn finish(self) -> Self {
        if self.display.is_empty() || self.raw.is_empty() {
            return Completions::default();
        }
        let mut pairs: Vec<(String, String)> = self.raw.into_iter().zip(self.display).collect();
        pairs.sort();
        let (raw, display) = pairs.into_iter().unzip();
        Completions { display, raw }
    }
}

impl Context {
    /// Complete `query` against `buffer`, the full text of the file being
    /// edited.
    ///
    /// The buffer's imports are loaded and its top-level declarations
    /// replace those of the previous query. Only a malformed archive is an
    /// error; everything that cannot be resolved yields no candidates.
    pub fn complete(&mut self, buffer: &str, query: &str) -> Result<Completions, LoadError> {
        self.reset_file_scope();
        let file = parse_file(buffer);
        if !file.errors.is_empty() {
            debug!(errors = file.errors.len(), first = %file.errors[0], "buffer has syntax errors");
        }
        for decl in &file.decls {
            if let ast::Decl::Import(specs) = decl {
                for spec in specs {
                    self.import(spec)?;
                }
            }
        }
        self.add_local_decls(&file.decls);

        let mut out = Completions::default();
        match query.split_once('.') {
            None => self.complete_names(query, &mut out),
            Some((left, prefix)) => self.complete_members(left, prefix, &mut out),
        }
        let out = out.finish();
        debug!(query, candidates = out.len(), "completed");
        Ok(out)
    }

    /// Imported packages and buffer declarations starting with `prefix`.
    fn complete_names(&self, prefix: &str, out: &mut Completions) {
        for (alias, canonical) in self.aliases() {
            if alias == "_" || alias == "." || !alias.starts_with(prefix) {
                continue;
            }
            if self.module(canonical).is_some() {
                out.push(format!("module {}", alias), alias, prefix);
            }
        }
        for decl in self.locals().values() {
            if !decl.name.starts_with(prefix) {
                continue;
            }
            if let Some(typed) = self.infer_type(decl, &Scope::Local) {
                trace!(name = %decl.name, ty = %typed.ty, "inferred");
            }
            out.push(decl.to_string(), &decl.name, prefix);
        }
    }

    /// Members of whatever `left` names: a package, a buffer type, or the
    /// type of a buffer value.
    fn complete_members(&self, left: &str, prefix: &str, out: &mut Completions) {
        if let Some(module) = self.module_for_alias(left) {
            push_matching(&module.children, prefix, out);
            return;
        }
        let Some(decl) = self.locals().get(left) else {
            trace!(left, "unresolved");
            return;
        };
        match decl.kind {
            DeclKind::Type => push_matching(&decl.children, prefix, out),
            DeclKind::Var | DeclKind::Const | DeclKind::Func => {
                let members = self
                    .infer_type(decl, &Scope::Local)
                    .and_then(|typed| self.members_of(&typed));
                match members {
                    Some((members, _)) => push_matching(&members, prefix, out),
                    None => trace!(left, "no members"),
                }
            }
            DeclKind::Module => {}
        }
    }
}

fn push_matching(members: &DeclMap, prefix: &str, out: &mut Completions) {
    for decl in members.values().filter(|d| d.name.starts_with(prefix)) {
        out.push(decl.to_string(), &decl.name, prefix);
    }
}

/// The dotted identifier path that ends at byte offset `cursor`, e.g.
/// `geom.Po` for `x := geom.Po|`. Offsets past the end or inside a
/// character are clamped to the previous character boundary.
pub fn query_at_cursor(source: &str, cursor: usize) -> &str {
    let mut end = cursor.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let head = &source[..end];
    let start = head
        .char_indices()
        .rev()
        .take_while(|&(_, c)| c == '.' || c == '_' || c.is_alphanumeric())
        .last()
        .map_or(end, |(i, _)| i);
    &head[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn context() -> Context {
        Context::new(|_: &str| -> Option<PathBuf> { None })
    }

    #[test]
    fn test_prefix_query_over_locals() {
        let mut ctx = context();
        let out = ctx
            .complete("package main\nvar Foo int\nvar Bar string\n", "Fo")
            .unwrap();
        assert_eq!(out.raw, vec!["o"]);
        assert_eq!(out.display, vec!["var Foo"]);
    }

    #[test]
    fn test_empty_prefix_lists_everything_sorted() {
        let mut ctx = context();
        let out = ctx
            .complete("package main\nfunc b() int\ntype c int\nconst a = 1\n", "")
            .unwrap();
        assert_eq!(out.raw, vec!["a", "b", "c"]);
        assert_eq!(out.display, vec!["const a", "func b() int", "type c"]);
    }

    #[test]
    fn test_member_query_on_local_variable() {
        let src = "package main\n\
                   type Point struct { X int; Y int }\n\
                   func (p Point) Len() float64\n\
                   var p = Point{}\n";
        let mut ctx = context();
        let out = ctx.complete(src, "p.").unwrap();
        assert_eq!(out.raw, vec!["Len", "X", "Y"]);
        assert_eq!(out.display, vec!["func Len() float64", "var X", "var Y"]);
    }

    #[test]
    fn test_member_query_on_type_lists_methods() {
        let src = "package main\ntype T int\nfunc (T) Get() int\nfunc (T) Put(v int)\n";
        let mut ctx = context();
        let out = ctx.complete(src, "T.P").unwrap();
        assert_eq!(out.raw, vec!["ut"]);
        assert_eq!(out.display, vec!["func Put(v int)"]);
    }

    #[test]
    fn test_unresolved_left_side_is_empty() {
        let mut ctx = context();
        let out = ctx.complete("package main\nvar x int\n", "nope.X").unwrap();
        assert!(out.is_empty());
        assert!(out.raw.is_empty());

        let out = ctx.complete("package main\nvar x int\n", "x.").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_match_is_empty() {
        let mut ctx = context();
        let out = ctx.complete("package main\nvar x int\n", "zz").unwrap();
        assert_eq!(out, Completions::default());
    }

    #[test]
    fn test_locals_are_reset_between_queries() {
        let mut ctx = context();
        ctx.complete("package main\nvar first int\n", "").unwrap();
        let out = ctx.complete("package main\nvar second int\n", "").unwrap();
        assert_eq!(out.raw, vec!["second"]);
    }

    #[test]
    fn test_broken_buffer_keeps_parsed_declarations() {
        let src = "package main\nvar ready int\nfunc main() {\n\tready.\n";
        let mut ctx = context();
        let out = ctx.complete(src, "re").unwrap();
        assert_eq!(out.display, vec!["var ready"]);
    }

    #[test]
    fn test_unterminated_literal_keeps_later_declarations() {
        let src = "package main\n\
                   var before int\n\
                   func f() {\n\
                   \tx := \"abc\n\
                   }\n\
                   var later int\n\
                   type T struct { A int }\n";
        let mut ctx = context();
        let out = ctx.complete(src, "").unwrap();
        assert_eq!(out.raw, vec!["T", "before", "f", "later"]);

        let out = ctx.complete(src, "T.").unwrap();
        assert_eq!(out.raw, vec!["A"]);
    }

    #[test]
    fn test_open_function_body_does_not_leak_locals() {
        let src = "package main\nvar top int\nfunc main() {\n\tx := 1\n\tvar inner int\n";
        let mut ctx = context();
        let out = ctx.complete(src, "").unwrap();
        assert_eq!(out.raw, vec!["top"]);
    }

    #[test]
    fn test_finish_sorts_pairs_by_raw() {
        let out = Completions {
            display: vec!["var b".into(), "var a".into()],
            raw: vec!["b".into(), "a".into()],
        }
        .finish();
        assert_eq!(out.raw, vec!["a", "b"]);
        assert_eq!(out.display, vec!["var a", "var b"]);
        let pairs: Vec<(&str, &str)> = out.iter().collect();
        assert_eq!(pairs, vec![("var a", "a"), ("var b", "b")]);
    }

    #[test]
    fn test_query_at_cursor() {
        let src = "x := geom.Po + 1";
        assert_eq!(query_at_cursor(src, 12), "geom.Po");
        assert_eq!(query_at_cursor(src, 5), "");
        assert_eq!(query_at_cursor(src, 1), "x");
        assert_eq!(query_at_cursor(src, 100), "1");
        assert_eq!(query_at_cursor("fmt.", 4), "fmt.");
    }
}
