//! The declaration tree.
//!
//! A [`Decl`] is one named symbol: a package, constant, variable, type or
//! function. Types own their struct fields, interface methods and attached
//! methods as ordered children. Declarations are built from parsed syntax
//! by splitting multi-name specs into one unit per name ([`split_decl`])
//! and inserting each unit into a scope ([`add_unit`]), where methods are
//! attached to their receiver type and redeclarations are merged.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::syntax::ast::{self, write_signature, Expr, FuncDecl, TypeExpr, ValueSpec};

/// Name-ordered declarations of one scope: a package, the edited buffer,
/// or the members of a type.
pub type DeclMap = IndexMap<String, Decl>;

/// What a [`Decl`] declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclKind {
    Module,
    Const,
    Var,
    Type,
    Func,
}

impl DeclKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DeclKind::Module => "module",
            DeclKind::Const => "const",
            DeclKind::Var => "var",
            DeclKind::Type => "type",
            DeclKind::Func => "func",
        }
    }
}

/// A declared symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub name: String,
    pub kind: DeclKind,
    /// Explicit type: the declared type of a var or const, the definition
    /// of a type, or the signature of a func.
    pub declared_type: Option<TypeExpr>,
    /// Value the type is inferred from when there is no declared type.
    pub initializer: Option<Expr>,
    /// Result position when `initializer` is one multi-value expression
    /// shared by several names (`a, b := f()`).
    pub initializer_index: Option<usize>,
    pub children: DeclMap,
}

impl Decl {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Decl {
            name: name.into(),
            kind,
            declared_type: None,
            initializer: None,
            initializer_index: None,
            children: DeclMap::new(),
        }
    }

    pub fn module(name: impl Into<String>) -> Self {
        Decl::new(name, DeclKind::Module)
    }

    pub fn with_type(mut self, ty: TypeExpr) -> Self {
        self.declared_type = Some(ty);
        self
    }

    pub fn with_initializer(mut self, value: Expr, index: Option<usize>) -> Self {
        self.initializer = Some(value);
        self.initializer_index = index;
        self
    }

    /// Fold a later declaration of the same name into this one. Type and
    /// value come from `other`; existing children are kept and children
    /// only `other` has are appended.
    pub fn merge(&mut self, other: Decl) {
        self.kind = other.kind;
        self.declared_type = other.declared_type;
        self.initializer = other.initializer;
        self.initializer_index = other.initializer_index;
        for (name, child) in other.children {
            self.children.entry(name).or_insert(child);
        }
    }

    /// A var or const with nothing to infer a type from carries no
    /// information and is never inserted.
    fn is_meaningful(&self) -> bool {
        !matches!(self.kind, DeclKind::Var | DeclKind::Const)
            || self.declared_type.is_some()
            || self.initializer.is_some()
    }

    /// Drop unexported children, recursively.
    pub fn retain_exported(&mut self) {
        self.children.retain(|name, _| is_exported(name));
        for child in self.children.values_mut() {
            child.retain_exported();
        }
    }

    /// Children whose name starts with `prefix`.
    pub fn children_matching<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Decl> {
        self.children
            .values()
            .filter(move |child| child.name.starts_with(prefix))
    }
}

/// `const Name`, `var Name`, `type Name`, `module Name`, or
/// `func Name(params) results`.
impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.keyword(), self.name)?;
        match (&self.kind, &self.declared_type) {
            (DeclKind::Func, Some(TypeExpr::Func(sig))) => write_signature(f, sig),
            _ => Ok(()),
        }
    }
}

/// Go's export rule: an upper-case initial letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

// ============================================================================
// Construction
// ============================================================================

/// One name's worth of a declaration, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub decl: Decl,
    /// Base type name of the receiver, for methods.
    pub receiver: Option<String>,
}

/// Which names of a declaration list enter a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    All,
    /// Package export data: exported names, exported receivers and
    /// exported members only.
    Exported,
}

/// Split a parsed declaration into one unit per declared name. Imports
/// produce nothing.
pub fn split_decl(decl: &ast::Decl) -> Vec<Unit> {
    match decl {
        ast::Decl::Import(_) => Vec::new(),
        ast::Decl::Const(specs) => split_value_specs(specs, DeclKind::Const),
        ast::Decl::Var(specs) => split_value_specs(specs, DeclKind::Var),
        ast::Decl::Type(specs) => specs
            .iter()
            .map(|spec| Unit {
                decl: type_decl(&spec.name, &spec.ty),
                receiver: None,
            })
            .collect(),
        ast::Decl::Func(func) => func_unit(func).into_iter().collect(),
    }
}

fn split_value_specs(specs: &[ValueSpec], kind: DeclKind) -> Vec<Unit> {
    let mut units = Vec::new();
    for spec in specs {
        let shared = spec.names.len() > 1 && spec.values.len() == 1;
        for (i, name) in spec.names.iter().enumerate() {
            let mut decl = Decl::new(name, kind);
            decl.declared_type = spec.ty.clone();
            if shared {
                decl = decl.with_initializer(spec.values[0].clone(), Some(i));
            } else if let Some(value) = spec.values.get(i) {
                decl = decl.with_initializer(value.clone(), None);
            }
            units.push(Unit {
                decl,
                receiver: None,
            });
        }
    }
    units
}

/// A type declaration with its struct fields or interface methods as
/// children. Embedded fields are named after their base type.
fn type_decl(name: &str, ty: &TypeExpr) -> Decl {
    let mut decl = Decl::new(name, DeclKind::Type).with_type(ty.clone());
    decl.children = member_decls(ty);
    decl
}

/// Members a struct or interface literal declares.
pub fn member_decls(ty: &TypeExpr) -> DeclMap {
    let mut members = DeclMap::new();
    match ty {
        TypeExpr::Struct(fields) => {
            for field in fields {
                if field.names.is_empty() {
                    if let Some(base) = field.ty.base_name() {
                        members.insert(
                            base.to_string(),
                            Decl::new(base, DeclKind::Var).with_type(field.ty.clone()),
                        );
                    }
                }
                for name in &field.names {
                    members.insert(
                        name.clone(),
                        Decl::new(name, DeclKind::Var).with_type(field.ty.clone()),
                    );
                }
            }
        }
        TypeExpr::Interface(elems) => {
            for elem in elems {
                for name in &elem.names {
                    members.insert(
                        name.clone(),
                        Decl::new(name, DeclKind::Func).with_type(elem.ty.clone()),
                    );
                }
            }
        }
        _ => {}
    }
    members
}

fn func_unit(func: &FuncDecl) -> Option<Unit> {
    let receiver = match &func.receiver {
        Some(_) => Some(func.receiver_base()?.to_string()),
        None => None,
    };
    Some(Unit {
        decl: Decl::new(&func.name, DeclKind::Func).with_type(TypeExpr::Func(func.ty.clone())),
        receiver,
    })
}

/// Insert a unit into a scope. Methods are attached to their receiver
/// type, which is created empty if it has not been declared yet; anything
/// else is inserted or merged into an existing declaration of the name.
pub fn add_unit(scope: &mut DeclMap, unit: Unit) {
    let Unit { decl, receiver } = unit;
    match receiver {
        Some(receiver) => {
            let owner = scope
                .entry(receiver.clone())
                .or_insert_with(|| Decl::new(receiver, DeclKind::Type));
            match owner.children.get_mut(&decl.name) {
                Some(existing) => existing.merge(decl),
                None => {
                    owner.children.insert(decl.name.clone(), decl);
                }
            }
        }
        None => {
            if !decl.is_meaningful() {
                return;
            }
            match scope.get_mut(&decl.name) {
                Some(existing) => existing.merge(decl),
                None => {
                    scope.insert(decl.name.clone(), decl);
                }
            }
        }
    }
}

/// Split and insert every declaration of a parsed list.
pub fn add_decls(scope: &mut DeclMap, decls: &[ast::Decl], visibility: Visibility) {
    for decl in decls {
        for mut unit in split_decl(decl) {
            if visibility == Visibility::Exported {
                let receiver_exported = unit.receiver.as_deref().map_or(true, is_exported);
                if !receiver_exported || !is_exported(&unit.decl.name) {
                    continue;
                }
                unit.decl.retain_exported();
            }
            add_unit(scope, unit);
        }
    }
}
