//! Lazy type inference over the declaration tree.
//!
//! Nothing is cached: a type is worked out from the declarations every
//! time it is asked for. Every step that follows a name to another
//! declaration counts towards a depth limit, so self-referential
//! declarations (`type T T`, `var a = b; var b = a`) come out as "no type"
//! instead of recursing forever.
//!
//! Type expressions are only meaningful together with the scope they were
//! written in: `Point` inside package `geom` names `geom`'s `Point`, not a
//! declaration of the buffer. [`Typed`] carries that scope along.

use std::borrow::Cow;

use tracing::trace;

use crate::context::Context;
use crate::decl::{member_decls, Decl, DeclKind, DeclMap};
use crate::syntax::ast::{Expr, LitKind, TypeExpr, UnaryOp};

/// Maximum number of name-following steps in one inference.
pub const MAX_DEPTH: usize = 32;

/// Where a type expression was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// The buffer being completed.
    Local,
    /// A cached module, by canonical import path.
    Module(String),
}

/// A type expression and the scope its names resolve in.
#[derive(Debug, Clone, PartialEq)]
pub struct Typed {
    pub ty: TypeExpr,
    pub scope: Scope,
}

impl Typed {
    pub fn new(ty: TypeExpr, scope: Scope) -> Self {
        Typed { ty, scope }
    }

    fn named(name: &str, scope: &Scope) -> Self {
        Typed::new(TypeExpr::named(name), scope.clone())
    }
}

/// Predeclared type names; calls to them are conversions.
const PREDECLARED_TYPES: &[&str] = &[
    "bool", "byte", "complex64", "complex128", "error", "float32", "float64", "int", "int8",
    "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "any",
];

impl Context {
    /// The type of a declaration found in `scope`: its declared type, or
    /// else the type of its initializer.
    pub fn infer_type(&self, decl: &Decl, scope: &Scope) -> Option<Typed> {
        self.decl_type(decl, scope, 0)
    }

    /// The type of an expression written in `scope`.
    pub fn expr_type(&self, expr: &Expr, scope: &Scope) -> Option<Typed> {
        self.value_type(expr, None, scope, 0)
    }

    /// Fields and methods of values of a type, along with the scope the
    /// member declarations were written in.
    pub fn members_of(&self, typed: &Typed) -> Option<(Cow<'_, DeclMap>, Scope)> {
        self.members(typed, 0)
    }

    /// Follow named types to the type they are defined as.
    pub fn underlying(&self, typed: &Typed) -> Option<Typed> {
        self.underlying_at(typed, 0)
    }

    // ------------------------------------------------------------------
    // Name resolution
    // ------------------------------------------------------------------

    fn lookup(&self, name: &str, scope: &Scope) -> Option<(&Decl, Scope)> {
        let decl = match scope {
            Scope::Local => self.locals().get(name),
            Scope::Module(canonical) => self.module(canonical)?.children.get(name),
        }?;
        Some((decl, scope.clone()))
    }

    /// A package member referenced as `package.name` from `scope`. Buffer
    /// aliases are tried first, then cached modules by display name.
    fn lookup_qualified(&self, package: &str, name: &str, scope: &Scope) -> Option<(&Decl, Scope)> {
        if *scope == Scope::Local {
            if let Some(canonical) = self.aliases().get(package) {
                if let Some(decl) = self.module(canonical).and_then(|m| m.children.get(name)) {
                    return Some((decl, Scope::Module(canonical.clone())));
                }
            }
        }
        self.modules()
            .iter()
            .filter(|(_, module)| module.name == package)
            .find_map(|(canonical, module)| {
                module
                    .children
                    .get(name)
                    .map(|decl| (decl, Scope::Module(canonical.clone())))
            })
    }

    /// Whether `name` refers to a package rather than a declaration.
    fn is_package(&self, name: &str, scope: &Scope) -> bool {
        if self.lookup(name, scope).is_some() {
            return false;
        }
        match scope {
            Scope::Local => self.aliases().contains_key(name),
            Scope::Module(_) => self.module_by_display_name(name).is_some(),
        }
    }

    /// The declaration a named type refers to.
    fn type_decl(&self, typed: &Typed) -> Option<(&Decl, Scope)> {
        let found = match typed.ty.strip_pointers() {
            TypeExpr::Named(name) => self.lookup(name, &typed.scope),
            TypeExpr::Qualified { package, name } => {
                self.lookup_qualified(package, name, &typed.scope)
            }
            _ => None,
        };
        found.filter(|(decl, _)| decl.kind == DeclKind::Type)
    }

    // ------------------------------------------------------------------
    // Declarations and types
    // ------------------------------------------------------------------

    fn decl_type(&self, decl: &Decl, scope: &Scope, depth: usize) -> Option<Typed> {
        if depth > MAX_DEPTH {
            trace!(name = %decl.name, "inference depth exceeded");
            return None;
        }
        if let Some(ty) = &decl.declared_type {
            return Some(Typed::new(ty.clone(), scope.clone()));
        }
        let value = decl.initializer.as_ref()?;
        let typed = self.value_type(value, decl.initializer_index, scope, depth + 1);
        if typed.is_none() {
            trace!(name = %decl.name, "no type inferred");
        }
        typed
    }

    fn underlying_at(&self, typed: &Typed, depth: usize) -> Option<Typed> {
        if depth > MAX_DEPTH {
            trace!(ty = %typed.ty, "underlying type cycle");
            return None;
        }
        match &typed.ty {
            TypeExpr::Named(_) | TypeExpr::Qualified { .. } => match self.type_decl(typed) {
                Some((decl, scope)) => {
                    let ty = decl.declared_type.clone()?;
                    self.underlying_at(&Typed::new(ty, scope), depth + 1)
                }
                None => Some(typed.clone()),
            },
            _ => Some(typed.clone()),
        }
    }

    fn members(&self, typed: &Typed, depth: usize) -> Option<(Cow<'_, DeclMap>, Scope)> {
        if depth > MAX_DEPTH {
            trace!(ty = %typed.ty, "member lookup cycle");
            return None;
        }
        match typed.ty.strip_pointers() {
            ty @ (TypeExpr::Struct(_) | TypeExpr::Interface(_)) => {
                Some((Cow::Owned(member_decls(ty)), typed.scope.clone()))
            }
            TypeExpr::Named(_) | TypeExpr::Qualified { .. } => {
                let (decl, scope) = self.type_decl(typed)?;
                if !decl.children.is_empty() {
                    return Some((Cow::Borrowed(&decl.children), scope));
                }
                let underlying = Typed::new(decl.declared_type.clone()?, scope);
                self.members(&underlying, depth + 1)
            }
            _ => None,
        }
    }

    /// The declaration `base.member` refers to: a package member, or a
    /// field or method of `base`'s type.
    fn select(
        &self,
        base: &Expr,
        member: &str,
        scope: &Scope,
        depth: usize,
    ) -> Option<(Cow<'_, Decl>, Scope)> {
        if let Expr::Ident(package) = base {
            if self.is_package(package, scope) {
                let (decl, scope) = self.lookup_qualified(package, member, scope)?;
                return Some((Cow::Borrowed(decl), scope));
            }
        }
        let base_type = self.value_type(base, None, scope, depth + 1)?;
        let (members, scope) = self.members(&base_type, depth + 1)?;
        let decl = match members {
            Cow::Borrowed(map) => Cow::Borrowed(map.get(member)?),
            Cow::Owned(mut map) => Cow::Owned(map.swap_remove(member)?),
        };
        Some((decl, scope))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Type of `expr`, or of its `index`th value when it is a multi-value
    /// expression shared by several names.
    fn value_type(
        &self,
        expr: &Expr,
        index: Option<usize>,
        scope: &Scope,
        depth: usize,
    ) -> Option<Typed> {
        if depth > MAX_DEPTH {
            trace!("inference depth exceeded");
            return None;
        }
        let index = index.unwrap_or(0);
        // second value of a comma-ok form
        if index == 1 && is_comma_ok(expr) {
            return Some(Typed::named("bool", scope));
        }
        if index > 0 && !matches!(expr, Expr::Call { .. } | Expr::Paren(_)) {
            return None;
        }

        match expr {
            Expr::Ident(name) => match self.lookup(name, scope) {
                Some((decl, scope)) => self.decl_type(decl, &scope, depth + 1),
                None => match name.as_str() {
                    "true" | "false" => Some(Typed::named("bool", scope)),
                    "iota" => Some(Typed::named("int", scope)),
                    _ => None,
                },
            },
            Expr::Lit(kind) => Some(Typed::named(literal_type(*kind), scope)),
            Expr::Paren(inner) => self.value_type(inner, Some(index), scope, depth + 1),
            Expr::Selector { base, member } => {
                let (decl, scope) = self.select(base, member, scope, depth + 1)?;
                self.decl_type(&decl, &scope, depth + 1)
            }
            Expr::Call { func, args } => self.call_type(func, args, index, scope, depth + 1),
            Expr::Composite(ty) | Expr::Type(ty) => Some(Typed::new(ty.clone(), scope.clone())),
            Expr::FuncLit(sig) => Some(Typed::new(TypeExpr::Func(sig.clone()), scope.clone())),
            Expr::Unary { op, operand } => self.unary_type(*op, operand, scope, depth + 1),
            Expr::Binary { op, lhs, rhs } => {
                if is_boolean_operator(op) {
                    return Some(Typed::named("bool", scope));
                }
                if matches!(op.as_str(), "<<" | ">>") {
                    return self.value_type(lhs, None, scope, depth + 1);
                }
                // an untyped constant operand takes the other operand's type
                let (first, second) = if matches!(lhs.as_ref(), Expr::Lit(_)) {
                    (rhs, lhs)
                } else {
                    (lhs, rhs)
                };
                self.value_type(first, None, scope, depth + 1)
                    .or_else(|| self.value_type(second, None, scope, depth + 1))
            }
            Expr::Index(base) => {
                let base_type = self.value_type(base, None, scope, depth + 1)?;
                self.element_type(&base_type, depth + 1)
            }
            Expr::Slice(base) => self.value_type(base, None, scope, depth + 1),
            Expr::TypeAssert { ty, .. } => ty.clone().map(|ty| Typed::new(ty, scope.clone())),
        }
    }

    fn unary_type(
        &self,
        op: UnaryOp,
        operand: &Expr,
        scope: &Scope,
        depth: usize,
    ) -> Option<Typed> {
        match op {
            UnaryOp::Not => Some(Typed::named("bool", scope)),
            UnaryOp::Neg | UnaryOp::Plus | UnaryOp::Xor => {
                self.value_type(operand, None, scope, depth + 1)
            }
            UnaryOp::Addr => {
                let inner = self.value_type(operand, None, scope, depth + 1)?;
                Some(Typed::new(TypeExpr::Pointer(Box::new(inner.ty)), inner.scope))
            }
            UnaryOp::Deref => {
                let pointer = self.value_type(operand, None, scope, depth + 1)?;
                if let TypeExpr::Pointer(inner) = &pointer.ty {
                    return Some(Typed::new((**inner).clone(), pointer.scope));
                }
                match self.underlying_at(&pointer, depth + 1)? {
                    Typed {
                        ty: TypeExpr::Pointer(inner),
                        scope,
                    } => Some(Typed::new(*inner, scope)),
                    _ => None,
                }
            }
            UnaryOp::Recv => {
                let chan = self.value_type(operand, None, scope, depth + 1)?;
                match self.underlying_at(&chan, depth + 1)? {
                    Typed {
                        ty: TypeExpr::Chan { elem, .. },
                        scope,
                    } => Some(Typed::new(*elem, scope)),
                    _ => None,
                }
            }
        }
    }

    /// Type of `x[i]` given the type of `x`.
    fn element_type(&self, container: &Typed, depth: usize) -> Option<Typed> {
        let Typed { ty, scope } = self.underlying_at(container, depth + 1)?;
        let elem = match ty {
            TypeExpr::Slice(elem) | TypeExpr::Array { elem, .. } | TypeExpr::Ellipsis(elem) => {
                *elem
            }
            TypeExpr::Map { value, .. } => *value,
            TypeExpr::Named(name) if name == "string" => TypeExpr::named("byte"),
            TypeExpr::Pointer(inner) => match *inner {
                TypeExpr::Array { elem, .. } => *elem,
                _ => return None,
            },
            _ => return None,
        };
        Some(Typed::new(elem, scope))
    }

    fn call_type(
        &self,
        func: &Expr,
        args: &[Expr],
        index: usize,
        scope: &Scope,
        depth: usize,
    ) -> Option<Typed> {
        // conversions to unnamed types: []byte(s), (*T)(p)
        if let Expr::Type(ty) = func {
            return (index == 0).then(|| Typed::new(ty.clone(), scope.clone()));
        }
        if let Expr::Paren(inner) = func {
            if let Expr::Unary {
                op: UnaryOp::Deref,
                ..
            } = inner.as_ref()
            {
                if let Some(ty) = func.as_type() {
                    return (index == 0).then(|| Typed::new(ty, scope.clone()));
                }
            }
        }

        let callee = match func {
            Expr::Ident(name) => match self.lookup(name, scope) {
                Some((decl, scope)) => Some((Cow::Borrowed(decl), scope)),
                None => return self.builtin_call_type(name, args, index, scope, depth + 1),
            },
            Expr::Selector { base, member } => self.select(base, member, scope, depth + 1),
            _ => None,
        };

        if let Some((decl, decl_scope)) = &callee {
            if decl.kind == DeclKind::Type {
                return (index == 0).then(|| Typed::named(&decl.name, decl_scope));
            }
        }

        let func_type = match callee {
            Some((decl, decl_scope)) => self.decl_type(&decl, &decl_scope, depth + 1)?,
            None => self.value_type(func, None, scope, depth + 1)?,
        };
        match self.underlying_at(&func_type, depth + 1)? {
            Typed {
                ty: TypeExpr::Func(sig),
                scope,
            } => sig
                .result(index)
                .map(|result| Typed::new(result.clone(), scope)),
            _ => None,
        }
    }

    /// Calls of predeclared functions and conversions to predeclared types.
    fn builtin_call_type(
        &self,
        name: &str,
        args: &[Expr],
        index: usize,
        scope: &Scope,
        depth: usize,
    ) -> Option<Typed> {
        if index != 0 {
            return None;
        }
        match name {
            "new" => {
                let ty = args.first()?.as_type()?;
                Some(Typed::new(TypeExpr::Pointer(Box::new(ty)), scope.clone()))
            }
            "make" => Some(Typed::new(args.first()?.as_type()?, scope.clone())),
            "append" => self.value_type(args.first()?, None, scope, depth + 1),
            "len" | "cap" | "copy" => Some(Typed::named("int", scope)),
            "complex" => Some(Typed::named("complex128", scope)),
            "real" | "imag" => Some(Typed::named("float64", scope)),
            _ if PREDECLARED_TYPES.contains(&name) => Some(Typed::named(name, scope)),
            _ => {
                trace!(name, "unknown function");
                None
            }
        }
    }
}

fn literal_type(kind: LitKind) -> &'static str {
    match kind {
        LitKind::Int => "int",
        LitKind::Float => "float64",
        LitKind::Imag => "complex128",
        LitKind::Char => "rune",
        LitKind::String => "string",
    }
}

fn is_boolean_operator(op: &str) -> bool {
    matches!(op, "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||")
}

/// `m[k]`, `x.(T)` and `<-ch` yield an extra boolean when assigned to two
/// names.
fn is_comma_ok(expr: &Expr) -> bool {
    match expr {
        Expr::Index(_) | Expr::TypeAssert { .. } => true,
        Expr::Unary {
            op: UnaryOp::Recv, ..
        } => true,
        Expr::Paren(inner) => is_comma_ok(inner),
        _ => false,
    }
}
