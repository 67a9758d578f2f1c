//! Syntax tree for the declaration subset of Go.
//!
//! Only what completion needs is modelled: top-level declarations, type
//! expressions in full, and enough of the expression grammar to infer the
//! type of an initializer. Function bodies and composite literal elements
//! are skipped by the parser and never reach this tree.

use std::fmt;

// ============================================================================
// Declarations
// ============================================================================

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// `import "path"` or a parenthesised import group.
    Import(Vec<ImportSpec>),
    /// `const` declaration (single spec or group).
    Const(Vec<ValueSpec>),
    /// `var` declaration (single spec or group).
    Var(Vec<ValueSpec>),
    /// `type` declaration (single spec or group).
    Type(Vec<TypeSpec>),
    /// Function or method declaration.
    Func(FuncDecl),
}

/// One import line: optional local name plus the unquoted import path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub alias: Option<String>,
    pub path: String,
}

/// `a, b T = x, y` inside a `const` or `var` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
}

/// `Name T` or `Name = T` inside a `type` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: String,
    pub ty: TypeExpr,
    pub alias: bool,
}

/// `func (recv) Name(params) results`.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub receiver: Option<Field>,
    pub name: String,
    pub ty: FuncType,
}

impl FuncDecl {
    /// Base type name of the receiver, with any pointer stripped.
    pub fn receiver_base(&self) -> Option<&str> {
        self.receiver.as_ref().and_then(|recv| recv.ty.base_name())
    }
}

// ============================================================================
// Types
// ============================================================================

/// Channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// `T`
    Named(String),
    /// `pkg.T`
    Qualified { package: String, name: String },
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T`
    Slice(Box<TypeExpr>),
    /// `[N]T`; the length is kept as source text.
    Array { len: String, elem: Box<TypeExpr> },
    /// `map[K]V`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `chan T`, `chan<- T`, `<-chan T`
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    /// `func(params) results`
    Func(FuncType),
    /// `struct { ... }`
    Struct(Vec<Field>),
    /// `interface { ... }`; methods carry a `Func` type, embedded
    /// interfaces have no names.
    Interface(Vec<Field>),
    /// `...T` (final parameter only)
    Ellipsis(Box<TypeExpr>),
}

impl TypeExpr {
    /// Name of the named type at the core of this expression, looking
    /// through pointers. `*pkg.T` yields `T`.
    pub fn base_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Named(name) => Some(name),
            TypeExpr::Qualified { name, .. } => Some(name),
            TypeExpr::Pointer(inner) => inner.base_name(),
            _ => None,
        }
    }

    /// Strip any number of pointer indirections.
    pub fn strip_pointers(&self) -> &TypeExpr {
        match self {
            TypeExpr::Pointer(inner) => inner.strip_pointers(),
            other => other,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }
}

/// A struct field, parameter, result, or interface method.
///
/// `names` is empty for unnamed parameters and embedded fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub names: Vec<String>,
    pub ty: TypeExpr,
}

impl Field {
    pub fn unnamed(ty: TypeExpr) -> Self {
        Field {
            names: Vec::new(),
            ty,
        }
    }

    /// Number of values this field contributes to a parameter/result tuple.
    pub fn arity(&self) -> usize {
        self.names.len().max(1)
    }
}

/// Parameter and result lists of a function type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FuncType {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

impl FuncType {
    /// Type of the `index`-th result, flattening grouped names.
    pub fn result(&self, index: usize) -> Option<&TypeExpr> {
        self.results
            .iter()
            .flat_map(|field| std::iter::repeat(&field.ty).take(field.arity()))
            .nth(index)
    }

    pub fn result_count(&self) -> usize {
        self.results.iter().map(Field::arity).sum()
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// Kind of a basic literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    Xor,
    Deref,
    Addr,
    Recv,
}

/// An expression, reduced to the shapes type inference cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    Lit(LitKind),
    Selector {
        base: Box<Expr>,
        member: String,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Index(Box<Expr>),
    Slice(Box<Expr>),
    /// `x.(T)`; `x.(type)` has no type.
    TypeAssert {
        base: Box<Expr>,
        ty: Option<TypeExpr>,
    },
    /// `T{...}`; elements are not kept.
    Composite(TypeExpr),
    FuncLit(FuncType),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Paren(Box<Expr>),
    /// A type in expression position, e.g. the first argument of `make`.
    Type(TypeExpr),
}

impl Expr {
    /// Reinterpret an expression as a type, for composite literals and
    /// conversions where the parser saw an operand first.
    pub fn as_type(&self) -> Option<TypeExpr> {
        match self {
            Expr::Ident(name) => Some(TypeExpr::Named(name.clone())),
            Expr::Selector { base, member } => match base.as_ref() {
                Expr::Ident(package) => Some(TypeExpr::Qualified {
                    package: package.clone(),
                    name: member.clone(),
                }),
                _ => None,
            },
            Expr::Paren(inner) => inner.as_type(),
            Expr::Unary {
                op: UnaryOp::Deref,
                operand,
            } => operand.as_type().map(|t| TypeExpr::Pointer(Box::new(t))),
            Expr::Type(ty) => Some(ty.clone()),
            _ => None,
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render a parameter/result list, returning how many values it declares.
pub fn write_fields(out: &mut impl fmt::Write, fields: &[Field]) -> Result<usize, fmt::Error> {
    let mut count = 0;
    for (i, field) in fields.iter().enumerate() {
        if field.names.is_empty() {
            count += 1;
        } else {
            write!(out, "{} ", field.names.join(", "))?;
            count += field.names.len();
        }
        write!(out, "{}", field.ty)?;
        if i + 1 != fields.len() {
            out.write_str(", ")?;
        }
    }
    Ok(count)
}

/// Render the `(params) results` tail shared by func types and func decls.
///
/// Results are parenthesised only when their rendering contains a space,
/// i.e. more than a single unnamed type.
pub fn write_signature(out: &mut impl fmt::Write, ty: &FuncType) -> fmt::Result {
    out.write_char('(')?;
    write_fields(out, &ty.params)?;
    out.write_char(')')?;

    let mut results = String::new();
    if write_fields(&mut results, &ty.results)? > 0 {
        if results.contains(' ') {
            write!(out, " ({})", results)?;
        } else {
            write!(out, " {}", results)?;
        }
    }
    Ok(())
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Qualified { package, name } => write!(f, "{}.{}", package, name),
            TypeExpr::Pointer(inner) => write!(f, "*{}", inner),
            TypeExpr::Slice(elem) => write!(f, "[]{}", elem),
            TypeExpr::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeExpr::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {}", elem),
                ChanDir::Send => write!(f, "chan<- {}", elem),
                ChanDir::Recv => write!(f, "<-chan {}", elem),
            },
            TypeExpr::Func(ty) => {
                f.write_str("func")?;
                write_signature(f, ty)
            }
            TypeExpr::Struct(_) => f.write_str("struct"),
            TypeExpr::Interface(_) => f.write_str("interface{}"),
            TypeExpr::Ellipsis(elem) => write!(f, "...{}", elem),
        }
    }
}
