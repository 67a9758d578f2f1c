//! Recursive-descent parser for Go declaration lists.
//!
//! The same grammar serves both inputs: grouped export lines from an
//! archive (strict, any error fails the group) and the buffer being edited
//! (lenient, errors are collected and parsing resumes at the next
//! top-level keyword). Function bodies and composite literal bodies are
//! skipped by brace matching, so incomplete statements inside a function
//! never disturb the declarations around it.
//!
//! ## Grammar
//!
//! ```text
//! File      := ["package" Ident ";"] { TopDecl ";" }
//! TopDecl   := ("import" | "const" | "var" | "type") Group | FuncDecl
//! Group     := Spec | "(" { Spec ";" } ")"
//! FuncDecl  := "func" [Params] Ident [TypeParams] Signature [Block]
//! Signature := Params [Params | Type]
//! Type      := Name | Name "." Name | "*" Type | "[" [Len] "]" Type
//!            | "map" "[" Type "]" Type | ["<-"] "chan" ["<-"] Type
//!            | "func" Signature | StructType | InterfaceType | "(" Type ")"
//! ```

use super::ast::{
    ChanDir, Decl, Expr, Field, FuncDecl, FuncType, ImportSpec, LitKind, TypeExpr, TypeSpec,
    UnaryOp, ValueSpec,
};
use super::lexer::{tokenize, tokenize_lossy, Token, TokenKind};
use super::SyntaxError;

type ParseResult<T> = Result<T, SyntaxError>;

/// Result of leniently parsing a whole source file.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    /// Name from the `package` clause, if present.
    pub package: Option<String>,
    /// Every top-level declaration that parsed cleanly.
    pub decls: Vec<Decl>,
    /// Errors encountered; parsing resumed after each one.
    pub errors: Vec<SyntaxError>,
}

/// Parse a list of top-level declarations. Any error fails the whole list.
pub fn parse_decl_list(src: &str) -> Result<Vec<Decl>, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(&tokens);
    let mut decls = Vec::new();
    while !parser.at_end() {
        if parser.eat_semi() {
            continue;
        }
        decls.push(parser.top_level_decl()?);
        parser.expect_terminator()?;
    }
    Ok(decls)
}

/// Parse a source file, keeping whatever declarations are well formed.
pub fn parse_file(src: &str) -> SourceFile {
    let (tokens, lex_errors) = tokenize_lossy(src);
    let mut file = SourceFile {
        errors: lex_errors,
        ..SourceFile::default()
    };

    let mut parser = Parser::new(&tokens);
    while parser.eat_semi() {}
    if parser.at_keyword("package") {
        match parser.package_clause() {
            Ok(name) => file.package = Some(name),
            Err(err) => {
                file.errors.push(err);
                parser.recover(0);
            }
        }
    }

    while !parser.at_end() {
        if parser.eat_semi() {
            continue;
        }
        let start = parser.pos;
        let decl = parser
            .top_level_decl()
            .and_then(|decl| parser.expect_terminator().map(|()| decl));
        match decl {
            Ok(decl) => file.decls.push(decl),
            Err(err) => {
                file.errors.push(err);
                parser.recover(start);
            }
        }
    }
    file
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn bump(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at_op(&self, op: &str) -> bool {
        self.peek().is_some_and(|t| t.is_op(op))
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_semi(&mut self) -> bool {
        if self.at_kind(TokenKind::Semi) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_op(&mut self, op: &str) -> ParseResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", op)))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Ident => {
                self.pos += 1;
                Ok(tok.text.clone())
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// A declaration ends at `;`, before a closing `)` of a group, or at
    /// end of input.
    fn expect_terminator(&mut self) -> ParseResult<()> {
        if self.eat_semi() || self.at_end() || self.at_op(")") {
            Ok(())
        } else {
            Err(self.unexpected("';' or newline"))
        }
    }

    fn at_terminator(&self) -> bool {
        self.at_end() || self.at_kind(TokenKind::Semi) || self.at_op(")")
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(tok) => SyntaxError {
                line: tok.line,
                message: format!("expected {}, found {:?}", expected, tok.text),
            },
            None => SyntaxError {
                line: self.tokens.last().map_or(1, |t| t.line),
                message: format!("expected {}, found end of input", expected),
            },
        }
    }

    /// Skip a balanced `open ... close` run starting at the current token.
    fn skip_balanced(&mut self, open: &str, close: &str) -> ParseResult<()> {
        self.expect_op(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.bump() {
                Some(tok) if tok.is_op(open) => depth += 1,
                Some(tok) if tok.is_op(close) => depth -= 1,
                Some(_) => {}
                None => return Err(self.unexpected(&format!("'{}'", close))),
            }
        }
        Ok(())
    }

    /// Resume after an error at the next declaration keyword that starts a
    /// line, always making progress past `start`. Inside braces left open
    /// since `start` only a named `func` counts.
    fn recover(&mut self, start: usize) {
        self.pos = start + 1;
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            let at_line_start = self
                .pos
                .checked_sub(1)
                .and_then(|prev| self.tokens.get(prev))
                .is_some_and(|prev| prev.kind == TokenKind::Semi);
            if at_line_start && tok.kind == TokenKind::Keyword {
                let resume = match tok.text.as_str() {
                    "import" | "const" | "var" | "type" => depth == 0,
                    "func" => depth == 0 || self.at_named_func(),
                    _ => false,
                };
                if resume {
                    return;
                }
            }
            if tok.is_op("{") {
                depth += 1;
            } else if tok.is_op("}") {
                depth = depth.saturating_sub(1);
            }
            self.pos += 1;
        }
    }

    /// Whether the `func` at the cursor declares a function or method
    /// rather than opening a function literal.
    fn at_named_func(&self) -> bool {
        match self.peek_at(1) {
            Some(tok) if tok.kind == TokenKind::Ident => true,
            Some(tok) if tok.is_op("(") => {
                let mut depth = 0usize;
                let mut offset = 1;
                while let Some(tok) = self.peek_at(offset) {
                    if tok.kind == TokenKind::Semi {
                        return false;
                    }
                    if tok.is_op("(") {
                        depth += 1;
                    } else if tok.is_op(")") {
                        depth -= 1;
                        if depth == 0 {
                            return self
                                .peek_at(offset + 1)
                                .is_some_and(|next| next.kind == TokenKind::Ident);
                        }
                    }
                    offset += 1;
                }
                false
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn package_clause(&mut self) -> ParseResult<String> {
        self.pos += 1;
        let name = self.expect_ident()?;
        self.expect_terminator()?;
        Ok(name)
    }

    fn top_level_decl(&mut self) -> ParseResult<Decl> {
        let keyword = match self.peek() {
            Some(tok) if tok.kind == TokenKind::Keyword => tok.text.as_str(),
            _ => return Err(self.unexpected("declaration")),
        };
        match keyword {
            "import" => {
                self.pos += 1;
                Ok(Decl::Import(self.group(Self::import_spec)?))
            }
            "const" => {
                self.pos += 1;
                let specs = self.group(Self::value_spec)?;
                Ok(Decl::Const(repeat_implicit_const_specs(specs)))
            }
            "var" => {
                self.pos += 1;
                Ok(Decl::Var(self.group(Self::value_spec)?))
            }
            "type" => {
                self.pos += 1;
                Ok(Decl::Type(self.group(Self::type_spec)?))
            }
            "func" => self.func_decl().map(Decl::Func),
            _ => Err(self.unexpected("declaration")),
        }
    }

    fn group<T>(&mut self, spec: fn(&mut Self) -> ParseResult<T>) -> ParseResult<Vec<T>> {
        if !self.eat_op("(") {
            return Ok(vec![spec(self)?]);
        }
        let mut specs = Vec::new();
        loop {
            if self.eat_op(")") {
                return Ok(specs);
            }
            if self.eat_semi() {
                continue;
            }
            specs.push(spec(self)?);
            if !self.at_op(")") && !self.eat_semi() {
                return Err(self.unexpected("';' or ')'"));
            }
        }
    }

    fn import_spec(&mut self) -> ParseResult<ImportSpec> {
        let alias = match self.peek() {
            Some(tok) if tok.kind == TokenKind::Ident || tok.is_op(".") => {
                self.pos += 1;
                Some(tok.text.clone())
            }
            _ => None,
        };
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::String => {
                self.pos += 1;
                Ok(ImportSpec {
                    alias,
                    path: unquote(&tok.text).to_string(),
                })
            }
            _ => Err(self.unexpected("import path")),
        }
    }

    fn value_spec(&mut self) -> ParseResult<ValueSpec> {
        let names = self.ident_list()?;
        let mut spec = ValueSpec {
            names,
            ty: None,
            values: Vec::new(),
        };
        if !self.at_op("=") && !self.at_terminator() {
            spec.ty = Some(self.parse_type()?);
        }
        if self.eat_op("=") {
            spec.values = self.expr_list()?;
        }
        Ok(spec)
    }

    fn type_spec(&mut self) -> ParseResult<TypeSpec> {
        let name = self.expect_ident()?;
        if self.at_type_params() {
            self.skip_balanced("[", "]")?;
        }
        let alias = self.eat_op("=");
        let ty = self.parse_type()?;
        Ok(TypeSpec { name, ty, alias })
    }

    /// `type T[K comparable] ...` as opposed to `type T [N]int`.
    fn at_type_params(&self) -> bool {
        if !self.at_op("[") || !self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Ident) {
            return false;
        }
        self.peek_at(2).is_some_and(|t| match t.kind {
            TokenKind::Ident | TokenKind::Keyword => true,
            TokenKind::Op => matches!(t.text.as_str(), "," | "~" | "["),
            _ => false,
        })
    }

    fn func_decl(&mut self) -> ParseResult<FuncDecl> {
        self.pos += 1;
        let receiver = if self.at_op("(") {
            let mut fields = self.parameters()?;
            if fields.len() != 1 {
                return Err(self.unexpected("single receiver"));
            }
            fields.pop()
        } else {
            None
        };
        let name = self.expect_ident()?;
        if self.at_op("[") {
            self.skip_balanced("[", "]")?;
        }
        let ty = self.signature()?;
        if self.at_op("{") {
            self.skip_balanced("{", "}")?;
        }
        Ok(FuncDecl { receiver, name, ty })
    }

    fn ident_list(&mut self) -> ParseResult<Vec<String>> {
        let mut names = vec![self.expect_ident()?];
        while self.eat_op(",") {
            names.push(self.expect_ident()?);
        }
        Ok(names)
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn at_type_start(&self) -> bool {
        match self.peek() {
            Some(tok) => match tok.kind {
                TokenKind::Ident => true,
                TokenKind::Keyword => matches!(
                    tok.text.as_str(),
                    "func" | "map" | "chan" | "struct" | "interface"
                ),
                TokenKind::Op => matches!(tok.text.as_str(), "*" | "[" | "(" | "<-"),
                _ => false,
            },
            None => false,
        }
    }

    fn parse_type(&mut self) -> ParseResult<TypeExpr> {
        let tok = match self.peek() {
            Some(tok) => tok,
            None => return Err(self.unexpected("type")),
        };
        match (tok.kind, tok.text.as_str()) {
            (TokenKind::Ident, _) => {
                self.pos += 1;
                if self.at_op(".") && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Ident)
                {
                    self.pos += 1;
                    let name = self.expect_ident()?;
                    Ok(TypeExpr::Qualified {
                        package: tok.text.clone(),
                        name,
                    })
                } else {
                    Ok(TypeExpr::Named(tok.text.clone()))
                }
            }
            (TokenKind::Op, "*") => {
                self.pos += 1;
                Ok(TypeExpr::Pointer(Box::new(self.parse_type()?)))
            }
            (TokenKind::Op, "[") => {
                self.pos += 1;
                if self.eat_op("]") {
                    return Ok(TypeExpr::Slice(Box::new(self.parse_type()?)));
                }
                let len = self.array_len()?;
                let elem = self.parse_type()?;
                Ok(TypeExpr::Array {
                    len,
                    elem: Box::new(elem),
                })
            }
            (TokenKind::Op, "(") => {
                self.pos += 1;
                let ty = self.parse_type()?;
                self.expect_op(")")?;
                Ok(ty)
            }
            (TokenKind::Op, "<-") => {
                self.pos += 1;
                if !self.at_keyword("chan") {
                    return Err(self.unexpected("'chan'"));
                }
                self.pos += 1;
                Ok(TypeExpr::Chan {
                    dir: ChanDir::Recv,
                    elem: Box::new(self.parse_type()?),
                })
            }
            (TokenKind::Keyword, "chan") => {
                self.pos += 1;
                let dir = if self.eat_op("<-") {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Ok(TypeExpr::Chan {
                    dir,
                    elem: Box::new(self.parse_type()?),
                })
            }
            (TokenKind::Keyword, "map") => {
                self.pos += 1;
                self.expect_op("[")?;
                let key = self.parse_type()?;
                self.expect_op("]")?;
                let value = self.parse_type()?;
                Ok(TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                })
            }
            (TokenKind::Keyword, "func") => {
                self.pos += 1;
                Ok(TypeExpr::Func(self.signature()?))
            }
            (TokenKind::Keyword, "struct") => {
                self.pos += 1;
                self.struct_body().map(TypeExpr::Struct)
            }
            (TokenKind::Keyword, "interface") => {
                self.pos += 1;
                self.interface_body().map(TypeExpr::Interface)
            }
            _ => Err(self.unexpected("type")),
        }
    }

    /// Source text between `[` and the matching `]` of an array type; the
    /// opening bracket is already consumed.
    fn array_len(&mut self) -> ParseResult<String> {
        let mut parts: Vec<&str> = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.bump() {
                Some(tok) if tok.is_op("]") && depth == 0 => break,
                Some(tok) => {
                    if tok.is_op("[") {
                        depth += 1;
                    } else if tok.is_op("]") {
                        depth -= 1;
                    }
                    parts.push(&tok.text);
                }
                None => return Err(self.unexpected("']'")),
            }
        }
        if parts.is_empty() {
            return Err(self.unexpected("array length"));
        }
        Ok(parts.concat())
    }

    fn signature(&mut self) -> ParseResult<FuncType> {
        let params = self.parameters()?;
        let results = if self.at_op("(") {
            self.parameters()?
        } else if self.at_type_start() {
            vec![Field::unnamed(self.parse_type()?)]
        } else {
            Vec::new()
        };
        Ok(FuncType { params, results })
    }

    /// A parenthesised parameter list. Entries are read as `Type [Type]`;
    /// if any entry carries two types, every bare entry is a name grouped
    /// with the next type that follows it.
    fn parameters(&mut self) -> ParseResult<Vec<Field>> {
        self.expect_op("(")?;
        let mut entries: Vec<(TypeExpr, Option<TypeExpr>)> = Vec::new();
        loop {
            if self.eat_op(")") {
                break;
            }
            let first = self.parameter_type()?;
            let second = if self.at_op(",") || self.at_op(")") {
                None
            } else {
                Some(self.parameter_type()?)
            };
            entries.push((first, second));
            if !self.eat_op(",") {
                self.expect_op(")")?;
                break;
            }
        }

        if entries.iter().all(|(_, second)| second.is_none()) {
            return Ok(entries
                .into_iter()
                .map(|(ty, _)| Field::unnamed(ty))
                .collect());
        }

        let mut fields = Vec::new();
        let mut pending = Vec::new();
        for (first, second) in entries {
            match first {
                TypeExpr::Named(name) => pending.push(name),
                _ => return Err(self.unexpected("parameter name")),
            }
            if let Some(ty) = second {
                fields.push(Field {
                    names: std::mem::take(&mut pending),
                    ty,
                });
            }
        }
        if !pending.is_empty() {
            return Err(self.unexpected("parameter type"));
        }
        Ok(fields)
    }

    fn parameter_type(&mut self) -> ParseResult<TypeExpr> {
        if self.eat_op("...") {
            Ok(TypeExpr::Ellipsis(Box::new(self.parse_type()?)))
        } else {
            self.parse_type()
        }
    }

    fn struct_body(&mut self) -> ParseResult<Vec<Field>> {
        self.expect_op("{")?;
        let mut fields = Vec::new();
        loop {
            if self.eat_op("}") {
                return Ok(fields);
            }
            if self.eat_semi() {
                continue;
            }
            fields.push(self.struct_field()?);
            if self.at_kind(TokenKind::String) {
                // tag
                self.pos += 1;
            }
            if !self.at_op("}") && !self.eat_semi() {
                return Err(self.unexpected("';' or '}'"));
            }
        }
    }

    fn struct_field(&mut self) -> ParseResult<Field> {
        if self.at_op("*") {
            return Ok(Field::unnamed(self.parse_type()?));
        }
        let embedded = match self.peek_at(1) {
            None => true,
            Some(next) => {
                next.is_op(".")
                    || next.is_op("}")
                    || matches!(next.kind, TokenKind::Semi | TokenKind::String)
            }
        };
        if embedded {
            return Ok(Field::unnamed(self.parse_type()?));
        }
        let names = self.ident_list()?;
        let ty = self.parse_type()?;
        Ok(Field { names, ty })
    }

    fn interface_body(&mut self) -> ParseResult<Vec<Field>> {
        self.expect_op("{")?;
        let mut elems = Vec::new();
        loop {
            if self.eat_op("}") {
                return Ok(elems);
            }
            if self.eat_semi() {
                continue;
            }
            let is_method = self.at_kind(TokenKind::Ident)
                && self.peek_at(1).is_some_and(|t| t.is_op("("));
            if is_method {
                let name = self.expect_ident()?;
                let sig = self.signature()?;
                elems.push(Field {
                    names: vec![name],
                    ty: TypeExpr::Func(sig),
                });
            } else {
                // embedded interface or constraint union; only the first
                // term is kept
                self.eat_op("~");
                let ty = self.parse_type()?;
                while self.eat_op("|") {
                    self.eat_op("~");
                    self.parse_type()?;
                }
                elems.push(Field::unnamed(ty));
            }
            if !self.at_op("}") && !self.eat_semi() {
                return Err(self.unexpected("';' or '}'"));
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut exprs = vec![self.expr()?];
        while self.eat_op(",") {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    fn expr(&mut self) -> ParseResult<Expr> {
        self.binary_expr(1)
    }

    fn binary_expr(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let mut lhs = self.unary_expr()?;
        while let Some(tok) = self.peek() {
            let prec = match binary_precedence(tok) {
                Some(prec) if prec >= min_prec => prec,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.binary_expr(prec + 1)?;
            lhs = Expr::Binary {
                op: tok.text.clone(),
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary_expr(&mut self) -> ParseResult<Expr> {
        let op = match self.peek() {
            Some(tok) if tok.kind == TokenKind::Op => match tok.text.as_str() {
                "-" => Some(UnaryOp::Neg),
                "+" => Some(UnaryOp::Plus),
                "!" => Some(UnaryOp::Not),
                "^" => Some(UnaryOp::Xor),
                "*" => Some(UnaryOp::Deref),
                "&" => Some(UnaryOp::Addr),
                "<-" => Some(UnaryOp::Recv),
                _ => None,
            },
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let operand = self.unary_expr()?;
                Ok(Expr::Unary {
                    op,
                    operand: Box::new(operand),
                })
            }
            None => self.primary_expr(),
        }
    }

    fn primary_expr(&mut self) -> ParseResult<Expr> {
        let mut expr = self.operand()?;
        loop {
            if self.eat_op(".") {
                if self.eat_op("(") {
                    let ty = if self.at_keyword("type") {
                        self.pos += 1;
                        None
                    } else {
                        Some(self.parse_type()?)
                    };
                    self.expect_op(")")?;
                    expr = Expr::TypeAssert {
                        base: Box::new(expr),
                        ty,
                    };
                } else {
                    let member = self.expect_ident()?;
                    expr = Expr::Selector {
                        base: Box::new(expr),
                        member,
                    };
                }
            } else if self.at_op("(") {
                let args = self.call_args()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                };
            } else if self.at_op("[") {
                expr = self.index_or_slice(expr)?;
            } else if self.at_op("{") {
                match expr.as_type() {
                    Some(ty) => {
                        self.skip_balanced("{", "}")?;
                        expr = Expr::Composite(ty);
                    }
                    None => return Ok(expr),
                }
            } else {
                return Ok(expr);
            }
        }
    }

    fn operand(&mut self) -> ParseResult<Expr> {
        let tok = match self.peek() {
            Some(tok) => tok,
            None => return Err(self.unexpected("expression")),
        };
        let lit = match tok.kind {
            TokenKind::Int => Some(LitKind::Int),
            TokenKind::Float => Some(LitKind::Float),
            TokenKind::Imag => Some(LitKind::Imag),
            TokenKind::Char => Some(LitKind::Char),
            TokenKind::String => Some(LitKind::String),
            _ => None,
        };
        if let Some(kind) = lit {
            self.pos += 1;
            return Ok(Expr::Lit(kind));
        }

        match (tok.kind, tok.text.as_str()) {
            (TokenKind::Ident, _) => {
                self.pos += 1;
                Ok(Expr::Ident(tok.text.clone()))
            }
            (TokenKind::Op, "(") => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect_op(")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            (TokenKind::Keyword, "func") => {
                self.pos += 1;
                let sig = self.signature()?;
                if self.at_op("{") {
                    self.skip_balanced("{", "}")?;
                    Ok(Expr::FuncLit(sig))
                } else {
                    Ok(Expr::Type(TypeExpr::Func(sig)))
                }
            }
            (TokenKind::Op, "[")
            | (TokenKind::Keyword, "map" | "chan" | "struct" | "interface") => {
                Ok(Expr::Type(self.parse_type()?))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn call_args(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect_op("(")?;
        let mut args = Vec::new();
        loop {
            if self.eat_op(")") {
                return Ok(args);
            }
            args.push(self.expr()?);
            self.eat_op("...");
            if !self.eat_op(",") {
                self.expect_op(")")?;
                return Ok(args);
            }
        }
    }

    fn index_or_slice(&mut self, base: Expr) -> ParseResult<Expr> {
        self.expect_op("[")?;
        let mut is_slice = false;
        if !self.at_op(":") {
            self.expr()?;
            while self.eat_op(",") {
                if self.at_op("]") {
                    break;
                }
                self.expr()?;
            }
        }
        while self.eat_op(":") {
            is_slice = true;
            if !self.at_op(":") && !self.at_op("]") {
                self.expr()?;
            }
        }
        self.expect_op("]")?;
        Ok(if is_slice {
            Expr::Slice(Box::new(base))
        } else {
            Expr::Index(Box::new(base))
        })
    }
}

fn binary_precedence(tok: &Token) -> Option<u8> {
    if tok.kind != TokenKind::Op {
        return None;
    }
    match tok.text.as_str() {
        "||" => Some(1),
        "&&" => Some(2),
        "==" | "!=" | "<" | "<=" | ">" | ">=" => Some(3),
        "+" | "-" | "|" | "^" => Some(4),
        "*" | "/" | "%" | "<<" | ">>" | "&" | "&^" => Some(5),
        _ => None,
    }
}

/// Inside a `const` group, a spec with neither type nor values repeats
/// the previous spec's type and values.
fn repeat_implicit_const_specs(specs: Vec<ValueSpec>) -> Vec<ValueSpec> {
    let mut previous: Option<(Option<TypeExpr>, Vec<Expr>)> = None;
    specs
        .into_iter()
        .map(|mut spec| {
            if spec.ty.is_none() && spec.values.is_empty() {
                if let Some((ty, values)) = &previous {
                    spec.ty = ty.clone();
                    spec.values = values.clone();
                }
            } else {
                previous = Some((spec.ty.clone(), spec.values.clone()));
            }
            spec
        })
        .collect()
}

/// Strip the quotes from an interpreted or raw string literal.
pub(crate) fn unquote(text: &str) -> &str {
    text.strip_prefix(['"', '`'])
        .and_then(|s| s.strip_suffix(['"', '`']))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> TypeExpr {
        TypeExpr::named(name)
    }

    fn single(src: &str) -> Decl {
        let mut decls = parse_decl_list(src).unwrap();
        assert_eq!(decls.len(), 1, "expected one decl in {:?}", src);
        decls.remove(0)
    }

    #[test]
    fn test_parse_const_with_value() {
        match single("const Pi = 0") {
            Decl::Const(specs) => {
                assert_eq!(specs[0].names, vec!["Pi"]);
                assert_eq!(specs[0].values, vec![Expr::Lit(LitKind::Int)]);
            }
            other => panic!("expected const, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_typed_var_group() {
        match single("var (\n\ta, b int\n\tc = \"x\"\n)") {
            Decl::Var(specs) => {
                assert_eq!(specs.len(), 2);
                assert_eq!(specs[0].names, vec!["a", "b"]);
                assert_eq!(specs[0].ty, Some(named("int")));
                assert!(specs[1].ty.is_none());
                assert_eq!(specs[1].values.len(), 1);
            }
            other => panic!("expected var, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_method_with_receiver() {
        match single("func (p *Point) Add(q geom.Point) (geom.Point)") {
            Decl::Func(func) => {
                assert_eq!(func.name, "Add");
                assert_eq!(func.receiver_base(), Some("Point"));
                assert_eq!(func.ty.params[0].names, vec!["q"]);
                assert_eq!(
                    func.ty.result(0),
                    Some(&TypeExpr::Qualified {
                        package: "geom".into(),
                        name: "Point".into()
                    })
                );
            }
            other => panic!("expected func, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unnamed_receiver_and_params() {
        match single("func ( *Buffer) Write ( []uint8) ( int,  error)") {
            Decl::Func(func) => {
                assert_eq!(func.receiver_base(), Some("Buffer"));
                assert_eq!(func.ty.params.len(), 1);
                assert!(func.ty.params[0].names.is_empty());
                assert_eq!(func.ty.result_count(), 2);
            }
            other => panic!("expected func, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_grouped_param_names() {
        match single("func F(a, b int, s ...string) (n int, err error)") {
            Decl::Func(func) => {
                assert_eq!(func.ty.params.len(), 2);
                assert_eq!(func.ty.params[0].names, vec!["a", "b"]);
                assert_eq!(
                    func.ty.params[1].ty,
                    TypeExpr::Ellipsis(Box::new(named("string")))
                );
                assert_eq!(func.ty.result(1), Some(&named("error")));
            }
            other => panic!("expected func, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_struct_with_embedded_and_tags() {
        let src = "type T struct { io.Reader; *Base; X, Y int `json:\"x\"`; next *T }";
        match single(src) {
            Decl::Type(specs) => match &specs[0].ty {
                TypeExpr::Struct(fields) => {
                    assert_eq!(fields.len(), 4);
                    assert!(fields[0].names.is_empty());
                    assert_eq!(fields[0].ty.base_name(), Some("Reader"));
                    assert_eq!(fields[1].ty.base_name(), Some("Base"));
                    assert_eq!(fields[2].names, vec!["X", "Y"]);
                    assert_eq!(fields[3].names, vec!["next"]);
                }
                other => panic!("expected struct, got {:?}", other),
            },
            other => panic!("expected type, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_interface() {
        match single("type Shape interface { Area () (float64); fmt.Stringer }") {
            Decl::Type(specs) => match &specs[0].ty {
                TypeExpr::Interface(elems) => {
                    assert_eq!(elems[0].names, vec!["Area"]);
                    assert!(matches!(elems[0].ty, TypeExpr::Func(_)));
                    assert!(elems[1].names.is_empty());
                }
                other => panic!("expected interface, got {:?}", other),
            },
            other => panic!("expected type, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_compound_types() {
        let src = "var m map[string][]*ast.File\n\
                   var c <-chan int\n\
                   var a [4]byte\n\
                   var f func(int) bool";
        let decls = parse_decl_list(src).unwrap();
        let types: Vec<String> = decls
            .iter()
            .map(|d| match d {
                Decl::Var(specs) => specs[0].ty.as_ref().unwrap().to_string(),
                other => panic!("expected var, got {:?}", other),
            })
            .collect();
        assert_eq!(
            types,
            vec![
                "map[string][]*ast.File",
                "<-chan int",
                "[4]byte",
                "func(int) bool"
            ]
        );
    }

    #[test]
    fn test_parse_initializer_shapes() {
        let src = "var a, b = F()\nvar p = &geom.Point{X: 1}\nvar s = x.y.z\nvar t = v.(T)";
        let decls = parse_decl_list(src).unwrap();
        let values: Vec<Expr> = decls
            .into_iter()
            .map(|d| match d {
                Decl::Var(mut specs) => specs.remove(0).values.remove(0),
                other => panic!("expected var, got {:?}", other),
            })
            .collect();
        assert!(matches!(values[0], Expr::Call { .. }));
        match &values[1] {
            Expr::Unary {
                op: UnaryOp::Addr,
                operand,
            } => assert!(matches!(operand.as_ref(), Expr::Composite(_))),
            other => panic!("expected &composite, got {:?}", other),
        }
        assert!(matches!(values[2], Expr::Selector { .. }));
        assert!(matches!(values[3], Expr::TypeAssert { ty: Some(_), .. }));
    }

    #[test]
    fn test_parse_const_iota_repetition() {
        match single("const (\n\tA Kind = iota\n\tB\n\tC\n)") {
            Decl::Const(specs) => {
                assert_eq!(specs.len(), 3);
                assert_eq!(specs[2].ty, Some(named("Kind")));
                assert_eq!(specs[2].values, vec![Expr::Ident("iota".into())]);
            }
            other => panic!("expected const, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_func_body_is_skipped() {
        let src = "func main() {\n\tx := foo.\n\tif y { z() }\n}\nvar after int";
        let decls = parse_decl_list(src).unwrap();
        assert_eq!(decls.len(), 2);
        assert!(matches!(&decls[1], Decl::Var(_)));
    }

    #[test]
    fn test_parse_decl_list_fails_on_garbage() {
        assert!(parse_decl_list("type = 5").is_err());
    }

    #[test]
    fn test_parse_file_imports_and_package() {
        let src = "package main\n\nimport (\n\t\"fmt\"\n\tstr \"strings\"\n)\n";
        let file = parse_file(src);
        assert_eq!(file.package.as_deref(), Some("main"));
        assert!(file.errors.is_empty());
        match &file.decls[0] {
            Decl::Import(specs) => {
                assert_eq!(specs[0].path, "fmt");
                assert_eq!(specs[1].alias.as_deref(), Some("str"));
                assert_eq!(specs[1].path, "strings");
            }
            other => panic!("expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_file_recovers_after_error() {
        let src = "package main\nvar x = )\nvar y int\nfunc f() {}\n";
        let file = parse_file(src);
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn test_parse_file_with_unbalanced_body_keeps_earlier_decls() {
        let src = "package main\nvar x int\nfunc main() {\n\tfmt.\n";
        let file = parse_file(src);
        assert_eq!(file.decls.len(), 1);
        assert!(!file.errors.is_empty());
    }

    #[test]
    fn test_parse_file_skips_past_bad_literal() {
        let src = "package main\nvar before int\nfunc f() {\n\tx := \"abc\n}\nvar later int\n";
        let file = parse_file(src);
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.errors[0].line, 4);
        assert_eq!(file.decls.len(), 3);
        assert!(matches!(&file.decls[2], Decl::Var(specs) if specs[0].names == ["later"]));
    }

    #[test]
    fn test_recover_ignores_keywords_inside_open_body() {
        let src = "package main\nfunc main() {\n\tx := 1\n\tvar inner int\n\tgo func() {\n\t}()\n\
                   func (s *S) Len() int {\n\treturn 0\n}\nvar after int\n";
        let file = parse_file(src);
        assert!(!file.errors.is_empty());
        let names: Vec<&str> = file
            .decls
            .iter()
            .flat_map(|decl| match decl {
                Decl::Var(specs) => specs.iter().flat_map(|s| s.names.iter()).collect(),
                Decl::Func(func) => vec![&func.name],
                _ => Vec::new(),
            })
            .map(String::as_str)
            .collect();
        assert_eq!(names, ["Len", "after"]);
    }

    #[test]
    fn test_generic_type_params_are_skipped() {
        match single("type List[T any] struct { items []T }") {
            Decl::Type(specs) => {
                assert_eq!(specs[0].name, "List");
                assert!(matches!(specs[0].ty, TypeExpr::Struct(_)));
            }
            other => panic!("expected type, got {:?}", other),
        }
        match single("type Block [16]byte") {
            Decl::Type(specs) => assert!(matches!(specs[0].ty, TypeExpr::Array { .. })),
            other => panic!("expected type, got {:?}", other),
        }
    }
}
