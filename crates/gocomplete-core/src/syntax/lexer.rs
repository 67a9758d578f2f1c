//! Tokenizer for Go source and preprocessed export lines.
//!
//! Produces a flat token vector with automatic semicolon insertion applied
//! (a newline after an identifier, literal, `)`, `]`, `}` and a few
//! keywords becomes a `;` token), so the parser only ever deals with
//! explicit terminators.

use winnow::combinator::{alt, delimited, preceded};
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_until, take_while};
use winnow::ModalResult;

use super::SyntaxError;

/// Reserved words. Everything else that looks like a word is an identifier.
const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Keyword,
    Int,
    Float,
    Imag,
    Char,
    String,
    /// Operators and delimiters.
    Op,
    /// Explicit `;` or one inserted at a newline.
    Semi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == keyword
    }

    fn ends_statement(&self) -> bool {
        match self.kind {
            TokenKind::Ident
            | TokenKind::Int
            | TokenKind::Float
            | TokenKind::Imag
            | TokenKind::Char
            | TokenKind::String => true,
            TokenKind::Keyword => matches!(
                self.text.as_str(),
                "break" | "continue" | "fallthrough" | "return"
            ),
            TokenKind::Op => matches!(self.text.as_str(), "++" | "--" | ")" | "]" | "}"),
            TokenKind::Semi => false,
        }
    }
}

/// Tokenize `src`, failing on the first unrecognized character.
pub fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    let (tokens, errors) = tokenize_lossy(src);
    match errors.into_iter().next() {
        None => Ok(tokens),
        Some(err) => Err(err),
    }
}

/// Tokenize `src`, skipping the rest of the line after each lexical error.
/// An unterminated block comment swallows the remaining input.
pub fn tokenize_lossy(src: &str) -> (Vec<Token>, Vec<SyntaxError>) {
    let mut lexer = Lexer {
        input: src,
        line: 1,
        tokens: Vec::new(),
        errors: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'s> {
    input: &'s str,
    line: u32,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl<'s> Lexer<'s> {
    fn run(&mut self) {
        loop {
            if self.skip_trivia() {
                self.insert_semicolon();
            }
            if self.input.is_empty() {
                self.insert_semicolon();
                return;
            }

            let start = self.input;
            let kind = match token.parse_next(&mut self.input) {
                Ok(kind) => kind,
                Err(_) => {
                    self.input = start;
                    let found = start.chars().next().unwrap_or_default();
                    let err = self.error(format!("unexpected character {:?}", found));
                    self.errors.push(err);
                    // the newline stays so semicolon insertion still sees it
                    let _: ModalResult<&str> = take_till(0.., '\n').parse_next(&mut self.input);
                    continue;
                }
            };
            let text = &start[..start.len() - self.input.len()];
            let kind = if kind == TokenKind::Op && text == ";" {
                TokenKind::Semi
            } else {
                kind
            };
            self.tokens.push(Token {
                kind,
                text: text.to_string(),
                line: self.line,
            });
            // raw strings may span lines
            self.line += count_newlines(text);
        }
    }

    /// Skip blanks and comments. Returns whether a line break was crossed.
    fn skip_trivia(&mut self) -> bool {
        let mut newline = false;
        loop {
            let _: ModalResult<&str> =
                take_while(0.., |c: char| c == ' ' || c == '\t' || c == '\r')
                    .parse_next(&mut self.input);

            if let Some(rest) = self.input.strip_prefix('\n') {
                self.input = rest;
                self.line += 1;
                newline = true;
            } else if self.input.starts_with("//") {
                let _ = line_comment.parse_next(&mut self.input);
            } else if self.input.starts_with("/*") {
                match block_comment.parse_next(&mut self.input) {
                    Ok(body) => {
                        let lines = count_newlines(body);
                        if lines > 0 {
                            self.line += lines;
                            newline = true;
                        }
                    }
                    Err(_) => {
                        let err = self.error("unterminated block comment".to_string());
                        self.errors.push(err);
                        self.input = "";
                        return newline;
                    }
                }
            } else {
                return newline;
            }
        }
    }

    fn insert_semicolon(&mut self) {
        if let Some(last) = self.tokens.last() {
            if last.ends_statement() {
                let line = last.line;
                self.tokens.push(Token {
                    kind: TokenKind::Semi,
                    text: "\n".to_string(),
                    line,
                });
            }
        }
    }

    fn error(&self, message: String) -> SyntaxError {
        SyntaxError {
            line: self.line,
            message,
        }
    }
}

fn count_newlines(text: &str) -> u32 {
    text.bytes().filter(|&b| b == b'\n').count() as u32
}

// ============================================================================
// Token parsers
// ============================================================================

fn token(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        ident_or_keyword,
        number,
        interpreted_string.value(TokenKind::String),
        raw_string.value(TokenKind::String),
        char_literal.value(TokenKind::Char),
        operator.value(TokenKind::Op),
    ))
    .parse_next(input)
}

fn line_comment<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    preceded("//", take_till(0.., '\n')).parse_next(input)
}

fn block_comment<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    delimited("/*", take_until(0.., "*/"), "*/").parse_next(input)
}

fn ident_or_keyword(input: &mut &str) -> ModalResult<TokenKind> {
    let word: &str = (
        one_of(|c: char| c.is_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)?;

    if KEYWORDS.contains(&word) {
        Ok(TokenKind::Keyword)
    } else {
        Ok(TokenKind::Ident)
    }
}

/// Numeric literal. Scanning is deliberately loose: the value is never
/// used, only the literal's kind.
fn number(input: &mut &str) -> ModalResult<TokenKind> {
    let s = *input;
    let bytes = s.as_bytes();
    let starts_number = match bytes {
        [b'0'..=b'9', ..] => true,
        [b'.', b'0'..=b'9', ..] => true,
        _ => false,
    };
    if !starts_number {
        return Err(ErrMode::from_input(input));
    }

    let hex = matches!(bytes, [b'0', b'x' | b'X', ..]);
    let mut end = 0;
    let mut float = false;
    while end < bytes.len() {
        let c = bytes[end];
        let exponent = if hex {
            matches!(c, b'p' | b'P')
        } else {
            matches!(c, b'e' | b'E' | b'p' | b'P')
        };
        if exponent {
            float = true;
            end += 1;
            if matches!(bytes.get(end), Some(b'+' | b'-')) {
                end += 1;
            }
        } else if c == b'.' {
            float = true;
            end += 1;
        } else if c.is_ascii_alphanumeric() || c == b'_' {
            end += 1;
        } else {
            break;
        }
    }

    let text = &s[..end];
    *input = &s[end..];
    Ok(if text.ends_with('i') {
        TokenKind::Imag
    } else if float {
        TokenKind::Float
    } else {
        TokenKind::Int
    })
}

fn interpreted_string(input: &mut &str) -> ModalResult<()> {
    quoted(input, '"')
}

fn raw_string(input: &mut &str) -> ModalResult<()> {
    quoted(input, '`')
}

fn char_literal(input: &mut &str) -> ModalResult<()> {
    quoted(input, '\'')
}

/// Consume a literal delimited by `quote`. Backslash escapes apply to
/// everything but raw strings, which are also the only ones allowed to
/// span lines.
fn quoted(input: &mut &str, quote: char) -> ModalResult<()> {
    let s = *input;
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c == quote => {}
        _ => return Err(ErrMode::from_input(input)),
    }

    let raw = quote == '`';
    let mut escaped = false;
    for (i, c) in chars {
        if !raw {
            if escaped {
                escaped = false;
                continue;
            }
            if c == '\\' {
                escaped = true;
                continue;
            }
            if c == '\n' {
                break;
            }
        }
        if c == quote {
            *input = &s[i + c.len_utf8()..];
            return Ok(());
        }
    }
    Err(ErrMode::from_input(input))
}

fn operator<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    alt((
        alt(("...", "<<=", ">>=", "&^=", "&&", "||", "<-", "++", "--", "==")),
        alt(("!=", "<=", ">=", "<<", ">>", "&^", ":=", "+=", "-=", "*=")),
        alt(("/=", "%=", "&=", "|=", "^=")),
        one_of([
            '+', '-', '*', '/', '%', '&', '|', '^', '<', '>', '=', '!', ':', '~', '.', ',', ';',
            '(', ')', '[', ']', '{', '}', '?',
        ])
        .take(),
    ))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn texts(src: &str) -> Vec<String> {
        tokenize(src).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_keywords_and_idents() {
        let tokens = kinds("func Foo");
        assert_eq!(tokens[0], (TokenKind::Keyword, "func".to_string()));
        assert_eq!(tokens[1], (TokenKind::Ident, "Foo".to_string()));
    }

    #[test]
    fn test_semicolon_inserted_after_ident_at_newline() {
        assert_eq!(texts("var x int\nvar y"), vec!["var", "x", "int", "\n", "var", "y", "\n"]);
    }

    #[test]
    fn test_no_semicolon_after_operator_at_newline() {
        assert_eq!(texts("x = a +\nb"), vec!["x", "=", "a", "+", "b", "\n"]);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(texts("a // trailing\nb /* inline */ c"), vec!["a", "\n", "b", "c", "\n"]);
    }

    #[test]
    fn test_multiline_block_comment_acts_as_newline() {
        assert_eq!(texts("a /*\n*/ b"), vec!["a", "\n", "b", "\n"]);
    }

    #[test]
    fn test_number_kinds() {
        let tokens = kinds("1 0x1fp-2 1.5e+10 2i .5");
        let got: Vec<TokenKind> = tokens
            .iter()
            .filter(|(k, _)| *k != TokenKind::Semi)
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(
            got,
            vec![
                TokenKind::Int,
                TokenKind::Float,
                TokenKind::Float,
                TokenKind::Imag,
                TokenKind::Float
            ]
        );
    }

    #[test]
    fn test_string_literals() {
        let tokens = kinds(r#""a\"b" `raw
line` 'x'"#);
        assert_eq!(tokens[0], (TokenKind::String, r#""a\"b""#.to_string()));
        assert_eq!(tokens[1], (TokenKind::String, "`raw\nline`".to_string()));
        assert_eq!(tokens[2], (TokenKind::Char, "'x'".to_string()));
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(texts("a := <-ch..."), vec!["a", ":=", "<-", "ch", "..."]);
        assert_eq!(texts("x &^= y"), vec!["x", "&^=", "y", "\n"]);
    }

    #[test]
    fn test_line_numbers() {
        let tokens = tokenize("a\n\nb").unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_unknown_character_is_an_error() {
        let err = tokenize("a $ b").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains('$'));
    }

    #[test]
    fn test_lossy_keeps_tokens_before_error() {
        let (tokens, errors) = tokenize_lossy("var x\n#");
        assert_eq!(errors.len(), 1);
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_lossy_resumes_on_next_line() {
        let (tokens, errors) = tokenize_lossy("x := \"abc\n}\nvar later int\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 1);
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["x", ":=", "}", "\n", "var", "later", "int", "\n"]);
        assert_eq!(tokens[4].line, 3);
    }

    #[test]
    fn test_lossy_collects_every_error() {
        let (tokens, errors) = tokenize_lossy("a $ b\nc\n# d\n");
        let lines: Vec<u32> = errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, [1, 3]);
        assert!(tokens.iter().any(|t| t.text == "c"));
        assert!(!tokens.iter().any(|t| t.text == "b" || t.text == "d"));
    }

    #[test]
    fn test_unterminated_block_comment_ends_input() {
        let (tokens, errors) = tokenize_lossy("a\n/* open\nvar b int\n");
        assert_eq!(errors.len(), 1);
        assert!(!tokens.iter().any(|t| t.text == "b"));
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        assert!(tokenize("\"abc").is_err());
    }
}
