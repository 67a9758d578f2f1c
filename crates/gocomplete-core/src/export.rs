//! Export-line preprocessing.
//!
//! Archive export data stores one declaration per line, with every
//! package-qualified name written as `"import/path".Name` and a few
//! placeholder characters that ordinary Go syntax does not allow. This
//! module rewrites such a line into a declaration that
//! [`parse_decl_list`](crate::syntax::parse_decl_list) accepts and reports
//! which package the declaration belongs to.
//!
//! ```text
//! func (p *"geom".Point) Add (q "geom".Point) ("geom".Point)
//!   => func (p *Point) Add (q geom.Point) (geom.Point)      package "geom"
//! ```

/// A rewritten export line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLine {
    /// Go declaration text.
    pub text: String,
    /// Import path of the owning package, when the line names one.
    pub package: Option<String>,
}

/// Separator the compiler uses in synthesized symbol names (`init·1`).
const INTERNAL_SEPARATOR: char = '·';

/// Rewrite one export line. Returns `None` for lines that carry nothing
/// completable: imports, compiler-internal symbols and lines with no
/// declaration keyword.
pub fn preprocess(line: &str) -> Option<ExportLine> {
    let line = line.trim_start_matches([' ', '\t']);
    let split = line.find([' ', '\t'])?;
    let (keyword, rest) = line.split_at(split);
    let rest = &rest[1..];

    let scrubbed;
    let rest = match keyword {
        "import" => return None,
        "const" => {
            scrubbed = scrub_const_literal(rest);
            scrubbed.as_str()
        }
        _ => rest,
    };

    let (body, package) = match rest.as_bytes().first() {
        Some(b'(') => strip_receiver_packages(rest),
        Some(b'"') => strip_leading_package(rest),
        _ => (rest.to_string(), None),
    };

    let body = expand_packages(&body.replace('?', ""));
    if body.contains(INTERNAL_SEPARATOR) {
        return None;
    }

    Some(ExportLine {
        text: format!("{} {}", keyword, body),
        package,
    })
}

/// Last segment of an import path: `"go/ast"` is referred to as `ast`.
pub fn display_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Replace the first numeric literal after `=` with `0`. Only the
/// constant's type matters, and exported literals use notations such as
/// `0x1p-52` or arbitrary-precision mantissas that need not be parsed.
fn scrub_const_literal(s: &str) -> String {
    let eq = match s.find('=') {
        Some(i) => i,
        None => return s.to_string(),
    };
    let start = match s[eq..].find(|c: char| c.is_ascii_digit() || c == '"' || c == '\'') {
        Some(i) => eq + i,
        None => return s.to_string(),
    };
    if !s.as_bytes()[start].is_ascii_digit() {
        return s.to_string();
    }
    let end = s[start..]
        .find(|c: char| !(c.is_ascii_digit() || matches!(c, 'p' | '-' | '+')))
        .map_or(s.len(), |i| start + i);
    format!("{}0{}", &s[..start], &s[end..])
}

/// Split `before"path".after` at the first quoted qualifier.
fn split_qualifier(s: &str) -> Option<(&str, &str, &str)> {
    let open = s.find('"')?;
    let close = open + 1 + s[open + 1..].find('"')?;
    let after = s[close + 1..].strip_prefix('.')?;
    Some((&s[..open], &s[open + 1..close], after))
}

/// `"path".Name ...` at the start of the declaration body.
fn strip_leading_package(rest: &str) -> (String, Option<String>) {
    match split_qualifier(rest) {
        Some(("", path, after)) => {
            let package = (!path.is_empty()).then(|| path.to_string());
            (after.to_string(), package)
        }
        _ => (rest.to_string(), None),
    }
}

/// `(recv *"path".T) "path".name ...`: unqualify the receiver type, which
/// names the owning package, and a qualified method name after it.
fn strip_receiver_packages(rest: &str) -> (String, Option<String>) {
    let close = match rest.find(')') {
        Some(i) => i,
        None => return (rest.to_string(), None),
    };
    let (mut receiver, tail) = rest.split_at(close);
    let mut out = String::with_capacity(rest.len());
    let mut package = None;

    while let Some((before, path, after)) = split_qualifier(receiver) {
        out.push_str(before);
        if package.is_none() && !path.is_empty() {
            package = Some(path.to_string());
        }
        receiver = after;
    }
    out.push_str(receiver);

    let (paren, tail) = tail.split_at(1);
    out.push_str(paren);
    let name = tail.trim_start_matches([' ', '\t']);
    out.push_str(&tail[..tail.len() - name.len()]);
    match split_qualifier(name) {
        Some(("", _, after)) => out.push_str(after),
        _ => out.push_str(name),
    }
    (out, package)
}

/// Byte length of the quoted string at the start of `s`, quotes included.
fn quoted_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Rewrite the quoted import paths left inside type expressions. Stops at
/// the first `=`, so constant values are never touched.
///
/// - `:"tag"` is a struct tag and is deleted along with its colon.
/// - `"".Name` refers to the package itself and becomes `Name`.
/// - `"full/path".Name` becomes `path.Name`.
fn expand_packages(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find(['"', '=']) {
        if rest.as_bytes()[open] == b'=' {
            break;
        }
        let len = match quoted_len(&rest[open..]) {
            Some(len) => len,
            None => break,
        };
        let before = &rest[..open];
        let quoted = &rest[open..open + len];
        let after = &rest[open + len..];

        if let Some(head) = before.strip_suffix(':') {
            out.push_str(head.trim_end());
            rest = after;
        } else if len == 2 {
            out.push_str(before);
            rest = after.strip_prefix('.').unwrap_or(after);
        } else {
            out.push_str(before);
            out.push_str(display_name(&quoted[1..len - 1]));
            rest = after;
        }
    }
    out.push_str(rest);
    out
}
