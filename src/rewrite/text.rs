//! Dialect-independent text rules and helpers.

use regex::Regex;

use super::Applied;
use crate::error::RewriteError;

/// Typographic punctuation and its ASCII spelling.
pub const PUNCTUATION: &[(&str, &str)] = &[("\u{2013}", "-"), ("\u{2014}", "-"), ("\u{2026}", "...")];

/// Prefixes that point outside the execution workspace.
pub const PATH_PREFIXES: &[&str] = &["/mnt/data/", "~/", "C:\\", "D:\\"];

const SMART_QUOTES: &[(char, char)] = &[
    ('\u{201C}', '"'),
    ('\u{201D}', '"'),
    ('\u{2018}', '\''),
    ('\u{2019}', '\''),
];

pub(super) fn smart_quotes(text: &str) -> Option<Applied> {
    if !text.chars().any(|c| SMART_QUOTES.iter().any(|(q, _)| *q == c)) {
        return None;
    }
    let fixed: String = text
        .chars()
        .map(|c| {
            SMART_QUOTES
                .iter()
                .find(|(q, _)| *q == c)
                .map_or(c, |(_, plain)| *plain)
        })
        .collect();
    Some(Applied::new(fixed, "Fixed smart quotes → regular quotes"))
}

pub(super) fn punctuation(text: &str, from: &str, to: &str) -> Option<Applied> {
    substitute(text, from, to, format!("Fixed unicode character: {} → {}", from, to))
}

pub(super) fn path_prefix(text: &str, prefix: &str) -> Option<Applied> {
    substitute(text, prefix, "./", format!("Fixed file path: {} → ./", prefix))
}

pub(super) fn api_spelling(text: &str, from: &str, to: &str) -> Option<Applied> {
    substitute(text, from, to, format!("Fixed syntax: {} → {}", from, to))
}

/// Replaces every occurrence of `from` with `to` when `from` is present.
pub(super) fn substitute(text: &str, from: &str, to: &str, fix: String) -> Option<Applied> {
    if !text.contains(from) {
        return None;
    }
    Some(Applied::new(text.replace(from, to), fix))
}

/// Renames `from` to `to` once `from` is assigned at the start of a
/// statement. Keyword arguments, attribute accesses, comments and text
/// inside single-line string literals keep the old spelling; f-string
/// replacement fields are treated as code. Triple-quoted blocks spanning
/// lines are not tracked.
pub(super) fn identifier(text: &str, from: &str, to: &str) -> Result<Option<Applied>, RewriteError> {
    let name = regex::escape(from);
    let assignment = Regex::new(&format!(r"(?m)^[ \t]*{}[ \t]*=(?:[^=]|$)", name))?;
    if !assignment
        .find_iter(text)
        .any(|m| starts_statement(&text[..m.start()]))
    {
        return Ok(None);
    }

    let word = Regex::new(&format!(r"\b{}\b", name))?;
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in word.find_iter(text) {
        let before = &text[..m.start()];
        let after = &text[m.end()..];
        out.push_str(&text[last..m.start()]);
        if keeps_spelling(before, after) {
            out.push_str(m.as_str());
        } else {
            out.push_str(to);
        }
        last = m.end();
    }
    out.push_str(&text[last..]);

    if out == text {
        return Ok(None);
    }
    Ok(Some(Applied::new(
        out,
        format!("Fixed variable name: {} → {}", from, to),
    )))
}

/// False when the line starting after `before` continues an open bracket,
/// an argument list or an explicit `\` continuation.
fn starts_statement(before: &str) -> bool {
    let prev_line = before
        .lines()
        .rev()
        .map(str::trim_end)
        .find(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'));
    let Some(prev_line) = prev_line else {
        return true;
    };
    if prev_line.ends_with(['(', '[', '{', ',', '\\']) {
        return false;
    }

    let mut depth = 0i32;
    for line in before.lines() {
        let mut quote: Option<char> = None;
        for c in line.chars() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '#') => break,
                (None, '"') | (None, '\'') => quote = Some(c),
                (None, '(') | (None, '[') | (None, '{') => depth += 1,
                (None, ')') | (None, ']') | (None, '}') => depth -= 1,
                _ => {}
            }
        }
    }
    depth <= 0
}

fn keeps_spelling(before: &str, after: &str) -> bool {
    let prev = before.chars().last();
    if prev == Some('.') {
        return true;
    }

    let line = before.rsplit('\n').next().unwrap_or(before);
    if in_literal(line) {
        return true;
    }

    let prev_token = before.trim_end().chars().last();
    let rest = after.trim_start();
    matches!(prev_token, Some('(') | Some(','))
        && rest.starts_with('=')
        && !rest.starts_with("==")
}

/// True when the end of `line` sits inside a string literal or a comment.
/// Inside an f-string, text between braces counts as code.
fn in_literal(line: &str) -> bool {
    struct Open {
        quote: char,
        formatted: bool,
        braces: usize,
    }

    let chars: Vec<char> = line.chars().collect();
    let mut open: Option<Open> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match open.as_mut() {
            None => match c {
                '#' => return true,
                '"' | '\'' => {
                    let prefix: String = chars[..i]
                        .iter()
                        .rev()
                        .take_while(|c| c.is_ascii_alphabetic())
                        .collect();
                    open = Some(Open {
                        quote: c,
                        formatted: prefix.eq_ignore_ascii_case("f")
                            || (prefix.len() == 2 && prefix.to_ascii_lowercase().contains('f')),
                        braces: 0,
                    });
                }
                _ => {}
            },
            Some(s) => match c {
                '\\' => i += 1,
                '{' if s.formatted && chars.get(i + 1) == Some(&'{') && s.braces == 0 => i += 1,
                '{' if s.formatted => s.braces += 1,
                '}' if s.formatted && s.braces > 0 => s.braces -= 1,
                q if q == s.quote && s.braces == 0 => open = None,
                _ => {}
            },
        }
        i += 1;
    }
    open.is_some_and(|s| s.braces == 0)
}

/// Python function names defined at any indentation, in source order.
pub(super) fn python_defs(text: &str) -> Result<Vec<String>, RewriteError> {
    let re = Regex::new(r"(?m)^[ \t]*def[ \t]+([A-Za-z_][A-Za-z0-9_]*)[ \t]*\(")?;
    Ok(re
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect())
}

/// True when `name(` appears anywhere other than its own `def` line.
pub(super) fn is_invoked(text: &str, name: &str) -> Result<bool, RewriteError> {
    let call = Regex::new(&format!(r"\b{}[ \t]*\(", regex::escape(name)))?;
    let invoked = call.find_iter(text).any(|m| {
        let before = text[..m.start()].trim_end();
        !(before.ends_with("def") && !is_word_char(before.chars().rev().nth(3)))
    });
    Ok(invoked)
}

fn is_word_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Byte offset just past the statement whose argument list opens at
/// `open_paren`: the end of the line holding the matching `)`.
pub(super) fn statement_end(text: &str, open_paren: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut close = None;

    for (i, c) in text[open_paren..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    close = Some(open_paren + i);
                    break;
                }
            }
            _ => {}
        }
    }

    let from = close.unwrap_or(open_paren);
    text[from..].find('\n').map_or(text.len(), |n| from + n)
}

/// Appends `block` after the snippet, separated by one blank line.
pub(super) fn append_block(text: &str, block: &str) -> String {
    format!("{}\n\n{}", text.trim_end(), block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_quotes() {
        let applied = smart_quotes("title = “Report” + ‘x’").unwrap();
        assert_eq!(applied.text, "title = \"Report\" + 'x'");
        assert_eq!(applied.fix.description(), "Fixed smart quotes → regular quotes");
        assert!(smart_quotes(&applied.text).is_none());
    }

    #[test]
    fn test_punctuation_table() {
        let mut text = "a – b — c…".to_string();
        for (from, to) in PUNCTUATION {
            if let Some(a) = punctuation(&text, from, to) {
                text = a.text;
            }
        }
        assert_eq!(text, "a - b - c...");
    }

    #[test]
    fn test_path_prefix() {
        let a = path_prefix("doc = SimpleDocTemplate('/mnt/data/out.pdf')", "/mnt/data/").unwrap();
        assert_eq!(a.text, "doc = SimpleDocTemplate('./out.pdf')");
        assert_eq!(a.fix.description(), "Fixed file path: /mnt/data/ → ./");
        assert!(path_prefix(&a.text, "/mnt/data/").is_none());
    }

    #[test]
    fn test_windows_prefix() {
        let a = path_prefix(r"out = 'C:\report.pdf'", "C:\\").unwrap();
        assert_eq!(a.text, "out = './report.pdf'");
    }

    #[test]
    fn test_identifier_renames_reads_too() {
        let code = "fileName = 'a.pdf'\ndoc = SimpleDocTemplate(fileName)\nprint(fileName)";
        let a = identifier(code, "fileName", "file_name").unwrap().unwrap();
        assert_eq!(
            a.text,
            "file_name = 'a.pdf'\ndoc = SimpleDocTemplate(file_name)\nprint(file_name)"
        );
        assert_eq!(a.fix.description(), "Fixed variable name: fileName → file_name");
    }

    #[test]
    fn test_identifier_keeps_keyword_arguments() {
        let code = "filename = 'a.pdf'\nc = canvas.Canvas(filename=filename)\nx = doc.filename";
        let a = identifier(code, "filename", "file_path").unwrap().unwrap();
        assert_eq!(
            a.text,
            "file_path = 'a.pdf'\nc = canvas.Canvas(filename=file_path)\nx = doc.filename"
        );
    }

    #[test]
    fn test_identifier_needs_assignment() {
        assert!(identifier("c = canvas.Canvas(filename='a.pdf')", "filename", "file_path")
            .unwrap()
            .is_none());
        assert!(identifier("if fileName == 'x': pass", "fileName", "file_name")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_identifier_ignores_longer_names() {
        let code = "fileName = 'a'\nfileNames = []";
        let a = identifier(code, "fileName", "file_name").unwrap().unwrap();
        assert_eq!(a.text, "file_name = 'a'\nfileNames = []");
    }

    #[test]
    fn test_identifier_ignores_keyword_on_own_line() {
        let code = "doc = SimpleDocTemplate(\n    filename='out.pdf',\n)\ndoc.build([])";
        assert!(identifier(code, "filename", "file_path").unwrap().is_none());
    }

    #[test]
    fn test_identifier_assignment_after_continuation_is_not_a_statement() {
        let code = "x = 1 + \\\nfilename = 2";
        assert!(!starts_statement("x = 1 + \\\n"));
        assert!(identifier(code, "filename", "file_path").unwrap().is_none());
    }

    #[test]
    fn test_identifier_keeps_string_text() {
        let code = "fileName = 'a.pdf'\nprint(\"fileName is\", fileName)  # fileName here\nlabel = f\"{fileName} saved\"";
        let a = identifier(code, "fileName", "file_name").unwrap().unwrap();
        assert_eq!(
            a.text,
            "file_name = 'a.pdf'\nprint(\"fileName is\", file_name)  # fileName here\nlabel = f\"{file_name} saved\""
        );
    }

    #[test]
    fn test_in_literal() {
        assert!(in_literal("print('a "));
        assert!(in_literal("x = 1  # "));
        assert!(!in_literal("print('a', "));
        assert!(!in_literal("s = f'{"));
        assert!(in_literal("s = f'{{"));
        assert!(in_literal(r#"s = "say \"hi "#));
    }

    #[test]
    fn test_defs_and_invocation() {
        let code = "def build_pdf():\n    pass\n\ndef helper(x):\n    return x\n\nhelper(1)\n";
        assert_eq!(python_defs(code).unwrap(), vec!["build_pdf", "helper"]);
        assert!(!is_invoked(code, "build_pdf").unwrap());
        assert!(is_invoked(code, "helper").unwrap());
    }

    #[test]
    fn test_longer_names_are_not_calls() {
        let code = "def build():\n    pass\n\nx = rebuild()\ny = build_all()\n";
        assert!(!is_invoked(code, "build").unwrap());
    }

    #[test]
    fn test_call_after_undef_identifier_counts() {
        let code = "def build():\n    pass\n\nundef build()\n";
        assert!(is_invoked(code, "build").unwrap());
    }

    #[test]
    fn test_statement_end_spans_lines() {
        let code = "doc = SimpleDocTemplate(\n    'a.pdf',\n    pagesize=A4,\n)\nstory.append(x)";
        let open = code.find('(').unwrap();
        let end = statement_end(code, open);
        assert_eq!(&code[..end], "doc = SimpleDocTemplate(\n    'a.pdf',\n    pagesize=A4,\n)");
    }

    #[test]
    fn test_statement_end_ignores_parens_in_strings() {
        let code = "doc = SimpleDocTemplate('a(.pdf')\nnext";
        let open = code.find('(').unwrap();
        assert_eq!(&code[..statement_end(code, open)], "doc = SimpleDocTemplate('a(.pdf')");
    }
}
