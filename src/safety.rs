//! Pre-execution safety filter.
//!
//! A heuristic deterrent, not a security boundary: snippets always run in a
//! separate process with a cleared environment and a private workspace. The
//! filter only rejects the obvious cases early, before any rewriting or
//! execution happens.
//!
//! Matching is case-insensitive substring containment against the raw,
//! unmodified snippet. Patterns are checked in declaration order and the
//! first hit is reported.

use serde::Deserialize;

/// Disallowed substrings, in evaluation order.
pub const DISALLOWED_PATTERNS: &[&str] = &[
    "import subprocess",
    "__import__",
    "eval(",
    "exec(",
    "open(",
    "file(",
    "input(",
    "raw_input(",
    "compile(",
    "globals()",
    "locals()",
    "vars()",
    "dir()",
    "hasattr(",
    "getattr(",
    "setattr(",
    "delattr(",
    "reload(",
    "memoryview(",
];

/// Known-safe compound substrings, matched verbatim.
pub const ALLOWED_IDIOMS: &[&str] = &["exec(compile(open(temp_file_path).read()"];

/// How far an allow-listed idiom exempts the rest of the snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarveOut {
    /// Only the idiom's own characters are exempt.
    #[default]
    Scoped,
    /// Any idiom occurrence suppresses every pattern check.
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject { pattern: &'static str },
}

impl Verdict {
    pub fn is_reject(&self) -> bool {
        matches!(self, Verdict::Reject { .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyFilter {
    carve_out: CarveOut,
}

impl SafetyFilter {
    pub fn new(carve_out: CarveOut) -> Self {
        Self { carve_out }
    }

    pub fn evaluate(&self, raw: &str) -> Verdict {
        let has_idiom = ALLOWED_IDIOMS.iter().any(|idiom| raw.contains(idiom));

        let haystack = match (self.carve_out, has_idiom) {
            (CarveOut::Global, true) => return Verdict::Accept,
            (CarveOut::Scoped, true) => blank_idioms(raw).to_lowercase(),
            (_, false) => raw.to_lowercase(),
        };

        DISALLOWED_PATTERNS
            .iter()
            .copied()
            .find(|p| haystack.contains(p))
            .map_or(Verdict::Accept, |p| Verdict::Reject { pattern: p })
    }
}

/// Replaces every allow-listed idiom with spaces of equal length, so the
/// characters on either side can't join up into a new match.
fn blank_idioms(raw: &str) -> String {
    ALLOWED_IDIOMS.iter().fold(raw.to_string(), |text, idiom| {
        text.replace(idiom, &" ".repeat(idiom.len()))
    })
}
