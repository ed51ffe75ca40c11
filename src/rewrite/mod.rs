//! Rule-based snippet repair.
//!
//! Every dialect has an ordered table of [`Rule`]s. A rule is a tagged
//! trigger/replacement pair: it looks at the current snippet text and, when
//! its trigger holds, returns the rewritten text together with exactly one
//! [`FixRecord`]. Rules never look at the fixes produced before them.
//!
//! Categories run in this order within each table:
//!
//! 1. character normalization
//! 2. dependency completion
//! 3. path normalization
//! 4. identifier normalization
//! 5. entry-point completion
//! 6. dialect-specific semantic normalization
//! 7. defensive wrapping
//!
//! All rewrites are textual. Nothing here parses the snippet language.
//!
//! A rule that errors or panics does not abort the pipeline: [`rewrite`]
//! appends an `Auto-fix encountered error` record and returns the text
//! accumulated so far.

mod browser;
mod markup;
mod procedural;
mod text;
mod visualization;

use std::panic::{self, AssertUnwindSafe};

use crate::error::RewriteError;
use crate::models::{Dialect, FixRecord, RewriteResult};

pub use text::{PATH_PREFIXES, PUNCTUATION};

/// A single trigger/replacement pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    // ── 1. character normalization ──
    /// Curly double and single quotes → straight quotes.
    SmartQuotes,
    /// One typographic punctuation character → its ASCII spelling.
    Punctuation {
        from: &'static str,
        to: &'static str,
    },

    // ── 2. dependency completion ──
    /// Prepend the canonical ReportLab import block when ReportLab names
    /// are used without any ReportLab import.
    ReportlabImports,
    /// Prepend matplotlib + pyplot imports when pyplot is used without them.
    MatplotlibImports,
    /// Prepend `require('jspdf')` when jsPDF is used without an import.
    JsPdfRequire,
    /// Wrap an HTML fragment in a full HTML5 document.
    HtmlSkeleton,
    HtmlDoctype,

    // ── 3. path normalization ──
    /// Absolute or home-relative prefix → `./`.
    PathPrefix(&'static str),

    // ── 4. identifier normalization ──
    /// Rename a misnamed variable when it is assigned at statement start.
    Identifier {
        from: &'static str,
        to: &'static str,
    },

    // ── 5. entry-point completion ──
    /// Invoke the first build/generate/create function that is never called.
    UncalledBuilder,
    /// Declare `story = []` after the document template when the snippet
    /// appends to a story it never declared.
    StoryList,
    /// Append `<doc>.build(story)` when the story is filled but never built.
    StoryBuild,
    /// Append the tight-layout / savefig / close sequence.
    ChartSave,
    /// Append `<doc>.save('document.pdf')`.
    JsPdfSave,

    // ── 6. semantic normalization ──
    /// Named paragraph alignment → ReportLab's integer encoding.
    Alignment {
        alias: &'static str,
        value: u8,
    },
    /// Exact-substring correction of a known API misspelling.
    ApiSpelling {
        from: &'static str,
        to: &'static str,
    },
    /// Neutralize an interactive display call such as `plt.show()`.
    HeadlessCall {
        call: &'static str,
        note: &'static str,
    },
    /// Insert `matplotlib.use('Agg')` ahead of the first matplotlib import.
    BackendDirective,
    /// Rewrite a raster `savefig` target to `.pdf`.
    OutputExtension {
        label: &'static str,
        extensions: &'static str,
    },
    NumpyImport,
    PandasImport,
    HtmlCharset,
    HtmlViewport,
    HtmlTitle,
    /// `<br>` → `<br/>` and friends.
    SelfClosingTag {
        from: &'static str,
        to: &'static str,
    },

    // ── 7. defensive wrapping ──
    /// Wrap the auto-added entry-point call in try/except.
    GuardEntryCall,
}

/// Rewritten text plus the single fix that describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub text: String,
    pub fix: FixRecord,
}

impl Applied {
    fn new(text: String, fix: impl Into<String>) -> Self {
        Self {
            text,
            fix: FixRecord::new(fix),
        }
    }
}

impl Rule {
    /// Applies the rule to `text`. `Ok(None)` means the trigger did not hold.
    pub fn apply(&self, text: &str) -> Result<Option<Applied>, RewriteError> {
        match *self {
            Rule::SmartQuotes => Ok(text::smart_quotes(text)),
            Rule::Punctuation { from, to } => Ok(text::punctuation(text, from, to)),
            Rule::PathPrefix(prefix) => Ok(text::path_prefix(text, prefix)),
            Rule::Identifier { from, to } => text::identifier(text, from, to),
            Rule::ApiSpelling { from, to } => Ok(text::api_spelling(text, from, to)),

            Rule::ReportlabImports => Ok(procedural::reportlab_imports(text)),
            Rule::UncalledBuilder => procedural::uncalled_builder(text),
            Rule::StoryList => procedural::story_list(text),
            Rule::StoryBuild => procedural::story_build(text),
            Rule::Alignment { alias, value } => procedural::alignment(text, alias, value),
            Rule::GuardEntryCall => procedural::guard_entry_call(text),

            Rule::MatplotlibImports => Ok(visualization::matplotlib_imports(text)),
            Rule::ChartSave => Ok(visualization::chart_save(text)),
            Rule::HeadlessCall { call, note } => visualization::headless_call(text, call, note),
            Rule::BackendDirective => visualization::backend_directive(text),
            Rule::OutputExtension { label, extensions } => {
                visualization::output_extension(text, label, extensions)
            }
            Rule::NumpyImport => visualization::numpy_import(text),
            Rule::PandasImport => visualization::pandas_import(text),

            Rule::HtmlSkeleton => Ok(markup::skeleton(text)),
            Rule::HtmlDoctype => Ok(markup::doctype(text)),
            Rule::HtmlCharset => Ok(markup::charset(text)),
            Rule::HtmlViewport => Ok(markup::viewport(text)),
            Rule::HtmlTitle => Ok(markup::title(text)),
            Rule::SelfClosingTag { from, to } => Ok(markup::self_closing(text, from, to)),

            Rule::JsPdfRequire => Ok(browser::jspdf_require(text)),
            Rule::JsPdfSave => browser::jspdf_save(text),
        }
    }
}

/// The ordered rule table for a dialect.
pub fn rules_for(dialect: Dialect) -> Vec<Rule> {
    match dialect {
        Dialect::Procedural => procedural::rules(),
        Dialect::Markup => markup::rules(),
        Dialect::Visualization => visualization::rules(),
        Dialect::BrowserScript => browser::rules(),
    }
}

/// Repairs `raw` with the dialect's rule table.
pub fn rewrite(dialect: Dialect, raw: &str) -> RewriteResult {
    run_rules(&rules_for(dialect), raw)
}

/// Runs `rules` in order over `raw`, stopping at the first rule failure.
pub fn run_rules(rules: &[Rule], raw: &str) -> RewriteResult {
    let mut text = raw.to_string();
    let mut fixes = Vec::new();

    for rule in rules {
        match apply_guarded(rule, &text) {
            Ok(Some(applied)) => {
                tracing::debug!(rule = ?rule, fix = %applied.fix, "auto-fix applied");
                text = applied.text;
                fixes.push(applied.fix);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(rule = ?rule, error = %e, "auto-fix rule failed");
                fixes.push(FixRecord::new(format!("Auto-fix encountered error: {}", e)));
                break;
            }
        }
    }

    RewriteResult { text, fixes }
}

fn apply_guarded(rule: &Rule, text: &str) -> Result<Option<Applied>, RewriteError> {
    panic::catch_unwind(AssertUnwindSafe(|| rule.apply(text))).unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(RewriteError::Panicked(msg))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptions(r: &RewriteResult) -> Vec<&str> {
        r.fixes.iter().map(|f| f.description()).collect()
    }

    #[test]
    fn test_every_dialect_has_rules() {
        for d in Dialect::ALL {
            assert!(!rules_for(d).is_empty(), "{} has no rules", d);
        }
    }

    #[test]
    fn test_clean_snippet_untouched() {
        let code = "from reportlab.platypus import SimpleDocTemplate\n\
                    pdf = SimpleDocTemplate('out.pdf')\n\
                    pdf.build([])";
        let r = rewrite(Dialect::Procedural, code);
        assert_eq!(r.text, code);
        assert!(r.fixes.is_empty());
    }

    #[test]
    fn test_deterministic_across_dialects() {
        let inputs = [
            "pdf = SimpleDocTemplate(“x.pdf”)\nstory.append(Paragraph('a'))",
            "<h1>Hi</h1><br>",
            "plt.plot([1, 2])\nplt.show()",
            "const doc = new jsPDF();",
        ];
        for d in Dialect::ALL {
            for input in inputs {
                assert_eq!(rewrite(d, input), rewrite(d, input));
            }
        }
    }

    #[test]
    fn test_second_pass_adds_nothing() {
        let inputs = [
            (
                Dialect::Procedural,
                "fileName = “report.pdf” – draft…\n\
                 def build_pdf():\n    doc = SimpleDocTemplate(fileName)\n    doc.build([])\n",
            ),
            (
                Dialect::Procedural,
                "doc = SimpleDocTemplate(\n    filename='out.pdf',\n)\ndoc.build([])",
            ),
            (Dialect::Markup, "<p>‘quoted’</p><br><hr>"),
            (Dialect::Visualization, "plt.plot(np.arange(3))\nplt.show()"),
            (Dialect::BrowserScript, "const doc = new jsPDF();\ndoc.text(“Hi”, 10, 10);"),
        ];
        for (d, input) in inputs {
            let once = rewrite(d, input);
            if !input.contains("fileName") {
                assert!(
                    !descriptions(&once).iter().any(|f| f.starts_with("Fixed variable name")),
                    "{} renamed a keyword argument: {:?}",
                    d,
                    descriptions(&once)
                );
            }
            let twice = rewrite(d, &once.text);
            assert_eq!(twice.text, once.text, "{} rewrite not stable", d);
            assert!(
                twice.fixes.is_empty(),
                "{} second pass produced {:?}",
                d,
                descriptions(&twice)
            );
        }
    }

    #[test]
    fn test_rule_error_degrades_and_stops() {
        // Alignment aliases are regex fragments, so an unbalanced one fails
        // to compile.
        let rules = [
            Rule::SmartQuotes,
            Rule::Alignment {
                alias: "(",
                value: 1,
            },
            Rule::PathPrefix("~/"),
        ];
        let r = run_rules(&rules, "x = “a”\np = '~/x.pdf'");
        assert_eq!(r.text, "x = \"a\"\np = '~/x.pdf'");
        let d = descriptions(&r);
        assert_eq!(d.len(), 2);
        assert!(d[1].starts_with("Auto-fix encountered error:"));
    }

    #[test]
    fn test_fix_order_follows_rule_order() {
        let r = rewrite(
            Dialect::Procedural,
            "p = Paragraph(“T”, alignment=\"center\")\nout = '/mnt/data/a.pdf'",
        );
        let d = descriptions(&r);
        let quotes = d.iter().position(|s| s.contains("smart quotes")).unwrap();
        let imports = d.iter().position(|s| s.contains("ReportLab imports")).unwrap();
        let path = d.iter().position(|s| s.contains("/mnt/data/")).unwrap();
        let align = d.iter().position(|s| s.contains("alignment")).unwrap();
        assert!(quotes < imports && imports < path && path < align);
    }
}
