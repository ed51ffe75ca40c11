//! Rules for the `python` dialect (ReportLab document assembly).

use regex::Regex;

use super::text::{append_block, is_invoked, python_defs, statement_end};
use super::{Applied, Rule, PATH_PREFIXES, PUNCTUATION};
use crate::error::RewriteError;

const REPORTLAB_IMPORTS: &str = "\
from reportlab.lib.pagesizes import A4, letter
from reportlab.lib import colors
from reportlab.lib.units import inch, mm, cm, pica
from reportlab.platypus import (
    SimpleDocTemplate, BaseDocTemplate, PageTemplate, Frame, Paragraph, Spacer,
    Table, TableStyle, PageBreak, KeepTogether, Flowable, Image, NextPageTemplate
)
from reportlab.lib.styles import getSampleStyleSheet, ParagraphStyle
from reportlab.pdfbase import pdfmetrics
from reportlab.pdfbase.ttfonts import TTFont
from reportlab.pdfgen import canvas
from reportlab.graphics.shapes import Drawing, Rect, Circle, Line
from reportlab.graphics.charts.linecharts import HorizontalLineChart
from reportlab.graphics.charts.piecharts import Pie
import os
import sys
";

/// Names whose presence means the snippet needs ReportLab.
const REPORTLAB_MARKERS: &[&str] = &[
    "SimpleDocTemplate",
    "BaseDocTemplate",
    "Paragraph(",
    "Spacer(",
    "Table(",
    "TableStyle(",
    "PageBreak(",
    "getSampleStyleSheet",
    "ParagraphStyle(",
    "canvas.Canvas(",
    "colors.",
];

const IDENTIFIERS: &[(&str, &str)] = &[
    ("fileName", "file_name"),
    ("filename", "file_path"),
    ("pdfFile", "pdf_file"),
    ("outputFile", "output_file"),
];

const ALIGNMENTS: &[(&str, u8)] = &[("center", 1), ("left", 0), ("right", 2), ("justify", 4)];

const API_SPELLINGS: &[(&str, &str)] = &[
    ("colors.hexcolor(", "colors.HexColor("),
    ("Colors.HexColor(", "colors.HexColor("),
    ("getSampleStylesheet()", "getSampleStyleSheet()"),
    ("getStyleSheet()", "getSampleStyleSheet()"),
];

const BUILDER_WORDS: &[&str] = &["build", "generate", "create"];

const ENTRY_MARKER: &str = "# Auto-added function call";

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = vec![Rule::SmartQuotes];
    rules.extend(PUNCTUATION.iter().map(|&(from, to)| Rule::Punctuation { from, to }));
    rules.push(Rule::ReportlabImports);
    rules.extend(PATH_PREFIXES.iter().map(|&p| Rule::PathPrefix(p)));
    rules.extend(
        IDENTIFIERS
            .iter()
            .map(|&(from, to)| Rule::Identifier { from, to }),
    );
    rules.extend([Rule::UncalledBuilder, Rule::StoryList, Rule::StoryBuild]);
    rules.extend(
        ALIGNMENTS
            .iter()
            .map(|&(alias, value)| Rule::Alignment { alias, value }),
    );
    rules.extend(
        API_SPELLINGS
            .iter()
            .map(|&(from, to)| Rule::ApiSpelling { from, to }),
    );
    rules.push(Rule::GuardEntryCall);
    rules
}

pub(super) fn reportlab_imports(text: &str) -> Option<Applied> {
    if text.contains("from reportlab") || text.contains("import reportlab") {
        return None;
    }
    if !REPORTLAB_MARKERS.iter().any(|m| text.contains(m)) {
        return None;
    }
    Some(Applied::new(
        format!("{}{}", REPORTLAB_IMPORTS, text),
        "Added comprehensive ReportLab imports",
    ))
}

pub(super) fn uncalled_builder(text: &str) -> Result<Option<Applied>, RewriteError> {
    let mut target = None;
    for name in python_defs(text)? {
        let lower = name.to_lowercase();
        if !BUILDER_WORDS.iter().any(|w| lower.contains(w)) {
            continue;
        }
        if !is_invoked(text, &name)? {
            target = Some(name);
            break;
        }
    }

    Ok(target.map(|name| {
        Applied::new(
            append_block(text, &format!("{}\n{}()", ENTRY_MARKER, name)),
            format!("Added missing {}() call", name),
        )
    }))
}

/// First top-level `<var> = SimpleDocTemplate(` / `BaseDocTemplate(`:
/// the variable name and the byte offset of its opening paren.
fn doc_template(text: &str) -> Result<Option<(String, usize)>, RewriteError> {
    let re = Regex::new(
        r"(?m)^([A-Za-z_][A-Za-z0-9_]*)[ \t]*=[ \t]*(?:SimpleDocTemplate|BaseDocTemplate)[ \t]*\(",
    )?;
    Ok(re
        .captures(text)
        .and_then(|c| Some((c[1].to_string(), c.get(0)?.end() - 1))))
}

pub(super) fn story_list(text: &str) -> Result<Option<Applied>, RewriteError> {
    if !text.contains("story.append(") {
        return Ok(None);
    }
    let declared = Regex::new(r"(?m)^[ \t]*story[ \t]*=")?;
    if declared.is_match(text) {
        return Ok(None);
    }
    let Some((_, open)) = doc_template(text)? else {
        return Ok(None);
    };

    let at = statement_end(text, open);
    let mut out = String::with_capacity(text.len() + 12);
    out.push_str(&text[..at]);
    out.push_str("\nstory = []");
    out.push_str(&text[at..]);
    Ok(Some(Applied::new(out, "Added missing story list")))
}

pub(super) fn story_build(text: &str) -> Result<Option<Applied>, RewriteError> {
    if !text.contains("story.append(") || text.contains(".build(") {
        return Ok(None);
    }
    let Some((doc, _)) = doc_template(text)? else {
        return Ok(None);
    };
    Ok(Some(Applied::new(
        append_block(text, &format!("{}.build(story)", doc)),
        format!("Added missing {}.build(story)", doc),
    )))
}

/// `alias` is a regex fragment matched case-insensitively, bare or quoted.
pub(super) fn alignment(text: &str, alias: &str, value: u8) -> Result<Option<Applied>, RewriteError> {
    let re = Regex::new(&format!(
        r#"alignment[ \t]*=[ \t]*(?i:"{a}"|'{a}'|{a}\b)"#,
        a = alias
    ))?;
    if !re.is_match(text) {
        return Ok(None);
    }
    let fixed = re.replace_all(text, format!("alignment={}", value).as_str());
    Ok(Some(Applied::new(
        fixed.into_owned(),
        format!("Fixed alignment: {} → {}", alias, value),
    )))
}

pub(super) fn guard_entry_call(text: &str) -> Result<Option<Applied>, RewriteError> {
    if python_defs(text)?.is_empty() || text.contains("try:") || text.contains("except") {
        return Ok(None);
    }
    let re = Regex::new(&format!(
        r"(?m)^{}\n([A-Za-z_][A-Za-z0-9_]*)\(\)[ \t]*$",
        regex::escape(ENTRY_MARKER)
    ))?;
    let Some(caps) = re.captures(text) else {
        return Ok(None);
    };
    let name = caps[1].to_string();
    let guarded = format!(
        "{marker}\n\
         try:\n    \
             {name}()\n    \
             print(\"PDF generated successfully!\")\n\
         except Exception as e:\n    \
             import sys\n    \
             print(f\"Error: {{e}}\", file=sys.stderr)",
        marker = ENTRY_MARKER,
        name = name
    );
    let fixed = re.replace(text, regex::NoExpand(&guarded));
    Ok(Some(Applied::new(fixed.into_owned(), "Added error handling")))
}
