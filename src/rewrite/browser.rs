//! Rules for the `javascript` dialect (jsPDF).
//!
//! The dialect is never executed, but its snippets are still repaired so the
//! fix list tells the caller what would have been changed.

use regex::Regex;

use super::{Applied, Rule, PUNCTUATION};
use crate::error::RewriteError;

const JSPDF_REQUIRE: &str = "const { jsPDF } = require('jspdf');\n";

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = vec![Rule::SmartQuotes];
    rules.extend(PUNCTUATION.iter().map(|&(from, to)| Rule::Punctuation { from, to }));
    rules.extend([Rule::JsPdfRequire, Rule::JsPdfSave]);
    rules
}

pub(super) fn jspdf_require(text: &str) -> Option<Applied> {
    if !text.contains("jsPDF") || text.contains("require(") || text.contains("import") {
        return None;
    }
    Some(Applied::new(
        format!("{}{}", JSPDF_REQUIRE, text),
        "Added jsPDF import",
    ))
}

pub(super) fn jspdf_save(text: &str) -> Result<Option<Applied>, RewriteError> {
    let ctor = Regex::new(r"(?:const|let|var)[ \t]+([A-Za-z_$][A-Za-z0-9_$]*)[ \t]*=[ \t]*new[ \t]+jsPDF[ \t]*\(")?;
    let Some(caps) = ctor.captures(text) else {
        return Ok(None);
    };
    let doc = &caps[1];
    if text.contains(&format!("{}.save(", doc)) {
        return Ok(None);
    }
    Ok(Some(Applied::new(
        format!("{}\n{}.save('document.pdf');", text.trim_end(), doc),
        format!("Added missing {}.save()", doc),
    )))
}
