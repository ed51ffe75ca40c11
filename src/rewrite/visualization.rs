//! Rules for the `matplotlib` dialect.

use regex::Regex;

use super::text::append_block;
use super::{Applied, Rule, PATH_PREFIXES, PUNCTUATION};
use crate::error::RewriteError;

const MATPLOTLIB_IMPORTS: &str = "\
import matplotlib
matplotlib.use('Agg')  # Backend for server environment
import matplotlib.pyplot as plt
";

const BACKEND_DIRECTIVE: &str = "import matplotlib\nmatplotlib.use('Agg')\n";

const SAVE_SEQUENCE: &str = "\
# Auto-added save commands
plt.tight_layout()
plt.savefig('chart.pdf', bbox_inches='tight', dpi=300)
plt.close()";

const HEADLESS_CALLS: &[(&str, &str)] = &[
    ("plt.show", "removed for PDF generation"),
    ("pyplot.show", "removed for PDF generation"),
    ("plt.ion", "removed for server environment"),
    ("plt.ioff", "removed for server environment"),
];

const RASTER_FORMATS: &[(&str, &str)] = &[("PNG", "png"), ("JPEG", "jpe?g")];

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = vec![Rule::SmartQuotes];
    rules.extend(PUNCTUATION.iter().map(|&(from, to)| Rule::Punctuation { from, to }));
    rules.push(Rule::MatplotlibImports);
    rules.extend(PATH_PREFIXES.iter().map(|&p| Rule::PathPrefix(p)));
    rules.push(Rule::ChartSave);
    rules.push(Rule::BackendDirective);
    rules.extend(
        HEADLESS_CALLS
            .iter()
            .map(|&(call, note)| Rule::HeadlessCall { call, note }),
    );
    rules.extend(
        RASTER_FORMATS
            .iter()
            .map(|&(label, extensions)| Rule::OutputExtension { label, extensions }),
    );
    rules.extend([Rule::NumpyImport, Rule::PandasImport]);
    rules
}

pub(super) fn matplotlib_imports(text: &str) -> Option<Applied> {
    if text.contains("matplotlib") || !(text.contains("plt.") || text.contains("pyplot")) {
        return None;
    }
    Some(Applied::new(
        format!("{}{}", MATPLOTLIB_IMPORTS, text),
        "Added comprehensive matplotlib imports",
    ))
}

pub(super) fn chart_save(text: &str) -> Option<Applied> {
    if !text.contains("plt.") || text.contains("savefig(") {
        return None;
    }
    Some(Applied::new(
        append_block(text, SAVE_SEQUENCE),
        "Added plt.savefig() with tight layout and close",
    ))
}

pub(super) fn backend_directive(text: &str) -> Result<Option<Applied>, RewriteError> {
    if text.contains("matplotlib.use(") {
        return Ok(None);
    }
    let first_import = Regex::new(r"(?m)^([ \t]*)(?:import|from)[ \t]+matplotlib\b")?;
    let Some(caps) = first_import.captures(text) else {
        return Ok(None);
    };
    let (Some(line), Some(indent)) = (caps.get(0), caps.get(1)) else {
        return Ok(None);
    };

    let directive: String = BACKEND_DIRECTIVE
        .lines()
        .map(|l| format!("{}{}\n", indent.as_str(), l))
        .collect();
    let mut out = String::with_capacity(text.len() + directive.len());
    out.push_str(&text[..line.start()]);
    out.push_str(&directive);
    out.push_str(&text[line.start()..]);
    Ok(Some(Applied::new(out, "Added Agg backend for server environment")))
}

/// Replaces `call(...)` statements with `pass` so the enclosing block stays
/// syntactically valid.
pub(super) fn headless_call(
    text: &str,
    call: &str,
    note: &str,
) -> Result<Option<Applied>, RewriteError> {
    let re = Regex::new(&format!(
        r"(?m)^([ \t]*)({}\([^)\n]*\))[ \t]*$",
        regex::escape(call)
    ))?;
    if !re.is_match(text) {
        return Ok(None);
    }
    let fixed = re.replace_all(text, format!("${{1}}pass  # ${{2}} {}", note).as_str());
    Ok(Some(Applied::new(
        fixed.into_owned(),
        format!("Fixed matplotlib: {}() → {}", call, note),
    )))
}

pub(super) fn output_extension(
    text: &str,
    label: &str,
    extensions: &str,
) -> Result<Option<Applied>, RewriteError> {
    if !text.contains("savefig(") {
        return Ok(None);
    }
    let target = Regex::new(&format!(
        r#"(savefig\([ \t]*['"][^'"\n]*)\.(?i:{})(['"])"#,
        extensions
    ))?;
    let format_kwarg = Regex::new(&format!(r#"(format[ \t]*=[ \t]*)(['"])(?i:{})['"]"#, extensions))?;
    if !target.is_match(text) {
        return Ok(None);
    }
    let fixed = target.replace_all(text, "${1}.pdf${2}");
    let fixed = format_kwarg.replace_all(&fixed, "${1}${2}pdf${2}");
    Ok(Some(Applied::new(
        fixed.into_owned(),
        format!("Changed output format from {} to PDF", label),
    )))
}

pub(super) fn numpy_import(text: &str) -> Result<Option<Applied>, RewriteError> {
    let used = Regex::new(r"\bnp\.")?.is_match(text) || text.contains("numpy");
    if !used || text.contains("import numpy") {
        return Ok(None);
    }
    Ok(Some(Applied::new(
        format!("import numpy as np\n{}", text),
        "Added numpy import",
    )))
}

pub(super) fn pandas_import(text: &str) -> Result<Option<Applied>, RewriteError> {
    let used = Regex::new(r"\bpd\.")?.is_match(text) || text.contains("DataFrame");
    if !used || text.contains("import pandas") {
        return Ok(None);
    }
    Ok(Some(Applied::new(
        format!("import pandas as pd\n{}", text),
        "Added pandas import",
    )))
}
