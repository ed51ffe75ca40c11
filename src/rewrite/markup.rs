//! Rules for the `html` dialect.

use super::text::substitute;
use super::{Applied, Rule};

const SELF_CLOSING: &[(&str, &str)] = &[("<br>", "<br/>"), ("<hr>", "<hr/>")];

pub(super) fn rules() -> Vec<Rule> {
    let mut rules = vec![
        Rule::SmartQuotes,
        Rule::HtmlSkeleton,
        Rule::HtmlDoctype,
        Rule::HtmlCharset,
        Rule::HtmlViewport,
        Rule::HtmlTitle,
    ];
    rules.extend(
        SELF_CLOSING
            .iter()
            .map(|&(from, to)| Rule::SelfClosingTag { from, to }),
    );
    rules
}

fn contains_ci(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(needle)
}

pub(super) fn skeleton(text: &str) -> Option<Applied> {
    if contains_ci(text, "<html") {
        return None;
    }
    let document = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Generated PDF Document</title>
    <style>
        body {{
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            margin: 20px;
            line-height: 1.6;
            color: #333;
        }}
        h1 {{ color: #213A5C; }}
        h2 {{ color: #5A7CA4; }}
        .container {{ max-width: 800px; margin: 0 auto; }}
    </style>
</head>
<body>
    <div class="container">
{}
    </div>
</body>
</html>"#,
        text
    );
    Some(Applied::new(document, "Added complete HTML5 document structure"))
}

pub(super) fn doctype(text: &str) -> Option<Applied> {
    if contains_ci(text, "<!doctype") || !contains_ci(text, "<html") {
        return None;
    }
    Some(Applied::new(
        format!("<!DOCTYPE html>\n{}", text),
        "Added missing DOCTYPE",
    ))
}

/// Inserts `line` right after the first `<head>` tag.
fn after_head(text: &str, line: &str) -> Option<String> {
    let at = text.find("<head>")? + "<head>".len();
    Some(format!("{}\n    {}{}", &text[..at], line, &text[at..]))
}

pub(super) fn charset(text: &str) -> Option<Applied> {
    if contains_ci(text, "charset=") {
        return None;
    }
    after_head(text, r#"<meta charset="UTF-8">"#).map(|t| Applied::new(t, "Added UTF-8 charset"))
}

pub(super) fn viewport(text: &str) -> Option<Applied> {
    if contains_ci(text, r#"name="viewport""#) {
        return None;
    }
    after_head(
        text,
        r#"<meta name="viewport" content="width=device-width, initial-scale=1.0">"#,
    )
    .map(|t| Applied::new(t, "Added viewport meta tag"))
}

pub(super) fn title(text: &str) -> Option<Applied> {
    if contains_ci(text, "<title") || !text.contains("<head>") {
        return None;
    }
    let at = text.find("</head>")?;
    Some(Applied::new(
        format!("{}    <title>PDF Document</title>\n{}", &text[..at], &text[at..]),
        "Added missing title tag",
    ))
}

pub(super) fn self_closing(text: &str, from: &str, to: &str) -> Option<Applied> {
    substitute(text, from, to, format!("Fixed HTML: {} → {}", from, to))
}
