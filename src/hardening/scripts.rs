//! Inline script discovery and reassembly.

use std::ops::Range;

use crate::hardening::html::{tokenize, HtmlError, HtmlToken, StartTag};

/// MIME types that mark a classic script.
const JAVASCRIPT_TYPES: &[&str] = &[
    "text/javascript",
    "application/javascript",
    "application/ecmascript",
    "application/x-javascript",
    "application/x-ecmascript",
    "text/ecmascript",
    "text/jscript",
    "text/livescript",
    "text/x-javascript",
    "text/x-ecmascript",
];

/// How the content of a `<script>` element is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Classic JavaScript.
    Classic,
    /// `type="module"`.
    Module,
    /// Data blocks and unknown types; left untouched.
    Data,
}

impl ScriptKind {
    pub fn of(tag: &StartTag<'_>) -> Self {
        let Some(Some(kind)) = tag.attribute("type") else {
            return ScriptKind::Classic;
        };
        let essence = kind.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        if essence.is_empty() || JAVASCRIPT_TYPES.contains(&essence.as_str()) {
            ScriptKind::Classic
        } else if essence == "module" {
            ScriptKind::Module
        } else {
            ScriptKind::Data
        }
    }

    pub fn is_javascript(self) -> bool {
        matches!(self, ScriptKind::Classic | ScriptKind::Module)
    }
}

/// Body of an inline classic script and where it sits in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineScript<'a> {
    pub body: &'a str,
    pub span: Range<usize>,
}

/// Every inline classic script in document order.
///
/// Scripts with a `src` attribute, modules and data blocks are skipped.
pub fn extract_scripts(html: &str) -> Result<Vec<InlineScript<'_>>, HtmlError> {
    let tokens = tokenize(html)?;
    let mut scripts = Vec::new();
    let mut eligible = false;
    for token in tokens {
        match token {
            HtmlToken::StartTag(tag) if tag.name == "script" => {
                eligible = tag.attribute("src").is_none() && ScriptKind::of(&tag) == ScriptKind::Classic;
            }
            HtmlToken::RawText { text, span } if std::mem::take(&mut eligible) => {
                scripts.push(InlineScript { body: text, span });
            }
            _ => eligible = false,
        }
    }
    Ok(scripts)
}

/// Replace each script body with its counterpart in `bodies`.
pub fn reassemble(html: &str, scripts: &[InlineScript<'_>], bodies: &[String]) -> String {
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for (script, body) in scripts.iter().zip(bodies) {
        out.push_str(&html[cursor..script.span.start]);
        out.push_str(body);
        cursor = script.span.end;
    }
    out.push_str(&html[cursor..]);
    out
}
