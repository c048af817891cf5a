//! Document minification.
//!
//! Removes comments, collapses whitespace between and inside tags and
//! minifies inline scripts and styles. `pre` and `textarea` content is
//! kept verbatim.

use crate::hardening::css::minify_css;
use crate::hardening::html::{tokenize, HtmlToken};
use crate::hardening::js::minify_js;
use crate::hardening::scripts::ScriptKind;
use crate::hardening::HardeningError;

/// Elements around which whitespace is rendered; every other element is
/// treated as a block boundary.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "acronym", "audio", "b", "bdi", "bdo", "big", "button", "cite", "code", "data",
    "del", "dfn", "em", "font", "i", "img", "input", "ins", "kbd", "label", "mark", "math",
    "meter", "nobr", "object", "output", "picture", "progress", "q", "rp", "rt", "rtc", "ruby",
    "s", "samp", "select", "small", "span", "strike", "strong", "sub", "sup", "svg", "textarea",
    "time", "tt", "u", "var", "video", "wbr",
];

#[derive(Debug)]
enum Node {
    /// Collapsible text.
    Text(String),
    /// Text inside `pre`.
    Verbatim(String),
    Tag { name: String, markup: String },
    /// Declarations and raw-text element content.
    Opaque(String),
}

impl Node {
    fn is_block_boundary(&self) -> bool {
        match self {
            Node::Tag { name, .. } => !INLINE_ELEMENTS.contains(&name.as_str()),
            Node::Opaque(_) => true,
            Node::Text(_) | Node::Verbatim(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RawContent {
    Script(ScriptKind),
    Style,
    Title,
    Verbatim,
}

/// Minify a complete document.
pub fn minify_html(html: &str) -> Result<String, HardeningError> {
    let tokens = tokenize(html)?;
    let mut nodes: Vec<Node> = Vec::with_capacity(tokens.len());
    let mut pre_depth = 0usize;
    let mut raw_content: Option<RawContent> = None;

    for token in tokens {
        match token {
            HtmlToken::Comment(_) => {}
            HtmlToken::Text(text) => {
                let verbatim = pre_depth > 0;
                match nodes.last_mut() {
                    Some(Node::Text(prev)) if !verbatim => prev.push_str(text),
                    Some(Node::Verbatim(prev)) if verbatim => prev.push_str(text),
                    _ if verbatim => nodes.push(Node::Verbatim(text.to_string())),
                    _ => nodes.push(Node::Text(text.to_string())),
                }
            }
            HtmlToken::Declaration(raw) => nodes.push(Node::Opaque(raw.to_string())),
            HtmlToken::StartTag(tag) => {
                if tag.name == "pre" {
                    pre_depth += 1;
                }
                raw_content = match tag.name.as_str() {
                    "script" => Some(RawContent::Script(ScriptKind::of(&tag))),
                    "style" => Some(RawContent::Style),
                    "title" => Some(RawContent::Title),
                    "textarea" => Some(RawContent::Verbatim),
                    _ => None,
                };
                nodes.push(Node::Tag {
                    markup: compact_tag(tag.raw),
                    name: tag.name,
                });
            }
            HtmlToken::EndTag { raw, name } => {
                if name == "pre" {
                    pre_depth = pre_depth.saturating_sub(1);
                }
                nodes.push(Node::Tag {
                    markup: compact_tag(raw),
                    name,
                });
            }
            HtmlToken::RawText { text, .. } => {
                let content = match raw_content.take() {
                    Some(RawContent::Script(kind)) if kind.is_javascript() => {
                        minify_js(text).map_err(HardeningError::MinifyScript)?
                    }
                    Some(RawContent::Style) => minify_css(text)?,
                    Some(RawContent::Title) => collapse_whitespace(text).trim().to_string(),
                    _ => text.to_string(),
                };
                nodes.push(Node::Opaque(content));
            }
        }
    }

    let mut out = String::with_capacity(html.len());
    for (i, node) in nodes.iter().enumerate() {
        match node {
            Node::Text(text) => {
                let collapsed = collapse_whitespace(text);
                let block_before = i == 0 || nodes[i - 1].is_block_boundary();
                let block_after = nodes.get(i + 1).map_or(true, Node::is_block_boundary);
                let mut trimmed = collapsed.as_str();
                if block_before {
                    trimmed = trimmed.trim_start_matches(' ');
                }
                if block_after {
                    trimmed = trimmed.trim_end_matches(' ');
                }
                out.push_str(trimmed);
            }
            Node::Verbatim(text) | Node::Opaque(text) => out.push_str(text),
            Node::Tag { markup, .. } => out.push_str(markup),
        }
    }
    Ok(out)
}

/// Replace every run of ASCII whitespace with a single space.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Collapse whitespace inside a tag, leaving quoted attribute values alone.
fn compact_tag(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;
    for c in raw.chars() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        if c.is_ascii_whitespace() {
            pending_space = true;
            continue;
        }
        if std::mem::take(&mut pending_space) {
            let after = out.chars().last();
            if !matches!(c, '>' | '=') && !matches!(after, Some('=') | Some('<') | Some('/')) {
                out.push(' ');
            }
        }
        if matches!(c, '"' | '\'') && out.ends_with('=') {
            quote = Some(c);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_comments_and_collapses_whitespace() {
        let html = "<!DOCTYPE html>\n<html>\n  <head>\n    <title>  My   Page </title>\n  </head>\n  \
                    <body>\n    <!-- note -->\n    <div>\n      Hello   <b>big</b>   world\n    </div>\n  </body>\n</html>\n";
        assert_eq!(
            minify_html(html).unwrap(),
            "<!DOCTYPE html><html><head><title>My Page</title></head><body><div>Hello <b>big</b> world</div></body></html>"
        );
    }

    #[test]
    fn test_comment_between_words_leaves_one_space() {
        assert_eq!(minify_html("<p>a <!-- x --> b</p>").unwrap(), "<p>a b</p>");
    }

    #[test]
    fn test_inline_whitespace_between_tags_is_kept() {
        assert_eq!(
            minify_html("<p><span>a</span>   \n  <span>b</span></p>").unwrap(),
            "<p><span>a</span> <span>b</span></p>"
        );
        assert_eq!(minify_html("<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>").unwrap(), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_pre_and_textarea_are_verbatim() {
        let html = "<div>\n<pre>  keep\n   this  <!-- gone --> </pre>\n<textarea>  and\n this </textarea></div>";
        assert_eq!(
            minify_html(html).unwrap(),
            "<div><pre>  keep\n   this   </pre><textarea>  and\n this </textarea></div>"
        );
    }

    #[test]
    fn test_tags_are_compacted_outside_quotes() {
        assert_eq!(
            minify_html("<a   href = \"/x  y\"\n   class='a  b' >go</a ><br />").unwrap(),
            "<a href=\"/x  y\" class='a  b'>go</a><br />"
        );
    }

    #[test]
    fn test_inline_script_and_style_are_minified() {
        let html = "<style>\n p { color : red ; }\n</style><script>\n  var a = 1 ;\n  // c\n</script>\
                    <script type=\"application/ld+json\">{ \"a\" : 1 }</script>";
        assert_eq!(
            minify_html(html).unwrap(),
            "<style>p{color :red}</style><script>var a=1;</script><script type=\"application/ld+json\">{ \"a\" : 1 }</script>"
        );
    }

    #[test]
    fn test_malformed_content_fails() {
        assert!(matches!(minify_html("<div><!-- open"), Err(HardeningError::Html(_))));
        assert!(matches!(minify_html("<script>var s = 'x</script>"), Err(HardeningError::MinifyScript(_))));
        assert!(matches!(minify_html("<style>a { /* x</style>"), Err(HardeningError::Css(_))));
    }
}
