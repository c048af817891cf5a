//! Markup tokenizer.
//!
//! Splits a document into text, comments, declarations, tags and the raw
//! text of `script`, `style`, `textarea` and `title` elements. Every token
//! borrows its exact source bytes, so untouched tokens reassemble verbatim.

use std::ops::Range;

/// Elements whose content is raw text, ended only by their own end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HtmlError {
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),

    #[error("unterminated tag at byte {0}")]
    UnterminatedTag(usize),

    #[error("unterminated attribute value at byte {0}")]
    UnterminatedAttribute(usize),

    #[error("<{name}> opened at byte {offset} is never closed")]
    UnclosedElement { name: String, offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lower-cased name.
    pub name: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'a> {
    pub raw: &'a str,
    /// Lower-cased element name.
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

impl StartTag<'_> {
    /// `None` if the attribute is absent, `Some(None)` if it has no value.
    pub fn attribute(&self, name: &str) -> Option<Option<&str>> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlToken<'a> {
    Text(&'a str),
    Comment(&'a str),
    /// `<!DOCTYPE ...>`, `<![CDATA[...]>`, `<?...>`.
    Declaration(&'a str),
    StartTag(StartTag<'a>),
    EndTag { raw: &'a str, name: String },
    /// Content of a raw-text element, with its byte range in the document.
    RawText { text: &'a str, span: Range<usize> },
}

impl HtmlToken<'_> {
    /// Source bytes of the token.
    pub fn raw(&self) -> &str {
        match self {
            HtmlToken::Text(raw) | HtmlToken::Comment(raw) | HtmlToken::Declaration(raw) => raw,
            HtmlToken::StartTag(tag) => tag.raw,
            HtmlToken::EndTag { raw, .. } => raw,
            HtmlToken::RawText { text, .. } => text,
        }
    }
}

/// Tokenize a document.
pub fn tokenize(html: &str) -> Result<Vec<HtmlToken<'_>>, HtmlError> {
    let bytes = html.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let next = bytes.get(pos + 1).copied();
        let after_next = bytes.get(pos + 2).copied();

        let (token, end) = if html[pos..].starts_with("<!--") {
            let close = html[pos + 4..]
                .find("-->")
                .ok_or(HtmlError::UnterminatedComment(pos))?;
            let end = pos + 4 + close + 3;
            (HtmlToken::Comment(&html[pos..end]), end)
        } else if matches!(next, Some(b'!' | b'?')) {
            let end = find_byte(bytes, pos, b'>').ok_or(HtmlError::UnterminatedTag(pos))? + 1;
            (HtmlToken::Declaration(&html[pos..end]), end)
        } else if next == Some(b'/') && after_next.is_some_and(|b| b.is_ascii_alphabetic()) {
            let end = find_byte(bytes, pos, b'>').ok_or(HtmlError::UnterminatedTag(pos))? + 1;
            let name_end = html[pos + 2..end]
                .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
                .map_or(end, |i| pos + 2 + i);
            let name = html[pos + 2..name_end].to_ascii_lowercase();
            (HtmlToken::EndTag { raw: &html[pos..end], name }, end)
        } else if next.is_some_and(|b| b.is_ascii_alphabetic()) {
            let (tag, end) = parse_start_tag(html, pos)?;
            (HtmlToken::StartTag(tag), end)
        } else {
            pos += 1;
            continue;
        };

        if text_start < pos {
            tokens.push(HtmlToken::Text(&html[text_start..pos]));
        }

        let raw_element = match &token {
            HtmlToken::StartTag(tag) if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) => Some(tag.name.clone()),
            _ => None,
        };
        tokens.push(token);
        pos = end;

        if let Some(name) = raw_element {
            let close = find_end_tag(html, pos, &name).ok_or_else(|| HtmlError::UnclosedElement {
                name: name.clone(),
                offset: pos,
            })?;
            tokens.push(HtmlToken::RawText {
                text: &html[pos..close],
                span: pos..close,
            });
            pos = close;
        }
        text_start = pos;
    }

    if text_start < bytes.len() {
        tokens.push(HtmlToken::Text(&html[text_start..]));
    }
    Ok(tokens)
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|i| from + i)
}

/// Start of the first `</name` (any case) at or after `from` that is
/// followed by whitespace, `/` or `>`.
fn find_end_tag(html: &str, from: usize, name: &str) -> Option<usize> {
    let haystack = html[from..].to_ascii_lowercase();
    let needle = format!("</{name}");
    let mut search = 0;
    while let Some(found) = haystack[search..].find(&needle) {
        let at = search + found;
        let boundary = haystack.as_bytes().get(at + needle.len()).copied();
        if boundary.map_or(true, |b| b.is_ascii_whitespace() || b == b'/' || b == b'>') {
            return Some(from + at);
        }
        search = at + needle.len();
    }
    None
}

fn parse_start_tag(html: &str, start: usize) -> Result<(StartTag<'_>, usize), HtmlError> {
    let bytes = html.as_bytes();
    let len = bytes.len();
    let is_space = |b: u8| b.is_ascii_whitespace();

    let mut i = start + 1;
    while i < len && !is_space(bytes[i]) && bytes[i] != b'>' && bytes[i] != b'/' {
        i += 1;
    }
    let name = html[start + 1..i].to_ascii_lowercase();

    let mut attributes = Vec::new();
    let mut self_closing = false;
    loop {
        while i < len && is_space(bytes[i]) {
            i += 1;
        }
        if i >= len {
            return Err(HtmlError::UnterminatedTag(start));
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' if bytes.get(i + 1) == Some(&b'>') => {
                self_closing = true;
                i += 2;
                break;
            }
            b'/' | b'=' => i += 1,
            _ => {
                let name_start = i;
                while i < len && !is_space(bytes[i]) && !matches!(bytes[i], b'>' | b'=' | b'/') {
                    i += 1;
                }
                let attr_name = html[name_start..i].to_ascii_lowercase();

                let mut j = i;
                while j < len && is_space(bytes[j]) {
                    j += 1;
                }
                let mut value = None;
                if j < len && bytes[j] == b'=' {
                    j += 1;
                    while j < len && is_space(bytes[j]) {
                        j += 1;
                    }
                    match bytes.get(j) {
                        Some(&quote @ (b'"' | b'\'')) => {
                            let close = find_byte(bytes, j + 1, quote).ok_or(HtmlError::UnterminatedAttribute(j))?;
                            value = Some(html[j + 1..close].to_string());
                            j = close + 1;
                        }
                        Some(_) => {
                            let value_start = j;
                            while j < len && !is_space(bytes[j]) && bytes[j] != b'>' {
                                j += 1;
                            }
                            value = Some(html[value_start..j].to_string());
                        }
                        None => return Err(HtmlError::UnterminatedTag(start)),
                    }
                    i = j;
                }
                attributes.push(Attribute { name: attr_name, value });
            }
        }
    }

    Ok((
        StartTag {
            raw: &html[start..i],
            name,
            attributes,
            self_closing,
        },
        i,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_reassemble_verbatim() {
        let html = "<!DOCTYPE html>\n<html lang=en><!-- c --><body class=\"a b\">Hi &amp; <b>bye</b> 1 < 2</body></html>";
        let tokens = tokenize(html).unwrap();
        let joined: String = tokens.iter().map(HtmlToken::raw).collect();
        assert_eq!(joined, html);
        assert!(matches!(tokens[0], HtmlToken::Declaration("<!DOCTYPE html>")));
        assert!(tokens.contains(&HtmlToken::Comment("<!-- c -->")));
    }

    #[test]
    fn test_start_tag_attributes() {
        let tokens = tokenize("<INPUT Type='text' disabled value = \"a > b\" data-x=1 />").unwrap();
        let HtmlToken::StartTag(tag) = &tokens[0] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.name, "input");
        assert_eq!(tag.attribute("type"), Some(Some("text")));
        assert_eq!(tag.attribute("disabled"), Some(None));
        assert_eq!(tag.attribute("value"), Some(Some("a > b")));
        assert_eq!(tag.attribute("data-x"), Some(Some("1")));
        assert_eq!(tag.attribute("src"), None);
        assert!(tag.self_closing);
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_script_content_is_raw_text() {
        let html = "<script type=\"text/javascript\">if (a < b && '</div>') {}</SCRIPT >after";
        let tokens = tokenize(html).unwrap();
        assert_eq!(tokens.len(), 4);
        match &tokens[1] {
            HtmlToken::RawText { text, span } => {
                assert_eq!(*text, "if (a < b && '</div>') {}");
                assert_eq!(&html[span.clone()], *text);
            }
            other => panic!("unexpected token {other:?}"),
        }
        assert!(matches!(&tokens[2], HtmlToken::EndTag { name, .. } if name == "script"));
        assert_eq!(tokens[3], HtmlToken::Text("after"));
    }

    #[test]
    fn test_end_tag_prefix_is_not_a_close() {
        let tokens = tokenize("<script>var s = '</scripts>';</script>").unwrap();
        assert_eq!(tokens[1].raw(), "var s = '</scripts>';");
    }

    #[test]
    fn test_malformed_markup() {
        assert_eq!(tokenize("<p>a<!-- open").unwrap_err(), HtmlError::UnterminatedComment(4));
        assert_eq!(tokenize("<div class=\"x\"").unwrap_err(), HtmlError::UnterminatedTag(0));
        assert_eq!(tokenize("<div class=\"x>").unwrap_err(), HtmlError::UnterminatedAttribute(11));
        assert!(matches!(
            tokenize("<script>alert(1)").unwrap_err(),
            HtmlError::UnclosedElement { name, .. } if name == "script"
        ));
    }
}
