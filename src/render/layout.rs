//! Shared page layout.
//!
//! # Responsibilities
//! - Parse the layout template once at startup into literal text and slots
//! - Merge a page's raw content and derived title into the slots
//!
//! # Design Decisions
//! - Slots use EJS tag syntax: `<%= name %>` escapes, `<%- name %>` is raw
//! - Only `content` and `title` are recognised; anything else fails startup
//! - Page content is inserted as-is and never evaluated itself
//! - Composition is a pure function of (layout, content, title)

use std::fmt;

/// Values a layout may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotName {
    Content,
    Title,
}

impl SlotName {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "content" => Some(SlotName::Content),
            "title" => Some(SlotName::Title),
            _ => None,
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotName::Content => f.write_str("content"),
            SlotName::Title => f.write_str("title"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot { name: SlotName, escape: bool },
}

/// Error produced while parsing a layout template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("unterminated template tag starting at byte {0}")]
    UnterminatedTag(usize),

    #[error("unsupported template tag {tag:?} at byte {offset}")]
    UnsupportedTag { tag: String, offset: usize },

    #[error("unknown layout slot {name:?} at byte {offset}")]
    UnknownSlot { name: String, offset: usize },
}

/// A parsed layout template, immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    segments: Vec<Segment>,
}

impl Layout {
    /// Parse layout source into literal segments and slots.
    pub fn parse(source: &str) -> Result<Self, LayoutError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("<%") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let tag_offset = offset + start;
            let after_open = &rest[start + 2..];
            let end = after_open
                .find("%>")
                .ok_or(LayoutError::UnterminatedTag(tag_offset))?;
            let inner = &after_open[..end];

            let (escape, expr) = match inner.chars().next() {
                Some('=') => (true, &inner[1..]),
                Some('-') => (false, &inner[1..]),
                _ => {
                    return Err(LayoutError::UnsupportedTag {
                        tag: format!("<%{inner}%>"),
                        offset: tag_offset,
                    })
                }
            };
            let expr = expr.trim().trim_end_matches('-').trim_end();
            let name = SlotName::parse(expr).ok_or_else(|| LayoutError::UnknownSlot {
                name: expr.to_string(),
                offset: tag_offset,
            })?;
            segments.push(Segment::Slot { name, escape });

            let consumed = start + 2 + end + 2;
            rest = &rest[consumed..];
            offset += consumed;
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Slots referenced by this layout, in document order.
    pub fn slots(&self) -> impl Iterator<Item = SlotName> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Slot { name, .. } => Some(*name),
            Segment::Literal(_) => None,
        })
    }

    /// Merge page content and title into the layout.
    pub fn compose(&self, content: &str, title: &str) -> String {
        let mut html = String::with_capacity(self.literal_len() + content.len() + title.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => html.push_str(text),
                Segment::Slot { name, escape } => {
                    let value = match name {
                        SlotName::Content => content,
                        SlotName::Title => title,
                    };
                    if *escape {
                        escape_html_into(value, &mut html);
                    } else {
                        html.push_str(value);
                    }
                }
            }
        }
        html
    }

    fn literal_len(&self) -> usize {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => text.len(),
                Segment::Slot { .. } => 0,
            })
            .sum()
    }
}

/// Escape text for HTML the way EJS `<%=` does.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    escape_html_into(value, &mut out);
    out
}

fn escape_html_into(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}
