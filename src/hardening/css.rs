//! Stylesheet minification for inline `<style>` blocks.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CssError {
    #[error("unterminated comment at byte {0}")]
    UnterminatedComment(usize),

    #[error("unterminated string at byte {0}")]
    UnterminatedString(usize),
}

/// Characters that need no surrounding whitespace.
fn is_tight(c: char) -> bool {
    matches!(c, '{' | '}' | ';' | ',' | '>' | '(' | ')' | '~' | '+')
}

/// Remove comments, collapse whitespace and drop redundant separators.
///
/// A space before `:` is kept because it is significant in selectors
/// (`a :hover` differs from `a:hover`). `+` is only tight outside
/// parentheses, where `calc()` needs its surrounding spaces.
pub fn minify_css(css: &str) -> Result<String, CssError> {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.char_indices().peekable();
    let mut pending_space = false;
    let mut paren_depth = 0usize;

    while let Some((offset, c)) = chars.next() {
        if c == '/' && chars.peek().map(|&(_, n)| n) == Some('*') {
            chars.next();
            let mut prev = '\0';
            loop {
                match chars.next() {
                    Some((_, '/')) if prev == '*' => break,
                    Some((_, ch)) => prev = ch,
                    None => return Err(CssError::UnterminatedComment(offset)),
                }
            }
            pending_space = true;
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            continue;
        }

        let tight = |ch: char| is_tight(ch) && !(ch == '+' && paren_depth > 0);
        if pending_space {
            let prev = out.chars().last();
            let drop = match prev {
                None => true,
                Some(p) => tight(p) || p == ':' || tight(c),
            };
            if !drop {
                out.push(' ');
            }
            pending_space = false;
        }

        match c {
            '"' | '\'' => {
                out.push(c);
                loop {
                    match chars.next() {
                        Some((_, '\\')) => {
                            out.push('\\');
                            if let Some((_, escaped)) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        Some((_, ch)) if ch == c => {
                            out.push(ch);
                            break;
                        }
                        Some((_, '\n')) | None => return Err(CssError::UnterminatedString(offset)),
                        Some((_, ch)) => out.push(ch),
                    }
                }
            }
            '}' => {
                if out.ends_with(';') {
                    out.pop();
                }
                out.push('}');
            }
            '(' => {
                paren_depth += 1;
                out.push('(');
            }
            ')' => {
                paren_depth = paren_depth.saturating_sub(1);
                out.push(')');
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_css_rules() {
        let css = "\n  body {\n    margin : 0;\n    color: #333; /* text */\n  }\n  a:hover , a:focus { color: red; }\n";
        assert_eq!(minify_css(css).unwrap(), "body{margin :0;color:#333}a:hover,a:focus{color:red}");
    }

    #[test]
    fn test_selectors_keep_descendant_spaces() {
        assert_eq!(minify_css("div  p > span ~ em :first-child {}").unwrap(), "div p>span~em :first-child{}");
    }

    #[test]
    fn test_calc_and_strings_preserved() {
        assert_eq!(
            minify_css("div { width: calc(100% - 2px + 1em); content: \"a  ;  b\"; }").unwrap(),
            "div{width:calc(100% - 2px + 1em);content:\"a  ;  b\"}"
        );
    }

    #[test]
    fn test_malformed_css() {
        assert_eq!(minify_css("a { /* open").unwrap_err(), CssError::UnterminatedComment(4));
        assert_eq!(minify_css("a { content: 'x").unwrap_err(), CssError::UnterminatedString(13));
    }
}
