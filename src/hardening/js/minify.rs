//! Compact script emission.
//!
//! Joins tokens with the least separation that keeps them distinct. A line
//! break is kept wherever dropping it could change automatic semicolon
//! insertion.

use crate::hardening::js::lexer::{is_identifier_start, tokenize, JsError, Token, TokenKind};

/// Minify a script body.
pub fn minify_js(src: &str) -> Result<String, JsError> {
    let lexed = tokenize(src)?;
    Ok(emit(&lexed.tokens))
}

/// Render a token stream as compact source.
pub fn emit(tokens: &[Token<'_>]) -> String {
    let mut out = String::with_capacity(tokens.iter().map(|t| t.text.len() + 1).sum());
    let mut prev: Option<&Token<'_>> = None;
    for token in tokens {
        if let Some(prev) = prev {
            if token.newline_before && line_break_matters(prev, token) {
                out.push('\n');
            } else if needs_space(prev, token) {
                out.push(' ');
            }
        }
        out.push_str(&token.text);
        prev = Some(token);
    }
    out
}

/// Tokens after which the statement cannot end.
fn continues_after(prev: &Token<'_>) -> bool {
    prev.kind == TokenKind::Punct
        && matches!(
            prev.text.as_ref(),
            "{" | "(" | "[" | "," | ";" | ":" | "?" | "." | "?." | "=>" | "..." | "=" | "+=" | "-="
                | "*=" | "/=" | "%=" | "**=" | "<<=" | ">>=" | ">>>=" | "&=" | "|=" | "^=" | "&&="
                | "||=" | "??=" | "==" | "===" | "!=" | "!==" | "<" | ">" | "<=" | ">=" | "&&"
                | "||" | "??" | "&" | "|" | "^" | "*" | "/" | "%" | "**" | "<<" | ">>" | ">>>"
                | "+" | "-" | "!" | "~"
        )
}

/// Tokens before which a line break never terminates a statement.
fn continues_before(next: &Token<'_>) -> bool {
    next.kind == TokenKind::Punct
        && matches!(
            next.text.as_ref(),
            ")" | "]" | "}" | "," | ";" | "." | "?." | ":" | "?" | "=" | "==" | "===" | "!="
                | "!==" | "&&" | "||" | "??" | "*" | "%" | "**" | "=>"
        )
}

fn line_break_matters(prev: &Token<'_>, next: &Token<'_>) -> bool {
    !(continues_after(prev) || continues_before(next))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || is_identifier_start(c) || !c.is_ascii()
}

fn needs_space(prev: &Token<'_>, next: &Token<'_>) -> bool {
    let (Some(a), Some(b)) = (prev.text.chars().last(), next.text.chars().next()) else {
        return false;
    };
    if is_word_char(a) && is_word_char(b) {
        return true;
    }
    // Regex flags would absorb a following word.
    if prev.kind == TokenKind::Regex && is_word_char(b) {
        return true;
    }
    // `1 .toString()` must not become `1.toString()`.
    if prev.kind == TokenKind::Number && b == '.' && prev.text.bytes().all(|c| c.is_ascii_digit()) {
        return true;
    }
    matches!(
        (a, b),
        ('+', '+') | ('-', '-') | ('/', '/') | ('/', '*') | ('<', '!') | ('-', '>')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_strips_comments_and_whitespace() {
        let src = "function add ( a , b ) {\n  // sum\n  return a + b ;\n}\n";
        assert_eq!(minify_js(src).unwrap(), "function add(a,b){return a+b;}");
    }

    #[test]
    fn test_keeps_line_breaks_needed_for_asi() {
        let src = "let a = 1\nlet b = a\n(function(){})()\nreturn\nx";
        assert_eq!(minify_js(src).unwrap(), "let a=1\nlet b=a\n(function(){})()\nreturn\nx");
    }

    #[test]
    fn test_drops_line_breaks_inside_expressions() {
        let src = "const total = [\n  1,\n  2\n]\n  .map(n => n * 2)\n";
        assert_eq!(minify_js(src).unwrap(), "const total=[1,2].map(n=>n*2)");
    }

    #[test]
    fn test_separates_tokens_that_would_merge() {
        assert_eq!(minify_js("a + +b; c - -d").unwrap(), "a+ +b;c- -d");
        assert_eq!(minify_js("x = a / /re/g.source").unwrap(), "x=a/ /re/g.source");
        assert_eq!(minify_js("y = 1 .toString()").unwrap(), "y=1 .toString()");
        assert_eq!(minify_js("if (/x/ instanceof RegExp) {}").unwrap(), "if(/x/ instanceof RegExp){}");
        assert_eq!(minify_js("return typeof 'a'").unwrap(), "return typeof'a'");
    }

    #[test]
    fn test_strings_and_templates_untouched() {
        let src = "const s = `  spaced ${ value }  `; const t = '  a  b  ';";
        assert_eq!(
            minify_js(src).unwrap(),
            "const s=`  spaced ${ value }  `;const t='  a  b  ';"
        );
    }

    #[test]
    fn test_minify_reports_malformed_input() {
        assert!(minify_js("let s = 'open").is_err());
    }
}
