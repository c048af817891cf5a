//! JavaScript tokenizer shared by the script minifier and obfuscator.
//!
//! Comments are discarded; whether a line terminator preceded each token is
//! kept so emitters can preserve automatic semicolon insertion.

use std::borrow::Cow;
use std::collections::HashSet;

/// Reserved words, plus the literal keywords `null`, `true` and `false`.
const KEYWORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Keywords after which a `/` starts a regular expression.
const REGEX_AFTER_KEYWORD: &[&str] = &[
    "await", "case", "delete", "do", "else", "in", "instanceof", "new", "return", "throw",
    "typeof", "void", "yield",
];

/// Punctuators, longest first so the scan is greedy.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@", "#",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Number,
    String,
    Template,
    Regex,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: Cow<'a, str>,
    /// A line terminator (or a comment containing one) preceded this token.
    pub newline_before: bool,
    /// Byte offset in the source; synthetic tokens carry the offset of the
    /// token they replace.
    pub offset: usize,
}

impl<'a> Token<'a> {
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    pub fn is_keyword(&self, k: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == k
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == name
    }

    pub fn is_opener(&self) -> bool {
        self.kind == TokenKind::Punct && matches!(self.text.as_ref(), "(" | "[" | "{")
    }

    pub fn is_closer(&self) -> bool {
        self.kind == TokenKind::Punct && matches!(self.text.as_ref(), ")" | "]" | "}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JsErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated template literal")]
    UnterminatedTemplate,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("unterminated regular expression")]
    UnterminatedRegex,
    #[error("unexpected character")]
    UnexpectedChar,
    #[error("unbalanced brackets")]
    UnbalancedBrackets,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {offset}")]
pub struct JsError {
    pub kind: JsErrorKind,
    pub offset: usize,
}

impl JsError {
    pub fn new(kind: JsErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// Tokens of a script plus every identifier referenced from inside template
/// literal substitutions (which stay opaque text).
#[derive(Debug, Clone)]
pub struct Lexed<'a> {
    pub tokens: Vec<Token<'a>>,
    pub template_identifiers: HashSet<String>,
}

/// Tokenize a script body.
pub fn tokenize(src: &str) -> Result<Lexed<'_>, JsError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(Lexed {
        tokens,
        template_identifiers: lexer.template_identifiers,
    })
}

pub(crate) fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

fn is_js_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}')
        || (!c.is_ascii() && c.is_whitespace() && !is_line_terminator(c))
}

pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$' || c == '\\' || (!c.is_ascii() && c.is_alphabetic())
}

fn is_identifier_part(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || c == '$'
        || c == '\u{200C}'
        || c == '\u{200D}'
        || (!c.is_ascii() && c.is_alphanumeric())
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    prev: Option<(TokenKind, &'a str)>,
    template_identifiers: HashSet<String>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            prev: None,
            template_identifiers: HashSet::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skip whitespace and comments; report whether a line break was crossed.
    fn skip_trivia(&mut self) -> Result<bool, JsError> {
        let mut newline = false;
        loop {
            let Some(c) = self.peek() else {
                return Ok(newline);
            };
            let at_line_start = newline || self.pos == 0;
            if is_line_terminator(c) {
                newline = true;
                self.bump();
            } else if is_js_whitespace(c) {
                self.bump();
            } else if self.rest().starts_with("//") || self.rest().starts_with("<!--") {
                self.skip_line();
            } else if at_line_start && self.rest().starts_with("-->") {
                self.skip_line();
            } else if self.rest().starts_with("/*") {
                let start = self.pos;
                let end = self.rest()[2..]
                    .find("*/")
                    .ok_or(JsError::new(JsErrorKind::UnterminatedComment, start))?;
                let body = &self.rest()[2..2 + end];
                if body.chars().any(is_line_terminator) {
                    newline = true;
                }
                self.pos += 2 + end + 2;
            } else {
                return Ok(newline);
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                break;
            }
            self.bump();
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.prev {
            None => true,
            Some((TokenKind::Punct, p)) => !matches!(p, ")" | "]" | "++" | "--"),
            Some((TokenKind::Keyword, k)) => REGEX_AFTER_KEYWORD.contains(&k),
            Some(_) => false,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, JsError> {
        let newline_before = self.skip_trivia()?;
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let start = self.pos;

        let kind = if is_identifier_start(c) {
            self.scan_identifier();
            if KEYWORDS.contains(&&self.src[start..self.pos]) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            }
        } else if c.is_ascii_digit() || (c == '.' && self.peek_nth(1).is_some_and(|d| d.is_ascii_digit())) {
            self.scan_number();
            TokenKind::Number
        } else if c == '"' || c == '\'' {
            self.scan_string(c)?;
            TokenKind::String
        } else if c == '`' {
            self.scan_template()?;
            TokenKind::Template
        } else if c == '/' && self.regex_allowed() {
            self.scan_regex()?;
            TokenKind::Regex
        } else {
            self.scan_punct()?;
            TokenKind::Punct
        };

        let text = &self.src[start..self.pos];
        self.prev = Some((kind, text));
        Ok(Some(Token {
            kind,
            text: Cow::Borrowed(text),
            newline_before,
            offset: start,
        }))
    }

    fn scan_identifier(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\\' && self.peek_nth(1) == Some('u') {
                self.pos += 2;
                if self.peek() == Some('{') {
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                    }
                } else {
                    for _ in 0..4 {
                        if self.peek().is_some_and(|h| h.is_ascii_hexdigit()) {
                            self.bump();
                        }
                    }
                }
            } else if is_identifier_part(c) {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn scan_number(&mut self) {
        let rest = self.rest().as_bytes();
        if rest.len() > 1 && rest[0] == b'0' && matches!(rest[1], b'x' | b'X' | b'o' | b'O' | b'b' | b'B') {
            self.pos += 2;
            while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
                self.bump();
            }
            return;
        }

        self.eat_digits();
        if self.peek() == Some('.') {
            self.bump();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let signed = matches!(self.peek_nth(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|d| d.is_ascii_digit()) {
                self.pos += digit_at;
                self.eat_digits();
            }
        }
        if self.peek() == Some('n') {
            self.bump();
        }
    }

    fn eat_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.bump();
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<(), JsError> {
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                None | Some('\n') | Some('\r') => {
                    return Err(JsError::new(JsErrorKind::UnterminatedString, start))
                }
                Some('\\') => {
                    let escaped = self
                        .bump()
                        .ok_or(JsError::new(JsErrorKind::UnterminatedString, start))?;
                    if escaped == '\r' && self.peek() == Some('\n') {
                        self.bump();
                    }
                }
                Some(c) if c == quote => return Ok(()),
                Some(_) => {}
            }
        }
    }

    fn scan_template(&mut self) -> Result<(), JsError> {
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                None => return Err(JsError::new(JsErrorKind::UnterminatedTemplate, start)),
                Some('\\') => {
                    self.bump()
                        .ok_or(JsError::new(JsErrorKind::UnterminatedTemplate, start))?;
                }
                Some('`') => return Ok(()),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    self.scan_substitution(start)?;
                }
                Some(_) => {}
            }
        }
    }

    /// Lex a `${ ... }` body up to its closing brace, recording identifiers.
    fn scan_substitution(&mut self, template_start: usize) -> Result<(), JsError> {
        let saved_prev = self.prev;
        self.prev = Some((TokenKind::Punct, "{"));
        let mut depth = 0usize;
        loop {
            let token = self
                .next_token()?
                .ok_or(JsError::new(JsErrorKind::UnterminatedTemplate, template_start))?;
            match token.kind {
                TokenKind::Identifier => {
                    self.template_identifiers.insert(token.text.into_owned());
                }
                TokenKind::Punct if token.text == "{" => depth += 1,
                TokenKind::Punct if token.text == "}" => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
        self.prev = saved_prev;
        Ok(())
    }

    fn scan_regex(&mut self) -> Result<(), JsError> {
        let start = self.pos;
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                None => return Err(JsError::new(JsErrorKind::UnterminatedRegex, start)),
                Some(c) if is_line_terminator(c) => {
                    return Err(JsError::new(JsErrorKind::UnterminatedRegex, start))
                }
                Some('\\') => match self.bump() {
                    Some(c) if !is_line_terminator(c) => {}
                    _ => return Err(JsError::new(JsErrorKind::UnterminatedRegex, start)),
                },
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        while self.peek().is_some_and(is_identifier_part) {
            self.bump();
        }
        Ok(())
    }

    fn scan_punct(&mut self) -> Result<(), JsError> {
        let rest = self.rest();
        for p in PUNCTUATORS {
            if rest.starts_with(p) {
                // `a?.5:b` is a conditional, not optional chaining.
                if *p == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
                    continue;
                }
                self.pos += p.len();
                return Ok(());
            }
        }
        Err(JsError::new(JsErrorKind::UnexpectedChar, self.pos))
    }
}

/// Decode a quoted string literal into its value.
///
/// Returns `None` for forms that are kept verbatim (legacy octal escapes,
/// lone surrogates).
pub fn decode_string_literal(literal: &str) -> Option<String> {
    let inner = literal.get(1..literal.len().checked_sub(1)?)?;
    let mut units: Vec<u16> = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    let push_char = |units: &mut Vec<u16>, c: char| {
        let mut buf = [0u16; 2];
        units.extend_from_slice(c.encode_utf16(&mut buf));
    };

    while let Some(c) = chars.next() {
        if c != '\\' {
            push_char(&mut units, c);
            continue;
        }
        let escaped = chars.next()?;
        match escaped {
            'n' => units.push(0x0A),
            't' => units.push(0x09),
            'r' => units.push(0x0D),
            'b' => units.push(0x08),
            'f' => units.push(0x0C),
            'v' => units.push(0x0B),
            '0' if !chars.peek().is_some_and(|d| d.is_ascii_digit()) => units.push(0),
            '1'..='9' | '0' => return None,
            'x' => {
                let hex: String = [chars.next()?, chars.next()?].iter().collect();
                units.push(u16::from_str_radix(&hex, 16).ok()?);
            }
            'u' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let mut hex = String::new();
                    loop {
                        let h = chars.next()?;
                        if h == '}' {
                            break;
                        }
                        hex.push(h);
                    }
                    let cp = char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?;
                    push_char(&mut units, cp);
                } else {
                    let hex: String = (0..4).map(|_| chars.next()).collect::<Option<_>>()?;
                    units.push(u16::from_str_radix(&hex, 16).ok()?);
                }
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' | '\u{2028}' | '\u{2029}' => {}
            other => push_char(&mut units, other),
        }
    }

    String::from_utf16(&units).ok()
}

/// Encode a value as a double-quoted literal that is also safe inside an
/// HTML `<script>` element.
pub fn encode_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' => out.push_str("\\x3c"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
