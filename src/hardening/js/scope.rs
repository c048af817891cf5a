//! Bracket structure and lexical bindings of a token stream.
//!
//! # Responsibilities
//! - Match brackets and classify every `{` as block, object or class body
//! - Decide which identifiers sit in property-key position
//! - Collect declared bindings with the token range they are visible in
//!
//! # Design Decisions
//! - Token-level analysis, no AST: enough to rename locals safely
//! - Each binding is a (name, start, end) range; a reference resolves to the
//!   smallest range that contains it
//! - `var` and function declarations hoist to the enclosing function;
//!   `let`, `const` and `class` bind to the enclosing block

use std::collections::{HashMap, HashSet};

use crate::hardening::js::lexer::{JsError, JsErrorKind, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraceKind {
    Block,
    Object,
    Class,
}

/// Bracket layout of a token stream.
#[derive(Debug)]
pub struct Structure {
    matching: Vec<Option<usize>>,
    enclosing: Vec<Option<usize>>,
    brace_kinds: Vec<Option<BraceKind>>,
}

impl Structure {
    pub fn analyze(tokens: &[Token<'_>]) -> Result<Self, JsError> {
        let n = tokens.len();
        let mut matching = vec![None; n];
        let mut enclosing = vec![None; n];
        let mut brace_kinds = vec![None; n];
        let mut stack: Vec<usize> = Vec::new();

        let mut class_pending = false;
        let mut case_pending = false;
        let mut open_ternaries = 0usize;
        let mut case_colons = HashSet::new();

        for (i, token) in tokens.iter().enumerate() {
            let after_dot = i > 0 && tokens[i - 1].is_punct(".");
            if token.is_keyword("class") && !after_dot {
                class_pending = true;
            }
            if (token.is_keyword("case") || token.is_keyword("default")) && !after_dot {
                case_pending = true;
                open_ternaries = 0;
            } else if case_pending && token.is_punct("?") {
                open_ternaries += 1;
            } else if case_pending && token.is_punct(":") {
                if open_ternaries == 0 {
                    case_colons.insert(i);
                    case_pending = false;
                } else {
                    open_ternaries -= 1;
                }
            }

            if token.is_closer() {
                let open = stack
                    .pop()
                    .ok_or(JsError::new(JsErrorKind::UnbalancedBrackets, token.offset))?;
                if !pairs(&tokens[open].text, &token.text) {
                    return Err(JsError::new(JsErrorKind::UnbalancedBrackets, token.offset));
                }
                matching[open] = Some(i);
                matching[i] = Some(open);
                enclosing[i] = stack.last().copied();
            } else {
                enclosing[i] = stack.last().copied();
                if token.is_opener() {
                    if token.is_punct("{") {
                        let kind = if std::mem::take(&mut class_pending) {
                            BraceKind::Class
                        } else {
                            classify_brace(tokens, i, &case_colons)
                        };
                        brace_kinds[i] = Some(kind);
                    }
                    stack.push(i);
                }
            }
        }

        if let Some(&open) = stack.last() {
            return Err(JsError::new(JsErrorKind::UnbalancedBrackets, tokens[open].offset));
        }

        Ok(Self {
            matching,
            enclosing,
            brace_kinds,
        })
    }

    pub fn matching(&self, i: usize) -> Option<usize> {
        self.matching.get(i).copied().flatten()
    }

    pub fn enclosing(&self, i: usize) -> Option<usize> {
        self.enclosing.get(i).copied().flatten()
    }

    pub fn brace_kind(&self, i: usize) -> Option<BraceKind> {
        self.brace_kinds.get(i).copied().flatten()
    }

    /// Kind of the brace directly enclosing token `i`, if that bracket is a brace.
    pub fn enclosing_brace_kind(&self, i: usize) -> Option<BraceKind> {
        self.enclosing(i).and_then(|open| self.brace_kind(open))
    }

    /// Whether token `i` names a property in an object literal or class body.
    pub fn is_key_position(&self, tokens: &[Token<'_>], i: usize) -> bool {
        let Some(open) = self.enclosing(i) else {
            return false;
        };
        let Some(kind) = self.brace_kind(open) else {
            return false;
        };
        if i == 0 {
            return false;
        }
        let prev = &tokens[i - 1];
        let prev_is_open = i - 1 == open;
        let prev_in_body = self.enclosing(i - 1) == Some(open);
        let after_modifier = prev_in_body && is_modifier(prev) && self.is_key_position(tokens, i - 1);

        match kind {
            BraceKind::Block => false,
            BraceKind::Object => prev_is_open || (prev_in_body && prev.is_punct(",")) || after_modifier,
            BraceKind::Class => {
                prev_is_open
                    || (prev_in_body && (prev.is_punct(";") || prev.is_punct("}")))
                    || after_modifier
                    || (prev_in_body && tokens[i].newline_before && ends_expression(prev))
            }
        }
    }
}

fn pairs(open: &str, close: &str) -> bool {
    matches!((open, close), ("(", ")") | ("[", "]") | ("{", "}"))
}

fn is_modifier(token: &Token<'_>) -> bool {
    token.is_punct("*")
        || token.is_keyword("static")
        || (token.kind == TokenKind::Identifier && matches!(token.text.as_ref(), "get" | "set" | "async"))
}

fn classify_brace(tokens: &[Token<'_>], i: usize, case_colons: &HashSet<usize>) -> BraceKind {
    let Some(prev_index) = i.checked_sub(1) else {
        return BraceKind::Block;
    };
    let prev = &tokens[prev_index];
    match prev.kind {
        TokenKind::Punct => match prev.text.as_ref() {
            ")" | "{" | "}" | ";" | "=>" => BraceKind::Block,
            ":" if case_colons.contains(&prev_index) => BraceKind::Block,
            _ => BraceKind::Object,
        },
        TokenKind::Keyword => match prev.text.as_ref() {
            "return" | "typeof" | "yield" | "await" | "void" | "delete" | "throw" | "in"
            | "instanceof" | "case" | "var" | "let" | "const" => BraceKind::Object,
            _ => BraceKind::Block,
        },
        _ => BraceKind::Block,
    }
}

/// Whether an expression can end with `token`.
pub fn ends_expression(token: &Token<'_>) -> bool {
    match token.kind {
        TokenKind::Identifier
        | TokenKind::Number
        | TokenKind::String
        | TokenKind::Template
        | TokenKind::Regex => true,
        TokenKind::Keyword => matches!(
            token.text.as_ref(),
            "this" | "null" | "true" | "false" | "super"
        ),
        TokenKind::Punct => matches!(token.text.as_ref(), ")" | "]" | "}" | "++" | "--"),
    }
}

/// Whether `token` can begin a new statement after a line break.
pub fn starts_statement(token: &Token<'_>) -> bool {
    match token.kind {
        TokenKind::Identifier => true,
        TokenKind::Keyword => !matches!(token.text.as_ref(), "in" | "instanceof"),
        _ => false,
    }
}

/// A declared name and the inclusive token range it is visible in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub start: usize,
    pub end: usize,
    /// Bound at script level (visible to other scripts on the page).
    pub global: bool,
}

impl Binding {
    fn contains(&self, i: usize) -> bool {
        self.start <= i && i <= self.end
    }

    fn span(&self) -> usize {
        self.end - self.start
    }
}

#[derive(Debug, Clone, Copy)]
struct Range {
    start: usize,
    end: usize,
    global: bool,
}

/// Every binding declared in a script.
#[derive(Debug, Default)]
pub struct Scopes {
    bindings: Vec<Binding>,
    by_name: HashMap<String, Vec<usize>>,
}

impl Scopes {
    pub fn collect(tokens: &[Token<'_>], structure: &Structure) -> Self {
        let mut collector = Collector {
            tokens,
            structure,
            functions: Vec::new(),
            scopes: Scopes::default(),
        };
        collector.collect_functions();
        collector.collect_declarations();
        collector.scopes
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Index of the innermost binding of `name` visible at token `i`.
    pub fn resolve(&self, name: &str, i: usize) -> Option<usize> {
        self.by_name
            .get(name)?
            .iter()
            .copied()
            .filter(|&b| self.bindings[b].contains(i))
            .min_by_key(|&b| self.bindings[b].span())
    }

    fn bind(&mut self, name: &str, range: Range) {
        let index = self.bindings.len();
        self.bindings.push(Binding {
            name: name.to_string(),
            start: range.start,
            end: range.end,
            global: range.global,
        });
        self.by_name.entry(name.to_string()).or_default().push(index);
    }
}

struct Collector<'t, 'a> {
    tokens: &'t [Token<'a>],
    structure: &'t Structure,
    functions: Vec<(usize, usize)>,
    scopes: Scopes,
}

impl Collector<'_, '_> {
    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn token_is(&self, i: usize, f: impl Fn(&Token<'_>) -> bool) -> bool {
        self.tokens.get(i).is_some_and(f)
    }

    fn bind_all(&mut self, indices: &[usize], range: Range) {
        for &index in indices {
            let name = self.tokens[index].text.to_string();
            self.scopes.bind(&name, range);
        }
    }

    /// Function ranges with their parameters, plus `catch` parameters.
    fn collect_functions(&mut self) {
        let tokens = self.tokens;
        for (i, token) in tokens.iter().enumerate() {
            if token.is_punct("(") {
                if i > 0 && tokens[i - 1].is_keyword("catch") {
                    self.collect_catch(i);
                } else if let Some((close, end)) = self.function_at_paren(i) {
                    self.functions.push((i, end));
                    let mut params = Vec::new();
                    self.collect_elements(i + 1, close, &mut params);
                    self.bind_all(&params, Range { start: i, end, global: false });
                }
            } else if token.kind == TokenKind::Identifier
                && self.token_is(i + 1, |t| t.is_punct("=>"))
                && !(i > 0 && tokens[i - 1].is_punct("."))
            {
                let end = self.body_end(i + 2);
                self.functions.push((i, end));
                self.bind_all(&[i], Range { start: i, end, global: false });
            }
        }
    }

    fn collect_catch(&mut self, paren: usize) {
        let Some(close) = self.structure.matching(paren) else {
            return;
        };
        if !self.token_is(close + 1, |t| t.is_punct("{")) {
            return;
        }
        let Some(end) = self.structure.matching(close + 1) else {
            return;
        };
        let mut params = Vec::new();
        self.collect_elements(paren + 1, close, &mut params);
        self.bind_all(&params, Range { start: paren, end, global: false });
    }

    /// If `(` at `p` opens a parameter list, its closing paren and the last
    /// token of the function body.
    fn function_at_paren(&self, p: usize) -> Option<(usize, usize)> {
        let close = self.structure.matching(p)?;
        let arrow = self.token_is(close + 1, |t| t.is_punct("=>"));
        let body_is_block = self.token_is(close + 1, |t| t.is_punct("{"));

        let is_function = arrow || {
            let prev = p.checked_sub(1).map(|j| &self.tokens[j]);
            let keyword_before = |j: Option<usize>| j.is_some_and(|j| self.tokens[j].is_keyword("function"));
            match prev {
                Some(t) if t.is_keyword("function") => true,
                Some(t) if t.is_punct("*") => keyword_before(p.checked_sub(2)),
                Some(t) if matches!(t.kind, TokenKind::Identifier | TokenKind::Keyword) => {
                    keyword_before(p.checked_sub(2))
                        || (p >= 3 && self.tokens[p - 2].is_punct("*") && keyword_before(Some(p - 3)))
                        || (body_is_block && self.structure.is_key_position(self.tokens, p - 1))
                }
                Some(t) if matches!(t.kind, TokenKind::String | TokenKind::Number) => {
                    body_is_block && self.structure.is_key_position(self.tokens, p - 1)
                }
                Some(t) if t.is_punct("]") => {
                    body_is_block
                        && self
                            .structure
                            .matching(p - 1)
                            .is_some_and(|open| self.structure.is_key_position(self.tokens, open))
                }
                _ => false,
            }
        };
        if !is_function {
            return None;
        }

        let body = if arrow { close + 2 } else { close + 1 };
        if self.token_is(body, |t| t.is_punct("{")) {
            Some((close, self.structure.matching(body)?))
        } else if arrow {
            Some((close, self.body_end(body)))
        } else {
            None
        }
    }

    /// Last token of an arrow body starting at `start`.
    fn body_end(&self, start: usize) -> usize {
        if self.token_is(start, |t| t.is_punct("{")) {
            if let Some(end) = self.structure.matching(start) {
                return end;
            }
        }
        let stop = self.skip_expression(start);
        stop.saturating_sub(1).max(start.min(self.len().saturating_sub(1)))
    }

    /// Index of the token that terminates the expression starting at `start`.
    fn skip_expression(&self, start: usize) -> usize {
        let n = self.len();
        let mut k = start;
        while k < n {
            let token = &self.tokens[k];
            if k > start && token.newline_before && ends_expression(&self.tokens[k - 1]) && starts_statement(token) {
                return k;
            }
            if token.is_opener() {
                k = self.structure.matching(k).map_or(n, |m| m + 1);
                continue;
            }
            if token.is_closer() || token.is_punct(",") || token.is_punct(";") {
                return k;
            }
            k += 1;
        }
        n
    }

    fn collect_declarations(&mut self) {
        let tokens = self.tokens;
        for (i, token) in tokens.iter().enumerate() {
            if i > 0 && tokens[i - 1].is_punct(".") {
                continue;
            }
            if token.is_keyword("var") || token.is_keyword("let") || token.is_keyword("const") {
                let mut names = Vec::new();
                self.collect_declarators(i + 1, &mut names);
                let range = if token.is_keyword("var") {
                    self.function_range(i)
                } else if i >= 2 && tokens[i - 1].is_punct("(") && tokens[i - 2].is_keyword("for") {
                    self.for_range(i - 1)
                } else {
                    self.block_range(i)
                };
                self.bind_all(&names, range);
            } else if token.is_keyword("function") && self.at_statement_start(i) {
                let name_at = if self.token_is(i + 1, |t| t.is_punct("*")) { i + 2 } else { i + 1 };
                if self.token_is(name_at, |t| t.kind == TokenKind::Identifier) {
                    let range = self.function_range(i);
                    self.bind_all(&[name_at], range);
                }
            } else if token.is_keyword("class")
                && self.at_statement_start(i)
                && self.token_is(i + 1, |t| t.kind == TokenKind::Identifier)
            {
                let range = self.block_range(i);
                self.bind_all(&[i + 1], range);
            }
        }
    }

    fn at_statement_start(&self, i: usize) -> bool {
        let Some(prev) = i.checked_sub(1).map(|j| &self.tokens[j]) else {
            return true;
        };
        if prev.is_identifier("async") {
            return self.at_statement_start(i - 1);
        }
        prev.is_punct(";")
            || prev.is_punct("{")
            || prev.is_punct("}")
            || prev.is_keyword("else")
            || (self.tokens[i].newline_before && ends_expression(prev))
    }

    fn collect_declarators(&self, mut j: usize, out: &mut Vec<usize>) {
        loop {
            let Some(token) = self.tokens.get(j) else {
                return;
            };
            if token.kind == TokenKind::Identifier {
                out.push(j);
                j += 1;
            } else if token.is_punct("{") || token.is_punct("[") {
                self.collect_pattern(j, out);
                j = self.structure.matching(j).map_or(self.len(), |m| m + 1);
            } else {
                return;
            }
            if self.token_is(j, |t| t.is_punct("=")) {
                j = self.skip_expression(j + 1);
            }
            if self.token_is(j, |t| t.is_punct(",")) {
                j += 1;
            } else {
                return;
            }
        }
    }

    fn collect_pattern(&self, open: usize, out: &mut Vec<usize>) {
        let Some(close) = self.structure.matching(open) else {
            return;
        };
        if self.tokens[open].is_punct("[") {
            self.collect_elements(open + 1, close, out);
        } else {
            self.collect_properties(open + 1, close, out);
        }
    }

    /// Binding targets in a comma separated list (parameters, array patterns).
    fn collect_elements(&self, start: usize, end: usize, out: &mut Vec<usize>) {
        let mut j = start;
        while j < end {
            let token = &self.tokens[j];
            if token.is_punct(",") || token.is_punct("...") {
                j += 1;
                continue;
            }
            j = self.collect_target(j, end, out);
            j = self.skip_to_comma(j, end);
        }
    }

    fn collect_properties(&self, start: usize, end: usize, out: &mut Vec<usize>) {
        let mut j = start;
        while j < end {
            let token = &self.tokens[j];
            if token.is_punct(",") {
                j += 1;
                continue;
            }
            if token.is_punct("...") {
                j = self.collect_target(j + 1, end, out);
            } else {
                let key_end = if token.is_punct("[") {
                    self.structure.matching(j).map_or(end, |m| m + 1)
                } else {
                    j + 1
                };
                if key_end < end && self.tokens[key_end].is_punct(":") {
                    j = self.collect_target(key_end + 1, end, out);
                } else {
                    if token.kind == TokenKind::Identifier {
                        out.push(j);
                    }
                    j = key_end;
                }
            }
            j = self.skip_to_comma(j, end);
        }
    }

    fn collect_target(&self, j: usize, end: usize, out: &mut Vec<usize>) -> usize {
        let Some(token) = self.tokens.get(j).filter(|_| j < end) else {
            return end;
        };
        if token.kind == TokenKind::Identifier {
            out.push(j);
            j + 1
        } else if token.is_punct("{") || token.is_punct("[") {
            self.collect_pattern(j, out);
            self.structure.matching(j).map_or(end, |m| m + 1)
        } else {
            j + 1
        }
    }

    fn skip_to_comma(&self, mut j: usize, end: usize) -> usize {
        while j < end {
            let token = &self.tokens[j];
            if token.is_punct(",") {
                return j;
            }
            if token.is_opener() {
                j = self.structure.matching(j).map_or(end, |m| m + 1);
            } else {
                j += 1;
            }
        }
        end
    }

    fn global_range(&self) -> Range {
        Range {
            start: 0,
            end: self.len().saturating_sub(1),
            global: true,
        }
    }

    fn function_range(&self, i: usize) -> Range {
        self.functions
            .iter()
            .filter(|(start, end)| *start <= i && i <= *end)
            .min_by_key(|(start, end)| end - start)
            .map_or_else(
                || self.global_range(),
                |&(start, end)| Range { start, end, global: false },
            )
    }

    fn block_range(&self, i: usize) -> Range {
        let mut cursor = self.structure.enclosing(i);
        while let Some(open) = cursor {
            if self.structure.brace_kind(open) == Some(BraceKind::Block) {
                if let Some(end) = self.structure.matching(open) {
                    return Range { start: open, end, global: false };
                }
            }
            cursor = self.structure.enclosing(open);
        }
        self.global_range()
    }

    /// `for (let ...)` bindings cover the loop head and body.
    fn for_range(&self, paren: usize) -> Range {
        let n = self.len();
        let Some(close) = self.structure.matching(paren) else {
            return self.block_range(paren);
        };
        let end = if self.token_is(close + 1, |t| t.is_punct("{")) {
            self.structure.matching(close + 1).unwrap_or(n - 1)
        } else {
            let mut k = close + 1;
            while k < n && !self.tokens[k].is_punct(";") {
                k = if self.tokens[k].is_opener() {
                    self.structure.matching(k).map_or(n, |m| m + 1)
                } else {
                    k + 1
                };
            }
            k.min(n - 1)
        };
        Range { start: paren, end, global: false }
    }
}
