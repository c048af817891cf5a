//! Inline script obfuscation.
//!
//! # Responsibilities
//! - Rename function-local bindings to `_0x` hexadecimal names
//! - Move string literals into an (optionally base64 encoded) lookup array
//! - Split long strings and rewrite integers as arithmetic
//! - Prepend a prelude that silences `console`
//!
//! # Design Decisions
//! - Script-level bindings keep their names: other scripts and inline
//!   event handlers on the page may refer to them
//! - Scripts using `eval` or `with` are never renamed
//! - A leading directive prologue (`'use strict'`) stays ahead of the
//!   prelude so the script keeps its mode
//! - Names referenced inside template substitutions are never renamed
//! - Randomness comes from a seedable RNG so output is reproducible in tests

use std::collections::{HashMap, HashSet};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ObfuscationProfile, StringArrayEncoding};
use crate::hardening::js::lexer::{
    decode_string_literal, encode_string_literal, tokenize, JsError, Token, TokenKind,
};
use crate::hardening::js::minify::emit;
use crate::hardening::js::scope::{starts_statement, BraceKind, Scopes, Structure};

/// Names that are never given a new name even when declared locally.
const RESERVED: &[&str] = &[
    "arguments", "eval", "undefined", "NaN", "Infinity", "async", "of", "get", "set",
];

/// Directive prologues that must stay plain string literals.
const DIRECTIVES: &[&str] = &["use strict", "use asm"];

/// Applies an [`ObfuscationProfile`] to script bodies.
pub struct Obfuscator {
    profile: ObfuscationProfile,
    rng: StdRng,
}

impl Obfuscator {
    pub fn new(profile: ObfuscationProfile) -> Self {
        Self {
            profile,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic obfuscator; the same seed yields the same output.
    pub fn with_seed(profile: ObfuscationProfile, seed: u64) -> Self {
        Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn profile(&self) -> &ObfuscationProfile {
        &self.profile
    }

    /// Obfuscate one script body.
    pub fn obfuscate(&mut self, src: &str) -> Result<String, JsError> {
        let lexed = tokenize(src)?;
        let tokens = lexed.tokens;
        if tokens.is_empty() {
            return Ok(String::new());
        }
        let structure = Structure::analyze(&tokens)?;
        let prologue_end = directive_prologue_len(&tokens);

        let mut names = NameGenerator::new(&tokens, &lexed.template_identifiers);
        let mut replacements: HashMap<usize, String> = HashMap::new();

        if self.profile.rename_identifiers {
            if uses_dynamic_scope(&tokens) {
                tracing::debug!("Script uses eval or with, identifiers kept");
            } else {
                let renamed = self.rename_bindings(&tokens, &structure, &lexed.template_identifiers, &mut names);
                replacements.extend(renamed);
            }
        }

        let mut array = self
            .profile
            .string_array
            .then(|| StringArray::new(names.fresh(&mut self.rng), names.fresh(&mut self.rng)));

        for (i, token) in tokens.iter().enumerate() {
            if i < prologue_end || replacements.contains_key(&i) || structure.is_key_position(&tokens, i) {
                continue;
            }
            let replacement = match token.kind {
                TokenKind::Number if self.profile.numbers_to_expressions => self.number_expression(&token.text),
                TokenKind::String if !is_module_specifier(&tokens, i) => {
                    self.transform_string(&token.text, array.as_mut())
                }
                _ => None,
            };
            if let Some(text) = replacement {
                replacements.insert(i, text);
            }
        }

        let output: Vec<Token<'_>> = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| match replacements.remove(&i) {
                Some(text) => Token {
                    text: text.into(),
                    ..token.clone()
                },
                None => token.clone(),
            })
            .collect();

        let mut parts = Vec::new();
        let directives: String = tokens[..prologue_end]
            .iter()
            .filter(|t| t.kind == TokenKind::String)
            .map(|t| format!("{};", t.text))
            .collect();
        if !directives.is_empty() {
            parts.push(directives);
        }
        if self.profile.disable_console_output {
            parts.push(console_prelude(&mut names, &mut self.rng));
        }
        if let Some(array) = array.filter(|a| !a.is_empty()) {
            parts.push(array.declaration(self.profile.string_array_encoding));
        }
        let body = emit(&output[prologue_end..]);
        if !body.is_empty() {
            parts.push(body);
        }
        Ok(parts.join("\n"))
    }

    fn rename_bindings(
        &mut self,
        tokens: &[Token<'_>],
        structure: &Structure,
        template_identifiers: &HashSet<String>,
        names: &mut NameGenerator,
    ) -> HashMap<usize, String> {
        let scopes = Scopes::collect(tokens, structure);
        let new_names: Vec<Option<String>> = scopes
            .bindings()
            .iter()
            .map(|binding| {
                let keep = binding.global
                    || template_identifiers.contains(&binding.name)
                    || RESERVED.contains(&binding.name.as_str());
                (!keep).then(|| names.fresh(&mut self.rng))
            })
            .collect();

        let mut replacements = HashMap::new();
        for (i, token) in tokens.iter().enumerate() {
            if token.kind != TokenKind::Identifier || is_property_access(tokens, i) || is_label(tokens, structure, i) {
                continue;
            }
            let Some(new_name) = scopes
                .resolve(&token.text, i)
                .and_then(|b| new_names[b].as_ref())
            else {
                continue;
            };

            if structure.is_key_position(tokens, i) {
                let shorthand = structure.enclosing_brace_kind(i) == Some(BraceKind::Object)
                    && tokens
                        .get(i + 1)
                        .is_some_and(|t| t.is_punct(",") || t.is_punct("}") || t.is_punct("="));
                if shorthand {
                    replacements.insert(i, format!("{}:{}", token.text, new_name));
                }
                continue;
            }
            replacements.insert(i, new_name.clone());
        }
        tracing::trace!(bindings = new_names.iter().flatten().count(), "Identifiers renamed");
        replacements
    }

    /// `42` becomes `(-0xa+0x2a+0xa)`.
    fn number_expression(&mut self, text: &str) -> Option<String> {
        if text.len() > 15 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Leading zeros mark legacy octal literals.
        if text.len() > 1 && text.starts_with('0') {
            return None;
        }
        let value: u64 = text.parse().ok()?;
        let a: u64 = self.rng.gen_range(1..=0xfff);
        let c: u64 = self.rng.gen_range(1..=a);
        let b = value + a - c;
        Some(format!("(-0x{a:x}+0x{b:x}+0x{c:x})"))
    }

    fn transform_string(&mut self, literal: &str, mut array: Option<&mut StringArray>) -> Option<String> {
        let value = decode_string_literal(literal)?;
        if value.is_empty() || DIRECTIVES.contains(&value.as_str()) {
            return None;
        }

        let chunk_length = self.profile.split_strings_chunk_length.max(1);
        let chunks: Vec<String> = if self.profile.split_strings && value.chars().count() > chunk_length {
            let chars: Vec<char> = value.chars().collect();
            chars.chunks(chunk_length).map(|c| c.iter().collect()).collect()
        } else {
            vec![value]
        };

        let mut changed = chunks.len() > 1;
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match array.as_deref_mut() {
                Some(array) if self.rng.gen_bool(self.profile.string_array_threshold) => {
                    changed = true;
                    parts.push(array.reference(chunk));
                }
                _ => parts.push(encode_string_literal(&chunk)),
            }
        }

        if !changed {
            return None;
        }
        if parts.len() == 1 {
            return parts.pop();
        }
        Some(format!("({})", parts.join("+")))
    }
}

fn uses_dynamic_scope(tokens: &[Token<'_>]) -> bool {
    tokens.iter().enumerate().any(|(i, t)| {
        t.is_keyword("with") || (t.is_identifier("eval") && !is_property_access(tokens, i))
    })
}

/// Number of leading tokens that make up the script's directive prologue:
/// string literal statements ended by `;` or by a line break.
fn directive_prologue_len(tokens: &[Token<'_>]) -> usize {
    let mut i = 0;
    while tokens.get(i).is_some_and(|t| t.kind == TokenKind::String) {
        match tokens.get(i + 1) {
            None => return i + 1,
            Some(next) if next.is_punct(";") => i += 2,
            Some(next) if next.newline_before && (next.kind == TokenKind::String || starts_statement(next)) => {
                i += 1
            }
            _ => break,
        }
    }
    i
}

fn is_property_access(tokens: &[Token<'_>], i: usize) -> bool {
    i > 0 && (tokens[i - 1].is_punct(".") || tokens[i - 1].is_punct("?."))
}

/// Label definitions and `break`/`continue` targets.
fn is_label(tokens: &[Token<'_>], structure: &Structure, i: usize) -> bool {
    if i > 0 && (tokens[i - 1].is_keyword("break") || tokens[i - 1].is_keyword("continue")) {
        return true;
    }
    let followed_by_colon = tokens.get(i + 1).is_some_and(|t| t.is_punct(":"));
    let statement_start = i == 0
        || tokens[i - 1].is_punct(";")
        || tokens[i - 1].is_punct("{")
        || tokens[i - 1].is_punct("}");
    followed_by_colon
        && statement_start
        && !matches!(
            structure.enclosing_brace_kind(i),
            Some(BraceKind::Object) | Some(BraceKind::Class)
        )
}

fn is_module_specifier(tokens: &[Token<'_>], i: usize) -> bool {
    i > 0 && (tokens[i - 1].is_keyword("import") || tokens[i - 1].is_identifier("from"))
}

/// Produces fresh `_0x` names that collide with nothing in the script.
struct NameGenerator {
    taken: HashSet<String>,
}

impl NameGenerator {
    fn new(tokens: &[Token<'_>], template_identifiers: &HashSet<String>) -> Self {
        let taken = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.text.to_string())
            .chain(template_identifiers.iter().cloned())
            .collect();
        Self { taken }
    }

    fn fresh(&mut self, rng: &mut StdRng) -> String {
        loop {
            let name = format!("_0x{:06x}", rng.gen_range(0..0x100_0000u32));
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// Deduplicated string table plus its accessor function.
struct StringArray {
    array_name: String,
    accessor_name: String,
    entries: Vec<String>,
    positions: HashMap<String, usize>,
}

impl StringArray {
    fn new(array_name: String, accessor_name: String) -> Self {
        Self {
            array_name,
            accessor_name,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reference(&mut self, value: String) -> String {
        let index = match self.positions.get(&value) {
            Some(&index) => index,
            None => {
                let index = self.entries.len();
                self.positions.insert(value.clone(), index);
                self.entries.push(value);
                index
            }
        };
        format!("{}(0x{:x})", self.accessor_name, index)
    }

    fn declaration(&self, encoding: StringArrayEncoding) -> String {
        let arr = &self.array_name;
        let get = &self.accessor_name;
        let entries: Vec<String> = self
            .entries
            .iter()
            .map(|entry| match encoding {
                StringArrayEncoding::Base64 => encode_string_literal(&STANDARD.encode(entry.as_bytes())),
                StringArrayEncoding::None => encode_string_literal(entry),
            })
            .collect();
        let accessor = match encoding {
            StringArrayEncoding::Base64 => format!(
                "function {get}(i){{return decodeURIComponent(Array.prototype.map.call(atob({arr}[i]),\
                 function(c){{return'%'+('00'+c.charCodeAt(0).toString(16)).slice(-2);}}).join(''));}}"
            ),
            StringArrayEncoding::None => format!("function {get}(i){{return {arr}[i];}}"),
        };
        format!("var {arr}=[{}];{accessor}", entries.join(","))
    }
}

fn console_prelude(names: &mut NameGenerator, rng: &mut StdRng) -> String {
    let g = names.fresh(rng);
    let c = names.fresh(rng);
    let m = names.fresh(rng);
    let i = names.fresh(rng);
    format!(
        "(function(){{var {g}=typeof window!=='undefined'?window:typeof globalThis!=='undefined'?globalThis:this;\
         var {c}={g}.console={g}.console||{{}};\
         var {m}=['log','warn','info','error','exception','table','trace','debug'];\
         for(var {i}=0;{i}<{m}.length;{i}++){{{c}[{m}[{i}]]=function(){{}};}}}})();"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(configure: impl FnOnce(&mut ObfuscationProfile)) -> ObfuscationProfile {
        let mut profile = ObfuscationProfile {
            rename_identifiers: false,
            string_array: false,
            string_array_threshold: 0.0,
            string_array_encoding: StringArrayEncoding::Base64,
            split_strings: false,
            split_strings_chunk_length: 10,
            numbers_to_expressions: false,
            disable_console_output: false,
        };
        configure(&mut profile);
        profile
    }

    fn run(profile: ObfuscationProfile, src: &str) -> String {
        Obfuscator::with_seed(profile, 7).obfuscate(src).unwrap()
    }

    fn renaming() -> ObfuscationProfile {
        profile(|p| p.rename_identifiers = true)
    }

    #[test]
    fn test_renames_function_locals_only() {
        let out = run(
            renaming(),
            "function greet(name) { var message = 'Hi ' + name; return message; }",
        );
        assert!(out.starts_with("function greet(_0x"), "{out}");
        assert!(!out.contains("message"), "{out}");
        assert!(!out.contains("name"), "{out}");
        assert!(tokenize(&out).is_ok());
    }

    #[test]
    fn test_script_level_bindings_keep_their_names() {
        let out = run(renaming(), "var counter = 0; function inc() { counter++; }");
        assert_eq!(out, "var counter=0;function inc(){counter++;}");
    }

    #[test]
    fn test_block_scoped_bindings_are_renamed() {
        let out = run(renaming(), "for (let i = 0; i < 3; i++) { sum += i; } { let tmp = 1; use(tmp); }");
        assert!(out.starts_with("for(let _0x"), "{out}");
        assert!(out.contains("sum+=_0x"), "{out}");
        assert!(!out.contains("tmp"), "{out}");
        assert!(out.contains("use(_0x"), "{out}");
    }

    #[test]
    fn test_names_used_in_template_substitutions_are_kept() {
        let out = run(
            renaming(),
            "function show(user) { const label = 'x'; return `${label}: ${user}`; }",
        );
        assert!(out.contains("show(user)"), "{out}");
        assert!(out.contains("const label="), "{out}");
        assert!(out.contains("`${label}: ${user}`"), "{out}");
    }

    #[test]
    fn test_properties_and_keys_are_not_renamed() {
        let out = run(
            renaming(),
            "function f(value) { var o = {value: value, other: 1}; return o.value + o.other; }",
        );
        assert!(out.contains("{value:_0x"), "{out}");
        assert!(out.contains(".value+"), "{out}");
        assert!(out.contains(".other;"), "{out}");
    }

    #[test]
    fn test_shorthand_properties_are_expanded() {
        let out = run(renaming(), "function f(a) { return {a}; }");
        assert!(out.contains("return{a:_0x"), "{out}");
    }

    #[test]
    fn test_eval_disables_renaming() {
        let src = "function f(a) { return eval('a'); }";
        assert_eq!(run(renaming(), src), "function f(a){return eval('a');}");
    }

    #[test]
    fn test_labels_are_untouched() {
        let out = run(renaming(), "function f() { outer: for (var k in o) { break outer; } }");
        assert!(out.contains("outer:for"), "{out}");
        assert!(out.contains("break outer"), "{out}");
    }

    #[test]
    fn test_strings_move_into_base64_array() {
        let out = run(
            profile(|p| {
                p.string_array = true;
                p.string_array_threshold = 1.0;
            }),
            "document.title = 'Hello'; say('Hello');",
        );
        assert!(out.contains("\"SGVsbG8=\""), "{out}");
        assert!(out.contains("atob("), "{out}");
        assert!(!out.contains("'Hello'"), "{out}");
        // One entry shared by both references.
        assert_eq!(out.matches("SGVsbG8=").count(), 1);
        assert!(out.contains("(0x0)"), "{out}");
    }

    #[test]
    fn test_plain_string_array() {
        let out = run(
            profile(|p| {
                p.string_array = true;
                p.string_array_threshold = 1.0;
                p.string_array_encoding = StringArrayEncoding::None;
            }),
            "x = '</script>';",
        );
        assert!(out.contains("[\"\\x3c/script>\"]"), "{out}");
        assert!(!out.contains("</script"), "{out}");
    }

    #[test]
    fn test_split_strings() {
        let out = run(profile(|p| p.split_strings = true), "x = 'abcdefghijklmnop'; y = 'short';");
        assert_eq!(out, "x=(\"abcdefghij\"+\"klmnop\");y='short';");
    }

    #[test]
    fn test_directives_and_keys_stay_plain() {
        let out = run(
            profile(|p| {
                p.string_array = true;
                p.string_array_threshold = 1.0;
            }),
            "'use strict'; o = {'key': 1};",
        );
        assert!(out.contains("'use strict';"), "{out}");
        assert!(out.contains("{'key':1}"), "{out}");
    }

    #[test]
    fn test_strict_mode_directive_stays_first() {
        let src = "'use strict'; var r; try { undeclaredVar = 1; r = 'sloppy'; } \
                   catch (e) { r = 'strict'; } result = r;";
        let out = run(ObfuscationProfile::default(), src);
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("'use strict';"), "{out}");
        assert!(lines.next().is_some_and(|l| l.starts_with("(function(){")), "{out}");
        assert_eq!(out.matches("use strict").count(), 1, "{out}");
        assert!(tokenize(&out).is_ok());
    }

    #[test]
    fn test_directive_ended_by_line_break() {
        let out = run(
            profile(|p| p.disable_console_output = true),
            "\"use strict\"\n'use asm'\nvar a = 1;",
        );
        assert!(out.starts_with("\"use strict\";'use asm';\n(function(){"), "{out}");
        assert!(out.ends_with("\nvar a=1;"), "{out}");
    }

    #[test]
    fn test_string_expression_is_not_a_directive() {
        let out = run(profile(|p| p.disable_console_output = true), "'abc'.length; x = 1;");
        assert!(out.starts_with("(function(){"), "{out}");
        assert!(out.ends_with("\n'abc'.length;x=1;"), "{out}");
    }

    #[test]
    fn test_numbers_become_equivalent_expressions() {
        let out = run(profile(|p| p.numbers_to_expressions = true), "x = 42; y = 0x10; z = 1.5;");
        assert!(!out.contains("=42"), "{out}");
        assert!(out.contains("y=0x10;z=1.5;"), "{out}");

        let expr = out
            .strip_prefix("x=(")
            .and_then(|rest| rest.split(')').next())
            .unwrap();
        let terms: Vec<i64> = expr
            .split('+')
            .map(|term| {
                let (sign, hex) = match term.strip_prefix('-') {
                    Some(hex) => (-1, hex),
                    None => (1, term),
                };
                sign * i64::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap()
            })
            .collect();
        assert_eq!(terms.iter().sum::<i64>(), 42);
    }

    #[test]
    fn test_console_prelude() {
        let out = run(profile(|p| p.disable_console_output = true), "console.log(1);");
        let (prelude, body) = out.split_once('\n').unwrap();
        assert!(prelude.starts_with("(function(){"), "{prelude}");
        assert!(prelude.contains("'log','warn','info','error'"));
        assert!(prelude.ends_with("})();"));
        assert_eq!(body, "console.log(1);");
        assert!(tokenize(&out).is_ok());
    }

    #[test]
    fn test_same_seed_same_output() {
        let src = "function f(a, b) { return a + b + 'some long string value' + 12; }";
        let full = ObfuscationProfile::default();
        let first = Obfuscator::with_seed(full.clone(), 99).obfuscate(src).unwrap();
        let second = Obfuscator::with_seed(full, 99).obfuscate(src).unwrap();
        assert_eq!(first, second);
        assert!(tokenize(&first).is_ok());
    }

    #[test]
    fn test_empty_and_malformed_scripts() {
        let mut obfuscator = Obfuscator::with_seed(ObfuscationProfile::default(), 1);
        assert_eq!(obfuscator.obfuscate("  \n // nothing\n").unwrap(), "");
        assert!(obfuscator.obfuscate("var s = 'unterminated").is_err());
        assert!(obfuscator.obfuscate("function f( {").is_err());
    }
}
