//! Response hardening subsystem.
//!
//! # Data Flow
//! ```text
//! HTML body (complete, buffered)
//!     → scripts.rs (locate inline classic scripts)
//!     → js/ (obfuscate each body with the fixed profile)
//!     → scripts.rs (splice obfuscated bodies back in)
//!     → minify.rs (drop comments, collapse whitespace, minify JS/CSS)
//!     → hardened HTML
//! ```
//!
//! # Design Decisions
//! - Scripts are found structurally by the tokenizer, never by pattern
//!   matching on the raw text
//! - Any failure aborts the whole document; the caller must never fall
//!   back to the un-hardened page
//! - Pure and CPU bound: the HTTP hook runs it on the blocking pool

pub mod css;
pub mod html;
pub mod js;
pub mod minify;
pub mod scripts;

use crate::config::ObfuscationProfile;

pub use css::{minify_css, CssError};
pub use html::HtmlError;
pub use js::{minify_js, JsError, Obfuscator};
pub use minify::minify_html;
pub use scripts::{extract_scripts, reassemble, InlineScript, ScriptKind};

/// Why a document could not be hardened.
#[derive(Debug, thiserror::Error)]
pub enum HardeningError {
    #[error("malformed markup: {0}")]
    Html(#[from] HtmlError),

    #[error("inline script {index} could not be obfuscated: {source}")]
    Obfuscate {
        index: usize,
        #[source]
        source: JsError,
    },

    #[error("inline script could not be minified: {0}")]
    MinifyScript(#[source] JsError),

    #[error("inline style could not be minified: {0}")]
    Css(#[from] CssError),

    #[error("failed to buffer response body: {0}")]
    Body(String),

    #[error("response body is not valid UTF-8")]
    NotUtf8,

    #[error("hardening worker failed: {0}")]
    Worker(String),
}

impl HardeningError {
    /// Short label for logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            HardeningError::Html(_) => "markup",
            HardeningError::Obfuscate { .. } => "obfuscate",
            HardeningError::MinifyScript(_) | HardeningError::Css(_) => "minify",
            HardeningError::Body(_) | HardeningError::NotUtf8 => "body",
            HardeningError::Worker(_) => "worker",
        }
    }
}

/// A hardened document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hardened {
    pub html: String,
    /// Number of inline scripts that were obfuscated.
    pub scripts: usize,
}

/// Harden a complete HTML document with a freshly seeded obfuscator.
pub fn harden(html: &str, profile: &ObfuscationProfile) -> Result<Hardened, HardeningError> {
    harden_with(html, &mut Obfuscator::new(profile.clone()))
}

/// Harden a complete HTML document with the given obfuscator.
pub fn harden_with(html: &str, obfuscator: &mut Obfuscator) -> Result<Hardened, HardeningError> {
    let scripts = extract_scripts(html)?;
    let bodies = scripts
        .iter()
        .enumerate()
        .map(|(index, script)| {
            obfuscator
                .obfuscate(script.body)
                .map_err(|source| HardeningError::Obfuscate { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let reassembled = reassemble(html, &scripts, &bodies);
    let html = minify_html(&reassembled)?;
    tracing::debug!(scripts = scripts.len(), bytes = html.len(), "Document hardened");
    Ok(Hardened {
        html,
        scripts: scripts.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardening::html::{tokenize, HtmlToken};

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Nixaut</title>
    <!-- layout -->
    <script src="/public/js/navigation.js"></script>
  </head>
  <body>
    <div id="loading-bar"></div>
    <div id="content">
      <h1>Welcome</h1>
      <p>Hello   <em>there</em></p>
    </div>
    <script>
      // greet the visitor
      function greet(name) {
        var message = 'Hello, ' + name + '!';
        console.log(message);
        return message.length * 2;
      }
      greet('visitor');
    </script>
  </body>
</html>
"#;

    fn seeded() -> Obfuscator {
        Obfuscator::with_seed(ObfuscationProfile::default(), 42)
    }

    /// Markup with every inline script body removed.
    fn without_script_bodies(html: &str) -> String {
        let scripts = extract_scripts(html).unwrap();
        let empty = vec![String::new(); scripts.len()];
        reassemble(html, &scripts, &empty)
    }

    #[test]
    fn test_hardened_page_has_no_comments_or_blank_text_between_tags() {
        let hardened = harden_with(PAGE, &mut seeded()).unwrap();
        assert_eq!(hardened.scripts, 1);

        let tokens = tokenize(&hardened.html).unwrap();
        assert!(!tokens.iter().any(|t| matches!(t, HtmlToken::Comment(_))));
        assert!(!tokens
            .iter()
            .any(|t| matches!(t, HtmlToken::Text(text) if text.trim().is_empty())));
    }

    #[test]
    fn test_strict_scripts_keep_their_directive_first() {
        let page = "<p>x</p>\n<script>\n  'use strict';\n  var total = 1;\n</script>";
        let hardened = harden_with(page, &mut seeded()).unwrap();
        let scripts = extract_scripts(&hardened.html).unwrap();
        assert!(scripts[0].body.starts_with("'use strict';"), "{}", hardened.html);
    }

    #[test]
    fn test_inline_script_is_transformed() {
        let hardened = harden_with(PAGE, &mut seeded()).unwrap();
        let scripts = extract_scripts(&hardened.html).unwrap();
        assert_eq!(scripts.len(), 1);

        let body = scripts[0].body;
        assert!(body.contains("function greet("));
        assert!(!body.contains("message"));
        assert!(!body.contains("greet the visitor"));
        assert!(body.contains("'log','warn'"));
    }

    #[test]
    fn test_markup_outside_scripts_only_changes_whitespace() {
        let hardened = harden_with(PAGE, &mut seeded()).unwrap();
        let expected = minify_html(&without_script_bodies(PAGE)).unwrap();
        assert_eq!(without_script_bodies(&hardened.html), expected);
        assert!(hardened.html.contains(r#"<script src="/public/js/navigation.js"></script>"#));
        assert!(hardened.html.contains("<p>Hello <em>there</em></p>"));
    }

    #[test]
    fn test_page_without_scripts_is_only_minified() {
        let page = "<html>\n<body>\n  <p>plain</p>\n</body>\n</html>";
        let hardened = harden(page, &ObfuscationProfile::default()).unwrap();
        assert_eq!(hardened.html, "<html><body><p>plain</p></body></html>");
        assert_eq!(hardened.scripts, 0);
    }

    #[test]
    fn test_malformed_input_fails_instead_of_passing_through() {
        let unterminated_script = "<html><body><script>var a = 'x</script></body></html>";
        let err = harden(unterminated_script, &ObfuscationProfile::default()).unwrap_err();
        assert!(matches!(err, HardeningError::Obfuscate { index: 0, .. }));
        assert_eq!(err.stage(), "obfuscate");

        let unclosed = "<html><body><script>var a = 1;</body></html>";
        let err = harden(unclosed, &ObfuscationProfile::default()).unwrap_err();
        assert!(matches!(err, HardeningError::Html(_)));
    }
}
