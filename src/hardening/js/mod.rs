//! Inline script processing.
//!
//! # Data Flow
//! ```text
//! script body
//!     → lexer.rs (tokens, newline flags, template identifiers)
//!     → scope.rs (bracket structure, bindings)
//!     → obfuscate.rs (rename, string array, numbers, console prelude)
//!     → minify.rs (compact emission)
//! ```

pub mod lexer;
pub mod minify;
pub mod obfuscate;
pub mod scope;

pub use lexer::{JsError, JsErrorKind};
pub use minify::minify_js;
pub use obfuscate::Obfuscator;
