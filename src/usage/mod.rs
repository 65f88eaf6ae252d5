//! The usage grammar: parsing and pattern compilation.
//!
//! A command declares the shape of its parameters with a compact usage
//! string:
//!
//! ```text
//! <game_id> <player> <delay:number>      placeholders, one typed
//! 'all'                                  a literal token
//! [<reason...>]                          optional trailing free text
//! (<user> | 'everyone')                  alternatives
//! ```
//!
//! [`parse_usage`] turns such a string into a [`UsageTree`];
//! [`PatternCompiler`] compiles the tree into a [`CompiledPattern`] - an
//! anchored matcher that extracts named values from an input string - and
//! caches the result per usage string.
//!
//! # Module organization
//!
//! - [`ast`] - the grammar node types
//! - [`parser`] - tokenizer and recursive-descent parser
//! - [`pattern`] - pattern compilation, matching and the pattern cache

pub mod ast;
pub mod parser;
pub mod pattern;

use thiserror::Error;

pub use ast::{UsageNode, UsageTree};
pub use parser::{UsageSyntaxError, parse_usage};
pub use pattern::{CompiledPattern, PatternCompiler, Slot, SlotKind};

/// A usage string could not be turned into an executable matcher.
#[derive(Debug, Error)]
pub enum UsageError {
    /// The usage string is malformed.
    #[error(transparent)]
    Syntax(#[from] UsageSyntaxError),
    /// The compiled expression was rejected by the regex engine. This
    /// indicates a compiler bug rather than bad user input; it is kept as
    /// an error rather than a panic so registration can fail cleanly.
    #[error("failed to build a matcher for usage `{usage}`")]
    Matcher {
        usage: String,
        source: regex::Error,
    },
}
