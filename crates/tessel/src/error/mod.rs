//! # Error Types
//!
//! One error type per failure domain:
//!
//! - [`GrammarError`]: the grammar could not be compiled into a table
//! - [`LoadError`]: a compiled blob could not be loaded
//! - [`LexError`]: no token matches at some offset (absorbed into the tree)
//! - [`ParseCancelled`]: a parse was cancelled and returned a partial tree
//! - [`SyntaxError`]: an error node found in a finished tree
//!
//! Malformed input text never produces an `Err`. Syntax and lexical errors
//! become `ERROR` nodes, and [`Tree::errors`](crate::Tree::errors) lists them.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! and carry stable diagnostic codes.

use crate::syntax::{Point, TextRange};
use crate::tree::Tree;
use compact_str::CompactString;
use std::fmt;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors detected while compiling a grammar.
///
/// All of them are fatal: a grammar that fails validation never produces a
/// parse table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("grammar `{grammar}` has no start rule")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(tessel::grammar::missing_start),
            help("call `GrammarBuilder::start` or declare at least one rule")
        )
    )]
    MissingStart { grammar: CompactString },

    #[error("rule `{rule}` references undefined symbol `{name}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::undefined_symbol)))]
    UndefinedSymbol { rule: CompactString, name: CompactString },

    #[error("rule `{name}` is not reachable from the start rule")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::unreachable_rule)))]
    UnreachableRule { name: CompactString },

    #[error("token `{name}` is never used")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(tessel::grammar::unused_token),
            help("reference it from a rule or declare it as an extra")
        )
    )]
    UnusedToken { name: CompactString },

    #[error("token `{token}` has contradictory precedence: {first} and {second}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::contradictory_precedence)))]
    ContradictoryPrecedence {
        token: CompactString,
        first: CompactString,
        second: CompactString,
    },

    #[error("invalid pattern for `{token}`: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::invalid_pattern)))]
    InvalidPattern { token: CompactString, message: String },

    #[error("token `{token}` matches the empty string")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::empty_token)))]
    EmptyToken { token: CompactString },

    #[error("token `{token}` must be lexical but references rule `{rule}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::non_lexical_token)))]
    NonLexicalToken { token: CompactString, rule: CompactString },

    #[error("rule `{name}` is defined twice")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::duplicate_rule)))]
    DuplicateRule { name: CompactString },

    #[error("grammar needs {count} symbols, at most {max} are supported")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::too_many_symbols)))]
    TooManySymbols { count: usize, max: usize },

    #[error("parse table needs {count} states, at most {max} are supported")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::too_many_states)))]
    TooManyStates { count: usize, max: usize },

    #[error("failed to build lexer: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::grammar::lexer)))]
    Lexer { message: String },
}

/// Errors while loading a compiled language blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum LoadError {
    #[error("blob too small: {len} bytes, header needs {needed}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::load::too_small)))]
    TooSmall { len: usize, needed: usize },

    #[error("invalid magic: expected {expected:?}, found {found:?}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::load::invalid_magic)))]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("ABI version mismatch: runtime expects {expected}, blob has {found}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(tessel::load::version_mismatch),
            help("recompile the grammar with this version of tessel")
        )
    )]
    VersionMismatch { expected: u32, found: u32 },

    #[error("size mismatch: header says {header} bytes, blob has {actual}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::load::size_mismatch)))]
    SizeMismatch { header: usize, actual: usize },

    #[error("checksum mismatch: header has {expected:#010x}, payload hashes to {actual:#010x}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::load::checksum_mismatch)))]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("failed to decode payload: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::load::decode)))]
    Decode(String),

    #[error("failed to load lexer automaton: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::load::lexer)))]
    Lexer(String),

    #[error("failed to encode payload: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::load::encode)))]
    Encode(String),

    #[error("inconsistent parse table: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::load::invalid_table)))]
    InvalidTable(String),
}

impl From<postcard::Error> for LoadError {
    fn from(err: postcard::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// No token of the language matches at `offset`.
///
/// The parser turns this into an `ERROR` leaf covering the unmatched bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("no token matches at byte {offset}")]
#[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::lex::no_match)))]
pub struct LexError {
    pub offset: usize,
    /// Number of bytes that could not be tokenized.
    pub len: usize,
}

/// Why a parse stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The shared cancellation flag was set.
    Flag,
    /// The operation budget ran out.
    Budget,
    /// The timeout elapsed.
    Timeout,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flag => "cancellation flag set",
            Self::Budget => "operation budget exhausted",
            Self::Timeout => "timeout elapsed",
        })
    }
}

/// A parse stopped before reaching the end of the input.
///
/// `partial` is a well-formed tree over the text consumed so far, rooted at
/// an `ERROR` node. It never shares mutable state with other parses.
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("parse cancelled: {reason}")]
#[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::parse::cancelled)))]
pub struct ParseCancelled {
    pub partial: Tree,
    pub reason: CancelReason,
}

/// A syntax error recovered into the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("{message} at {start}")]
#[cfg_attr(feature = "diagnostics", diagnostic(code(tessel::parse::syntax)))]
pub struct SyntaxError {
    #[cfg_attr(feature = "diagnostics", label("here"))]
    pub range: TextRange,
    pub start: Point,
    pub end: Point,
    pub message: String,
}

impl SyntaxError {
    #[must_use]
    pub fn new(range: TextRange, start: Point, end: Point, message: impl Into<String>) -> Self {
        Self {
            range,
            start,
            end,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::TextSize;

    #[test]
    fn test_version_mismatch_message() {
        let err = LoadError::VersionMismatch {
            expected: 3,
            found: 2,
        };
        let message = err.to_string();
        assert!(message.contains("expects 3"));
        assert!(message.contains("has 2"));
    }

    #[test]
    fn test_grammar_error_messages() {
        let err = GrammarError::UndefinedSymbol {
            rule: "sum".into(),
            name: "num".into(),
        };
        assert_eq!(err.to_string(), "rule `sum` references undefined symbol `num`");

        let err = GrammarError::EmptyToken { token: "ws".into() };
        assert_eq!(err.to_string(), "token `ws` matches the empty string");
    }

    #[test]
    fn test_lex_error_carries_offset() {
        let err = LexError { offset: 7, len: 1 };
        assert_eq!(err.to_string(), "no token matches at byte 7");
    }

    #[test]
    fn test_syntax_error_display_uses_one_based_point() {
        let range = TextRange::new(TextSize::from(2), TextSize::from(3));
        let err = SyntaxError::new(range, Point::new(0, 2), Point::new(0, 3), "unexpected `+`");
        assert_eq!(err.to_string(), "unexpected `+` at 1:3");
    }

    #[test]
    fn test_cancel_reason_display() {
        assert_eq!(CancelReason::Budget.to_string(), "operation budget exhausted");
    }
}
