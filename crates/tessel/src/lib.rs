//! # Tessel
//!
//! An incremental GLR parsing engine. Grammars are compiled into LALR(1)
//! tables; conflicts that precedence does not resolve are kept and explored
//! in parallel at parse time. Trees are immutable, share unchanged subtrees
//! between versions, and always cover the whole input: syntax errors become
//! `ERROR` nodes instead of failures.
//!
//! ## Quick Start
//!
//! ```rust
//! use tessel::grammar::*;
//! use tessel::{InputEdit, Language, Parser};
//!
//! let grammar = GrammarBuilder::new("sum")
//!     .rule("sum", choice([prec_left(1, seq([sym("sum"), lit("+"), sym("num")])), sym("num")]))
//!     .token("num", pat("[0-9]+"))
//!     .extra(pat(r"\s+"))
//!     .build()
//!     .unwrap();
//! let language = Language::compile(&grammar).unwrap();
//!
//! let mut parser = Parser::new(language);
//! let text = b"1 + 2 + 3";
//! let tree = parser.parse(text, None).unwrap();
//! assert_eq!(tree.to_sexp(), "(sum (sum (sum (num)) (num)) (num))");
//!
//! // Replace `2` with `20` and reparse, reusing what the edit did not touch.
//! let (new_text, edit) = InputEdit::replace(text, 4..5, b"20");
//! let tree = parser.parse(&new_text, Some(&tree.edit(&edit))).unwrap();
//! assert_eq!(tree.root_node().end_byte(), new_text.len());
//! ```
//!
//! ## Layout
//!
//! - [`grammar`]: rule combinators, the grammar builder and lowering
//! - [`table`]: LALR(1) construction and conflict resolution
//! - [`lexer`]: the state-driven lexer
//! - [`parser`]: the GLR driver with error recovery and cancellation
//! - [`incremental`]: edits, subtree reuse and changed ranges
//! - [`language`]: the shared [`Language`] handle and its binary blob
//! - [`syntax`]: green and red trees, cursors and printers
//!
//! ## Features
//!
//! - `diagnostics`: `miette` integration for every error type
//! - `serialize`: `serde` support for spans, points and edits
//! - `parallel`: [`parse_batch`] over many texts with `rayon`

pub mod error;
pub mod grammar;
pub mod incremental;
pub mod language;
pub mod lexer;
pub mod parser;
pub mod syntax;
pub mod table;
pub mod testing;
pub mod tree;

pub use error::{CancelReason, GrammarError, LexError, LoadError, ParseCancelled, SyntaxError};
pub use incremental::{changed_ranges, InputEdit};
pub use language::Language;
pub use parser::{parse, ParseOptions, ParseStats, Parser};
pub use syntax::{Point, SyntaxNode, TextRange, TextSize, TreeCursor};
pub use tree::Tree;

#[cfg(feature = "parallel")]
pub use parser::parallel::{parse_batch, FileParseResult, ParseBatch};
