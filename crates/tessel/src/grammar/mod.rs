//! # Grammar Definition
//!
//! Grammars are declared in Rust with rule combinators modelled on
//! tree-sitter's `grammar.js` DSL:
//!
//! - [`sym`] references a named rule or token
//! - [`lit`] and [`pat`] declare anonymous tokens inline
//! - [`seq`], [`choice`], [`optional`], [`repeat`] and [`repeat1`] combine rules
//! - [`field`] labels children, [`prec`], [`prec_left`] and [`prec_right`]
//!   resolve conflicts, [`token`] collapses a lexical rule into one token
//!
//! Rules whose names start with `_` are hidden: their children are spliced
//! into the parent node. [`GrammarBuilder::build`] validates the grammar;
//! [`Language::compile`](crate::Language::compile) lowers it and builds the
//! parse table and lexer.
//!
//! ## Example
//!
//! ```rust
//! use tessel::grammar::*;
//!
//! let grammar = GrammarBuilder::new("list")
//!     .rule("list", seq([lit("["), optional(sym("_items")), lit("]")]))
//!     .rule("_items", seq([sym("item"), repeat(seq([lit(","), sym("item")]))]))
//!     .token("item", pat("[a-z]+"))
//!     .extra(pat(r"\s+"))
//!     .build()
//!     .unwrap();
//! assert_eq!(grammar.rules().count(), 2);
//! ```

pub mod builder;
pub mod lower;
pub mod rule;
pub(crate) mod validate;

pub use builder::{Grammar, GrammarBuilder};
pub use lower::{lower, LexicalRule, LoweredGrammar};
pub use rule::{
    blank, choice, field, lit, optional, pat, prec, prec_left, prec_nonassoc, prec_right, repeat, repeat1,
    seq, sym, token, Assoc, Precedence, Rule,
};
