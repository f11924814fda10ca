//! # Parser
//!
//! A generalized LR driver over a compiled [`Language`].
//!
//! The parser keeps one or more *versions*, each a stack of states and
//! nodes. While the table gives a single action the parser behaves like a
//! plain LR parser. Where a conflict was kept, the version forks and both
//! interpretations run side by side until one fails, they converge to the
//! same stack and are merged, or the input ends. The surviving tree is the
//! one with the fewest error nodes, then the highest total production
//! precedence, then the earliest fork.
//!
//! Syntax errors never abort a parse: they are repaired locally and the
//! unparseable region becomes an `ERROR` node (see `recovery`).
//!
//! ## Example
//!
//! ```rust
//! use tessel::grammar::*;
//! use tessel::{Language, Parser};
//!
//! let grammar = GrammarBuilder::new("sum")
//!     .rule("sum", choice([seq([sym("sum"), lit("+"), sym("num")]), sym("num")]))
//!     .token("num", pat("[0-9]+"))
//!     .build()
//!     .unwrap();
//! let language = Language::compile(&grammar).unwrap();
//!
//! let mut parser = Parser::new(language);
//! let tree = parser.parse(b"1+2", None).unwrap();
//! assert!(!tree.has_error());
//! assert_eq!(parser.last_stats().tokens, 3);
//! ```

mod cancel;
mod engine;
#[cfg(feature = "parallel")]
pub mod parallel;
mod recovery;
mod select;
mod stack;
mod version;

use crate::error::ParseCancelled;
use crate::incremental::reuse::ReuseCursor;
use crate::language::Language;
use crate::tree::Tree;
use engine::{Engine, Outcome};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Options for a parse.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub(crate) flag: Option<Arc<AtomicBool>>,
    pub(crate) budget: Option<u64>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) max_versions: usize,
    pub(crate) max_recovery_skip: usize,
    pub(crate) max_recovery_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            flag: None,
            budget: None,
            timeout: None,
            max_versions: 16,
            max_recovery_skip: 8,
            max_recovery_depth: 8,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the parse once `flag` is set. Checked once per parser step.
    #[must_use]
    pub fn cancellation_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.flag = Some(flag);
        self
    }

    /// Cancel the parse after `operations` parser steps.
    #[must_use]
    pub fn operation_budget(mut self, operations: u64) -> Self {
        self.budget = Some(operations);
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Maximum number of versions kept alive at once. At least one is
    /// always kept.
    #[must_use]
    pub fn max_versions(mut self, max: usize) -> Self {
        self.max_versions = max.max(1);
        self
    }

    /// How many tokens error recovery may skip to resynchronize.
    #[must_use]
    pub fn max_recovery_skip(mut self, tokens: usize) -> Self {
        self.max_recovery_skip = tokens;
        self
    }

    /// How many stack entries error recovery may discard.
    #[must_use]
    pub fn max_recovery_depth(mut self, depth: usize) -> Self {
        self.max_recovery_depth = depth;
        self
    }
}

/// Counters from the most recent parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ParseStats {
    /// Tokens shifted, not counting tokens inside reused subtrees.
    pub tokens: usize,
    pub reused_nodes: usize,
    pub reused_bytes: usize,
    /// Extra versions created by conflicting actions.
    pub forks: usize,
    /// Largest number of versions alive at once.
    pub max_versions: usize,
    pub recoveries: usize,
    /// Runs of bytes no token pattern matched.
    pub lex_errors: usize,
    pub operations: u64,
}

/// A reusable parser for one language.
///
/// A `Parser` holds no state between parses apart from its options and the
/// statistics of the last run, so one instance can parse any number of
/// texts. Use one parser per thread; the [`Language`] itself is shared.
#[derive(Debug, Clone)]
pub struct Parser {
    language: Language,
    options: ParseOptions,
    stats: ParseStats,
}

impl Parser {
    #[must_use]
    pub fn new(language: Language) -> Self {
        Self::with_options(language, ParseOptions::default())
    }

    #[must_use]
    pub fn with_options(language: Language, options: ParseOptions) -> Self {
        Self {
            language,
            options,
            stats: ParseStats::default(),
        }
    }

    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ParseOptions) {
        self.options = options;
    }

    /// Parse `text`, reusing unchanged subtrees of `old_tree`.
    ///
    /// `old_tree` must already reflect every edit made to the text since it
    /// was parsed (see [`Tree::edit`]). The result is the same tree a parse
    /// without `old_tree` would produce.
    ///
    /// # Errors
    ///
    /// Returns [`ParseCancelled`] with a partial tree when the cancellation
    /// flag, operation budget or timeout trips. Malformed text is never an
    /// error.
    pub fn parse(&mut self, text: &[u8], old_tree: Option<&Tree>) -> Result<Tree, ParseCancelled> {
        let reuse = old_tree
            .filter(|old| old.language().same_as(&self.language))
            .map(|old| ReuseCursor::new(old.green().clone()));
        let span = tracing::debug_span!("parse", language = self.language.name(), bytes = text.len());
        let _guard = span.enter();

        let (outcome, stats) = Engine::new(&self.language, text, &self.options, reuse).run();
        self.stats = stats;
        tracing::debug!(
            tokens = stats.tokens,
            reused = stats.reused_nodes,
            forks = stats.forks,
            recoveries = stats.recoveries,
            "parse finished"
        );
        match outcome {
            Outcome::Done(root) => Ok(Tree::new(root, self.language.clone())),
            Outcome::Cancelled(partial, reason) => Err(ParseCancelled {
                partial: Tree::new(partial, self.language.clone()),
                reason,
            }),
        }
    }

    #[must_use]
    pub fn last_stats(&self) -> ParseStats {
        self.stats
    }
}

/// Parse `text` with default options.
///
/// Without cancellation options a parse cannot be cancelled, so this always
/// returns a complete tree.
#[must_use]
pub fn parse(language: &Language, text: &[u8], old_tree: Option<&Tree>) -> Tree {
    let mut parser = Parser::new(language.clone());
    parser.parse(text, old_tree).unwrap_or_else(|cancelled| cancelled.partial)
}
