use crate::lexer::Lookahead;
use crate::parser::stack::Stack;
use crate::syntax::{Length, StateId};

/// One live interpretation of the input.
#[derive(Debug, Clone)]
pub(crate) struct Version {
    pub stack: Stack,
    /// Token to act on next. Kept across reductions until it is shifted.
    pub lookahead: Option<Lookahead>,
    /// Number of error nodes this version has produced.
    pub error_cost: u32,
    /// Sum of the precedence levels of every production reduced.
    pub dynamic_precedence: i32,
    /// Creation order, the last tie-breaker between versions.
    pub order: u64,
}

impl Version {
    pub fn new(initial: StateId) -> Self {
        Self {
            stack: Stack::new(initial),
            lookahead: None,
            error_cost: 0,
            dynamic_precedence: 0,
            order: 0,
        }
    }

    pub fn state(&self) -> StateId {
        self.stack.state()
    }

    pub fn position(&self) -> Length {
        self.stack.end()
    }

    /// Whether the two versions will behave identically on the rest of the
    /// input.
    pub fn is_equivalent(&self, other: &Self) -> bool {
        let same_lookahead = match (&self.lookahead, &other.lookahead) {
            (Some(a), Some(b)) => a.same_tokens(b),
            (None, None) => true,
            _ => false,
        };
        same_lookahead && self.stack.same_shape(&other.stack)
    }
}
