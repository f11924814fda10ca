use crate::syntax::StateId;
use crate::table::ProductionId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Parse action for a (state, terminal) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Push the lookahead token and go to the state
    Shift(StateId),
    /// Pop the production's right-hand side and push its left-hand side
    Reduce(ProductionId),
    /// The start symbol is complete and the input is exhausted
    Accept,
}

impl Action {
    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, Self::Shift(_))
    }

    #[must_use]
    pub const fn is_reduce(self) -> bool {
        matches!(self, Self::Reduce(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift(state) => write!(f, "shift {}", state.0),
            Self::Reduce(production) => write!(f, "reduce {production}"),
            Self::Accept => f.write_str("accept"),
        }
    }
}

/// All actions for one (state, terminal) pair.
///
/// An empty cell is a syntax error; more than one action means the conflict
/// was kept and the parser forks.
pub type ActionCell = SmallVec<[Action; 1]>;

/// Summary of table construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub states: usize,
    pub shift_reduce_resolved: usize,
    pub reduce_reduce_resolved: usize,
    /// Cells that kept more than one action.
    pub conflicts_kept: usize,
    pub lex_modes: usize,
}
