//! Local error recovery.
//!
//! When a version has no action for its lookahead, recovery looks for the
//! cheapest way to resynchronize: pop `d` nodes off the stack and skip `k`
//! tokens so that the token at `k` can be consumed from the state left at
//! depth `d`. Candidates are tried in order of increasing `d + k`, then
//! increasing `d`, inside a bounded window. The popped nodes and skipped
//! tokens are wrapped in one `ERROR` node.

use crate::lexer::Token;
use crate::syntax::{StateId, Symbol};
use crate::table::{Action, ParseTable};

/// Upper bound on simulated steps when checking whether a state can
/// consume a token.
const SIMULATION_LIMIT: usize = 256;

/// A resynchronization point: pop `depth` nodes and skip `skip` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Repair {
    pub depth: usize,
    pub skip: usize,
}

/// Find the cheapest repair. `states` are the stack states bottom to top;
/// `tokens[0]` is the token that could not be handled.
pub(crate) fn find_repair(
    table: &ParseTable,
    states: &[StateId],
    tokens: &[Token],
    max_depth: usize,
) -> Option<Repair> {
    let max_depth = max_depth.min(states.len().saturating_sub(1));
    let max_skip = tokens.len().saturating_sub(1);
    for total in 1..=max_skip + max_depth {
        for depth in 0..=total.min(max_depth) {
            let skip = total - depth;
            if skip > max_skip {
                continue;
            }
            let remaining = &states[..states.len() - depth];
            if can_consume(table, remaining, tokens[skip].symbol) {
                tracing::trace!(depth, skip, "repair found");
                return Some(Repair { depth, skip });
            }
        }
    }
    None
}

/// Whether some sequence of reductions from `states` ends in a shift or
/// accept of `symbol`.
pub(crate) fn can_consume(table: &ParseTable, states: &[StateId], symbol: Symbol) -> bool {
    let mut worklist = vec![states.to_vec()];
    let mut steps = 0;
    while let Some(stack) = worklist.pop() {
        let Some(&top) = stack.last() else {
            continue;
        };
        for action in table.actions(top, symbol) {
            steps += 1;
            if steps > SIMULATION_LIMIT {
                return false;
            }
            match *action {
                Action::Shift(_) | Action::Accept => return true,
                Action::Reduce(id) => {
                    let production = table.production(id);
                    if production.len() >= stack.len() {
                        continue;
                    }
                    let base = stack.len() - production.len();
                    let Some(next) = table.goto(stack[base - 1], production.lhs) else {
                        continue;
                    };
                    let mut reduced = stack[..base].to_vec();
                    reduced.push(next);
                    worklist.push(reduced);
                }
            }
        }
    }
    false
}
