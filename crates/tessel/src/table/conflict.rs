//! Conflict resolution by precedence and associativity.
//!
//! Resolution order:
//!
//! 1. Reduce/reduce: if every reduction has a precedence, only the highest
//!    level survives. Otherwise all are kept.
//! 2. Shift/reduce, for each remaining reduction: the higher level wins.
//!    On equal levels the reduction's associativity decides (left reduces,
//!    right shifts, non-associative drops both). Missing precedence on either
//!    side keeps both actions.

use crate::grammar::{Assoc, Precedence};
use crate::syntax::StateId;
use crate::table::{Action, ActionCell, ProductionId, TableStats};
use std::cmp::Ordering;

/// Candidate actions for one (state, terminal) pair before resolution.
#[derive(Debug, Clone, Default)]
pub(crate) struct Candidates {
    pub shift: Option<StateId>,
    pub reduces: Vec<(ProductionId, Option<Precedence>)>,
    pub accept: bool,
}

impl Candidates {
    pub fn is_conflict(&self) -> bool {
        usize::from(self.shift.is_some()) + self.reduces.len() + usize::from(self.accept) > 1
    }
}

/// Resolve a cell. `shift_precedence` is only consulted when a shift
/// competes with a reduction.
pub(crate) fn resolve(
    candidates: Candidates,
    shift_precedence: impl FnOnce() -> Option<Precedence>,
    stats: &mut TableStats,
) -> ActionCell {
    let mut cell = ActionCell::new();
    if candidates.accept {
        cell.push(Action::Accept);
    }
    if !candidates.is_conflict() {
        if let Some(state) = candidates.shift {
            cell.push(Action::Shift(state));
        }
        cell.extend(candidates.reduces.iter().map(|(production, _)| Action::Reduce(*production)));
        return cell;
    }

    let mut reduces = candidates.reduces;
    if reduces.len() > 1 && reduces.iter().all(|(_, prec)| prec.is_some()) {
        let max = reduces.iter().filter_map(|(_, prec)| prec.map(|p| p.level)).max();
        let before = reduces.len();
        reduces.retain(|(_, prec)| prec.map(|p| p.level) == max);
        if reduces.len() < before {
            stats.reduce_reduce_resolved += 1;
        }
    }

    let mut keep_shift = candidates.shift.is_some();
    if keep_shift {
        let shift_prec = shift_precedence();
        let mut survivors = Vec::with_capacity(reduces.len());
        for (production, reduce_prec) in reduces {
            match compare(shift_prec, reduce_prec) {
                Winner::Reduce => {
                    keep_shift = false;
                    survivors.push((production, reduce_prec));
                    stats.shift_reduce_resolved += 1;
                }
                Winner::Shift => stats.shift_reduce_resolved += 1,
                Winner::Neither => {
                    keep_shift = false;
                    stats.shift_reduce_resolved += 1;
                }
                Winner::Both => survivors.push((production, reduce_prec)),
            }
        }
        reduces = survivors;
    }

    if keep_shift {
        if let Some(state) = candidates.shift {
            cell.push(Action::Shift(state));
        }
    }
    cell.extend(reduces.iter().map(|(production, _)| Action::Reduce(*production)));
    if cell.len() > 1 {
        stats.conflicts_kept += 1;
    }
    cell
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Winner {
    Shift,
    Reduce,
    Neither,
    Both,
}

fn compare(shift: Option<Precedence>, reduce: Option<Precedence>) -> Winner {
    let (Some(shift), Some(reduce)) = (shift, reduce) else {
        return Winner::Both;
    };
    match reduce.level.cmp(&shift.level) {
        Ordering::Greater => Winner::Reduce,
        Ordering::Less => Winner::Shift,
        Ordering::Equal => match reduce.assoc {
            Assoc::Left => Winner::Reduce,
            Assoc::Right => Winner::Shift,
            Assoc::NonAssoc => Winner::Neither,
            Assoc::None => Winner::Both,
        },
    }
}
