use crate::grammar::LoweredGrammar;
use crate::syntax::Symbol;
use crate::table::TerminalSet;

/// FIRST sets and nullability of every symbol.
#[derive(Debug, Clone)]
pub struct FirstSets {
    first: Vec<TerminalSet>,
    nullable: Vec<bool>,
    terminal_count: usize,
}

impl FirstSets {
    /// Compute FIRST and nullable to a fixpoint over the productions.
    #[must_use]
    pub fn compute(grammar: &LoweredGrammar) -> Self {
        let terminal_count = grammar.terminal_count;
        let mut first: Vec<TerminalSet> = (0..grammar.symbols.len())
            .map(|_| TerminalSet::with_capacity(terminal_count))
            .collect();
        for (terminal, set) in first.iter_mut().enumerate().take(terminal_count) {
            set.insert(terminal);
        }
        let mut nullable = vec![false; grammar.symbols.len()];

        let mut changed = true;
        while changed {
            changed = false;
            for production in &grammar.productions {
                let lhs = production.lhs.index();
                let mut all_nullable = true;
                for symbol in &production.rhs {
                    let symbol = symbol.index();
                    if symbol != lhs {
                        let (target, source) = pick_two(&mut first, lhs, symbol);
                        changed |= target.union_with(source);
                    }
                    if !nullable[symbol] {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable && !nullable[lhs] {
                    nullable[lhs] = true;
                    changed = true;
                }
            }
        }

        Self {
            first,
            nullable,
            terminal_count,
        }
    }

    #[must_use]
    pub fn first(&self, symbol: Symbol) -> &TerminalSet {
        &self.first[symbol.index()]
    }

    #[must_use]
    pub fn is_nullable(&self, symbol: Symbol) -> bool {
        self.nullable[symbol.index()]
    }

    /// Add FIRST of `sequence` to `out`, returning whether the whole sequence
    /// is nullable.
    pub fn first_of_sequence(&self, sequence: &[Symbol], out: &mut TerminalSet) -> bool {
        for symbol in sequence {
            out.union_with(self.first(*symbol));
            if !self.is_nullable(*symbol) {
                return false;
            }
        }
        true
    }

    #[must_use]
    pub const fn terminal_count(&self) -> usize {
        self.terminal_count
    }
}

/// Mutable reference to `a` and shared reference to `b`, `a != b`.
fn pick_two(sets: &mut [TerminalSet], a: usize, b: usize) -> (&mut TerminalSet, &TerminalSet) {
    if a < b {
        let (left, right) = sets.split_at_mut(b);
        (&mut left[a], &right[0])
    } else {
        let (left, right) = sets.split_at_mut(a);
        (&mut right[0], &left[b])
    }
}
