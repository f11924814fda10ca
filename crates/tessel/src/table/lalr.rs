//! LALR(1) automaton construction.
//!
//! States are identified by their LR(0) kernel. Lookaheads are attached to
//! kernel items and propagated through closures and transitions until
//! nothing changes, which merges LR(1) states with equal cores on the fly.

use crate::grammar::LoweredGrammar;
use crate::syntax::Symbol;
use crate::table::{FirstSets, TerminalSet};
use hashbrown::HashMap;
use std::collections::{BTreeMap, VecDeque};

/// Production index of the augmented rule `start' -> start`.
pub(crate) const AUGMENTED: u32 = u32::MAX;

/// An LR(0) item: a production with a dot position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Item {
    pub production: u32,
    pub dot: u16,
}

impl Item {
    const fn advance(self) -> Self {
        Self {
            production: self.production,
            dot: self.dot + 1,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LalrState {
    /// Sorted kernel items.
    pub kernel: Vec<Item>,
    /// Lookahead set per kernel item.
    pub lookaheads: Vec<TerminalSet>,
    /// Transitions by symbol, ordered by symbol id.
    pub transitions: Vec<(Symbol, usize)>,
}

pub(crate) struct Automaton<'g> {
    pub grammar: &'g LoweredGrammar,
    pub first: &'g FirstSets,
    pub states: Vec<LalrState>,
    by_lhs: Vec<Vec<u32>>,
}

impl<'g> Automaton<'g> {
    pub fn build(grammar: &'g LoweredGrammar, first: &'g FirstSets) -> Self {
        let mut by_lhs = vec![Vec::new(); grammar.symbols.len()];
        for (index, production) in grammar.productions.iter().enumerate() {
            by_lhs[production.lhs.index()].push(index as u32);
        }

        let mut end = TerminalSet::with_capacity(grammar.terminal_count);
        end.insert(Symbol::END.index());
        let mut automaton = Self {
            grammar,
            first,
            states: vec![LalrState {
                kernel: vec![Item {
                    production: AUGMENTED,
                    dot: 0,
                }],
                lookaheads: vec![end],
                transitions: Vec::new(),
            }],
            by_lhs,
        };
        automaton.run();
        automaton
    }

    fn run(&mut self) {
        let mut index: HashMap<Vec<Item>, usize> = HashMap::new();
        index.insert(self.states[0].kernel.clone(), 0);
        let mut queue = VecDeque::from([0usize]);
        let mut queued = vec![true];
        let mut passes = 0usize;

        while let Some(state) = queue.pop_front() {
            queued[state] = false;
            passes += 1;

            let mut groups: BTreeMap<Symbol, Vec<(Item, TerminalSet)>> = BTreeMap::new();
            for (item, lookahead) in self.closure(state) {
                if let Some(symbol) = self.next_symbol(item) {
                    groups.entry(symbol).or_default().push((item.advance(), lookahead));
                }
            }

            let mut transitions = Vec::with_capacity(groups.len());
            for (symbol, mut items) in groups {
                items.sort_by_key(|(item, _)| *item);
                let kernel: Vec<Item> = items.iter().map(|(item, _)| *item).collect();
                let target = if let Some(&target) = index.get(&kernel) {
                    let mut changed = false;
                    for (slot, (_, lookahead)) in self.states[target].lookaheads.iter_mut().zip(&items) {
                        changed |= slot.union_with(lookahead);
                    }
                    if changed && !queued[target] {
                        queued[target] = true;
                        queue.push_back(target);
                    }
                    target
                } else {
                    let target = self.states.len();
                    self.states.push(LalrState {
                        kernel: kernel.clone(),
                        lookaheads: items.into_iter().map(|(_, lookahead)| lookahead).collect(),
                        transitions: Vec::new(),
                    });
                    index.insert(kernel, target);
                    queued.push(true);
                    queue.push_back(target);
                    target
                };
                transitions.push((symbol, target));
            }
            self.states[state].transitions = transitions;
        }

        tracing::trace!(states = self.states.len(), passes, "lalr automaton converged");
    }

    pub fn rhs(&self, production: u32) -> &[Symbol] {
        if production == AUGMENTED {
            std::slice::from_ref(&self.grammar.start)
        } else {
            &self.grammar.productions[production as usize].rhs
        }
    }

    pub fn next_symbol(&self, item: Item) -> Option<Symbol> {
        self.rhs(item.production).get(usize::from(item.dot)).copied()
    }

    /// Closure of a state's kernel, with lookaheads.
    pub fn closure(&self, state: usize) -> Vec<(Item, TerminalSet)> {
        let state = &self.states[state];
        let mut items: Vec<(Item, TerminalSet)> = state
            .kernel
            .iter()
            .copied()
            .zip(state.lookaheads.iter().cloned())
            .collect();
        let mut positions: HashMap<Item, usize> =
            items.iter().enumerate().map(|(index, (item, _))| (*item, index)).collect();
        let mut stack: Vec<usize> = (0..items.len()).rev().collect();

        while let Some(index) = stack.pop() {
            let (item, lookahead) = items[index].clone();
            let Some(next) = self.next_symbol(item) else {
                continue;
            };
            if self.grammar.is_terminal(next) {
                continue;
            }
            let rest = &self.rhs(item.production)[usize::from(item.dot) + 1..];
            let mut follow = TerminalSet::with_capacity(self.grammar.terminal_count);
            if self.first.first_of_sequence(rest, &mut follow) {
                follow.union_with(&lookahead);
            }
            for &production in &self.by_lhs[next.index()] {
                let added = Item { production, dot: 0 };
                match positions.get(&added) {
                    Some(&existing) => {
                        if items[existing].1.union_with(&follow) {
                            stack.push(existing);
                        }
                    }
                    None => {
                        positions.insert(added, items.len());
                        stack.push(items.len());
                        items.push((added, follow.clone()));
                    }
                }
            }
        }
        items
    }
}
