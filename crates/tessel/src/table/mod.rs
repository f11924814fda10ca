//! # Parse Tables
//!
//! Compiled, immutable LALR(1) tables with generalized cells.
//!
//! A [`ParseTable`] maps (state, terminal) to an [`ActionCell`] and
//! (state, non-terminal) to a goto state. Conflicts that precedence cannot
//! resolve stay in the cell as several actions; the parser explores each of
//! them (see [`conflict`] for the resolution order).
//!
//! Tables are built once per language and shared read-only by every parse.

pub mod action;
pub(crate) mod conflict;
pub mod first;
pub(crate) mod lalr;
pub(crate) mod lex_mode;
pub mod symbol;
pub mod terminal_set;

pub use action::{Action, ActionCell, TableStats};
pub use first::FirstSets;
pub use symbol::{Production, ProductionId, SymbolInfo, SymbolKind};
pub use terminal_set::TerminalSet;

use crate::error::GrammarError;
use crate::grammar::{LoweredGrammar, Precedence};
use crate::syntax::{StateId, Symbol};
use conflict::Candidates;
use lalr::{Automaton, AUGMENTED};
use lex_mode::LexModeBuilder;
use serde::{Deserialize, Serialize};

/// Largest usable state count; `u16::MAX` marks "no state".
pub const MAX_STATES: usize = u16::MAX as usize - 1;

const NO_GOTO: u16 = u16::MAX;

/// Compiled parse table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseTable {
    state_count: usize,
    terminal_count: usize,
    nonterminal_count: usize,
    actions: Vec<ActionCell>,
    gotos: Vec<u16>,
    productions: Vec<Production>,
    lex_modes: Vec<TerminalSet>,
    state_lex_modes: Vec<u16>,
    error_lex_mode: u16,
    start: Symbol,
    nullable_start: bool,
}

impl ParseTable {
    /// Build the LALR(1) table for a lowered grammar.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::TooManyStates`] when state ids do not fit.
    pub fn build(grammar: &LoweredGrammar) -> Result<(Self, TableStats), GrammarError> {
        let first = FirstSets::compute(grammar);
        let automaton = Automaton::build(grammar, &first);
        let state_count = automaton.states.len();
        if state_count > MAX_STATES {
            return Err(GrammarError::TooManyStates {
                count: state_count,
                max: MAX_STATES,
            });
        }

        let terminal_count = grammar.terminal_count;
        let nonterminal_count = grammar.nonterminal_count();
        let mut stats = TableStats {
            states: state_count,
            ..TableStats::default()
        };
        let mut actions = Vec::with_capacity(state_count * terminal_count);
        let mut gotos = vec![NO_GOTO; state_count * nonterminal_count];
        let mut modes = LexModeBuilder::default();
        let mut state_lex_modes = Vec::with_capacity(state_count);

        for (state, lalr_state) in automaton.states.iter().enumerate() {
            let closure = automaton.closure(state);
            let mut cells: Vec<Candidates> = vec![Candidates::default(); terminal_count];

            for &(symbol, target) in &lalr_state.transitions {
                let target = StateId(target as u16);
                if grammar.is_terminal(symbol) {
                    cells[symbol.index()].shift = Some(target);
                } else {
                    gotos[state * nonterminal_count + symbol.index() - terminal_count] = target.0;
                }
            }
            for (item, lookahead) in &closure {
                if automaton.next_symbol(*item).is_some() {
                    continue;
                }
                if item.production == AUGMENTED {
                    cells[Symbol::END.index()].accept = true;
                    continue;
                }
                let production = item.production as ProductionId;
                let precedence = reduce_precedence(grammar, production);
                for terminal in lookahead.iter() {
                    cells[terminal].reduces.push((production, precedence));
                }
            }

            let mut accepted = TerminalSet::with_capacity(terminal_count);
            for (terminal, mut candidates) in cells.into_iter().enumerate() {
                candidates.reduces.sort_by_key(|(production, _)| *production);
                let conflict = candidates.is_conflict();
                let cell = conflict::resolve(
                    candidates,
                    || shift_precedence(&automaton, &closure, terminal),
                    &mut stats,
                );
                if conflict && cell.len() > 1 {
                    tracing::debug!(
                        state,
                        terminal = grammar.symbol_name(Symbol(terminal as u16)),
                        actions = ?cell,
                        "conflict kept"
                    );
                }
                if !cell.is_empty() {
                    accepted.insert(terminal);
                }
                actions.push(cell);
            }
            state_lex_modes.push(modes.intern(accepted));
        }

        let mut all = TerminalSet::with_capacity(terminal_count);
        for terminal in 0..terminal_count {
            all.insert(terminal);
        }
        let error_lex_mode = modes.intern(all);
        let lex_modes = modes.finish();
        stats.lex_modes = lex_modes.len();

        if stats.conflicts_kept > 0 {
            tracing::warn!(
                grammar = %grammar.name,
                conflicts = stats.conflicts_kept,
                "unresolved conflicts kept, parser will fork"
            );
        }
        tracing::debug!(
            grammar = %grammar.name,
            states = stats.states,
            shift_reduce_resolved = stats.shift_reduce_resolved,
            reduce_reduce_resolved = stats.reduce_reduce_resolved,
            conflicts_kept = stats.conflicts_kept,
            lex_modes = stats.lex_modes,
            "parse table built"
        );

        Ok((
            Self {
                state_count,
                terminal_count,
                nonterminal_count,
                actions,
                gotos,
                productions: grammar.productions.clone(),
                lex_modes,
                state_lex_modes,
                error_lex_mode,
                start: grammar.start,
                nullable_start: first.is_nullable(grammar.start),
            },
            stats,
        ))
    }

    /// Actions for `symbol` in `state`. Unknown states and symbols, including
    /// `ERROR`, have no actions.
    #[must_use]
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[Action] {
        if state.index() >= self.state_count || symbol.index() >= self.terminal_count {
            return &[];
        }
        &self.actions[state.index() * self.terminal_count + symbol.index()]
    }

    #[must_use]
    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        if state.index() >= self.state_count
            || symbol.index() < self.terminal_count
            || symbol.index() >= self.terminal_count + self.nonterminal_count
        {
            return None;
        }
        let target = self.gotos[state.index() * self.nonterminal_count + symbol.index() - self.terminal_count];
        (target != NO_GOTO).then_some(StateId(target))
    }

    #[must_use]
    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[usize::from(id)]
    }

    #[must_use]
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    #[must_use]
    pub const fn state_count(&self) -> usize {
        self.state_count
    }

    #[must_use]
    pub const fn terminal_count(&self) -> usize {
        self.terminal_count
    }

    #[must_use]
    pub const fn symbol_count(&self) -> usize {
        self.terminal_count + self.nonterminal_count
    }

    #[must_use]
    pub const fn start_symbol(&self) -> Symbol {
        self.start
    }

    #[must_use]
    pub const fn is_start_nullable(&self) -> bool {
        self.nullable_start
    }

    #[must_use]
    pub fn lex_mode(&self, state: StateId) -> u16 {
        self.state_lex_modes
            .get(state.index())
            .copied()
            .unwrap_or(self.error_lex_mode)
    }

    #[must_use]
    pub const fn error_lex_mode(&self) -> u16 {
        self.error_lex_mode
    }

    #[must_use]
    pub fn lex_mode_terminals(&self, mode: u16) -> Option<&TerminalSet> {
        self.lex_modes.get(usize::from(mode))
    }

    #[must_use]
    pub fn lex_mode_count(&self) -> usize {
        self.lex_modes.len()
    }

    /// Terminals with at least one action in `state`.
    pub fn expected(&self, state: StateId) -> impl Iterator<Item = Symbol> + '_ {
        (0..self.terminal_count)
            .filter(move |&terminal| !self.actions(state, Symbol(terminal as u16)).is_empty())
            .map(|terminal| Symbol(terminal as u16))
    }

    /// Number of cells holding more than one action.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.actions.iter().filter(|cell| cell.len() > 1).count()
    }

    #[cfg(test)]
    pub(crate) fn set_actions(&mut self, state: StateId, symbol: Symbol, actions: &[Action]) {
        let index = state.index() * self.terminal_count + symbol.index();
        self.actions[index] = actions.iter().copied().collect();
    }

    /// Check that every index stored in the table is in range, and that only
    /// the end of input can be accepted and it is never shifted.
    ///
    /// # Errors
    ///
    /// Returns a description of the first inconsistency found.
    pub fn validate(&self) -> Result<(), String> {
        if self.state_count == 0 {
            return Err("table has no states".into());
        }
        if self.actions.len() != self.state_count * self.terminal_count {
            return Err(format!("expected {} action cells, found {}", self.state_count * self.terminal_count, self.actions.len()));
        }
        if self.gotos.len() != self.state_count * self.nonterminal_count {
            return Err(format!("expected {} goto entries, found {}", self.state_count * self.nonterminal_count, self.gotos.len()));
        }
        if self.state_lex_modes.len() != self.state_count {
            return Err("lex mode count does not match state count".into());
        }
        let symbol_count = self.symbol_count();
        for (index, cell) in self.actions.iter().enumerate() {
            let terminal = index % self.terminal_count.max(1);
            for action in cell {
                match *action {
                    Action::Shift(_) if terminal == Symbol::END.index() => {
                        return Err("shift on end of input".into());
                    }
                    Action::Accept if terminal != Symbol::END.index() => {
                        return Err(format!("accept on terminal {terminal}"));
                    }
                    Action::Shift(state) if state.index() >= self.state_count => {
                        return Err(format!("shift to unknown state {}", state.0));
                    }
                    Action::Reduce(production) if usize::from(production) >= self.productions.len() => {
                        return Err(format!("reduce by unknown production {production}"));
                    }
                    _ => {}
                }
            }
        }
        if let Some(target) = self
            .gotos
            .iter()
            .find(|&&target| target != NO_GOTO && usize::from(target) >= self.state_count)
        {
            return Err(format!("goto to unknown state {target}"));
        }
        for production in &self.productions {
            let lhs = production.lhs.index();
            if lhs < self.terminal_count || lhs >= symbol_count {
                return Err(format!("production with invalid left-hand side {lhs}"));
            }
            if let Some(symbol) = production.rhs.iter().find(|symbol| symbol.index() >= symbol_count) {
                return Err(format!("production references unknown symbol {}", symbol.0));
            }
        }
        if self
            .state_lex_modes
            .iter()
            .chain(std::iter::once(&self.error_lex_mode))
            .any(|&mode| usize::from(mode) >= self.lex_modes.len())
        {
            return Err("lex mode index out of range".into());
        }
        let start = self.start.index();
        if start < self.terminal_count || start >= symbol_count {
            return Err(format!("invalid start symbol {start}"));
        }
        Ok(())
    }
}

/// Explicit production precedence, else the precedence of its last terminal
/// that declares one.
fn reduce_precedence(grammar: &LoweredGrammar, production: ProductionId) -> Option<Precedence> {
    let production = &grammar.productions[usize::from(production)];
    production.precedence.or_else(|| {
        production
            .rhs
            .iter()
            .rev()
            .filter(|symbol| grammar.is_terminal(**symbol))
            .find_map(|symbol| grammar.terminal_precedence[symbol.index()])
    })
}

/// The terminal's declared precedence, else the highest precedence among the
/// items that can shift it.
fn shift_precedence(
    automaton: &Automaton<'_>,
    closure: &[(lalr::Item, TerminalSet)],
    terminal: usize,
) -> Option<Precedence> {
    let grammar = automaton.grammar;
    if let Some(declared) = grammar.terminal_precedence[terminal] {
        return Some(declared);
    }
    closure
        .iter()
        .filter(|(item, _)| item.production != AUGMENTED)
        .filter(|(item, _)| {
            automaton.next_symbol(*item).is_some_and(|next| {
                next.index() == terminal
                    || (!grammar.is_terminal(next) && automaton.first.first(next).contains(terminal))
            })
        })
        .filter_map(|(item, _)| grammar.productions[item.production as usize].precedence)
        .fold(None, |best: Option<Precedence>, prec| match best {
            Some(best) if best.level >= prec.level => Some(best),
            _ => Some(prec),
        })
}
