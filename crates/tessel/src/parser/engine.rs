//! The GLR driver loop.
//!
//! Versions advance in rounds. Each round takes the versions at the lowest
//! text position and runs each of them until it shifts a token, accepts or
//! fails; conflicting actions fork the version. After the round, equivalent
//! versions are merged, the survivors are pruned to the configured maximum
//! and, when every version failed, the best one is repaired.

use crate::error::CancelReason;
use crate::incremental::reuse::ReuseCursor;
use crate::language::Language;
use crate::lexer::{Lexer, Lookahead, Token};
use crate::parser::cancel::CancelCheck;
use crate::parser::recovery::{find_repair, Repair};
use crate::parser::select::{self, compare};
use crate::parser::stack::Popped;
use crate::parser::version::Version;
use crate::parser::{ParseOptions, ParseStats};
use crate::syntax::{FieldId, GreenNode, Length, NodeFlags, StateId, Symbol};
use crate::table::{Action, ParseTable, ProductionId};
use std::cmp::Ordering;
use std::sync::Arc;

/// Reductions a single version may perform without shifting.
const MAX_REDUCTIONS_PER_TOKEN: usize = 10_000;

/// Consecutive rounds without moving past a text position before the parse
/// gives up on the rest of the text.
const MAX_STALLED_ROUNDS: usize = 256;

/// How a parse run ended.
pub(crate) enum Outcome {
    Done(Arc<GreenNode>),
    Cancelled(Arc<GreenNode>, CancelReason),
}

struct Finished {
    root: Arc<GreenNode>,
    error_cost: u32,
    dynamic_precedence: i32,
    order: u64,
}

impl Finished {
    fn compare(&self, other: &Self) -> Ordering {
        select::rank(
            self.error_cost,
            self.dynamic_precedence,
            self.order,
            other.error_cost,
            other.dynamic_precedence,
            other.order,
        )
    }
}

/// Results of advancing the versions of one round.
#[derive(Default)]
struct Round {
    shifted: Vec<Version>,
    failed: Vec<Version>,
    finished: Vec<Finished>,
}

pub(crate) struct Engine<'a> {
    language: &'a Language,
    table: &'a ParseTable,
    lexer: Lexer<'a>,
    options: &'a ParseOptions,
    cancel: CancelCheck,
    reuse: Option<ReuseCursor>,
    stats: ParseStats,
    next_order: u64,
}

impl<'a> Engine<'a> {
    pub fn new(language: &'a Language, text: &'a [u8], options: &'a ParseOptions, reuse: Option<ReuseCursor>) -> Self {
        let table = language.table();
        Self {
            language,
            table,
            lexer: Lexer::new(language.lex_table(), table, text),
            options,
            cancel: CancelCheck::new(options.flag.clone(), options.budget, options.timeout),
            reuse,
            stats: ParseStats::default(),
            next_order: 1,
        }
    }

    pub fn run(mut self) -> (Outcome, ParseStats) {
        let outcome = self.drive();
        self.stats.operations = self.cancel.operations();
        self.stats.lex_errors = self.lexer.errors().len();
        (outcome, self.stats)
    }

    fn drive(&mut self) -> Outcome {
        let mut active = vec![Version::new(StateId(0))];
        let mut finished: Vec<Finished> = Vec::new();
        let mut last_position = None;
        let mut stalled = 0usize;

        while !active.is_empty() {
            self.stats.max_versions = self.stats.max_versions.max(active.len());
            let position = active
                .iter()
                .map(|version| version.position().byte_len())
                .min()
                .unwrap_or_default();
            if last_position == Some(position) {
                stalled += 1;
            } else {
                stalled = 0;
                last_position = Some(position);
            }
            if stalled > MAX_STALLED_ROUNDS {
                tracing::warn!(offset = position, rounds = stalled, "parse stopped advancing");
                if let Some(best) = active.iter().min_by(|a, b| compare(a, b)) {
                    finished.push(self.abandon(best));
                }
                break;
            }
            let ambiguous = active.len() > 1;
            let (current, waiting): (Vec<_>, Vec<_>) = active
                .into_iter()
                .partition(|version| version.position().byte_len() == position);

            let mut round = Round::default();
            for version in current {
                if let Err(reason) = self.advance(version, ambiguous, &mut round) {
                    let mut live = waiting;
                    live.append(&mut round.shifted);
                    live.append(&mut round.failed);
                    finished.append(&mut round.finished);
                    return self.cancelled(&live, &finished, reason);
                }
            }
            finished.append(&mut round.finished);

            let mut next = waiting;
            next.append(&mut round.shifted);
            if next.is_empty() && finished.is_empty() {
                round.failed.sort_by(compare);
                if let Some(best) = round.failed.into_iter().next() {
                    if let Some(version) = self.recover(best, &mut finished) {
                        next.push(version);
                    }
                }
            } else if !round.failed.is_empty() {
                tracing::trace!(count = round.failed.len(), "failed versions discarded");
            }

            select::merge(&mut next);
            let dropped = select::prune(&mut next, self.options.max_versions);
            if dropped > 0 {
                tracing::warn!(dropped, max = self.options.max_versions, "parse versions pruned");
            }
            if let Some(best) = finished.iter().min_by(|a, b| a.compare(b)) {
                let limit = best.error_cost;
                next.retain(|version| version.error_cost <= limit);
            }
            active = next;
        }

        finished.sort_by(Finished::compare);
        match finished.into_iter().next() {
            Some(best) => Outcome::Done(best.root),
            None => Outcome::Done(Arc::new(GreenNode::branch(Symbol::ERROR, [], StateId::NONE))),
        }
    }

    /// Run one version until every branch of it has shifted, accepted or
    /// failed.
    fn advance(&mut self, version: Version, ambiguous: bool, round: &mut Round) -> Result<(), CancelReason> {
        let mut work = vec![version];
        let mut forked = false;
        let mut reductions = 0usize;

        while let Some(mut version) = work.pop() {
            if let Err(reason) = self.cancel.tick() {
                round.failed.push(version);
                round.failed.append(&mut work);
                return Err(reason);
            }
            let lookahead = self.lookahead(&mut version);

            if !ambiguous && !forked && work.is_empty() && self.try_reuse(&mut version, &lookahead) {
                round.shifted.push(version);
                continue;
            }

            let state = version.state();
            let actions = self.table.actions(state, lookahead.token.symbol);
            tracing::trace!(
                state = state.0,
                symbol = %self.language.symbol_name(lookahead.token.symbol),
                actions = actions.len(),
                "step"
            );
            if actions.is_empty() {
                round.failed.push(version);
                continue;
            }
            if actions.len() > 1 {
                self.stats.forks += actions.len() - 1;
                forked = true;
                tracing::trace!(state = state.0, branches = actions.len(), "fork");
            }

            let actions: Vec<Action> = actions.to_vec();
            for (index, action) in actions.into_iter().enumerate() {
                let mut branch = version.clone();
                if index > 0 {
                    branch.order = self.fresh_order();
                }
                match action {
                    Action::Shift(next) => {
                        self.shift(&mut branch, next, &lookahead);
                        round.shifted.push(branch);
                    }
                    Action::Reduce(id) => {
                        reductions += 1;
                        if reductions > MAX_REDUCTIONS_PER_TOKEN {
                            tracing::warn!(state = state.0, "reduction limit reached");
                            round.failed.push(branch);
                        } else if self.reduce(&mut branch, id, &lookahead, ambiguous || forked) {
                            work.push(branch);
                        } else {
                            round.failed.push(branch);
                        }
                    }
                    Action::Accept => {
                        let root = self.accept(&branch, &lookahead);
                        tracing::trace!(errors = branch.error_cost, "accept");
                        round.finished.push(Finished {
                            root,
                            error_cost: branch.error_cost,
                            dynamic_precedence: branch.dynamic_precedence,
                            order: branch.order,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn fresh_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    /// The pending lookahead of `version`, lexing it first if needed.
    fn lookahead(&mut self, version: &mut Version) -> Lookahead {
        if let Some(lookahead) = &version.lookahead {
            return lookahead.clone();
        }
        let mode = self.table.lex_mode(version.state());
        let lookahead = self.lexer.next_token(version.position(), mode);
        version.lookahead = Some(lookahead.clone());
        lookahead
    }

    fn leaf(token: &Token, state: StateId) -> Arc<GreenNode> {
        Arc::new(GreenNode::leaf(token.symbol, token.len, state, token.lookahead_bytes()))
    }

    fn trivia_leaf(token: &Token, state: StateId) -> Arc<GreenNode> {
        Arc::new(
            GreenNode::leaf(token.symbol, token.len, state, token.lookahead_bytes()).with_flag(NodeFlags::EXTRA),
        )
    }

    fn push_trivia(version: &mut Version, lookahead: &Lookahead) {
        let state = version.state();
        for trivia in &lookahead.trivia {
            version.stack.push_extra(Self::trivia_leaf(trivia, state));
        }
    }

    fn shift(&mut self, version: &mut Version, next: StateId, lookahead: &Lookahead) {
        Self::push_trivia(version, lookahead);
        let leaf = Self::leaf(&lookahead.token, version.state());
        version.stack.push(next, leaf);
        version.lookahead = None;
        self.stats.tokens += 1;
    }

    /// Pop the right-hand side of production `id` and push its node.
    /// Returns `false` if the stack is too shallow or has no goto.
    fn reduce(&mut self, version: &mut Version, id: ProductionId, lookahead: &Lookahead, fragile: bool) -> bool {
        let production = self.table.production(id);
        let Some(popped) = version.stack.pop(production.len()) else {
            return false;
        };
        let below = version.state();
        let Some(next) = self.table.goto(below, production.lhs) else {
            return false;
        };

        let mut children: Vec<(Arc<GreenNode>, Option<FieldId>)> = Vec::with_capacity(popped.len());
        let mut position = 0;
        for Popped { node, extra } in popped {
            if extra {
                children.push((node, None));
                continue;
            }
            let field = production.field_at(position);
            position += 1;
            if self.is_hidden_rule(node.kind()) {
                children.extend(
                    node.children()
                        .iter()
                        .map(|child| (child.node.clone(), child.field.or(field))),
                );
            } else {
                children.push((node, field));
            }
        }

        let start = version.position().byte_len();
        let examined = u32::try_from(lookahead.token.examined_end.saturating_sub(start)).unwrap_or(u32::MAX);
        let mut node = GreenNode::branch(production.lhs, children, below)
            .with_lookahead_end(examined)
            .with_next_lex_mode(lookahead.mode);
        if fragile {
            node = node.with_flag(NodeFlags::FRAGILE);
        }
        version.dynamic_precedence += production.dynamic_precedence();
        version.stack.push(next, Arc::new(node));
        true
    }

    fn is_hidden_rule(&self, symbol: Symbol) -> bool {
        !symbol.is_error()
            && symbol.index() >= self.table.terminal_count()
            && !self.language.symbol_is_visible(symbol)
    }

    /// Build the final tree of an accepting version.
    fn accept(&self, version: &Version, lookahead: &Lookahead) -> Arc<GreenNode> {
        let start = self.table.start_symbol();
        let mut children: Vec<(Arc<GreenNode>, Option<FieldId>)> = Vec::new();
        for Popped { node, extra } in version.stack.nodes() {
            if !extra && node.kind() == start {
                children.extend(node.children().iter().map(|child| (child.node.clone(), child.field)));
            } else {
                children.push((node, None));
            }
        }
        let state = version.state();
        children.extend(lookahead.trivia.iter().map(|trivia| (Self::trivia_leaf(trivia, state), None)));
        Arc::new(GreenNode::branch(start, children, StateId::NONE))
    }

    /// Reuse a subtree of the previous tree in place of parsing it again.
    ///
    /// Only done with a single live version, for a node that was built in
    /// the current state, covers no edit and begins with the current token,
    /// and only when the table would shift that token without alternatives.
    /// The token after the node is read in the lex mode recorded on it, so
    /// it comes out as it did when the node was built.
    fn try_reuse(&mut self, version: &mut Version, lookahead: &Lookahead) -> bool {
        let token = &lookahead.token;
        if token.is_end() || token.symbol.is_error() {
            return false;
        }
        let state = version.state();
        let actions = self.table.actions(state, token.symbol);
        if !matches!(actions, [Action::Shift(_)]) {
            return false;
        }
        let Some(cursor) = self.reuse.as_mut() else {
            return false;
        };
        for candidate in cursor.candidates(token.start_byte()) {
            if candidate.is_changed()
                || candidate.is_fragile()
                || candidate.has_error()
                || candidate.is_extra()
                || candidate.is_empty()
                || candidate.is_leaf()
                || candidate.parse_state() != state
                || candidate.first_leaf().kind() != token.symbol
            {
                continue;
            }
            let Some(next) = self.table.goto(state, candidate.kind()) else {
                continue;
            };
            tracing::trace!(
                kind = %self.language.symbol_name(candidate.kind()),
                offset = token.start_byte(),
                bytes = candidate.text_len().to_usize(),
                "reused node"
            );
            Self::push_trivia(version, lookahead);
            self.stats.reused_nodes += 1;
            self.stats.reused_bytes += candidate.text_len().to_usize();
            let mode = candidate.next_lex_mode();
            version.stack.push(next, candidate);
            version.lookahead = Some(self.lexer.next_token(version.position(), mode));
            return true;
        }
        false
    }

    /// Repair a failed version. Returns the repaired version, or `None` if
    /// the repair finished the parse.
    fn recover(&mut self, mut version: Version, finished: &mut Vec<Finished>) -> Option<Version> {
        let lookahead = self.lookahead(&mut version);
        self.stats.recoveries += 1;
        version.error_cost += 1;

        let mut window = vec![lookahead.clone()];
        let error_mode = self.table.error_lex_mode();
        while window.len() <= self.options.max_recovery_skip {
            let Some(last) = window.last() else { break };
            if last.token.is_end() {
                break;
            }
            let next = self.lexer.next_token(last.token.end(), error_mode);
            window.push(next);
        }
        let tokens: Vec<Token> = window.iter().map(|lookahead| lookahead.token).collect();
        let states = version.stack.states();

        match find_repair(self.table, &states, &tokens, self.options.max_recovery_depth) {
            Some(Repair { depth, skip }) => {
                tracing::debug!(
                    offset = lookahead.token.start_byte(),
                    depth,
                    skip,
                    "recovered from syntax error"
                );
                let popped = version.stack.pop(depth).unwrap_or_default();
                let state = version.state();
                let mut children: Vec<(Arc<GreenNode>, Option<FieldId>)> =
                    popped.into_iter().map(|popped| (popped.node, None)).collect();
                let mut skipped = window[..skip].iter();
                if children.is_empty() {
                    if let Some(first) = skipped.next() {
                        Self::push_trivia(&mut version, first);
                        children.push((Self::leaf(&first.token, state), None));
                    }
                }
                for token in skipped {
                    Self::append_token(&mut children, token, state);
                }
                if !children.is_empty() {
                    let error = GreenNode::branch(Symbol::ERROR, children, state);
                    version.stack.push_extra(Arc::new(error));
                }
                version.lookahead = Some(window[skip].clone());
                Some(version)
            }
            None if lookahead.token.is_end() => {
                tracing::debug!(offset = lookahead.token.start_byte(), "no repair before end of input");
                let state = version.state();
                let mut children: Vec<(Arc<GreenNode>, Option<FieldId>)> = version
                    .stack
                    .nodes()
                    .into_iter()
                    .map(|popped| (popped.node, None))
                    .collect();
                children.extend(lookahead.trivia.iter().map(|trivia| (Self::trivia_leaf(trivia, state), None)));
                finished.push(Finished {
                    root: Arc::new(GreenNode::branch(Symbol::ERROR, children, StateId::NONE)),
                    error_cost: version.error_cost,
                    dynamic_precedence: version.dynamic_precedence,
                    order: version.order,
                });
                None
            }
            None => {
                tracing::debug!(offset = lookahead.token.start_byte(), "skipped unexpected token");
                Self::push_trivia(&mut version, &lookahead);
                let state = version.state();
                let children = [(Self::leaf(&lookahead.token, state), None)];
                version
                    .stack
                    .push_extra(Arc::new(GreenNode::branch(Symbol::ERROR, children, state)));
                version.lookahead = None;
                Some(version)
            }
        }
    }

    /// Final tree for a version that cannot advance: its stack, then the
    /// rest of the text as one error token.
    fn abandon(&self, version: &Version) -> Finished {
        let state = version.state();
        let mut children: Vec<(Arc<GreenNode>, Option<FieldId>)> = version
            .stack
            .nodes()
            .into_iter()
            .map(|popped| (popped.node, None))
            .collect();
        let text = self.lexer.text();
        let position = version.position().byte_len().min(text.len());
        if position < text.len() {
            let rest = Arc::new(GreenNode::leaf(Symbol::ERROR, Length::of(&text[position..]), state, 1));
            children.push((rest, None));
        }
        Finished {
            root: Arc::new(GreenNode::branch(Symbol::ERROR, children, StateId::NONE)),
            error_cost: version.error_cost + 1,
            dynamic_precedence: version.dynamic_precedence,
            order: version.order,
        }
    }

    fn append_token(children: &mut Vec<(Arc<GreenNode>, Option<FieldId>)>, lookahead: &Lookahead, state: StateId) {
        children.extend(lookahead.trivia.iter().map(|trivia| (Self::trivia_leaf(trivia, state), None)));
        children.push((Self::leaf(&lookahead.token, state), None));
    }

    /// Partial tree for a cancelled parse: the stack of the best live
    /// version under an `ERROR` root.
    fn cancelled(&self, active: &[Version], finished: &[Finished], reason: CancelReason) -> Outcome {
        tracing::debug!(%reason, "parse cancelled");
        if let Some(best) = active.iter().min_by(|a, b| compare(a, b)) {
            let children = best.stack.nodes().into_iter().map(|popped| (popped.node, None));
            return Outcome::Cancelled(
                Arc::new(GreenNode::branch(Symbol::ERROR, children, StateId::NONE)),
                reason,
            );
        }
        let root = finished
            .iter()
            .min_by(|a, b| a.compare(b))
            .map(|best| best.root.clone())
            .unwrap_or_else(|| Arc::new(GreenNode::branch(Symbol::ERROR, [], StateId::NONE)));
        Outcome::Cancelled(root, reason)
    }
}
