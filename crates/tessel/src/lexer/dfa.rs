//! Multi-pattern token automaton.
//!
//! All terminal patterns are compiled into one anchored DFA that reports
//! every pattern matching at each position. The DFA is stored in sparse
//! form, which is also the representation written into compiled blobs.

use regex_automata::dfa::{dense, sparse, Automaton, StartKind};
use regex_automata::{Anchored, Input, MatchKind};

#[derive(Debug, Clone)]
pub(crate) struct TokenDfa {
    dfa: sparse::DFA<Vec<u8>>,
}

impl TokenDfa {
    pub fn build<P: AsRef<str>>(patterns: &[P]) -> Result<Self, String> {
        let dense = dense::Builder::new()
            .configure(
                dense::DFA::config()
                    .match_kind(MatchKind::All)
                    .start_kind(StartKind::Anchored),
            )
            .build_many(patterns)
            .map_err(|err| err.to_string())?;
        let dfa = dense.to_sparse().map_err(|err| err.to_string())?;
        tracing::trace!(
            patterns = patterns.len(),
            bytes = dfa.memory_usage(),
            "token automaton built"
        );
        Ok(Self { dfa })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let (dfa, _) = sparse::DFA::from_bytes(bytes).map_err(|err| err.to_string())?;
        Ok(Self { dfa: dfa.to_owned() })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.dfa.to_bytes_little_endian()
    }

    pub fn pattern_count(&self) -> usize {
        self.dfa.pattern_len()
    }

    /// Run the automaton from `pos`, storing in `ends[p]` the end of the
    /// longest match of pattern `p`.
    ///
    /// Returns one past the last position the automaton looked at. Reading
    /// the end of input counts as looking at position `text.len()`.
    pub fn scan(&self, text: &[u8], pos: usize, ends: &mut [Option<usize>]) -> usize {
        let input = Input::new(text).range(pos..).anchored(Anchored::Yes);
        let Ok(mut state) = self.dfa.start_state_forward(&input) else {
            return pos + 1;
        };
        for (at, &byte) in text.iter().enumerate().skip(pos) {
            state = self.dfa.next_state(state, byte);
            if self.dfa.is_special_state(state) {
                // Matches are reported one byte late: this state means a
                // match ended just before `byte`.
                if self.dfa.is_match_state(state) {
                    self.record(state, at, ends);
                } else if self.dfa.is_dead_state(state) || self.dfa.is_quit_state(state) {
                    return at + 1;
                }
            }
        }
        state = self.dfa.next_eoi_state(state);
        if self.dfa.is_match_state(state) {
            self.record(state, text.len(), ends);
        }
        text.len() + 1
    }

    fn record(&self, state: regex_automata::util::primitives::StateID, end: usize, ends: &mut [Option<usize>]) {
        for index in 0..self.dfa.match_len(state) {
            if let Some(slot) = ends.get_mut(self.dfa.match_pattern(state, index).as_usize()) {
                *slot = Some(end);
            }
        }
    }
}
