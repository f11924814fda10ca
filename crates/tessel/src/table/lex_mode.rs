use crate::table::TerminalSet;
use hashbrown::HashMap;

/// Deduplicating collector of lex modes.
///
/// A lex mode is the set of terminals a state accepts. States with the same
/// set share one mode, so the lexer's token cache can be keyed by mode
/// instead of by state.
#[derive(Debug, Default)]
pub(crate) struct LexModeBuilder {
    modes: Vec<TerminalSet>,
    index: HashMap<TerminalSet, u16>,
}

impl LexModeBuilder {
    pub fn intern(&mut self, set: TerminalSet) -> u16 {
        if let Some(&mode) = self.index.get(&set) {
            return mode;
        }
        let mode = u16::try_from(self.modes.len()).unwrap_or(u16::MAX);
        self.modes.push(set.clone());
        self.index.insert(set, mode);
        mode
    }

    pub fn finish(self) -> Vec<TerminalSet> {
        self.modes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_sets_share_a_mode() {
        let mut builder = LexModeBuilder::default();
        let mut a = TerminalSet::with_capacity(8);
        a.insert(1);
        a.insert(4);
        let mut b = TerminalSet::with_capacity(8);
        b.insert(2);
        assert_eq!(builder.intern(a.clone()), 0);
        assert_eq!(builder.intern(b), 1);
        assert_eq!(builder.intern(a), 0);
        assert_eq!(builder.finish().len(), 2);
    }
}
