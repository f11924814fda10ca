use serde::{Deserialize, Serialize};

/// Bit set over terminal ids.
///
/// Used for FIRST sets, LALR lookaheads and lex modes. Sets that are
/// compared or hashed must be created with the same capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalSet {
    words: Vec<u64>,
}

impl TerminalSet {
    #[must_use]
    pub fn with_capacity(terminals: usize) -> Self {
        Self {
            words: vec![0; terminals.div_ceil(64)],
        }
    }

    /// Insert `terminal`, returning whether the set changed.
    pub fn insert(&mut self, terminal: usize) -> bool {
        let (word, bit) = (terminal / 64, terminal % 64);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let before = self.words[word];
        self.words[word] |= 1 << bit;
        before != self.words[word]
    }

    #[must_use]
    pub fn contains(&self, terminal: usize) -> bool {
        self.words
            .get(terminal / 64)
            .is_some_and(|word| word & (1 << (terminal % 64)) != 0)
    }

    /// Add every member of `other`, returning whether the set changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (word, theirs) in self.words.iter_mut().zip(&other.words) {
            let merged = *word | theirs;
            changed |= merged != *word;
            *word = merged;
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(index * 64 + bit)
            })
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_iterate_in_order() {
        let mut set = TerminalSet::with_capacity(130);
        assert!(set.insert(129));
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert!(set.insert(64));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 64, 129]);
        assert_eq!(set.len(), 3);
        assert!(set.contains(64));
        assert!(!set.contains(65));
        assert!(!set.contains(1000));
    }

    #[test]
    fn test_union_reports_change() {
        let mut a = TerminalSet::with_capacity(10);
        let mut b = TerminalSet::with_capacity(10);
        a.insert(1);
        b.insert(1);
        assert!(!a.union_with(&b));
        b.insert(7);
        assert!(a.union_with(&b));
        assert_eq!(a, b);
    }
}
