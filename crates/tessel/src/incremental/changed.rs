use crate::syntax::{GreenNode, TextRange, TextSize};
use crate::tree::Tree;
use std::sync::Arc;

/// Byte ranges, in the new text, where the structure of `new` differs from
/// `old`.
///
/// `old` must be the edited previous tree, so that both trees use the
/// coordinates of the new text. Subtrees shared between the two trees are
/// skipped without being visited. Adjacent and overlapping ranges are
/// merged; the result is sorted.
#[must_use]
pub fn changed_ranges(old: &Tree, new: &Tree) -> Vec<TextRange> {
    let mut ranges = Vec::new();
    let mut pending: Vec<(&Arc<GreenNode>, &Arc<GreenNode>, usize, usize)> = vec![(old.green(), new.green(), 0, 0)];
    while let Some((old, new, old_start, new_start)) = pending.pop() {
        if old_start == new_start && Arc::ptr_eq(old, new) {
            continue;
        }
        let same_shape = old_start == new_start
            && old.kind() == new.kind()
            && old.len().bytes == new.len().bytes
            && old.child_count() == new.child_count();
        if !same_shape {
            let start = old_start.min(new_start);
            let end = (old_start + old.len().byte_len()).max(new_start + new.len().byte_len());
            ranges.push(TextRange::new(TextSize::of(start), TextSize::of(end)));
            continue;
        }
        for (a, b) in old.children().iter().zip(new.children()) {
            pending.push((
                &a.node,
                &b.node,
                old_start + a.offset.byte_len(),
                new_start + b.offset.byte_len(),
            ));
        }
    }
    merge(ranges)
}

fn merge(mut ranges: Vec<TextRange>) -> Vec<TextRange> {
    ranges.sort_by_key(|range| (range.start(), range.end()));
    let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start() <= last.end() => *last = last.cover(range),
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    #[test]
    fn test_merge_joins_touching_ranges() {
        let merged = merge(vec![range(5, 7), range(0, 2), range(2, 3), range(6, 9)]);
        assert_eq!(merged, vec![range(0, 3), range(5, 9)]);
    }
}
