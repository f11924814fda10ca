//! Ranking of competing parse versions.
//!
//! A version is preferred when it has fewer error nodes, then when the
//! productions it reduced have a higher total precedence, then when it was
//! created earlier. The same order decides merges, pruning and the final
//! tree, so ambiguous input always resolves the same way.

use crate::parser::version::Version;
use std::cmp::Ordering;

pub(crate) fn compare(a: &Version, b: &Version) -> Ordering {
    rank(a.error_cost, a.dynamic_precedence, a.order, b.error_cost, b.dynamic_precedence, b.order)
}

pub(crate) fn rank(
    a_errors: u32,
    a_precedence: i32,
    a_order: u64,
    b_errors: u32,
    b_precedence: i32,
    b_order: u64,
) -> Ordering {
    a_errors
        .cmp(&b_errors)
        .then_with(|| b_precedence.cmp(&a_precedence))
        .then_with(|| a_order.cmp(&b_order))
}

/// Drop versions equivalent to a preferred one. Returns how many were merged.
pub(crate) fn merge(versions: &mut Vec<Version>) -> usize {
    versions.sort_by(compare);
    let mut kept: Vec<Version> = Vec::with_capacity(versions.len());
    let mut merged = 0;
    for version in versions.drain(..) {
        if kept.iter().any(|better| better.is_equivalent(&version)) {
            tracing::trace!(order = version.order, state = version.state().0, "version merged");
            merged += 1;
        } else {
            kept.push(version);
        }
    }
    *versions = kept;
    merged
}

/// Keep at most `max` versions, dropping the least preferred. Expects the
/// versions to be sorted by [`compare`]. Returns how many were dropped.
pub(crate) fn prune(versions: &mut Vec<Version>, max: usize) -> usize {
    let max = max.max(1);
    if versions.len() <= max {
        return 0;
    }
    let dropped = versions.len() - max;
    versions.truncate(max);
    dropped
}
