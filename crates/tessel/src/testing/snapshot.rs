//! # Snapshot Testing
//!
//! Compares trees against `.snap` files holding their S-expression, or their
//! indented dump when the source text is given.
//!
//! ```rust,ignore
//! use tessel::testing::SnapshotTester;
//!
//! let tester = SnapshotTester::new("tests/snapshots");
//! tester.assert_tree("sum_left_assoc", &tree);
//! ```
//!
//! Run with `UPDATE_SNAPSHOTS=1` to write the current output instead of
//! comparing.

use crate::tree::Tree;
use std::fmt::Write;
use std::path::PathBuf;

/// Snapshot tester for parse trees
#[derive(Debug, Clone)]
pub struct SnapshotTester {
    snapshot_dir: PathBuf,
    update_mode: bool,
}

impl SnapshotTester {
    #[must_use]
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        let update_mode = std::env::var_os("UPDATE_SNAPSHOTS").is_some()
            || std::env::var_os("TESSEL_UPDATE_SNAPSHOTS").is_some();
        Self {
            snapshot_dir: snapshot_dir.into(),
            update_mode,
        }
    }

    #[must_use]
    pub const fn with_update_mode(mut self, update: bool) -> Self {
        self.update_mode = update;
        self
    }

    /// Assert that the S-expression of `tree` matches the snapshot.
    ///
    /// # Panics
    /// Panics if the snapshot is missing or differs, unless update mode is on.
    pub fn assert_tree(&self, name: &str, tree: &Tree) {
        let mut actual = tree.to_sexp();
        actual.push('\n');
        self.check_snapshot(name, &actual);
    }

    /// Assert that the indented dump of `tree` over `source` matches the
    /// snapshot.
    ///
    /// # Panics
    /// Panics if the snapshot is missing or differs, unless update mode is on.
    pub fn assert_dump(&self, name: &str, tree: &Tree, source: &[u8]) {
        self.check_snapshot(name, &tree.debug_dump(Some(source)));
    }

    /// Assert that the syntax errors of `tree` match the snapshot.
    ///
    /// # Panics
    /// Panics if the snapshot is missing or differs, unless update mode is on.
    pub fn assert_errors(&self, name: &str, tree: &Tree) {
        let mut actual = String::new();
        for error in tree.errors() {
            let _ = writeln!(actual, "{}: {}", error.range, error);
        }
        self.check_snapshot(name, &actual);
    }

    fn check_snapshot(&self, name: &str, actual: &str) {
        let path = self.snapshot_dir.join(format!("{name}.snap"));

        if self.update_mode {
            std::fs::create_dir_all(&self.snapshot_dir).expect("Failed to create snapshot directory");
            std::fs::write(&path, actual).expect("Failed to write snapshot");
            return;
        }

        match std::fs::read_to_string(&path) {
            Ok(expected) => assert!(
                actual == expected,
                "Snapshot mismatch for '{name}':\n\
                --- Expected ---\n{expected}\n\
                --- Actual ---\n{actual}\n\
                \n\
                To update snapshots, run with UPDATE_SNAPSHOTS=1"
            ),
            Err(_) => panic!(
                "Snapshot '{name}' not found at {}.\n\
                To create it, run with UPDATE_SNAPSHOTS=1",
                path.display()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::*;
    use crate::{parse, Language};

    fn tree() -> Tree {
        let grammar = GrammarBuilder::new("pairs")
            .rule("pairs", repeat(sym("pair")))
            .rule("pair", seq([sym("key"), lit(":"), sym("key")]))
            .token("key", pat("[a-z]+"))
            .extra(pat(r"\s+"))
            .build()
            .unwrap();
        parse(&Language::compile(&grammar).unwrap(), b"a: b", None)
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tessel-snapshots-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_update_then_compare() {
        let dir = scratch_dir("roundtrip");
        SnapshotTester::new(&dir).with_update_mode(true).assert_tree("pairs", &tree());
        let written = std::fs::read_to_string(dir.join("pairs.snap")).unwrap();
        assert_eq!(written, "(pairs (pair (key) (key)))\n");
        SnapshotTester::new(&dir).with_update_mode(false).assert_tree("pairs", &tree());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[should_panic(expected = "not found")]
    fn test_missing_snapshot_panics() {
        let dir = scratch_dir("missing");
        SnapshotTester::new(dir).with_update_mode(false).assert_tree("absent", &tree());
    }
}
