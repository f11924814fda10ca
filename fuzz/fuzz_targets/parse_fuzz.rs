#![no_main]
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tessel::testing::check_coverage;
use tessel::Language;

fn language() -> &'static Language {
    static LANGUAGE: OnceLock<Language> = OnceLock::new();
    LANGUAGE.get_or_init(|| tessel_p::load_language().expect("embedded P language loads"))
}

// Any byte string parses into a tree that covers it exactly, and parsing
// is deterministic.
fuzz_target!(|data: &[u8]| {
    let tree = tessel::parse(language(), data, None);
    if let Err(err) = check_coverage(&tree, data.len()) {
        panic!("coverage broken: {err}\n{}", tree.debug_dump(Some(data)));
    }
    let again = tessel::parse(language(), data, None);
    assert!(tree.structurally_eq(&again), "parse is not deterministic");
    for error in tree.errors() {
        assert!(error.range.end().to_usize() <= data.len());
    }
});
