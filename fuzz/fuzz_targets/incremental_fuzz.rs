#![no_main]
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tessel::{InputEdit, Language, Parser};

fn language() -> &'static Language {
    static LANGUAGE: OnceLock<Language> = OnceLock::new();
    LANGUAGE.get_or_init(|| tessel_p::load_language().expect("embedded P language loads"))
}

// Input layout: two bytes for the edit start, one for its length, the rest
// split evenly into the original text and the replacement.
fuzz_target!(|data: &[u8]| {
    let [a, b, len, rest @ ..] = data else {
        return;
    };
    let (text, replacement) = rest.split_at(rest.len() / 2);
    let start = usize::from(u16::from_le_bytes([*a, *b])) % (text.len() + 1);
    let end = (start + usize::from(*len)).min(text.len());

    let mut parser = Parser::new(language().clone());
    let Ok(old_tree) = parser.parse(text, None) else {
        return;
    };
    let (new_text, edit) = InputEdit::replace(text, start..end, replacement);
    let edited = old_tree.edit(&edit);
    assert_eq!(edited.root_node().end_byte(), new_text.len());

    let Ok(incremental) = parser.parse(&new_text, Some(&edited)) else {
        return;
    };
    let Ok(fresh) = parser.parse(&new_text, None) else {
        return;
    };
    assert!(
        incremental.structurally_eq(&fresh),
        "incremental reparse differs from a fresh parse\nincremental: {}\nfresh: {}",
        incremental.to_sexp(),
        fresh.to_sexp()
    );
});
