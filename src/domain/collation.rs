//! Text ordering for listings
//!
//! Names and languages compare ignoring case and accents, so "Ágata" sorts
//! before "Bruno" and "alemão" before "Inglês". Equal keys fall back to the
//! raw bytes, keeping the order total.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercased `text` with diacritics removed
pub fn sort_key(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn compare_text(a: &str, b: &str) -> Ordering {
    sort_key(a).cmp(&sort_key(b)).then_with(|| a.cmp(b))
}
