//! Tokenisation and normalisation helpers shared by the checks.

use std::collections::BTreeSet;

/// Lower-cased word tokens: runs of ASCII letters, digits and apostrophes.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Token form used for near-duplicate detection: punctuation dropped,
/// words joined by single spaces.
pub fn token_normalize(text: &str) -> String {
    words(text).join(" ")
}

/// Case-folded text with whitespace runs collapsed.
pub fn whitespace_normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn content_words(text: &str) -> BTreeSet<String> {
    words(text).into_iter().filter(|w| w.len() > 2).collect()
}

/// Share of `choice`'s content words (longer than two characters) that
/// also occur in `stem`. Zero when either side has none.
pub fn lexical_overlap(stem: &str, choice: &str) -> f64 {
    let stem_words = content_words(stem);
    let choice_words = content_words(choice);
    if stem_words.is_empty() || choice_words.is_empty() {
        return 0.0;
    }
    let shared = stem_words.intersection(&choice_words).count();
    shared as f64 / choice_words.len() as f64
}
