use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\b[a-z]{2,}\b").expect("valid regex");
    static ref NON_LETTER: Regex = Regex::new(r"[^a-z\s]").expect("valid regex");
}

/// Lowercases and removes diacritics by dropping combining marks after NFD.
pub fn fold(text: &str) -> String {
    text.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Tokenize document text into lowercase ASCII words of two letters or more.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = fold(text);
    WORD.find_iter(&folded).map(|m| m.as_str().to_string()).collect()
}

/// Normalize raw query text into the uppercase, space-separated form the
/// query-set file carries.
pub fn normalize_query(text: &str) -> String {
    let folded = fold(text);
    let letters = NON_LETTER.replace_all(&folded, "");
    letters.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}
