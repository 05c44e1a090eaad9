//! Keyword extraction from page text.
//!
//! A keyword is a whole-word run of ASCII letters, at least
//! [`MIN_KEYWORD_LEN`] long, case-folded to lowercase. Words glued to digits
//! or to non-ASCII letters are not keywords at all.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use serpcluster_shared::KeywordSet;

/// Minimum number of letters in a keyword.
pub const MIN_KEYWORD_LEN: usize = 4;

static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\b[a-z]{{{MIN_KEYWORD_LEN},}}\b")).expect("valid regex")
});

/// Extract the de-duplicated keyword set of `text`. Total over any input.
pub fn extract(text: &str) -> KeywordSet {
    let mut keywords = KeywordSet::new();
    extract_into(&mut keywords, text);
    keywords
}

/// Union the keywords of `text` into an existing set.
/// Returns how many keywords were new to the set.
pub fn extract_into(keywords: &mut KeywordSet, text: &str) -> usize {
    let lowered = text.to_lowercase();
    let before = keywords.len();

    for m in KEYWORD_RE.find_iter(&lowered) {
        if !keywords.contains(m.as_str()) {
            keywords.insert(m.as_str().to_string());
        }
    }

    let added = keywords.len() - before;
    trace!(chars = text.len(), added, total = keywords.len(), "keywords extracted");
    added
}
