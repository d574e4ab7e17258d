// Whole-word mention matching for the country and region coverage tables.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Countries counted by name alongside the site-list regions. "US" is
/// matched case-sensitively so the pronoun "us" does not count.
pub const NAMED_REGIONS: &[(&str, bool)] = &[
    ("US", false),
    ("China", true),
    ("Russia", true),
    ("Ukraine", true),
];

/// Number of articles mentioning one country or region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionCount {
    pub name: String,
    pub articles: usize,
}

/// Matches `term` as a whole word (or phrase). None for a blank term.
pub fn mention_pattern(term: &str, case_insensitive: bool) -> Option<Regex> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let flags = if case_insensitive { "(?i)" } else { "" };
    Regex::new(&format!(r"{flags}\b{}\b", regex_lite::escape(term))).ok()
}

/// Most mentioned first, ties by name.
pub(crate) fn rank(mut rows: Vec<MentionCount>) -> Vec<MentionCount> {
    rows.sort_by(|a, b| b.articles.cmp(&a.articles).then_with(|| a.name.cmp(&b.name)));
    rows
}
