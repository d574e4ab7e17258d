// Tokenization: lowercase, pull out runs of two or more word characters,
// drop stop words.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex_lite::Regex;
use stop_words::{get, LANGUAGE};

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is a valid regex"));

/// Which stop words to strip before building a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopWords {
    /// The English list shipped with the `stop-words` crate
    #[default]
    English,
    /// Keep every token
    None,
    /// An explicit list (compared after lowercasing)
    Custom(BTreeSet<String>),
}

impl StopWords {
    /// Build a custom stop-word set from any list of words.
    pub fn custom<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StopWords::Custom(
            words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        )
    }

    /// Parse the config form: `english`, `none`, or a comma-separated list.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "english" | "" => StopWords::English,
            "none" => StopWords::None,
            _ => StopWords::custom(value.split(',')),
        }
    }

    fn resolve(&self) -> HashSet<String> {
        match self {
            StopWords::English => get(LANGUAGE::English)
                .iter()
                .map(|w| w.to_string().to_lowercase())
                .collect(),
            StopWords::None => HashSet::new(),
            StopWords::Custom(words) => words.iter().cloned().collect(),
        }
    }
}

/// Splits document text into vocabulary candidates.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stop_words: HashSet<String>,
}

impl Tokenizer {
    pub fn new(stop_words: &StopWords) -> Self {
        Self {
            stop_words: stop_words.resolve(),
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        TOKEN_PATTERN
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|tok| !self.stop_words.contains(*tok))
            .map(str::to_string)
            .collect()
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_drops_short_tokens() {
        let tok = Tokenizer::new(&StopWords::None);
        assert_eq!(
            tok.tokenize("Stocks RALLY, a 5% surge!"),
            vec!["stocks", "rally", "surge"]
        );
    }

    #[test]
    fn test_custom_stop_words_are_removed() {
        let tok = Tokenizer::new(&StopWords::custom(["as", "This"]));
        assert_eq!(
            tok.tokenize("stocks rally as markets surge this week"),
            vec!["stocks", "rally", "markets", "surge", "week"]
        );
        assert!(tok.is_stop_word("THIS"));
    }

    #[test]
    fn test_english_list_removes_common_words() {
        let tok = Tokenizer::new(&StopWords::English);
        let tokens = tok.tokenize("the weather and the markets");
        assert!(!tokens.contains(&"the".to_string()));
        assert!(!tokens.contains(&"and".to_string()));
        assert!(tokens.iter().all(|t| t == "weather" || t == "markets"));
    }

    #[test]
    fn test_parse_stop_word_setting() {
        assert_eq!(StopWords::parse("english"), StopWords::English);
        assert_eq!(StopWords::parse("NONE"), StopWords::None);
        assert_eq!(
            StopWords::parse("as, this ,after"),
            StopWords::custom(["as", "this", "after"])
        );
    }
}
