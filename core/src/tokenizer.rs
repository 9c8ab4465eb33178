use crate::error::{Result, SearchError};
use std::collections::BTreeSet;
use std::str::Split;

/// Lazy iterator over the space-separated words of a text.
///
/// Runs of spaces collapse and leading/trailing spaces are ignored. The
/// iterator is `Clone`, so a cloned copy restarts from the same position.
#[derive(Debug, Clone)]
pub struct SplitWords<'a> {
    inner: Split<'a, char>,
}

impl<'a> Iterator for SplitWords<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.inner.find(|w| !w.is_empty())
    }
}

/// Split `text` on ASCII spaces. No other normalization is applied.
pub fn split_into_words(text: &str) -> SplitWords<'_> {
    SplitWords { inner: text.split(' ') }
}

/// A word is valid when it holds no ASCII control characters (codes below space).
pub fn is_valid_word(word: &str) -> bool {
    !word.bytes().any(|b| b < b' ')
}

/// Immutable set of words excluded from indexing and querying.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: BTreeSet<String>,
}

impl StopWords {
    /// Build from any collection of words; empty entries are skipped, duplicates collapse.
    pub fn new<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for w in words {
            let w = w.as_ref();
            if w.is_empty() { continue; }
            if !is_valid_word(w) {
                return Err(SearchError::invalid(format!("stop word {w:?} is invalid")));
            }
            set.insert(w.to_string());
        }
        Ok(Self { words: set })
    }

    /// Build from a space-separated list, e.g. `"and in at"`.
    pub fn from_text(text: &str) -> Result<Self> { Self::new(split_into_words(text)) }

    pub fn contains(&self, word: &str) -> bool { self.words.contains(word) }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }

    /// Validate every word of a document and drop stop words. Fails on the
    /// first invalid word without yielding a partial result.
    pub fn split_no_stop<'a>(&self, text: &'a str) -> Result<Vec<&'a str>> {
        let mut words = Vec::new();
        for word in split_into_words(text) {
            if !is_valid_word(word) {
                return Err(SearchError::invalid(format!("word {word:?} is invalid")));
            }
            if !self.contains(word) {
                words.push(word);
            }
        }
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_spaces_only() {
        let words: Vec<&str> = split_into_words("  curly  cat\ttail ").collect();
        assert_eq!(words, vec!["curly", "cat\ttail"]);
    }

    #[test]
    fn split_is_restartable() {
        let it = split_into_words("a b c");
        let first: Vec<&str> = it.clone().collect();
        let second: Vec<&str> = it.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn rejects_control_characters() {
        assert!(is_valid_word("cat"));
        assert!(!is_valid_word("ca\u{12}t"));
        assert!(StopWords::new(["in", "th\u{1}e"]).is_err());
    }

    #[test]
    fn skips_empty_stop_words() {
        let stop = StopWords::new(["", "in", "in", "the"]).unwrap();
        assert_eq!(stop.len(), 2);
        assert!(stop.contains("the"));
    }
}
