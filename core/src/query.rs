use crate::error::{Result, SearchError};
use crate::tokenizer::{is_valid_word, split_into_words, StopWords};

/// Parsed search request. Words borrow from the raw query text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query<'q> {
    /// Words a document must contain to score; sorted and unique.
    pub plus_words: Vec<&'q str>,
    /// Words that disqualify a document; sorted and unique.
    pub minus_words: Vec<&'q str>,
}

struct QueryWord<'q> {
    data: &'q str,
    is_minus: bool,
    is_stop: bool,
}

fn parse_query_word<'q>(token: &'q str, stop_words: &StopWords) -> Result<QueryWord<'q>> {
    let (data, is_minus) = match token.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (token, false),
    };
    if data.is_empty() || data.starts_with('-') || !is_valid_word(data) {
        return Err(SearchError::invalid(format!("query word {token:?} is invalid")));
    }
    Ok(QueryWord { data, is_minus, is_stop: stop_words.contains(data) })
}

/// Parse raw query text into plus and minus words.
///
/// A leading `-` marks an excluded word. Stop words are dropped after the
/// sign is parsed, so `-the` is ignored rather than excluded.
pub fn parse_query<'q>(text: &'q str, stop_words: &StopWords) -> Result<Query<'q>> {
    let mut query = Query::default();
    for token in split_into_words(text) {
        let word = parse_query_word(token, stop_words)?;
        if word.is_stop { continue; }
        if word.is_minus {
            query.minus_words.push(word.data);
        } else {
            query.plus_words.push(word.data);
        }
    }
    query.plus_words.sort_unstable();
    query.plus_words.dedup();
    query.minus_words.sort_unstable();
    query.minus_words.dedup();
    Ok(query)
}
