//! Error types for the search engine.
//!
//! Every failure is caused by caller input and is reported before any index
//! mutation, so the engine stays usable after an error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Malformed stop word, document text, query token, or an unusable document id.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Lookup of a document id or position that does not exist.
    #[error("{0} is out of range")]
    OutOfRange(String),
}

impl SearchError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self { SearchError::InvalidInput(msg.into()) }

    pub(crate) fn out_of_range(what: impl Into<String>) -> Self { SearchError::OutOfRange(what.into()) }
}
