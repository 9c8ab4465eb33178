use crate::document::Document;
use crate::error::Result;
use crate::index::SearchServer;
use rayon::prelude::*;

/// Run every query in parallel against the default (`Actual`) filter.
/// Results keep the order of `queries`.
pub fn process_queries<S>(search_server: &SearchServer, queries: &[S]) -> Result<Vec<Vec<Document>>>
where
    S: AsRef<str> + Sync,
{
    queries
        .par_iter()
        .map(|query| search_server.find_top_documents(query.as_ref()))
        .collect()
}

/// Same as [`process_queries`], flattened into one sequence.
pub fn process_queries_joined<S>(search_server: &SearchServer, queries: &[S]) -> Result<Vec<Document>>
where
    S: AsRef<str> + Sync,
{
    Ok(process_queries(search_server, queries)?.into_iter().flatten().collect())
}
