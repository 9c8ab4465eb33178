use crate::document::{DocId, Document, DocumentStatus};
use crate::error::Result;
use crate::index::SearchServer;
use std::collections::VecDeque;

/// Number of requests kept: one per minute of a day.
pub const MIN_IN_DAY: usize = 1440;

#[derive(Debug, Clone)]
struct QueryResult {
    request: String,
    is_empty: bool,
}

/// Sliding log of the most recent requests against one engine.
#[derive(Debug)]
pub struct RequestQueue<'s> {
    search_server: &'s SearchServer,
    requests: VecDeque<QueryResult>,
    no_result_requests: usize,
}

impl<'s> RequestQueue<'s> {
    pub fn new(search_server: &'s SearchServer) -> Self {
        Self { search_server, requests: VecDeque::with_capacity(MIN_IN_DAY), no_result_requests: 0 }
    }

    pub fn add_find_request_by<P>(&mut self, raw_query: &str, predicate: P) -> Result<Vec<Document>>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool + Sync,
    {
        let documents = self.search_server.find_top_documents_by(raw_query, predicate)?;
        self.record(raw_query, documents.is_empty());
        Ok(documents)
    }

    pub fn add_find_request_by_status(&mut self, raw_query: &str, status: DocumentStatus) -> Result<Vec<Document>> {
        self.add_find_request_by(raw_query, move |_, document_status, _| document_status == status)
    }

    pub fn add_find_request(&mut self, raw_query: &str) -> Result<Vec<Document>> {
        self.add_find_request_by_status(raw_query, DocumentStatus::Actual)
    }

    /// Requests inside the window that returned nothing.
    pub fn no_result_requests(&self) -> usize { self.no_result_requests }

    /// Raw queries inside the window, oldest first.
    pub fn requests(&self) -> impl Iterator<Item = &str> + '_ { self.requests.iter().map(|r| r.request.as_str()) }

    pub fn len(&self) -> usize { self.requests.len() }

    pub fn is_empty(&self) -> bool { self.requests.is_empty() }

    fn record(&mut self, raw_query: &str, is_empty: bool) {
        if self.requests.len() == MIN_IN_DAY {
            if let Some(oldest) = self.requests.pop_front() {
                if oldest.is_empty {
                    self.no_result_requests -= 1;
                }
            }
        }
        if is_empty {
            self.no_result_requests += 1;
        }
        self.requests.push_back(QueryResult { request: raw_query.to_string(), is_empty });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> SearchServer {
        let mut server = SearchServer::from_stop_words_text("and in at").unwrap();
        server.add_document(1, "curly cat curly tail", DocumentStatus::Actual, &[7, 2, 7]).unwrap();
        server.add_document(2, "curly dog and fancy collar", DocumentStatus::Actual, &[1, 2, 3]).unwrap();
        server.add_document(3, "big cat fancy collar ", DocumentStatus::Actual, &[1, 2, 8]).unwrap();
        server.add_document(4, "big dog sparrow Eugene", DocumentStatus::Actual, &[1, 3, 2]).unwrap();
        server.add_document(5, "big dog sparrow Vasiliy", DocumentStatus::Actual, &[1, 1, 1]).unwrap();
        server
    }

    #[test]
    fn old_requests_fall_out_of_the_window() {
        let server = server();
        let mut queue = RequestQueue::new(&server);
        for _ in 0..1439 {
            queue.add_find_request("empty request").unwrap();
        }
        assert_eq!(queue.no_result_requests(), 1439);
        queue.add_find_request("curly dog").unwrap();
        assert_eq!(queue.no_result_requests(), 1439);
        queue.add_find_request("big collar").unwrap();
        assert_eq!(queue.no_result_requests(), 1438);
        queue.add_find_request("sparrow").unwrap();
        assert_eq!(queue.no_result_requests(), 1437);
        assert_eq!(queue.len(), MIN_IN_DAY);
        assert_eq!(queue.requests().last(), Some("sparrow"));
    }

    #[test]
    fn failed_requests_are_not_recorded() {
        let server = server();
        let mut queue = RequestQueue::new(&server);
        assert!(queue.add_find_request("--curly").is_err());
        assert!(queue.is_empty());
    }

    #[test]
    fn status_filter_is_forwarded() {
        let server = server();
        let mut queue = RequestQueue::new(&server);
        let docs = queue.add_find_request_by_status("curly", DocumentStatus::Banned).unwrap();
        assert!(docs.is_empty());
        assert_eq!(queue.no_result_requests(), 1);
    }
}
