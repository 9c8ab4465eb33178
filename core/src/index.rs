use crate::concurrent_map::ConcurrentMap;
use crate::document::{DocId, Document, DocumentStatus};
use crate::error::{Result, SearchError};
use crate::query::{parse_query, Query};
use crate::tokenizer::StopWords;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{btree_map, BTreeMap};
use std::sync::Arc;
use tracing::debug;

pub const MAX_RESULT_DOCUMENT_COUNT: usize = 5;

/// Relevances closer than this are treated as equal and ordered by rating.
pub const EPSILON: f64 = 1e-6;

const RELEVANCE_BUCKETS: usize = 100;

/// How the inner fan-out of a single call is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    #[default]
    Sequential,
    Parallel,
}

/// Term frequencies of one document, keyed by interned words.
pub type WordFreqs = BTreeMap<Arc<str>, f64>;

static EMPTY_WORD_FREQS: WordFreqs = BTreeMap::new();

#[derive(Debug, Clone, Copy)]
struct DocumentData {
    rating: i32,
    status: DocumentStatus,
}

/// In-memory TF-IDF search engine.
///
/// Keeps a forward index (word -> document -> tf) and a reverse index
/// (document -> word -> tf). Both are only mutated inside `add_document`
/// and `remove_document`, which keep them in lock-step. Every word is stored
/// once as an `Arc<str>` shared by both indices.
///
/// The engine is not internally synchronized: mutations take `&mut self`, so
/// callers that share it across threads serialize access themselves.
#[derive(Debug, Default)]
pub struct SearchServer {
    stop_words: StopWords,
    word_to_document_freqs: BTreeMap<Arc<str>, BTreeMap<DocId, f64>>,
    document_to_word_freqs: BTreeMap<DocId, WordFreqs>,
    documents: BTreeMap<DocId, DocumentData>,
}

impl SearchServer {
    pub fn new<I, S>(stop_words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self::with_stop_words(StopWords::new(stop_words)?))
    }

    /// Build from a space-separated stop word list, e.g. `"and in at"`.
    pub fn from_stop_words_text(text: &str) -> Result<Self> {
        Ok(Self::with_stop_words(StopWords::from_text(text)?))
    }

    pub fn with_stop_words(stop_words: StopWords) -> Self {
        Self { stop_words, ..Self::default() }
    }

    pub fn add_document(
        &mut self,
        document_id: DocId,
        document: &str,
        status: DocumentStatus,
        ratings: &[i32],
    ) -> Result<()> {
        if document_id < 0 {
            return Err(SearchError::invalid(format!("document id {document_id} is negative")));
        }
        if self.documents.contains_key(&document_id) {
            return Err(SearchError::invalid(format!("document id {document_id} already exists")));
        }
        let words = self.stop_words.split_no_stop(document)?;

        let inv_word_count = 1.0 / words.len() as f64;
        let mut word_freqs = WordFreqs::new();
        for word in &words {
            let key = self.intern(word);
            *word_freqs.entry(key).or_insert(0.0) += inv_word_count;
        }
        for (word, &tf) in &word_freqs {
            self.word_to_document_freqs
                .entry(Arc::clone(word))
                .or_default()
                .insert(document_id, tf);
        }
        self.document_to_word_freqs.insert(document_id, word_freqs);
        let rating = compute_average_rating(ratings);
        self.documents.insert(document_id, DocumentData { rating, status });
        debug!(document_id, words = words.len(), rating, ?status, "document added");
        Ok(())
    }

    /// Top documents with status `Actual`.
    pub fn find_top_documents(&self, raw_query: &str) -> Result<Vec<Document>> {
        self.find_top_documents_by_status(raw_query, DocumentStatus::Actual)
    }

    pub fn find_top_documents_by_status(&self, raw_query: &str, status: DocumentStatus) -> Result<Vec<Document>> {
        self.find_top_documents_by(raw_query, move |_, document_status, _| document_status == status)
    }

    pub fn find_top_documents_by<P>(&self, raw_query: &str, predicate: P) -> Result<Vec<Document>>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool + Sync,
    {
        self.find_top_documents_with(Execution::Sequential, raw_query, predicate)
    }

    /// Rank documents matching `raw_query` and accepted by `predicate`.
    ///
    /// Relevance is the sum of tf * idf over plus words. Documents holding any
    /// minus word are dropped. Results are ordered by relevance descending,
    /// with near-equal relevances ordered by rating, and capped at
    /// [`MAX_RESULT_DOCUMENT_COUNT`].
    pub fn find_top_documents_with<P>(&self, execution: Execution, raw_query: &str, predicate: P) -> Result<Vec<Document>>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool + Sync,
    {
        let query = parse_query(raw_query, &self.stop_words)?;
        let mut matched = match execution {
            Execution::Sequential => self.find_all_documents(&query, &predicate),
            Execution::Parallel => self.find_all_documents_par(&query, &predicate),
        };
        let hits = matched.len();
        match execution {
            Execution::Sequential => matched.sort_by(by_relevance_then_rating),
            Execution::Parallel => matched.par_sort_by(by_relevance_then_rating),
        }
        order_near_ties_by_rating(&mut matched);
        matched.truncate(MAX_RESULT_DOCUMENT_COUNT);
        debug!(
            plus = query.plus_words.len(),
            minus = query.minus_words.len(),
            ?execution,
            hits,
            "query evaluated"
        );
        Ok(matched)
    }

    pub fn document_count(&self) -> usize { self.documents.len() }

    /// Id at `index` in ascending id order.
    pub fn document_id(&self, index: usize) -> Result<DocId> {
        self.documents
            .keys()
            .nth(index)
            .copied()
            .ok_or_else(|| SearchError::out_of_range(format!("position {index}")))
    }

    /// Ascending ids of all present documents.
    pub fn document_ids(&self) -> DocumentIds<'_> { DocumentIds { inner: self.documents.keys() } }

    /// Term frequencies of one document; empty when the id is absent.
    pub fn get_word_frequencies(&self, document_id: DocId) -> &WordFreqs {
        self.document_to_word_freqs.get(&document_id).unwrap_or(&EMPTY_WORD_FREQS)
    }

    pub fn match_document(&self, raw_query: &str, document_id: DocId) -> Result<(Vec<&str>, DocumentStatus)> {
        self.match_document_with(Execution::Sequential, raw_query, document_id)
    }

    /// Plus words of `raw_query` present in the document, sorted. Empty when
    /// the document holds any minus word.
    pub fn match_document_with(
        &self,
        execution: Execution,
        raw_query: &str,
        document_id: DocId,
    ) -> Result<(Vec<&str>, DocumentStatus)> {
        let status = self
            .documents
            .get(&document_id)
            .map(|d| d.status)
            .ok_or_else(|| SearchError::out_of_range(format!("document {document_id}")))?;
        let query = parse_query(raw_query, &self.stop_words)?;
        let word_freqs = self.get_word_frequencies(document_id);
        let lookup = |word: &&str| word_freqs.get_key_value(*word).map(|(k, _)| &**k);

        let matched = match execution {
            Execution::Sequential => {
                if query.minus_words.iter().any(|w| word_freqs.contains_key(*w)) {
                    Vec::new()
                } else {
                    query.plus_words.iter().filter_map(lookup).collect()
                }
            }
            Execution::Parallel => {
                if query.minus_words.par_iter().any(|w| word_freqs.contains_key(*w)) {
                    Vec::new()
                } else {
                    let mut words: Vec<&str> = query.plus_words.par_iter().filter_map(lookup).collect();
                    words.par_sort_unstable();
                    words.dedup();
                    words
                }
            }
        };
        Ok((matched, status))
    }

    pub fn remove_document(&mut self, document_id: DocId) -> Result<()> {
        self.remove_document_with(Execution::Sequential, document_id)
    }

    /// Erase a document from both indices and the document table.
    pub fn remove_document_with(&mut self, execution: Execution, document_id: DocId) -> Result<()> {
        if !self.documents.contains_key(&document_id) {
            return Err(SearchError::out_of_range(format!("document {document_id}")));
        }
        let word_freqs = self.document_to_word_freqs.remove(&document_id).unwrap_or_default();
        match execution {
            Execution::Sequential => {
                for word in word_freqs.keys() {
                    if let Some(postings) = self.word_to_document_freqs.get_mut(word) {
                        postings.remove(&document_id);
                    }
                }
            }
            Execution::Parallel => {
                // BTreeMap cannot hand out several &mut by key, so fan out over
                // the whole index and touch only this document's words.
                self.word_to_document_freqs
                    .par_iter_mut()
                    .filter(|(word, _)| word_freqs.contains_key(*word))
                    .for_each(|(_, postings)| {
                        postings.remove(&document_id);
                    });
            }
        }
        for word in word_freqs.keys() {
            if self.word_to_document_freqs.get(word).is_some_and(BTreeMap::is_empty) {
                self.word_to_document_freqs.remove(word);
            }
        }
        self.documents.remove(&document_id);
        debug!(document_id, words = word_freqs.len(), ?execution, "document removed");
        Ok(())
    }

    fn intern(&self, word: &str) -> Arc<str> {
        match self.word_to_document_freqs.get_key_value(word) {
            Some((key, _)) => Arc::clone(key),
            None => Arc::from(word),
        }
    }

    fn inverse_document_freq(&self, documents_with_word: usize) -> f64 {
        (self.document_count() as f64 / documents_with_word as f64).ln()
    }

    fn find_all_documents<P>(&self, query: &Query<'_>, predicate: &P) -> Vec<Document>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool,
    {
        let mut document_to_relevance: BTreeMap<DocId, f64> = BTreeMap::new();
        for word in &query.plus_words {
            let Some(postings) = self.word_to_document_freqs.get(*word) else { continue };
            let idf = self.inverse_document_freq(postings.len());
            for (&document_id, &tf) in postings {
                let Some(data) = self.documents.get(&document_id) else { continue };
                if predicate(document_id, data.status, data.rating) {
                    *document_to_relevance.entry(document_id).or_insert(0.0) += tf * idf;
                }
            }
        }
        for word in &query.minus_words {
            let Some(postings) = self.word_to_document_freqs.get(*word) else { continue };
            for document_id in postings.keys() {
                document_to_relevance.remove(document_id);
            }
        }
        self.to_documents(document_to_relevance)
    }

    fn find_all_documents_par<P>(&self, query: &Query<'_>, predicate: &P) -> Vec<Document>
    where
        P: Fn(DocId, DocumentStatus, i32) -> bool + Sync,
    {
        let document_to_relevance: ConcurrentMap<DocId, f64> = ConcurrentMap::new(RELEVANCE_BUCKETS);
        query.plus_words.par_iter().for_each(|word| {
            let Some(postings) = self.word_to_document_freqs.get(*word) else { return };
            let idf = self.inverse_document_freq(postings.len());
            for (&document_id, &tf) in postings {
                let Some(data) = self.documents.get(&document_id) else { continue };
                if predicate(document_id, data.status, data.rating) {
                    *document_to_relevance.access(document_id) += tf * idf;
                }
            }
        });
        query.minus_words.par_iter().for_each(|word| {
            let Some(postings) = self.word_to_document_freqs.get(*word) else { return };
            for &document_id in postings.keys() {
                document_to_relevance.erase(document_id);
            }
        });
        self.to_documents(document_to_relevance.into_ordinary_map())
    }

    fn to_documents(&self, document_to_relevance: BTreeMap<DocId, f64>) -> Vec<Document> {
        document_to_relevance
            .into_iter()
            .filter_map(|(id, relevance)| self.documents.get(&id).map(|d| Document::new(id, relevance, d.rating)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a SearchServer {
    type Item = DocId;
    type IntoIter = DocumentIds<'a>;

    fn into_iter(self) -> DocumentIds<'a> { self.document_ids() }
}

/// Ascending iterator over present document ids.
#[derive(Clone)]
pub struct DocumentIds<'a> {
    inner: btree_map::Keys<'a, DocId, DocumentData>,
}

impl Iterator for DocumentIds<'_> {
    type Item = DocId;

    fn next(&mut self) -> Option<DocId> { self.inner.next().copied() }

    fn size_hint(&self) -> (usize, Option<usize>) { self.inner.size_hint() }
}

impl DoubleEndedIterator for DocumentIds<'_> {
    fn next_back(&mut self) -> Option<DocId> { self.inner.next_back().copied() }
}

impl ExactSizeIterator for DocumentIds<'_> {}

/// Mean of `ratings` truncated toward zero; 0 for no ratings.
fn compute_average_rating(ratings: &[i32]) -> i32 {
    if ratings.is_empty() {
        return 0;
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    (sum / ratings.len() as i64) as i32
}

fn by_relevance_then_rating(lhs: &Document, rhs: &Document) -> Ordering {
    rhs.relevance
        .total_cmp(&lhs.relevance)
        .then_with(|| rhs.rating.cmp(&lhs.rating))
        .then_with(|| lhs.id.cmp(&rhs.id))
}

/// Reorder runs of near-equal relevance by rating descending, then id ascending.
///
/// Input must already be sorted by relevance. A run holds every document
/// within [`EPSILON`] of the run's first (highest) relevance, so it never
/// spans more than `EPSILON`. Ordering inside a run ignores the exact
/// relevance, which keeps sequential and parallel sums in the same order.
fn order_near_ties_by_rating(documents: &mut [Document]) {
    let mut start = 0;
    while start < documents.len() {
        let head = documents[start].relevance;
        let mut end = start + 1;
        while end < documents.len() && head - documents[end].relevance < EPSILON {
            end += 1;
        }
        if end - start > 1 {
            documents[start..end].sort_by(|l, r| r.rating.cmp(&l.rating).then_with(|| l.id.cmp(&r.id)));
        }
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_rating_truncates_toward_zero() {
        assert_eq!(compute_average_rating(&[]), 0);
        assert_eq!(compute_average_rating(&[1, 2, 3]), 2);
        assert_eq!(compute_average_rating(&[3, 4]), 3);
        assert_eq!(compute_average_rating(&[-3, -4]), -3);
        assert_eq!(compute_average_rating(&[i32::MAX, i32::MAX]), i32::MAX);
    }

    #[test]
    fn near_ties_are_ordered_by_rating() {
        let mut docs = vec![
            Document::new(1, 0.5 + 1e-8, 1),
            Document::new(2, 0.5, 9),
            Document::new(3, 0.1, 7),
        ];
        docs.sort_by(by_relevance_then_rating);
        order_near_ties_by_rating(&mut docs);
        let ids: Vec<DocId> = docs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn last_bit_differences_do_not_reorder_ties() {
        let r = 0.3f64;
        let noisy = f64::from_bits(r.to_bits() + 1);
        let mut docs = vec![
            Document::new(7, r, 5),
            Document::new(2, noisy, 5),
            Document::new(4, r, 5),
            Document::new(9, noisy, 6),
        ];
        docs.sort_by(by_relevance_then_rating);
        order_near_ties_by_rating(&mut docs);
        let ids: Vec<DocId> = docs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![9, 2, 4, 7]);
    }

    #[test]
    fn tie_run_never_spans_more_than_epsilon() {
        let mut docs = vec![
            Document::new(1, 1.0, 1),
            Document::new(2, 1.0 - 0.9e-6, 1),
            Document::new(3, 1.0 - 1.8e-6, 9),
        ];
        docs.sort_by(by_relevance_then_rating);
        order_near_ties_by_rating(&mut docs);
        let ids: Vec<DocId> = docs.iter().map(|d| d.id).collect();
        // 3 is more than EPSILON below the run head, so it cannot jump ahead of 1
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn words_are_interned_once() {
        let mut server = SearchServer::new(["in"]).unwrap();
        server.add_document(1, "cat in cat", DocumentStatus::Actual, &[]).unwrap();
        server.add_document(2, "cat", DocumentStatus::Actual, &[]).unwrap();
        let (fwd_key, _) = server.word_to_document_freqs.get_key_value("cat").unwrap();
        let (rev_key, _) = server.get_word_frequencies(2).get_key_value("cat").unwrap();
        assert!(Arc::ptr_eq(fwd_key, rev_key));
        // one in the forward index, one per document
        assert_eq!(Arc::strong_count(fwd_key), 3);
    }

    #[test]
    fn removal_releases_unused_words() {
        let mut server = SearchServer::new(Vec::<String>::new()).unwrap();
        server.add_document(1, "solo word", DocumentStatus::Actual, &[]).unwrap();
        server.add_document(2, "word", DocumentStatus::Actual, &[]).unwrap();
        server.remove_document(1).unwrap();
        assert!(!server.word_to_document_freqs.contains_key("solo"));
        assert_eq!(server.word_to_document_freqs["word"].len(), 1);
    }

    #[test]
    fn parallel_removal_keeps_indices_in_step() {
        let mut server = SearchServer::new(Vec::<String>::new()).unwrap();
        server.add_document(1, "a b c", DocumentStatus::Actual, &[]).unwrap();
        server.add_document(2, "b c d", DocumentStatus::Actual, &[]).unwrap();
        server.remove_document_with(Execution::Parallel, 2).unwrap();
        let words: Vec<&str> = server.word_to_document_freqs.keys().map(|w| &**w).collect();
        assert_eq!(words, vec!["a", "b", "c"]);
        for postings in server.word_to_document_freqs.values() {
            assert_eq!(postings.keys().copied().collect::<Vec<_>>(), vec![1]);
        }
    }
}
