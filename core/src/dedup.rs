use crate::document::DocId;
use crate::index::SearchServer;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Remove documents whose set of distinct words matches an earlier document.
///
/// Ids are visited in ascending order, so the lowest id of each group
/// survives. Returns the removed ids, ascending.
pub fn remove_duplicates(search_server: &mut SearchServer) -> Vec<DocId> {
    let mut seen: BTreeMap<BTreeSet<Arc<str>>, DocId> = BTreeMap::new();
    let mut duplicates = Vec::new();
    for document_id in search_server.document_ids() {
        let words: BTreeSet<Arc<str>> = search_server.get_word_frequencies(document_id).keys().cloned().collect();
        match seen.get(&words) {
            Some(&original) => {
                info!(document_id, original, "Found duplicate document id {document_id}");
                duplicates.push(document_id);
            }
            None => {
                seen.insert(words, document_id);
            }
        }
    }
    for &document_id in &duplicates {
        // ids come from the engine itself, so removal cannot miss
        if let Err(err) = search_server.remove_document(document_id) {
            warn!(document_id, %err, "duplicate vanished before removal");
        }
    }
    duplicates
}
