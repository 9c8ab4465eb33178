pub mod concurrent_map;
pub mod dedup;
pub mod document;
pub mod error;
pub mod index;
pub mod paginator;
pub mod process_queries;
pub mod query;
pub mod request_queue;
pub mod tokenizer;

pub use concurrent_map::ConcurrentMap;
pub use dedup::remove_duplicates;
pub use document::{DocId, Document, DocumentStatus};
pub use error::{Result, SearchError};
pub use index::{DocumentIds, Execution, SearchServer, WordFreqs, EPSILON, MAX_RESULT_DOCUMENT_COUNT};
pub use paginator::{paginate, Page, Paginator};
pub use process_queries::{process_queries, process_queries_joined};
pub use request_queue::RequestQueue;
