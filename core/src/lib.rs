pub mod chunk;
pub mod compress;
pub mod error;
pub mod index;
pub mod merge;
pub mod persist;
pub mod postings;
pub mod query;
pub mod skiplist;
pub mod tokenizer;

pub use error::IndexError;
pub use index::{DocEntry, DocId, DocTable, Posting, TermAllocator, TermId, VocabEntry, Vocabulary};
