use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;
pub type DocId = u32;

/// One (term, document, frequency) fact, produced during chunk building.
/// Chunk files are flat sequences of these, sorted by term_id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub term_id: TermId,
    pub doc_id: DocId,
    pub freq: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocEntry {
    /// Original file name of the document.
    pub name: String,
    /// L2 norm of the document's term-frequency vector, fixed at chunk time.
    pub norm: f64,
}

pub type DocTable = HashMap<DocId, DocEntry>;

/// Where a term's posting list lives in `index.bin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabEntry {
    pub offset: u64,
    pub count: u32,
    pub term_id: TermId,
    /// (offset into skips.bin, entry count), present once skip lists are built.
    pub skips: Option<(u64, u32)>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Vocabulary {
    pub entries: HashMap<String, VocabEntry>,
    /// Terms in id order (index == term_id), so passes over the index can
    /// follow allocation order without sorting.
    pub terms: Vec<String>,
}

impl Vocabulary {
    pub fn get(&self, term: &str) -> Option<&VocabEntry> {
        self.entries.get(term)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Single owner of the term -> id mapping for one indexing run. Ids are
/// dense, assigned in first-seen order, and never reused; every chunk of the
/// run allocates through the same instance.
#[derive(Debug, Default)]
pub struct TermAllocator {
    ids: HashMap<String, TermId>,
    terms: Vec<String>,
}

impl TermAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_assign(&mut self, term: &str) -> TermId {
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        let id = self.terms.len() as TermId;
        self.ids.insert(term.to_string(), id);
        self.terms.push(term.to_string());
        id
    }

    pub fn get(&self, term: &str) -> Option<TermId> {
        self.ids.get(term).copied()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms in id order; `terms()[id as usize] == term` for every assigned id.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn into_terms(self) -> Vec<String> {
        self.terms
    }
}
