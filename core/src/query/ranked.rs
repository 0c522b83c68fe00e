//! Ranked retrieval. Both evaluation orders score with the same cosine:
//!
//!   score(d) = sum_t qf(t) * tf(t, d) / (|q| * |d|)
//!
//! where |d| is the document norm fixed at chunk time. DAAT walks candidate
//! documents against all posting lists at once; TAAT accumulates partial
//! products per document one term at a time. Same scores, same top-k.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::error::Result;
use crate::index::{DocId, DocTable, Vocabulary};
use crate::postings::PostingStore;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

impl Eq for ScoredDoc {}

impl Ord for ScoredDoc {
    /// Higher score is greater; on equal scores the lower doc id is
    /// greater, so ties resolve to ascending doc id deterministically.
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.doc_id.cmp(&self.doc_id))
    }
}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded top-k collector: a min-heap of the k best candidates seen.
struct TopK {
    k: usize,
    heap: BinaryHeap<std::cmp::Reverse<ScoredDoc>>,
}

impl TopK {
    fn new(k: usize) -> Self {
        Self {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    fn push(&mut self, candidate: ScoredDoc) {
        if self.heap.len() < self.k {
            self.heap.push(std::cmp::Reverse(candidate));
        } else if let Some(worst) = self.heap.peek() {
            if candidate > worst.0 {
                self.heap.pop();
                self.heap.push(std::cmp::Reverse(candidate));
            }
        }
    }

    fn into_sorted(self) -> Vec<ScoredDoc> {
        let mut out: Vec<ScoredDoc> = self.heap.into_iter().map(|r| r.0).collect();
        out.sort_by(|a, b| b.cmp(a));
        out
    }
}

/// Turn a token stream into a query vector, dropping terms the vocabulary
/// does not know (they cannot contribute to any score).
pub fn parse_query<I, S>(tokens: I, vocab: &Vocabulary) -> HashMap<String, u32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut query = HashMap::new();
    for token in tokens {
        let term = token.as_ref();
        if vocab.get(term).is_some() {
            *query.entry(term.to_string()).or_insert(0) += 1;
        }
    }
    query
}

fn query_norm(query: &HashMap<String, u32>) -> f64 {
    query
        .values()
        .map(|&f| (f as f64) * (f as f64))
        .sum::<f64>()
        .sqrt()
}

/// Document-at-a-time top-k: form the candidate union of all query terms'
/// postings, then score each candidate document in one pass over the lists.
pub fn daat(
    store: &mut PostingStore,
    vocab: &Vocabulary,
    docs: &DocTable,
    query: &HashMap<String, u32>,
    k: usize,
) -> Result<Vec<ScoredDoc>> {
    let q_norm = query_norm(query);
    if q_norm == 0.0 {
        return Ok(Vec::new());
    }

    let mut lists: Vec<(u32, HashMap<DocId, u32>)> = Vec::with_capacity(query.len());
    let mut candidates: BTreeSet<DocId> = BTreeSet::new();
    for (term, &qf) in query {
        let postings = store.get(vocab, term)?.unwrap_or_default();
        candidates.extend(postings.iter().map(|&(d, _)| d));
        lists.push((qf, postings.into_iter().collect()));
    }

    let mut top = TopK::new(k);
    for doc_id in candidates {
        let Some(doc) = docs.get(&doc_id) else {
            continue;
        };
        if doc.norm == 0.0 {
            continue;
        }
        let mut numerator = 0.0;
        for (qf, postings) in &lists {
            if let Some(&tf) = postings.get(&doc_id) {
                numerator += (*qf as f64) * (tf as f64);
            }
        }
        top.push(ScoredDoc {
            doc_id,
            score: numerator / (q_norm * doc.norm),
        });
    }
    Ok(top.into_sorted())
}

/// Term-at-a-time top-k: one accumulator per document, filled term by term,
/// then normalized. Produces the same ranking as `daat`.
pub fn taat(
    store: &mut PostingStore,
    vocab: &Vocabulary,
    docs: &DocTable,
    query: &HashMap<String, u32>,
    k: usize,
) -> Result<Vec<ScoredDoc>> {
    let q_norm = query_norm(query);
    if q_norm == 0.0 {
        return Ok(Vec::new());
    }

    let mut accumulators: HashMap<DocId, f64> = HashMap::new();
    for (term, &qf) in query {
        let postings = store.get(vocab, term)?.unwrap_or_default();
        for (doc_id, tf) in postings {
            *accumulators.entry(doc_id).or_insert(0.0) += (qf as f64) * (tf as f64);
        }
    }

    let mut top = TopK::new(k);
    for (doc_id, numerator) in accumulators {
        let Some(doc) = docs.get(&doc_id) else {
            continue;
        };
        if doc.norm == 0.0 {
            continue;
        }
        top.push(ScoredDoc {
            doc_id,
            score: numerator / (q_norm * doc.norm),
        });
    }
    Ok(top.into_sorted())
}
