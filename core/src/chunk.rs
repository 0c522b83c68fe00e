//! Chunk building: the first BSBI pass. Documents stream in one at a time;
//! every `doc_limit` documents the accumulated postings are sorted by term id
//! and flushed to an immutable chunk file.

use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};

use tracing::{debug, info};

use crate::error::{IndexError, Result};
use crate::index::{DocEntry, DocId, DocTable, Posting, TermAllocator, TermId};
use crate::persist::IndexPaths;

/// Bytes per chunk record: three u32 (term_id, doc_id, freq).
pub const CHUNK_RECORD_SIZE: u64 = 12;

pub struct ChunkBuilder {
    paths: IndexPaths,
    doc_limit: u32,
    buffer: Vec<Posting>,
    docs_in_chunk: u32,
    chunk_number: u32,
    docs: DocTable,
}

impl ChunkBuilder {
    /// `doc_limit` is the number of documents per chunk and must be > 0;
    /// callers validate it before constructing the builder.
    pub fn new(paths: IndexPaths, doc_limit: u32) -> Self {
        debug_assert!(doc_limit > 0);
        Self {
            paths,
            doc_limit,
            buffer: Vec::new(),
            docs_in_chunk: 0,
            chunk_number: 0,
            docs: DocTable::new(),
        }
    }

    /// Consume one document's token stream. Allocates term ids on first
    /// sight, records the document's L2 norm, and buffers one posting per
    /// distinct term. Flushes a chunk once `doc_limit` documents are in.
    pub fn process_document<I, S>(
        &mut self,
        doc_id: DocId,
        name: &str,
        tokens: I,
        alloc: &mut TermAllocator,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut term_freq: HashMap<TermId, u32> = HashMap::new();
        for token in tokens {
            let term_id = alloc.get_or_assign(token.as_ref());
            *term_freq.entry(term_id).or_insert(0) += 1;
        }

        let norm = term_freq
            .values()
            .map(|&f| (f as f64) * (f as f64))
            .sum::<f64>()
            .sqrt();
        self.docs.insert(
            doc_id,
            DocEntry {
                name: name.to_string(),
                norm,
            },
        );

        debug!(doc_id, name, distinct_terms = term_freq.len(), "processed document");
        for (term_id, freq) in term_freq {
            self.buffer.push(Posting {
                term_id,
                doc_id,
                freq,
            });
        }

        self.docs_in_chunk += 1;
        if self.docs_in_chunk >= self.doc_limit {
            self.flush()?;
        }
        Ok(())
    }

    /// Flush the final partial chunk and hand back what the merger needs.
    /// Returns the number of chunk files written and the document table.
    pub fn finish(mut self) -> Result<(u32, DocTable)> {
        if self.docs_in_chunk > 0 {
            self.flush()?;
        }
        Ok((self.chunk_number, self.docs))
    }

    fn flush(&mut self) -> Result<()> {
        let chunk = self.chunk_number;
        let write_err = |source| IndexError::ChunkWrite { chunk, source };

        self.buffer.sort_by_key(|p| p.term_id);

        create_dir_all(self.paths.chunks_dir()).map_err(write_err)?;
        let file = File::create(self.paths.chunk(chunk)).map_err(write_err)?;
        let mut out = BufWriter::new(file);
        for p in &self.buffer {
            out.write_all(&p.term_id.to_le_bytes()).map_err(write_err)?;
            out.write_all(&p.doc_id.to_le_bytes()).map_err(write_err)?;
            out.write_all(&p.freq.to_le_bytes()).map_err(write_err)?;
        }
        out.flush().map_err(write_err)?;

        info!(
            chunk,
            docs = self.docs_in_chunk,
            postings = self.buffer.len(),
            "flushed chunk"
        );
        self.buffer.clear();
        self.docs_in_chunk = 0;
        self.chunk_number += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(|t| t.to_string()).collect()
    }

    #[test]
    fn flushes_on_limit_and_at_end() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut alloc = TermAllocator::new();
        let mut builder = ChunkBuilder::new(paths.clone(), 2);

        builder
            .process_document(0, "d0", tokens("the cat sat"), &mut alloc)
            .unwrap();
        builder
            .process_document(1, "d1", tokens("the dog sat"), &mut alloc)
            .unwrap();
        builder
            .process_document(2, "d2", tokens("cat and dog"), &mut alloc)
            .unwrap();

        let (chunk_count, docs) = builder.finish().unwrap();
        assert_eq!(chunk_count, 2);
        assert_eq!(docs.len(), 3);
        assert!(paths.chunk(0).exists());
        assert!(paths.chunk(1).exists());
        assert!(!paths.chunk(2).exists());

        // Each chunk file is whole 12-byte records.
        for n in 0..2 {
            let len = std::fs::metadata(paths.chunk(n)).unwrap().len();
            assert_eq!(len % CHUNK_RECORD_SIZE, 0);
        }
    }

    #[test]
    fn norm_is_l2_over_term_frequencies() {
        let dir = tempdir().unwrap();
        let mut alloc = TermAllocator::new();
        let mut builder = ChunkBuilder::new(IndexPaths::new(dir.path()), 10);
        // freqs: cat=2, sat=1 -> norm = sqrt(4 + 1)
        builder
            .process_document(0, "d0", tokens("cat cat sat"), &mut alloc)
            .unwrap();
        let (_, docs) = builder.finish().unwrap();
        let norm = docs.get(&0).unwrap().norm;
        assert!((norm - 5f64.sqrt()).abs() < 1e-12);
    }
}
