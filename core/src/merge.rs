//! Chunk merging: the second BSBI pass. All chunk files are read through
//! forward-only cursors; each term's postings are collected across chunks,
//! sorted by doc id, and appended to the single index file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

use tracing::{debug, info};

use crate::chunk::CHUNK_RECORD_SIZE;
use crate::error::{IndexError, Result};
use crate::index::{Posting, TermAllocator, TermId, VocabEntry, Vocabulary};
use crate::persist::IndexPaths;

/// Bytes per index record: two u32 (doc_id, freq).
pub const INDEX_RECORD_SIZE: u64 = 8;

/// Buffered forward-only reader over one chunk file, holding a one-record
/// lookahead. The cursor never moves backward: each term's postings form a
/// single contiguous run in the chunk, and terms are visited in ascending id
/// order, so draining matching runs in file order visits every record once.
struct ChunkCursor {
    chunk: u32,
    reader: BufReader<File>,
    current: Option<Posting>,
}

impl ChunkCursor {
    fn open(paths: &IndexPaths, chunk: u32) -> Result<Self> {
        let path = paths.chunk(chunk);
        let file = File::open(&path).map_err(|source| IndexError::ChunkRead { chunk, source })?;
        let len = file
            .metadata()
            .map_err(|source| IndexError::ChunkRead { chunk, source })?
            .len();
        if len % CHUNK_RECORD_SIZE != 0 {
            return Err(IndexError::ChunkIntegrity { chunk, len });
        }
        let mut cursor = Self {
            chunk,
            reader: BufReader::new(file),
            current: None,
        };
        cursor.advance()?;
        Ok(cursor)
    }

    fn advance(&mut self) -> Result<()> {
        let mut buf = [0u8; CHUNK_RECORD_SIZE as usize];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => {
                self.current = Some(Posting {
                    term_id: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
                    doc_id: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
                    freq: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
                });
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.current = None;
                Ok(())
            }
            Err(source) => Err(IndexError::ChunkRead {
                chunk: self.chunk,
                source,
            }),
        }
    }

    /// Append this cursor's run of postings for `term_id` (possibly empty)
    /// onto `out`, advancing past it.
    fn drain_term(&mut self, term_id: TermId, out: &mut Vec<(u32, u32)>) -> Result<()> {
        while let Some(p) = self.current {
            if p.term_id != term_id {
                break;
            }
            out.push((p.doc_id, p.freq));
            self.advance()?;
        }
        Ok(())
    }
}

/// Merge `chunk_count` chunk files into `index.bin` and build the
/// vocabulary. Takes ownership of the term allocator: after the merge the
/// vocabulary is the authoritative term mapping.
///
/// Terms are visited in allocation order, which is ascending term id, the
/// same order chunk files are sorted in. Draining one run per chunk per term
/// therefore reads every chunk exactly once, front to back.
pub fn merge_chunks(
    paths: &IndexPaths,
    alloc: TermAllocator,
    chunk_count: u32,
) -> Result<Vocabulary> {
    let mut cursors = Vec::with_capacity(chunk_count as usize);
    for chunk in 0..chunk_count {
        cursors.push(ChunkCursor::open(paths, chunk)?);
    }

    let file = File::create(paths.index()).map_err(IndexError::IndexWrite)?;
    let mut out = BufWriter::new(file);
    let mut offset: u64 = 0;

    let terms = alloc.into_terms();
    let mut vocab = Vocabulary {
        entries: std::collections::HashMap::with_capacity(terms.len()),
        terms: Vec::new(),
    };

    let mut postings: Vec<(u32, u32)> = Vec::new();
    for (id, term) in terms.iter().enumerate() {
        let term_id = id as TermId;
        postings.clear();
        for cursor in &mut cursors {
            cursor.drain_term(term_id, &mut postings)?;
        }
        // A document contributes at most one posting per term, so doc ids
        // are unique across chunks and this sort yields a strictly
        // increasing list.
        postings.sort_by_key(|&(doc_id, _)| doc_id);

        for &(doc_id, freq) in &postings {
            out.write_all(&doc_id.to_le_bytes())
                .map_err(IndexError::IndexWrite)?;
            out.write_all(&freq.to_le_bytes())
                .map_err(IndexError::IndexWrite)?;
        }

        vocab.entries.insert(
            term.clone(),
            VocabEntry {
                offset,
                count: postings.len() as u32,
                term_id,
                skips: None,
            },
        );
        offset += postings.len() as u64 * INDEX_RECORD_SIZE;
        debug!(term = %term, term_id, postings = postings.len(), "merged term");
    }
    out.flush().map_err(IndexError::IndexWrite)?;

    vocab.terms = terms;
    info!(
        terms = vocab.len(),
        chunks = chunk_count,
        index_bytes = offset,
        "merge complete"
    );
    Ok(vocab)
}
