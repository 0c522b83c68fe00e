//! Random access to posting lists in `index.bin` via vocabulary offsets.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use crate::error::{IndexError, Result};
use crate::index::{DocId, VocabEntry, Vocabulary};
use crate::persist::IndexPaths;

/// Read-only handle over the merged index file.
pub struct PostingStore {
    file: File,
}

impl PostingStore {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let file = File::open(paths.index()).map_err(IndexError::IndexRead)?;
        Ok(Self { file })
    }

    /// Posting list for a term. `Ok(None)` means the term is not in the
    /// vocabulary, a normal query outcome rather than an error.
    pub fn get(&mut self, vocab: &Vocabulary, term: &str) -> Result<Option<Vec<(DocId, u32)>>> {
        match vocab.get(term) {
            Some(entry) => self.get_entry(entry).map(Some),
            None => Ok(None),
        }
    }

    /// Read exactly `entry.count` (doc_id, freq) records starting at
    /// `entry.offset`.
    pub fn get_entry(&mut self, entry: &VocabEntry) -> Result<Vec<(DocId, u32)>> {
        self.read_at(entry.offset, entry.count)
    }

    /// Read `count` records starting at an arbitrary byte offset; skip-list
    /// search uses this to resume a scan mid-list.
    pub fn read_at(&mut self, offset: u64, count: u32) -> Result<Vec<(DocId, u32)>> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(IndexError::IndexRead)?;
        let mut buf = vec![0u8; count as usize * 8];
        self.file
            .read_exact(&mut buf)
            .map_err(IndexError::IndexRead)?;

        let mut postings = Vec::with_capacity(count as usize);
        for rec in buf.chunks_exact(8) {
            let doc_id = u32::from_le_bytes(rec[0..4].try_into().unwrap());
            let freq = u32::from_le_bytes(rec[4..8].try_into().unwrap());
            postings.push((doc_id, freq));
        }
        Ok(postings)
    }
}
