//! Skip lists over posting lists: sqrt(L)-spaced jump entries stored in a
//! side file, used to start intersection scans past non-matching runs.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};

use tracing::info;

use crate::error::{IndexError, Result};
use crate::index::{DocId, VocabEntry, Vocabulary};
use crate::merge::INDEX_RECORD_SIZE;
use crate::persist::IndexPaths;
use crate::postings::PostingStore;

/// Bytes per skip record: three u32 (doc_id, skip_to_doc_id, index_offset).
pub const SKIP_RECORD_SIZE: u64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipEntry {
    pub doc_id: DocId,
    pub skip_to: DocId,
    /// Absolute byte offset of `doc_id`'s record in `index.bin`.
    pub offset: u32,
}

/// Skip stride for a posting list of length `len`.
pub fn stride(len: usize) -> usize {
    ((len as f64).sqrt() as usize).max(1)
}

/// Compute the skip entries for one posting list located at `offset`.
/// Entries cover i = 0, S, 2S, ... while i + S stays inside the list, so a
/// list of length <= 1 gets none. Offsets past u32::MAX cannot be stored in
/// the record format and fail instead of wrapping.
pub fn skip_entries(postings: &[(DocId, u32)], offset: u64) -> Result<Vec<SkipEntry>> {
    let s = stride(postings.len());
    let mut entries = Vec::new();
    let mut i = 0;
    while i + s < postings.len() {
        let at = offset + i as u64 * INDEX_RECORD_SIZE;
        entries.push(SkipEntry {
            doc_id: postings[i].0,
            skip_to: postings[i + s].0,
            offset: u32::try_from(at).map_err(|_| IndexError::SkipOffsetOverflow(at))?,
        });
        i += s;
    }
    Ok(entries)
}

/// Build skip lists for every term and persist them to `skips.bin`.
/// Returns a new vocabulary whose entries carry (skip offset, skip count);
/// the input vocabulary stays valid for the uncompressed index.
pub fn build_skip_lists(paths: &IndexPaths, vocab: &Vocabulary) -> Result<Vocabulary> {
    let mut store = PostingStore::open(paths)?;
    let file = File::create(paths.skips()).map_err(IndexError::SkipWrite)?;
    let mut out = BufWriter::new(file);
    let mut skip_offset: u64 = 0;

    let mut with_skips = Vocabulary {
        entries: std::collections::HashMap::with_capacity(vocab.len()),
        terms: vocab.terms.clone(),
    };

    for term in &vocab.terms {
        let entry = vocab
            .get(term)
            .expect("every allocated term has a vocabulary entry");
        let postings = store.get_entry(entry)?;
        let entries = skip_entries(&postings, entry.offset)?;
        for e in &entries {
            out.write_all(&e.doc_id.to_le_bytes())
                .map_err(IndexError::SkipWrite)?;
            out.write_all(&e.skip_to.to_le_bytes())
                .map_err(IndexError::SkipWrite)?;
            out.write_all(&e.offset.to_le_bytes())
                .map_err(IndexError::SkipWrite)?;
        }

        let mut new_entry = entry.clone();
        new_entry.skips = Some((skip_offset, entries.len() as u32));
        with_skips.entries.insert(term.clone(), new_entry);
        skip_offset += entries.len() as u64 * SKIP_RECORD_SIZE;
    }
    out.flush().map_err(IndexError::SkipWrite)?;

    info!(terms = with_skips.len(), skip_bytes = skip_offset, "built skip lists");
    Ok(with_skips)
}

/// Read-only handle over `skips.bin`.
pub struct SkipReader {
    file: File,
}

impl SkipReader {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let file = File::open(paths.skips()).map_err(IndexError::SkipRead)?;
        Ok(Self { file })
    }

    /// Skip entries for a term; empty when the term has none (short lists,
    /// or a vocabulary from before `build_skip_lists`).
    pub fn get(&mut self, entry: &VocabEntry) -> Result<Vec<SkipEntry>> {
        let Some((offset, count)) = entry.skips else {
            return Ok(Vec::new());
        };
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(IndexError::SkipRead)?;
        let mut buf = vec![0u8; count as usize * SKIP_RECORD_SIZE as usize];
        self.file
            .read_exact(&mut buf)
            .map_err(IndexError::SkipRead)?;

        let mut entries = Vec::with_capacity(count as usize);
        for rec in buf.chunks_exact(SKIP_RECORD_SIZE as usize) {
            entries.push(SkipEntry {
                doc_id: u32::from_le_bytes(rec[0..4].try_into().unwrap()),
                skip_to: u32::from_le_bytes(rec[4..8].try_into().unwrap()),
                offset: u32::from_le_bytes(rec[8..12].try_into().unwrap()),
            });
        }
        Ok(entries)
    }
}

/// Membership test for `target` in a term's posting list, two phases: pick
/// the starting offset from the skip entries, then scan forward through the
/// underlying postings with early exit once doc ids pass the target.
pub fn locate(
    store: &mut PostingStore,
    entry: &VocabEntry,
    skips: &[SkipEntry],
    target: DocId,
) -> Result<bool> {
    if entry.count == 0 {
        return Ok(false);
    }

    // Last skip entry at or before the target, if any.
    let mut start_offset = entry.offset;
    for skip in skips {
        if skip.doc_id == target {
            return Ok(true);
        }
        if skip.doc_id > target {
            break;
        }
        start_offset = skip.offset as u64;
    }

    let skipped = (start_offset - entry.offset) / INDEX_RECORD_SIZE;
    let remaining = entry.count - skipped as u32;
    let tail = store.read_at(start_offset, remaining)?;
    for (doc_id, _) in tail {
        if doc_id == target {
            return Ok(true);
        }
        if doc_id > target {
            return Ok(false);
        }
    }
    Ok(false)
}

/// Skip-assisted AND of two terms: walk `a`'s postings and probe `b`'s list
/// through its skip entries. Either term missing yields an empty result.
pub fn intersect(
    store: &mut PostingStore,
    skip_reader: &mut SkipReader,
    vocab: &Vocabulary,
    a: &str,
    b: &str,
) -> Result<Vec<DocId>> {
    let (Some(a_entry), Some(b_entry)) = (vocab.get(a), vocab.get(b)) else {
        return Ok(Vec::new());
    };
    let a_postings = store.get_entry(a_entry)?;
    let b_skips = skip_reader.get(b_entry)?;

    let mut out = Vec::new();
    for (doc_id, _) in a_postings {
        if locate(store, b_entry, &b_skips, doc_id)? {
            out.push(doc_id);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_floor_sqrt_with_min_one() {
        assert_eq!(stride(0), 1);
        assert_eq!(stride(1), 1);
        assert_eq!(stride(4), 2);
        assert_eq!(stride(10), 3);
        assert_eq!(stride(100), 10);
    }

    #[test]
    fn degenerate_lists_have_no_entries() {
        assert!(skip_entries(&[], 0).unwrap().is_empty());
        assert!(skip_entries(&[(7, 1)], 0).unwrap().is_empty());
    }

    #[test]
    fn entries_cover_sqrt_spaced_positions() {
        // 9 postings, stride 3: entries at i = 0 and 3 (6 + 3 is not < 9).
        let postings: Vec<(DocId, u32)> = (0..9).map(|d| (d * 2, 1)).collect();
        let entries = skip_entries(&postings, 80).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], SkipEntry { doc_id: 0, skip_to: 6, offset: 80 });
        assert_eq!(entries[1], SkipEntry { doc_id: 6, skip_to: 12, offset: 80 + 24 });
    }

    #[test]
    fn offsets_past_the_record_field_fail() {
        let postings: Vec<(DocId, u32)> = (0..4).map(|d| (d, 1)).collect();
        match skip_entries(&postings, u64::from(u32::MAX) + 1) {
            Err(IndexError::SkipOffsetOverflow(_)) => {}
            other => panic!("expected SkipOffsetOverflow, got {other:?}"),
        }
    }
}
