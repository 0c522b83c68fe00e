//! Compressed index: doc ids variable-byte coded (optionally gap-coded
//! first), frequencies Elias-gamma coded, each stream in its own file. The
//! compressed pair is written next to the uncompressed index, which stays
//! valid and queryable on its own.

use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{IndexError, Result};
use crate::index::{DocId, TermId, Vocabulary};
use crate::persist::{self, IndexPaths};
use crate::postings::PostingStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedVocabEntry {
    pub doc_offset: u64,
    pub count: u32,
    pub freq_offset: u64,
    pub term_id: TermId,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompressedVocabulary {
    pub entries: HashMap<String, CompressedVocabEntry>,
    pub terms: Vec<String>,
    /// Whether doc ids were gap-coded before variable-byte encoding.
    pub delta: bool,
}

impl CompressedVocabulary {
    pub fn get(&self, term: &str) -> Option<&CompressedVocabEntry> {
        self.entries.get(term)
    }
}

/// Variable-byte encode one value: 7-bit groups, least significant group
/// first, continuation bit set on every byte but the last of the value.
pub fn vbyte_encode(mut value: u32, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
}

/// Decode exactly `n` variable-byte values from the front of `bytes`.
pub fn vbyte_decode_n(bytes: &[u8], n: usize) -> Result<Vec<u32>> {
    let mut values = Vec::with_capacity(n);
    let mut acc: u32 = 0;
    let mut shift = 0;
    let mut iter = bytes.iter();
    while values.len() < n {
        let Some(&byte) = iter.next() else {
            return Err(IndexError::CompressedRead(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "doc-id stream truncated",
            )));
        };
        acc |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            values.push(acc);
            acc = 0;
            shift = 0;
        } else {
            shift += 7;
            // A u32 takes at most five 7-bit groups; a longer run of
            // continuation bytes means the stream is corrupt.
            if shift > 28 {
                return Err(IndexError::CompressedRead(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "doc-id stream corrupt: value longer than 32 bits",
                )));
            }
        }
    }
    Ok(values)
}

/// MSB-first bit accumulator producing an Elias-gamma stream. The final
/// partial byte is zero-padded on `finish`.
#[derive(Default)]
pub struct GammaWriter {
    buf: Vec<u8>,
    acc: u8,
    used: u8,
}

impl GammaWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_bit(&mut self, bit: bool) {
        self.acc = (self.acc << 1) | (bit as u8);
        self.used += 1;
        if self.used == 8 {
            self.buf.push(self.acc);
            self.acc = 0;
            self.used = 0;
        }
    }

    /// Gamma-code `value`: for bit length N, (N - 1) one-bits, a zero bit,
    /// then the low N - 1 bits of the value. Zero has no gamma code.
    pub fn write(&mut self, value: u32) -> Result<()> {
        if value == 0 {
            return Err(IndexError::CompressionInput(value));
        }
        let n = 32 - value.leading_zeros();
        for _ in 0..n - 1 {
            self.push_bit(true);
        }
        self.push_bit(false);
        for i in (0..n - 1).rev() {
            self.push_bit(value & (1 << i) != 0);
        }
        Ok(())
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.used > 0 {
            self.buf.push(self.acc << (8 - self.used));
        }
        self.buf
    }
}

/// Decode exactly `n` gamma-coded values from the front of `bytes`.
pub fn gamma_decode_n(bytes: &[u8], n: usize) -> Result<Vec<u32>> {
    let truncated = || {
        IndexError::CompressedRead(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "frequency stream truncated",
        ))
    };
    let total_bits = bytes.len() * 8;
    let bit_at = |i: usize| bytes[i / 8] & (0x80 >> (i % 8)) != 0;

    let mut values = Vec::with_capacity(n);
    let mut pos = 0;
    while values.len() < n {
        let mut ones = 0;
        loop {
            if pos >= total_bits {
                return Err(truncated());
            }
            if !bit_at(pos) {
                pos += 1;
                break;
            }
            ones += 1;
            pos += 1;
        }
        if pos + ones > total_bits {
            return Err(truncated());
        }
        // Implicit leading one bit, then the stored low bits MSB-first.
        let mut value: u32 = 1;
        for _ in 0..ones {
            value = (value << 1) | (bit_at(pos) as u32);
            pos += 1;
        }
        values.push(value);
    }
    Ok(values)
}

/// Gap-code a strictly increasing sequence: first value, then differences.
pub fn delta_encode(doc_ids: &mut [u32]) {
    for i in (1..doc_ids.len()).rev() {
        doc_ids[i] -= doc_ids[i - 1];
    }
}

/// Invert `delta_encode` via running prefix sums.
pub fn delta_decode(gaps: &mut [u32]) {
    for i in 1..gaps.len() {
        gaps[i] += gaps[i - 1];
    }
}

/// Re-encode every posting list into the compressed doc-id and frequency
/// streams, in vocabulary term order. Returns the new vocabulary; the
/// uncompressed index is untouched.
pub fn compress_index(
    paths: &IndexPaths,
    vocab: &Vocabulary,
    use_delta: bool,
) -> Result<CompressedVocabulary> {
    let mut store = PostingStore::open(paths)?;
    create_dir_all(paths.compressed_dir()).map_err(IndexError::CompressedWrite)?;
    let mut doc_out = BufWriter::new(
        File::create(paths.compressed_doc_ids()).map_err(IndexError::CompressedWrite)?,
    );
    let mut freq_out = BufWriter::new(
        File::create(paths.compressed_freqs()).map_err(IndexError::CompressedWrite)?,
    );

    let mut cvocab = CompressedVocabulary {
        entries: HashMap::with_capacity(vocab.len()),
        terms: vocab.terms.clone(),
        delta: use_delta,
    };
    let (mut doc_offset, mut freq_offset) = (0u64, 0u64);

    for term in &vocab.terms {
        let entry = vocab
            .get(term)
            .expect("every allocated term has a vocabulary entry");
        let postings = store.get_entry(entry)?;

        let mut doc_ids: Vec<u32> = postings.iter().map(|&(d, _)| d).collect();
        if use_delta {
            delta_encode(&mut doc_ids);
        }
        let mut doc_bytes = Vec::new();
        for id in doc_ids {
            vbyte_encode(id, &mut doc_bytes);
        }

        let mut gamma = GammaWriter::new();
        for &(_, freq) in &postings {
            gamma.write(freq)?;
        }
        let freq_bytes = gamma.finish();

        doc_out
            .write_all(&doc_bytes)
            .map_err(IndexError::CompressedWrite)?;
        freq_out
            .write_all(&freq_bytes)
            .map_err(IndexError::CompressedWrite)?;

        cvocab.entries.insert(
            term.clone(),
            CompressedVocabEntry {
                doc_offset,
                count: entry.count,
                freq_offset,
                term_id: entry.term_id,
            },
        );
        doc_offset += doc_bytes.len() as u64;
        freq_offset += freq_bytes.len() as u64;
    }
    doc_out.flush().map_err(IndexError::CompressedWrite)?;
    freq_out.flush().map_err(IndexError::CompressedWrite)?;

    info!(
        terms = cvocab.entries.len(),
        doc_stream_bytes = doc_offset,
        freq_stream_bytes = freq_offset,
        delta = use_delta,
        "compressed index written"
    );
    Ok(cvocab)
}

pub fn save_compressed_vocabulary(paths: &IndexPaths, cvocab: &CompressedVocabulary) -> Result<()> {
    create_dir_all(paths.compressed_dir()).map_err(IndexError::CompressedWrite)?;
    persist::write_bincode(
        &paths.compressed_vocabulary(),
        "compressed vocabulary",
        cvocab,
    )
}

pub fn load_compressed_vocabulary(paths: &IndexPaths) -> Result<CompressedVocabulary> {
    persist::read_bincode(&paths.compressed_vocabulary(), "compressed vocabulary")
}

/// Read-only handle over the compressed stream pair.
pub struct CompressedStore {
    doc_file: File,
    freq_file: File,
}

impl CompressedStore {
    pub fn open(paths: &IndexPaths) -> Result<Self> {
        let doc_file =
            File::open(paths.compressed_doc_ids()).map_err(IndexError::CompressedRead)?;
        let freq_file =
            File::open(paths.compressed_freqs()).map_err(IndexError::CompressedRead)?;
        Ok(Self { doc_file, freq_file })
    }

    /// Decompress a single term's posting list without touching any other
    /// term: seek each stream to the recorded offset and decode exactly
    /// `count` values. `Ok(None)` when the term is unknown.
    pub fn get(
        &mut self,
        cvocab: &CompressedVocabulary,
        term: &str,
    ) -> Result<Option<Vec<(DocId, u32)>>> {
        let Some(entry) = cvocab.get(term) else {
            return Ok(None);
        };

        let doc_bytes = read_from(&mut self.doc_file, entry.doc_offset)?;
        let mut doc_ids = vbyte_decode_n(&doc_bytes, entry.count as usize)?;
        if cvocab.delta {
            delta_decode(&mut doc_ids);
        }

        let freq_bytes = read_from(&mut self.freq_file, entry.freq_offset)?;
        let freqs = gamma_decode_n(&freq_bytes, entry.count as usize)?;

        Ok(Some(doc_ids.into_iter().zip(freqs).collect()))
    }
}

/// Bytes from `offset` to end of file. Streams carry no per-term length, so
/// the decoder reads the tail and stops after the recorded value count.
fn read_from(file: &mut File, offset: u64) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(offset))
        .map_err(IndexError::CompressedRead)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(IndexError::CompressedRead)?;
    Ok(buf)
}
