use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go fatally wrong while building, storing or querying
/// an index. Absent terms are deliberately *not* represented here: a term
/// missing from the vocabulary is a normal empty query result.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read document {path}: {source}")]
    DocumentRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write chunk {chunk}: {source}")]
    ChunkWrite {
        chunk: u32,
        source: std::io::Error,
    },

    #[error("failed to read chunk {chunk}: {source}")]
    ChunkRead {
        chunk: u32,
        source: std::io::Error,
    },

    #[error("chunk {chunk} is corrupt: {len} bytes is not a multiple of the 12-byte record size")]
    ChunkIntegrity { chunk: u32, len: u64 },

    #[error("failed to write index file: {0}")]
    IndexWrite(#[source] std::io::Error),

    #[error("failed to read index file: {0}")]
    IndexRead(#[source] std::io::Error),

    #[error("failed to write skip list file: {0}")]
    SkipWrite(#[source] std::io::Error),

    #[error("failed to read skip list file: {0}")]
    SkipRead(#[source] std::io::Error),

    #[error("index offset {0} does not fit the 4-byte skip record field")]
    SkipOffsetOverflow(u64),

    #[error("failed to write compressed index: {0}")]
    CompressedWrite(#[source] std::io::Error),

    #[error("failed to read compressed index: {0}")]
    CompressedRead(#[source] std::io::Error),

    #[error("Elias-gamma cannot encode {0}: values must be >= 1")]
    CompressionInput(u32),

    #[error("malformed boolean expression: {0}")]
    MalformedExpression(String),

    #[error("failed to persist {what}: {source}")]
    Persist {
        what: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, IndexError>;
