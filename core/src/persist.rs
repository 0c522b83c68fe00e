use crate::error::{IndexError, Result};
use crate::index::{DocTable, Vocabulary};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub chunk_count: u32,
    pub created_at: String,
    pub version: u32,
}

/// File layout of one index directory. Every reader and writer goes through
/// these accessors so the layout is defined in exactly one place.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }

    pub fn chunk(&self, number: u32) -> PathBuf {
        self.chunks_dir().join(format!("chunk_{number}.bin"))
    }

    pub fn index(&self) -> PathBuf {
        self.root.join("index.bin")
    }

    pub fn skips(&self) -> PathBuf {
        self.root.join("skips.bin")
    }

    pub fn vocabulary(&self) -> PathBuf {
        self.root.join("vocabulary.bin")
    }

    pub fn docs(&self) -> PathBuf {
        self.root.join("docs.bin")
    }

    pub fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    pub fn compressed_dir(&self) -> PathBuf {
        self.root.join("compressed")
    }

    pub fn compressed_doc_ids(&self) -> PathBuf {
        self.compressed_dir().join("doc_ids.bin")
    }

    pub fn compressed_freqs(&self) -> PathBuf {
        self.compressed_dir().join("freqs.bin")
    }

    pub fn compressed_vocabulary(&self) -> PathBuf {
        self.compressed_dir().join("vocabulary.bin")
    }
}

fn persist_err<E>(what: &'static str) -> impl FnOnce(E) -> IndexError
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| IndexError::Persist {
        what,
        source: Box::new(e),
    }
}

pub(crate) fn write_bincode<T: Serialize>(path: &Path, what: &'static str, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value).map_err(persist_err(what))?;
    let mut f = File::create(path).map_err(persist_err(what))?;
    f.write_all(&bytes).map_err(persist_err(what))?;
    Ok(())
}

pub(crate) fn read_bincode<T: for<'de> Deserialize<'de>>(path: &Path, what: &'static str) -> Result<T> {
    let mut f = File::open(path).map_err(persist_err(what))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(persist_err(what))?;
    bincode::deserialize(&buf).map_err(persist_err(what))
}

pub fn save_vocabulary(paths: &IndexPaths, vocab: &Vocabulary) -> Result<()> {
    create_dir_all(&paths.root).map_err(persist_err("vocabulary"))?;
    write_bincode(&paths.vocabulary(), "vocabulary", vocab)
}

pub fn load_vocabulary(paths: &IndexPaths) -> Result<Vocabulary> {
    read_bincode(&paths.vocabulary(), "vocabulary")
}

pub fn save_docs(paths: &IndexPaths, docs: &DocTable) -> Result<()> {
    create_dir_all(&paths.root).map_err(persist_err("docs"))?;
    write_bincode(&paths.docs(), "docs", docs)
}

pub fn load_docs(paths: &IndexPaths) -> Result<DocTable> {
    read_bincode(&paths.docs(), "docs")
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root).map_err(persist_err("meta"))?;
    let json = serde_json::to_string_pretty(meta).map_err(persist_err("meta"))?;
    let mut f = File::create(paths.meta()).map_err(persist_err("meta"))?;
    f.write_all(json.as_bytes()).map_err(persist_err("meta"))?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).map_err(persist_err("meta"))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf).map_err(persist_err("meta"))?;
    serde_json::from_str(&buf).map_err(persist_err("meta"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DocEntry, VocabEntry};
    use tempfile::tempdir;

    #[test]
    fn vocabulary_and_docs_round_trip() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());

        let mut vocab = Vocabulary::default();
        vocab.terms.push("cat".to_string());
        vocab.entries.insert(
            "cat".to_string(),
            VocabEntry {
                offset: 16,
                count: 2,
                term_id: 0,
                skips: None,
            },
        );
        save_vocabulary(&paths, &vocab).unwrap();
        let loaded = load_vocabulary(&paths).unwrap();
        assert_eq!(loaded.terms, vocab.terms);
        assert_eq!(loaded.get("cat").unwrap().offset, 16);

        let mut docs = DocTable::new();
        docs.insert(
            0,
            DocEntry {
                name: "doc0.txt".into(),
                norm: 1.5,
            },
        );
        save_docs(&paths, &docs).unwrap();
        let docs2 = load_docs(&paths).unwrap();
        assert_eq!(docs2.get(&0).unwrap().name, "doc0.txt");
    }
}
