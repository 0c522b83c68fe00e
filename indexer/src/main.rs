use anyhow::{bail, Context, Result};
use bsbi_core::chunk::ChunkBuilder;
use bsbi_core::compress::{
    compress_index, load_compressed_vocabulary, save_compressed_vocabulary, CompressedStore,
};
use bsbi_core::merge::merge_chunks;
use bsbi_core::persist::{
    load_docs, load_vocabulary, save_docs, save_meta, save_vocabulary, IndexPaths, MetaFile,
};
use bsbi_core::postings::PostingStore;
use bsbi_core::query::{boolean, ranked};
use bsbi_core::skiplist::build_skip_lists;
use bsbi_core::tokenizer::{tokenize, TokenizerConfig};
use bsbi_core::{DocId, IndexError, TermAllocator};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "bsbi")]
#[command(about = "Blocked sort-based inverted index builder and query engine", long_about = None)]
struct Cli {
    /// Index directory
    #[arg(long, global = true, default_value = "./index")]
    index: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TokenizerArgs {
    /// Keep stopwords instead of dropping them
    #[arg(long, default_value_t = false)]
    keep_stopwords: bool,
    /// Disable English stemming
    #[arg(long, default_value_t = false)]
    no_stem: bool,
    /// Strip HTML tags before tokenizing
    #[arg(long, default_value_t = false)]
    strip_html: bool,
}

impl TokenizerArgs {
    fn config(&self) -> TokenizerConfig {
        TokenizerConfig {
            strip_html: self.strip_html,
            remove_stopwords: !self.keep_stopwords,
            stem: !self.no_stem,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of text documents
    BuildIndex {
        /// Directory of input documents
        input_dir: String,
        /// Documents per chunk (must be > 0)
        chunk_doc_limit: u32,
        #[command(flatten)]
        tokenizer: TokenizerArgs,
    },
    /// Build skip lists for every posting list and extend the vocabulary
    BuildSkips,
    /// Print the posting list of one term
    Lookup {
        term: String,
    },
    /// Evaluate a boolean expression (AND, OR, NOT, parentheses)
    BooleanQuery {
        expression: String,
    },
    /// Rank documents against a free-text query, cosine top-k
    RankQuery {
        query_text: String,
        k: usize,
        /// Use term-at-a-time evaluation instead of document-at-a-time
        #[arg(long, default_value_t = false)]
        taat: bool,
        #[command(flatten)]
        tokenizer: TokenizerArgs,
    },
    /// Re-encode the index with variable-byte doc ids and gamma frequencies
    CompressIndex {
        /// Gap-code doc ids before variable-byte encoding
        #[arg(long, default_value_t = false)]
        delta: bool,
    },
    /// Decode one term's posting list from the compressed index
    LookupCompressed {
        term: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let paths = IndexPaths::new(&cli.index);

    match cli.command {
        Commands::BuildIndex {
            input_dir,
            chunk_doc_limit,
            tokenizer,
        } => build_index(&paths, &input_dir, chunk_doc_limit, &tokenizer.config()),
        Commands::BuildSkips => build_skips(&paths),
        Commands::Lookup { term } => lookup(&paths, &term),
        Commands::BooleanQuery { expression } => boolean_query(&paths, &expression),
        Commands::RankQuery {
            query_text,
            k,
            taat,
            tokenizer,
        } => rank_query(&paths, &query_text, k, taat, &tokenizer.config()),
        Commands::CompressIndex { delta } => compress(&paths, delta),
        Commands::LookupCompressed { term } => lookup_compressed(&paths, &term),
    }
}

fn build_index(
    paths: &IndexPaths,
    input_dir: &str,
    chunk_doc_limit: u32,
    config: &TokenizerConfig,
) -> Result<()> {
    if chunk_doc_limit == 0 {
        bail!("chunk_doc_limit must be greater than 0");
    }
    let input = Path::new(input_dir);
    if !input.is_dir() {
        bail!("{input_dir} is not a directory");
    }

    let start = Instant::now();
    let mut alloc = TermAllocator::new();
    let mut builder = ChunkBuilder::new(paths.clone(), chunk_doc_limit);

    // Sorted traversal keeps doc id assignment reproducible across runs.
    let mut next_doc_id: DocId = 0;
    for entry in WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.path().is_file() {
            continue;
        }
        let text = fs::read_to_string(entry.path()).map_err(|source| IndexError::DocumentRead {
            path: entry.path().to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        let tokens = tokenize(&text, config);
        builder.process_document(next_doc_id, &name, tokens, &mut alloc)?;
        next_doc_id += 1;
    }

    let num_terms = alloc.len() as u32;
    let (chunk_count, docs) = builder.finish()?;
    tracing::info!(
        docs = next_doc_id,
        terms = num_terms,
        chunks = chunk_count,
        "chunking complete"
    );

    let vocab = merge_chunks(paths, alloc, chunk_count)?;
    save_vocabulary(paths, &vocab)?;
    save_docs(paths, &docs)?;
    save_meta(
        paths,
        &MetaFile {
            num_docs: next_doc_id,
            num_terms,
            chunk_count,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| String::new()),
            version: 1,
        },
    )?;

    tracing::info!(
        elapsed_s = start.elapsed().as_secs_f64(),
        index = %paths.root.display(),
        "index build complete"
    );
    Ok(())
}

fn build_skips(paths: &IndexPaths) -> Result<()> {
    let vocab = load_vocabulary(paths)?;
    let with_skips = build_skip_lists(paths, &vocab)?;
    save_vocabulary(paths, &with_skips)?;
    println!("skip lists built for {} terms", with_skips.len());
    Ok(())
}

fn lookup(paths: &IndexPaths, term: &str) -> Result<()> {
    let vocab = load_vocabulary(paths)?;
    let docs = load_docs(paths)?;
    let mut store = PostingStore::open(paths)?;

    match store.get(&vocab, term)? {
        Some(postings) => {
            for (doc_id, freq) in postings {
                let name = docs.get(&doc_id).map(|d| d.name.as_str()).unwrap_or("?");
                println!("{doc_id}:{name}:{freq}");
            }
        }
        None => println!("term {term:?} not found"),
    }
    Ok(())
}

fn boolean_query(paths: &IndexPaths, expression: &str) -> Result<()> {
    let vocab = load_vocabulary(paths)?;
    let docs = load_docs(paths)?;
    let mut store = PostingStore::open(paths)?;

    let expr = boolean::parse(expression)?;
    let universe: BTreeSet<DocId> = docs.keys().copied().collect();
    let result = boolean::evaluate(&expr, &universe, &mut store, &vocab)?;

    if result.is_empty() {
        println!("no documents match the query");
        return Ok(());
    }
    for doc_id in result {
        let name = docs.get(&doc_id).map(|d| d.name.as_str()).unwrap_or("?");
        println!("{name}:{doc_id}");
    }
    Ok(())
}

fn rank_query(
    paths: &IndexPaths,
    query_text: &str,
    k: usize,
    use_taat: bool,
    config: &TokenizerConfig,
) -> Result<()> {
    if k == 0 {
        bail!("k must be greater than 0");
    }
    let vocab = load_vocabulary(paths)?;
    let docs = load_docs(paths)?;
    let mut store = PostingStore::open(paths)?;

    let query = ranked::parse_query(tokenize(query_text, config), &vocab);
    let results = if use_taat {
        ranked::taat(&mut store, &vocab, &docs, &query, k)?
    } else {
        ranked::daat(&mut store, &vocab, &docs, &query, k)?
    };

    if results.is_empty() {
        println!("no documents match the query");
        return Ok(());
    }
    for hit in results {
        let name = docs.get(&hit.doc_id).map(|d| d.name.as_str()).unwrap_or("?");
        println!("{name}:{}:{:.4}", hit.doc_id, hit.score);
    }
    Ok(())
}

fn compress(paths: &IndexPaths, delta: bool) -> Result<()> {
    let vocab = load_vocabulary(paths)?;
    let cvocab = compress_index(paths, &vocab, delta)?;
    save_compressed_vocabulary(paths, &cvocab)?;

    let original = file_size(&paths.index())?;
    let compressed =
        file_size(&paths.compressed_doc_ids())? + file_size(&paths.compressed_freqs())?;
    println!("original index: {original} bytes");
    println!("compressed index: {compressed} bytes (delta: {delta})");
    if original > 0 {
        let saved = 100.0 * (1.0 - compressed as f64 / original as f64);
        println!("size reduction: {saved:.2}%");
    }
    Ok(())
}

fn lookup_compressed(paths: &IndexPaths, term: &str) -> Result<()> {
    let cvocab = load_compressed_vocabulary(paths)?;
    let mut store = CompressedStore::open(paths)?;

    match store.get(&cvocab, term)? {
        Some(postings) => {
            for (doc_id, freq) in postings {
                println!("{doc_id}:{freq}");
            }
        }
        None => println!("term {term:?} not found"),
    }
    Ok(())
}

fn file_size(path: &PathBuf) -> Result<u64> {
    let meta = fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    Ok(meta.len())
}
