use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

fn bsbi(index: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bsbi"))
        .arg("--index")
        .arg(index)
        .args(args)
        .output()
        .expect("failed to run bsbi")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn write_corpus(dir: &Path) {
    fs::write(dir.join("doc0.txt"), "the cat sat").unwrap();
    fs::write(dir.join("doc1.txt"), "the dog sat").unwrap();
    fs::write(dir.join("doc2.txt"), "cat and dog").unwrap();
}

#[test]
fn build_then_query_end_to_end() {
    let docs = tempdir().unwrap();
    let index = tempdir().unwrap();
    write_corpus(docs.path());

    // Passthrough tokenization so stopwords like "the" stay indexed.
    let out = bsbi(
        index.path(),
        &[
            "build-index",
            docs.path().to_str().unwrap(),
            "2",
            "--keep-stopwords",
            "--no-stem",
        ],
    );
    assert!(out.status.success(), "build-index failed: {out:?}");

    let out = bsbi(index.path(), &["lookup", "cat"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("0:doc0.txt:1"), "got: {text}");
    assert!(text.contains("2:doc2.txt:1"), "got: {text}");

    let out = bsbi(index.path(), &["lookup", "unicorn"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("not found"));

    let out = bsbi(index.path(), &["boolean-query", "cat AND dog"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("doc2.txt:2"));
    assert!(!text.contains("doc0.txt"));

    let out = bsbi(
        index.path(),
        &["rank-query", "cat dog", "2", "--keep-stopwords", "--no-stem"],
    );
    assert!(out.status.success());
    // doc2 contains both query terms and must rank first.
    assert!(stdout(&out).lines().next().unwrap().starts_with("doc2.txt:2:"));

    let out = bsbi(index.path(), &["build-skips"]);
    assert!(out.status.success());

    let out = bsbi(index.path(), &["compress-index", "--delta"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("compressed index"));

    let out = bsbi(index.path(), &["lookup-compressed", "cat"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("0:1"));
    assert!(text.contains("2:1"));
}

#[test]
fn bad_arguments_exit_nonzero() {
    let index = tempdir().unwrap();

    // Missing input directory.
    let out = bsbi(index.path(), &["build-index", "/no/such/dir", "2"]);
    assert!(!out.status.success());

    // Zero chunk limit.
    let docs = tempdir().unwrap();
    let out = bsbi(
        index.path(),
        &["build-index", docs.path().to_str().unwrap(), "0"],
    );
    assert!(!out.status.success());

    // Malformed boolean expression against a real index.
    write_corpus(docs.path());
    let out = bsbi(
        index.path(),
        &["build-index", docs.path().to_str().unwrap(), "2"],
    );
    assert!(out.status.success());
    let out = bsbi(index.path(), &["boolean-query", "cat AND"]);
    assert!(!out.status.success());
}
