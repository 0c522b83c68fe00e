use bsbi_core::tokenizer::{tokenize, TokenizerConfig};

#[test]
fn it_normalizes_and_stems() {
    let toks = tokenize("Running Runners RUN! The café's menu.", &TokenizerConfig::default());
    // Stemming to "run" should appear
    assert!(toks.contains(&"run".to_string()));
    // Unicode normalization keeps the word intact
    assert!(toks.iter().any(|w| w.starts_with("caf")));
}

#[test]
fn it_filters_stopwords() {
    let toks = tokenize("The quick brown fox and the lazy dog", &TokenizerConfig::default());
    assert!(!toks.contains(&"the".to_string()));
    assert!(!toks.contains(&"and".to_string()));
}

#[test]
fn token_order_is_preserved() {
    let toks = tokenize("zebra apple zebra", &TokenizerConfig::passthrough());
    assert_eq!(toks, vec!["zebra", "apple", "zebra"]);
}
