//! Tokenizer adapter. The indexing core only ever sees the ordered token
//! stream this module produces; pattern choices, stopwords and stemming all
//! stay on this side of the boundary.

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Token classes, tried in this order. Dates before numbers so "12-05-2024"
    // is not split into number fragments.
    static ref RE: Regex = Regex::new(concat!(
        r"(?:ftp|https?)://[^\s/$.?#][^\s]*",                     // urls
        r"|[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,7}",      // emails
        r"|\d{2}[-/.]\d{2}[-/.]\d{4}",                            // dates
        r"|\d{1,4}(?:[.-]?\d{1,4}){0,3}",                         // numbers
        r"|\p{L}+(?:['\-]\p{L}+)*",                               // words
    ))
    .expect("valid regex");
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    pub strip_html: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            strip_html: false,
            remove_stopwords: true,
            stem: true,
        }
    }
}

impl TokenizerConfig {
    /// No stopword removal, no stemming. Tokens come out as typed, lowercased.
    pub fn passthrough() -> Self {
        Self {
            strip_html: false,
            remove_stopwords: false,
            stem: false,
        }
    }
}

/// Tokenize text into an ordered list of normalized terms: NFKC
/// normalization, lowercasing, optional HTML stripping, optional stopword
/// removal, optional English stemming.
pub fn tokenize(text: &str, config: &TokenizerConfig) -> Vec<String> {
    let stripped;
    let text = if config.strip_html {
        stripped = HTML_TAG.replace_all(text, " ");
        stripped.as_ref()
    } else {
        text
    };
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        if config.remove_stopwords && is_stopword(token) {
            continue;
        }
        if config.stem {
            tokens.push(STEMMER.stem(token).to_string());
        } else {
            tokens.push(token.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_keeps_stopwords() {
        let toks = tokenize("the cat sat", &TokenizerConfig::passthrough());
        assert_eq!(toks, vec!["the", "cat", "sat"]);
    }

    #[test]
    fn strips_html_when_asked() {
        let cfg = TokenizerConfig {
            strip_html: true,
            ..TokenizerConfig::passthrough()
        };
        let toks = tokenize("<p>cat</p><br/>dog", &cfg);
        assert_eq!(toks, vec!["cat", "dog"]);
    }

    #[test]
    fn recognizes_urls_and_emails_as_single_tokens() {
        let toks = tokenize(
            "see https://example.org/x and mail bob@example.org",
            &TokenizerConfig::passthrough(),
        );
        assert!(toks.contains(&"https://example.org/x".to_string()));
        assert!(toks.contains(&"bob@example.org".to_string()));
    }
}
