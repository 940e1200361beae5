use std::collections::HashSet;
use std::sync::OnceLock;

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;

use crate::core::config::Config;

/// A single recognized word in a token stream, in first-appearance order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

/// Which character class a caller is allowed to retain. The indexer
/// restricts to letters; the searcher additionally accepts digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenizerMode {
    Index,
    Search,
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("[a-z0-9]+").expect("static regex"))
}

/// Lowercase-ASCII word extraction with stop-word and min-length filtering.
/// Deterministic; results for a given `(mode, text)` pair are cached in a
/// small LRU so repeated queries/autocomplete prefixes avoid re-tokenizing.
pub struct Tokenizer {
    min_word_length: usize,
    stop_words: HashSet<String>,
    cache: Mutex<LruCache<(TokenizerMode, String), Vec<Token>>>,
}

impl Tokenizer {
    pub fn new(config: &Config) -> Self {
        Tokenizer {
            min_word_length: config.min_word_length,
            stop_words: config.stop_words.clone(),
            cache: Mutex::new(LruCache::new(std::num::NonZeroUsize::new(256).unwrap())),
        }
    }

    /// Tokenizes `text`, applying ASCII lowercasing plus min-length and
    /// stop-word filters. `Index` mode restricts to letters; `Search`
    /// mode additionally allows digits.
    pub fn tokenize(&self, text: &str, mode: TokenizerMode) -> Vec<Token> {
        let key = (mode, text.to_string());
        if let Some(hit) = self.cache.lock().get(&key) {
            return hit.clone();
        }

        let lowered = text.to_lowercase();
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for m in word_regex().find_iter(&lowered) {
            let word = m.as_str();
            if mode == TokenizerMode::Index && word.bytes().any(|b| b.is_ascii_digit()) {
                continue;
            }
            if word.len() < self.min_word_length {
                continue;
            }
            if self.stop_words.contains(word) {
                continue;
            }
            tokens.push(Token { text: word.to_string(), position });
            position += 1;
        }

        self.cache.lock().put(key, tokens.clone());
        tokens
    }

    /// Tokenizes without dropping stop-words, used when removing them would
    /// empty the query.
    pub fn tokenize_keep_stopwords(&self, text: &str, mode: TokenizerMode) -> Vec<Token> {
        let lowered = text.to_lowercase();
        let mut tokens = Vec::new();
        let mut position = 0u32;
        for m in word_regex().find_iter(&lowered) {
            let word = m.as_str();
            if mode == TokenizerMode::Index && word.bytes().any(|b| b.is_ascii_digit()) {
                continue;
            }
            if word.len() < self.min_word_length {
                continue;
            }
            tokens.push(Token { text: word.to_string(), position });
            position += 1;
        }
        tokens
    }
}

/// Bare word extraction with a caller-supplied minimum length and no
/// stop-word filtering, used by the dynamic in-memory index whose
/// instant-upload path is looser than the persisted lexicon's
/// `min_word_length`.
pub fn extract_words(text: &str, min_len: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    word_regex()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .filter(|w| w.len() >= min_len)
        .collect()
}
