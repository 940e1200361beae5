use std::collections::HashSet;

/// Default closed-class English stop-word set.
pub fn default_stopwords() -> HashSet<String> {
    const WORDS: &[&str] = &[
        "a", "an", "the", "and", "or", "but", "if", "of", "at", "by", "for",
        "with", "about", "this", "that", "these", "those", "which", "it",
        "its", "in", "on", "is", "to", "as", "are", "was", "be", "from",
        "has", "he", "will",
    ];
    WORDS.iter().map(|w| w.to_string()).collect()
}
