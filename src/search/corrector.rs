use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder};

use crate::core::config::Config;
use crate::embedding::EmbeddingModel;
use crate::index::barrel::BarrelSet;
use crate::index::dense_offsets::DenseOffsets;
use crate::lexicon::Lexicon;

const EDIT_RATIO_THRESHOLD: f64 = 0.7;
const FUZZY_RATIO_THRESHOLD: f64 = 0.75;
const MIN_CANDIDATES_BEFORE_SEMANTIC: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionType {
    None,
    EditDistance,
    Fuzzy,
    Semantic,
}

#[derive(Debug, Clone)]
pub struct CorrectionResult {
    pub original: String,
    pub is_correct: bool,
    pub suggestions: Vec<(String, f32)>,
    pub correction_type: CorrectionType,
}

pub struct CorrectorContext<'a> {
    pub config: &'a Config,
    pub lexicon: &'a Lexicon,
    pub dense_offsets: &'a DenseOffsets,
    pub barrels: &'a BarrelSet,
    pub embedding: &'a EmbeddingModel,
}

impl<'a> CorrectorContext<'a> {
    fn doc_frequency(&self, word: &str) -> u32 {
        self.lexicon
            .get_id(word)
            .and_then(|id| self.dense_offsets.lookup(id))
            .map(|r| r.count)
            .unwrap_or(0)
    }
}

/// Layered spell correction: a bounded-edit-distance scan over the lexicon
/// FST, then a looser fuzzy pass if that left too few candidates, then an
/// embedding-based semantic fallback as a last resort.
pub fn correct_word(ctx: &CorrectorContext<'_>, word: &str, max_suggestions: usize) -> CorrectionResult {
    let word_lower = word.to_lowercase();

    if ctx.lexicon.get_id(&word_lower).is_some() {
        return CorrectionResult {
            original: word.to_string(),
            is_correct: true,
            suggestions: Vec::new(),
            correction_type: CorrectionType::None,
        };
    }

    let mut suggestions = edit_distance_suggestions(ctx, &word_lower, max_suggestions);
    let mut correction_type =
        if suggestions.is_empty() { CorrectionType::None } else { CorrectionType::EditDistance };

    if suggestions.len() < MIN_CANDIDATES_BEFORE_SEMANTIC {
        let seen: std::collections::HashSet<_> = suggestions.iter().map(|(w, _)| w.clone()).collect();
        for (candidate, score) in fuzzy_suggestions(ctx, &word_lower, max_suggestions) {
            if !seen.contains(&candidate) {
                suggestions.push((candidate, score));
                correction_type = CorrectionType::Fuzzy;
            }
        }
    }

    if suggestions.len() < MIN_CANDIDATES_BEFORE_SEMANTIC {
        let seen: std::collections::HashSet<_> = suggestions.iter().map(|(w, _)| w.clone()).collect();
        for (candidate, score) in semantic_suggestions(ctx, &word_lower, max_suggestions) {
            if !seen.contains(&candidate) {
                suggestions.push((candidate, score));
                correction_type = CorrectionType::Semantic;
            }
        }
    }

    suggestions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    suggestions.truncate(max_suggestions);

    CorrectionResult { original: word.to_string(), is_correct: false, suggestions, correction_type }
}

/// Builds a Levenshtein DFA for `word` and streams the lexicon's ordered
/// FST for matches within `config.correction_max_edit_distance`, scoring
/// each hit by `lcs_ratio * (1 + ln(1 + doc_frequency))`.
fn edit_distance_suggestions(ctx: &CorrectorContext<'_>, word: &str, limit: usize) -> Vec<(String, f32)> {
    if word.len() < 2 {
        return Vec::new();
    }

    let builder = LevenshteinAutomatonBuilder::new(ctx.config.correction_max_edit_distance, true);
    let dfa = builder.build_dfa(word);

    let mut scored: Vec<(String, f32)> = ctx
        .lexicon
        .surfaces()
        .filter_map(|surface| match dfa.eval(surface.as_bytes()) {
            Distance::Exact(_) => {
                let ratio = strsim::normalized_levenshtein(word, surface);
                if ratio < EDIT_RATIO_THRESHOLD {
                    return None;
                }
                let freq = ctx.doc_frequency(surface) as f64;
                let score = ratio * (1.0 + (1.0 + freq).ln());
                Some((surface.to_string(), score as f32))
            }
            Distance::AtLeast(_) => None,
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}

/// Looser similarity pass over the whole vocabulary using Jaro-Winkler,
/// standing in for the original's fuzzy token-set matcher: tolerant of
/// transpositions and prefix drift that plain edit distance penalizes.
fn fuzzy_suggestions(ctx: &CorrectorContext<'_>, word: &str, limit: usize) -> Vec<(String, f32)> {
    let mut scored: Vec<(String, f32)> = ctx
        .lexicon
        .surfaces()
        .filter_map(|surface| {
            let ratio = strsim::jaro_winkler(word, surface);
            if ratio < FUZZY_RATIO_THRESHOLD {
                return None;
            }
            let freq = ctx.doc_frequency(surface) as f64;
            let score = ratio * (1.0 + (1.0 + freq).ln());
            Some((surface.to_string(), score as f32))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit * 2);
    scored.truncate(limit);
    scored
}

/// Embedding-neighbour fallback, used only when the two lexical passes
/// left too few candidates. Neighbours already come pre-filtered by
/// cosine similarity inside `EmbeddingModel::similar`.
fn semantic_suggestions(ctx: &CorrectorContext<'_>, word: &str, limit: usize) -> Vec<(String, f32)> {
    if !ctx.embedding.is_loaded() || ctx.embedding.get_vector(word).is_none() {
        return Vec::new();
    }
    ctx.embedding
        .similar(word, limit)
        .into_iter()
        .filter(|(candidate, _)| ctx.lexicon.get_id(candidate).is_some())
        .collect()
}
