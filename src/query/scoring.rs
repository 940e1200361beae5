use std::collections::HashMap;

use crate::core::config::Config;

/// How a document's score was accumulated, kept per-document so the
/// engine can apply the strict-AND boost once term coverage is known.
#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    pub score: f32,
    pub matched_terms: std::collections::HashSet<u32>,
}

/// Running per-document scores across all query terms. `term_count` is
/// the number of distinct query terms (post-expansion grouping by
/// originating term), used to detect documents that matched every term
/// for the strict-AND boost.
pub struct Scorer<'a> {
    config: &'a Config,
    scores: HashMap<u32, ScoreAccumulator>,
    terms_with_postings: std::collections::HashSet<u32>,
}

impl<'a> Scorer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Scorer { config, scores: HashMap::new(), terms_with_postings: std::collections::HashSet::new() }
    }

    /// Adds `weight` to every doc_id in `doc_ids` for query term `term_index`.
    pub fn add_postings(&mut self, term_index: u32, doc_ids: impl Iterator<Item = u32>, weight: f32) {
        for doc_id in doc_ids {
            let entry = self.scores.entry(doc_id).or_default();
            entry.score += weight;
            entry.matched_terms.insert(term_index);
            self.terms_with_postings.insert(term_index);
        }
    }

    /// Adds `weight` to a single doc_id for `term_index`, used by the
    /// dynamic index whose postings aren't already an iterator of u32.
    pub fn add_one(&mut self, term_index: u32, doc_id: u32, weight: f32) {
        let entry = self.scores.entry(doc_id).or_default();
        entry.score += weight;
        entry.matched_terms.insert(term_index);
        self.terms_with_postings.insert(term_index);
    }

    /// Number of distinct query terms that produced at least one posting
    /// anywhere (on-disk or dynamic) — an out-of-vocabulary term has an
    /// empty concept set and must not count toward the strict-AND
    /// intersection, or it would demote every fully-matching document
    /// into the unboosted union fallback.
    pub fn terms_with_postings(&self) -> usize {
        self.terms_with_postings.len()
    }

    /// Finalizes scores. Any document matching every one of `total_terms`
    /// non-empty-concept-set query terms (see `terms_with_postings`) forms
    /// the strict-AND intersection; when that intersection is non-empty,
    /// it alone is returned (boosted by `strict_and_boost`) and documents
    /// matching only some terms are dropped. Only when no document
    /// matches every term does this fall back to the full union, ranked
    /// by accumulated score. Either way, results are sorted by score
    /// descending, doc_id ascending.
    pub fn finish(self, total_terms: usize) -> Vec<(u32, f32)> {
        let boost = self.config.strict_and_boost;
        let intersection: Vec<(u32, f32)> = self
            .scores
            .iter()
            .filter(|(_, acc)| total_terms > 0 && acc.matched_terms.len() == total_terms)
            .map(|(&doc_id, acc)| (doc_id, acc.score * boost))
            .collect();

        let mut ranked = if !intersection.is_empty() {
            intersection
        } else {
            self.scores.into_iter().map(|(doc_id, acc)| (doc_id, acc.score)).collect()
        };

        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_intersection_excludes_partial_matches() {
        let config = Config::default();
        let mut scorer = Scorer::new(&config);
        // doc 1 matches both terms, doc 2 matches only the first.
        scorer.add_postings(0, vec![1u32, 2].into_iter(), config.exact_weight);
        scorer.add_postings(1, vec![1u32].into_iter(), config.exact_weight);

        let ranked = scorer.finish(2);
        assert_eq!(ranked, vec![(1, config.exact_weight * 2.0 * config.strict_and_boost)]);
    }

    #[test]
    fn empty_intersection_falls_back_to_union() {
        let config = Config::default();
        let mut scorer = Scorer::new(&config);
        // doc 1 matches only the first term, doc 2 matches only the second:
        // no document matches every term, so both survive via the union.
        scorer.add_postings(0, vec![1u32].into_iter(), config.exact_weight);
        scorer.add_postings(1, vec![2u32].into_iter(), config.exact_weight);

        let ranked = scorer.finish(2);
        let doc_ids: Vec<u32> = ranked.iter().map(|(id, _)| *id).collect();
        assert_eq!(doc_ids, vec![1, 2]);
    }

    #[test]
    fn out_of_vocabulary_term_does_not_shrink_the_intersection() {
        let config = Config::default();
        let mut scorer = Scorer::new(&config);
        // term 0 "quick" matches doc 1; term 1 is a typo with no postings
        // anywhere, so it must not count toward `total_terms`.
        scorer.add_postings(0, vec![1u32].into_iter(), config.exact_weight);

        let total_terms = scorer.terms_with_postings();
        let ranked = scorer.finish(total_terms);
        assert_eq!(ranked, vec![(1, config.exact_weight * config.strict_and_boost)]);
    }

    #[test]
    fn ties_break_on_ascending_doc_id() {
        let config = Config::default();
        let mut scorer = Scorer::new(&config);
        scorer.add_one(0, 5, 1.0);
        scorer.add_one(0, 2, 1.0);
        let ranked = scorer.finish(1);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[1].0, 5);
    }
}
