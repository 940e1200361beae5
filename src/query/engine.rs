use crate::analysis::tokenizer::{Tokenizer, TokenizerMode};
use crate::core::config::Config;
use crate::core::types::DocId;
use crate::embedding::EmbeddingModel;
use crate::index::barrel::BarrelSet;
use crate::index::dense_offsets::DenseOffsets;
use crate::lexicon::Lexicon;
use crate::query::scoring::Scorer;
use crate::store::dynamic::DynamicIndex;
use crate::store::metadata::MetadataStore;

/// One ranked search result, enriched with display metadata.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub doc_id: u32,
    pub score: f32,
    pub title: String,
    pub authors: String,
}

/// Everything a single search needs read access to. Borrowed rather than
/// owned so the engine can hold them behind a `RwLock` and serve many
/// concurrent queries over the same snapshot.
pub struct QueryContext<'a> {
    pub config: &'a Config,
    pub tokenizer: &'a Tokenizer,
    pub lexicon: &'a Lexicon,
    pub barrels: &'a BarrelSet,
    pub dense_offsets: &'a DenseOffsets,
    pub dynamic: &'a DynamicIndex,
    pub embedding: &'a EmbeddingModel,
    pub metadata: &'a MetadataStore,
}

/// Runs one query end to end: tokenize, optionally expand each term with
/// its nearest embedding neighbours, fetch postings from both the
/// on-disk barrels and the in-memory dynamic index, score, rank, and
/// enrich with title/author metadata.
pub fn search(ctx: &QueryContext<'_>, query: &str, use_semantic: bool) -> Vec<SearchHit> {
    let tokens = ctx.tokenizer.tokenize(query, TokenizerMode::Search);
    let tokens = if tokens.is_empty() {
        ctx.tokenizer.tokenize_keep_stopwords(query, TokenizerMode::Search)
    } else {
        tokens
    };
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut scorer = Scorer::new(ctx.config);

    for (term_index, token) in tokens.iter().enumerate() {
        let term_index = term_index as u32;
        collect_term(ctx, &mut scorer, term_index, &token.text, ctx.config.exact_weight);

        if use_semantic && ctx.embedding.is_loaded() {
            for (neighbour, _cosine) in ctx.embedding.similar(&token.text, ctx.config.k_expand) {
                collect_term(ctx, &mut scorer, term_index, &neighbour, ctx.config.expanded_weight);
            }
        }
    }

    let total_terms = scorer.terms_with_postings();
    let ranked = scorer.finish(total_terms);
    ranked
        .into_iter()
        .take(ctx.config.max_results)
        .map(|(doc_id, score)| enrich(ctx, doc_id, score))
        .collect()
}

fn collect_term(ctx: &QueryContext<'_>, scorer: &mut Scorer<'_>, term_index: u32, word: &str, weight: f32) {
    if let Some(word_id) = ctx.lexicon.get_id(word) {
        if let Some(record) = ctx.dense_offsets.lookup(word_id) {
            match ctx.barrels.posting_list(record) {
                Ok(postings) => scorer.add_postings(term_index, postings.iter(), weight),
                Err(e) => tracing::warn!(word, error = %e, "skipping corrupt posting list"),
            }
        }
    }

    if let Some(doc_ids) = ctx.dynamic.posting_list(word) {
        let dynamic_weight = weight * ctx.config.dynamic_boost;
        for &doc_id in doc_ids {
            scorer.add_one(term_index, doc_id, dynamic_weight);
        }
    }
}

fn enrich(ctx: &QueryContext<'_>, doc_id: u32, score: f32) -> SearchHit {
    if DynamicIndex::is_dynamic(doc_id) {
        let title = ctx.dynamic.title(doc_id).unwrap_or_default().to_string();
        return SearchHit { doc_id, score, title, authors: String::new() };
    }

    let title = ctx
        .metadata
        .display_title(DocId(doc_id), ctx.config.metadata_title_display_cap)
        .unwrap_or_default();
    let authors = ctx.metadata.get(DocId(doc_id)).map(|e| e.authors.clone()).unwrap_or_default();
    SearchHit { doc_id, score, title, authors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::barrel::build_barrels;
    use crate::index::dense_offsets::write_dense_table;
    use crate::index::forward::ForwardIndexWriter;
    use crate::store::metadata::MetadataStore;
    use tempfile::tempdir;

    fn setup() -> (Config, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        (config, dir)
    }

    #[test]
    fn strict_and_intersection_excludes_partial_matches() {
        let (config, _dir) = setup();
        let tokenizer = Tokenizer::new(&config);
        let mut lexicon = Lexicon::new();

        let quick = lexicon.intern("quick");
        let fox = lexicon.intern("fox");
        let brown = lexicon.intern("brown");

        {
            let mut fw = ForwardIndexWriter::create(&config.forward_index_path()).unwrap();
            fw.append(DocId(1), &[quick.value(), fox.value()]).unwrap();
            fw.append(DocId(2), &[fox.value(), brown.value()]).unwrap();
            fw.flush().unwrap();
        }

        let build = build_barrels(&config.forward_index_path(), &config).unwrap();
        let max_word_id = build.max_word_id.unwrap();
        write_dense_table(&config.dense_offsets_path(), &build.offsets, max_word_id).unwrap();

        let barrels = BarrelSet::open(&config).unwrap();
        let dense = DenseOffsets::open(&config.dense_offsets_path()).unwrap();
        let dynamic = DynamicIndex::new(config.dynamic_min_word_length);
        let embedding = EmbeddingModel::empty();
        let metadata = MetadataStore::new();

        let ctx = QueryContext {
            config: &config,
            tokenizer: &tokenizer,
            lexicon: &lexicon,
            barrels: &barrels,
            dense_offsets: &dense,
            dynamic: &dynamic,
            embedding: &embedding,
            metadata: &metadata,
        };

        let hits = search(&ctx, "quick fox", false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 1);

        let hits = search(&ctx, "fox brown", false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 2);

        // "zzyzx" is out-of-vocabulary: its concept set is empty and must
        // not shrink the intersection target, or doc 1 would get demoted
        // into the unboosted union fallback alongside doc 2.
        let hits = search(&ctx, "quick fox zzyzx", false);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 1);
    }

    #[test]
    fn empty_query_returns_no_hits() {
        let (config, _dir) = setup();
        let tokenizer = Tokenizer::new(&config);
        let lexicon = Lexicon::new();
        let barrels = BarrelSet::open(&config).unwrap();
        let dense = DenseOffsets::open(&config.dense_offsets_path()).unwrap();
        let dynamic = DynamicIndex::new(config.dynamic_min_word_length);
        let embedding = EmbeddingModel::empty();
        let metadata = MetadataStore::new();

        let ctx = QueryContext {
            config: &config,
            tokenizer: &tokenizer,
            lexicon: &lexicon,
            barrels: &barrels,
            dense_offsets: &dense,
            dynamic: &dynamic,
            embedding: &embedding,
            metadata: &metadata,
        };

        assert!(search(&ctx, "   ", false).is_empty());
    }
}
