use std::time::{Duration, Instant};

use chrono::Utc;
use rayon::prelude::*;

use crate::analysis::tokenizer::{Token, Tokenizer, TokenizerMode};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::{DocId, NewDocument};
use crate::index::barrel::build_barrels;
use crate::index::dense_offsets::write_dense_table;
use crate::index::forward::ForwardIndexWriter;
use crate::lexicon::Lexicon;
use crate::state::PersistedState;
use crate::store::document_store::DocumentStoreWriter;
use crate::store::metadata::MetadataStore;

/// Timing and volume summary for one full bulk build, logged at info
/// level per stage and returned for callers that want it programmatically.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub documents: usize,
    pub total_words: usize,
    pub vocabulary_size: usize,
    pub tokenize_stage: Duration,
    pub invert_stage: Duration,
}

/// Runs the full bulk indexing pipeline over `corpus` from scratch,
/// overwriting any index already present under `config.data_dir`:
/// tokenize and stream every document into the lexicon, forward index,
/// document store, and metadata store in a single pass, then invert the
/// forward index into barrels and a dense offset table, then persist
/// indexer state.
pub fn build_all(config: &Config, tokenizer: &Tokenizer, corpus: impl Iterator<Item = NewDocument>) -> Result<BuildReport> {
    std::fs::create_dir_all(&config.data_dir)?;

    let tokenize_start = Instant::now();
    let mut lexicon = Lexicon::new();
    let mut metadata = MetadataStore::new();
    let mut forward_writer = ForwardIndexWriter::create(&config.forward_index_path())?;
    let mut doc_store = DocumentStoreWriter::create(&config.dataset_path(), &config.doc_offsets_path())?;

    let mut documents = 0usize;
    let mut total_words = 0usize;
    let mut next_doc_id = 1u32;

    // Tokenizing is CPU-bound and embarrassingly parallel per document;
    // interning and appends stay sequential afterward so doc_ids and
    // lexicon surface order are reproducible regardless of thread count.
    let pool = rayon::ThreadPoolBuilder::new().num_threads(config.indexing_threads).build().ok();

    let mut corpus = corpus;
    let mut batch: Vec<NewDocument> = Vec::with_capacity(config.batch_size);
    loop {
        batch.extend(corpus.by_ref().take(config.batch_size));
        if batch.is_empty() {
            break;
        }

        for (doc, tokens) in tokenize_batch(&pool, tokenizer, std::mem::take(&mut batch)) {
            if tokens.is_empty() {
                continue;
            }

            let word_ids: Vec<u32> = tokens.iter().map(|t| lexicon.intern(&t.text).value()).collect();

            let doc_id = DocId(next_doc_id);
            forward_writer.append(doc_id, &word_ids)?;
            doc_store.append(doc_id, &doc.title, &doc.body, &doc.authors)?;
            metadata.append(&config.metadata_path(), doc_id, &doc.title, &doc.authors)?;

            documents += 1;
            total_words += tokens.len();
            next_doc_id += 1;

            if documents % config.progress_interval == 0 {
                tracing::info!(documents, total_words, "bulk build progress");
            }
        }
    }

    forward_writer.flush()?;
    doc_store.flush()?;
    lexicon.rebuild_ordered_view()?;
    lexicon.save_text(&config.lexicon_path())?;

    let tokenize_stage = tokenize_start.elapsed();
    tracing::info!(documents, elapsed_ms = tokenize_stage.as_millis(), "tokenize stage complete");

    let invert_start = Instant::now();
    let build = build_barrels(&config.forward_index_path(), config)?;
    if let Some(max_word_id) = build.max_word_id {
        write_dense_table(&config.dense_offsets_path(), &build.offsets, max_word_id)?;
    }
    let invert_stage = invert_start.elapsed();
    tracing::info!(words = build.offsets.len(), elapsed_ms = invert_stage.as_millis(), "invert stage complete");

    let state = PersistedState {
        next_doc_id,
        next_word_id: lexicon.next_word_id(),
        timestamp: Utc::now(),
        total_words: lexicon.len(),
    };
    state.save(&config.state_path())?;

    Ok(BuildReport {
        documents,
        total_words,
        vocabulary_size: lexicon.len(),
        tokenize_stage,
        invert_stage,
    })
}

/// Tokenizes one batch of documents, using `pool` when available so the
/// regex scan runs across `config.indexing_threads` workers; falls back to
/// a plain sequential map if the pool failed to build.
fn tokenize_batch(
    pool: &Option<rayon::ThreadPool>,
    tokenizer: &Tokenizer,
    batch: Vec<NewDocument>,
) -> Vec<(NewDocument, Vec<Token>)> {
    let tokenize_one = |doc: NewDocument| {
        let full_text = format!("{} {}", doc.title, doc.body);
        let tokens = tokenizer.tokenize(&full_text, TokenizerMode::Index);
        (doc, tokens)
    };
    match pool {
        Some(pool) => pool.install(|| batch.into_par_iter().map(tokenize_one).collect()),
        None => batch.into_iter().map(tokenize_one).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;
    use tempfile::tempdir;

    #[test]
    fn builds_full_index_from_corpus() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let tokenizer = Tokenizer::new(&config);

        let corpus = vec![
            NewDocument { title: "Fox".into(), body: "the quick brown fox".into(), authors: "Alice".into() },
            NewDocument { title: "Dog".into(), body: "the lazy dog".into(), authors: "Bob".into() },
        ];

        let report = build_all(&config, &tokenizer, corpus.into_iter()).unwrap();
        assert_eq!(report.documents, 2);
        assert!(report.vocabulary_size > 0);
        assert!(config.lexicon_path().exists());
        assert!(config.dense_offsets_path().exists());
        assert!(config.state_path().exists());
    }

    #[test]
    fn empty_body_documents_are_skipped() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let tokenizer = Tokenizer::new(&config);
        let corpus = vec![NewDocument { title: "Empty".into(), body: "  ".into(), authors: "".into() }];
        let report = build_all(&config, &tokenizer, corpus.into_iter()).unwrap();
        assert_eq!(report.documents, 0);
    }

    #[test]
    fn title_words_are_indexed_alongside_body_words() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let tokenizer = Tokenizer::new(&config);
        let corpus =
            vec![NewDocument { title: "Algorithms".into(), body: "sorting and searching".into(), authors: "".into() }];
        let engine = Engine::build_all(config, corpus.into_iter()).unwrap();
        assert!(!engine.search("algorithms", false).is_empty());
    }
}
