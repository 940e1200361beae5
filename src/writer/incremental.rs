use chrono::Utc;

use crate::analysis::tokenizer::{Tokenizer, TokenizerMode};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::{DocId, NewDocument};
use crate::index::barrel::build_barrels;
use crate::index::dense_offsets::write_dense_table;
use crate::lexicon::Lexicon;
use crate::state::PersistedState;
use crate::store::document_store::DocumentStoreWriter;
use crate::store::metadata::MetadataStore;

/// Outcome of one `add_documents` call.
#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub documents_added: usize,
    pub new_words: usize,
    pub total_words_processed: usize,
}

/// Appends `documents` to every on-disk structure, then rebuilds the
/// inverted index (barrels + dense offsets) from the forward index end
/// to end, and finally persists the updated indexer state.
///
/// Rebuilding the whole inverted index on every batch (rather than
/// patching barrels in place) keeps barrel layout simple at the cost of
/// O(total postings) work per batch; acceptable because barrels are
/// rebuilt from a sequential scan of the forward index, not re-tokenized.
pub fn add_documents(
    config: &Config,
    tokenizer: &Tokenizer,
    lexicon: &mut Lexicon,
    metadata: &mut MetadataStore,
    documents: &[NewDocument],
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();
    if documents.is_empty() {
        return Ok(stats);
    }

    let mut next_doc_id = metadata.max_doc_id().map(|id| id + 1).unwrap_or(1);
    let mut new_surfaces = Vec::new();

    let mut forward_writer =
        crate::index::forward::ForwardIndexWriter::append_for_incremental(&config.forward_index_path())?;
    let mut doc_store = if config.dataset_path().exists() {
        DocumentStoreWriter::open_append(&config.dataset_path(), &config.doc_offsets_path())?
    } else {
        DocumentStoreWriter::create(&config.dataset_path(), &config.doc_offsets_path())?
    };

    for doc in documents {
        let full_text = format!("{} {}", doc.title, doc.body);
        let tokens = tokenizer.tokenize(&full_text, TokenizerMode::Index);
        if tokens.is_empty() {
            continue;
        }

        let mut word_ids = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let before = lexicon.len();
            let id = lexicon.intern(&token.text);
            if lexicon.len() > before {
                new_surfaces.push(token.text.clone());
                stats.new_words += 1;
            }
            word_ids.push(id.value());
        }

        let doc_id = DocId(next_doc_id);
        forward_writer.append(doc_id, &word_ids)?;
        doc_store.append(doc_id, &doc.title, &doc.body, &doc.authors)?;
        metadata.append(&config.metadata_path(), doc_id, &doc.title, &doc.authors)?;

        stats.documents_added += 1;
        stats.total_words_processed += tokens.len();
        next_doc_id += 1;
    }

    forward_writer.flush()?;
    doc_store.flush()?;

    if !new_surfaces.is_empty() {
        lexicon.append_text(&config.lexicon_path(), &new_surfaces)?;
    }

    let build = build_barrels(&config.forward_index_path(), config)?;
    if let Some(max_word_id) = build.max_word_id {
        write_dense_table(&config.dense_offsets_path(), &build.offsets, max_word_id)?;
    }

    let state = PersistedState {
        next_doc_id,
        next_word_id: lexicon.next_word_id(),
        timestamp: Utc::now(),
        total_words: lexicon.len(),
    };
    state.save(&config.state_path())?;

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn adds_documents_and_rebuilds_barrels() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let tokenizer = Tokenizer::new(&config);
        let mut lexicon = Lexicon::new();
        let mut metadata = MetadataStore::new();

        let docs = vec![
            NewDocument { title: "Quick Fox".into(), body: "the quick brown fox".into(), authors: "Alice".into() },
            NewDocument { title: "Lazy Dog".into(), body: "a lazy dog sleeps".into(), authors: "Bob".into() },
        ];

        let stats = add_documents(&config, &tokenizer, &mut lexicon, &mut metadata, &docs).unwrap();
        assert_eq!(stats.documents_added, 2);
        assert!(stats.new_words > 0);
        assert!(config.dense_offsets_path().exists());
        assert!(config.state_path().exists());
        assert_eq!(metadata.max_doc_id(), Some(2));
    }

    #[test]
    fn second_batch_continues_doc_ids_and_preserves_first_batch() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let tokenizer = Tokenizer::new(&config);
        let mut lexicon = Lexicon::new();
        let mut metadata = MetadataStore::new();

        let first = vec![NewDocument { title: "A".into(), body: "quick brown fox".into(), authors: "".into() }];
        add_documents(&config, &tokenizer, &mut lexicon, &mut metadata, &first).unwrap();

        let second = vec![NewDocument { title: "B".into(), body: "quick silver".into(), authors: "".into() }];
        let stats = add_documents(&config, &tokenizer, &mut lexicon, &mut metadata, &second).unwrap();

        assert_eq!(stats.documents_added, 1);
        assert_eq!(metadata.max_doc_id(), Some(2));
        assert!(metadata.get(DocId(1)).is_some());
        assert!(metadata.get(DocId(2)).is_some());
    }

    #[test]
    fn title_words_are_indexed_alongside_body_words() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let tokenizer = Tokenizer::new(&config);
        let mut lexicon = Lexicon::new();
        let mut metadata = MetadataStore::new();

        let docs = vec![NewDocument { title: "Algorithms".into(), body: "sorting and searching".into(), authors: "".into() }];
        add_documents(&config, &tokenizer, &mut lexicon, &mut metadata, &docs).unwrap();

        assert!(lexicon.get_id("algorithms").is_some());
    }
}
