//! A sharded, memory-mapped full-text search engine: tokenizer, lexicon,
//! inverted index, optional embedding-based query expansion, and an
//! incremental writer, all exposed through the top-level [`Engine`].

pub mod analysis;
pub mod core;
pub mod embedding;
pub mod index;
pub mod lexicon;
pub mod query;
pub mod search;
pub mod state;
pub mod store;
pub mod writer;

use std::sync::atomic::Ordering;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::analysis::tokenizer::Tokenizer;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::stats::{Counters, EngineStats, Readiness};
use crate::core::types::{DocId, DocumentRecord, NewDocument};
use crate::embedding::EmbeddingModel;
use crate::index::barrel::BarrelSet;
use crate::index::dense_offsets::DenseOffsets;
use crate::lexicon::Lexicon;
use crate::query::{QueryContext, SearchHit};
use crate::search::corrector::{CorrectionResult, CorrectorContext};
use crate::search::Suggestion;
use crate::state::PersistedState;
use crate::store::document_store::DocumentStoreReader;
use crate::store::dynamic::DynamicIndex;
use crate::store::metadata::MetadataStore;
use crate::writer::incremental::IngestStats;

/// A fully open search engine over one `data_dir`. Holds every on-disk
/// structure behind a read-write lock so queries run concurrently and
/// writers (`add_documents`) take an exclusive pass only while rebuilding
/// the inverted index.
///
/// `Engine` replaces the process-wide singleton pattern some search
/// tools use: callers own the value and can open as many independent
/// engines (pointed at different `data_dir`s) as they like.
pub struct Engine {
    config: Config,
    tokenizer: Tokenizer,
    lexicon: RwLock<Lexicon>,
    barrels: RwLock<BarrelSet>,
    dense_offsets: RwLock<DenseOffsets>,
    document_store: RwLock<DocumentStoreReader>,
    metadata: RwLock<MetadataStore>,
    dynamic: RwLock<DynamicIndex>,
    embedding: EmbeddingModel,
    state: RwLock<PersistedState>,
    counters: Counters,
    readiness: RwLock<Readiness>,
}

impl Engine {
    /// Runs the full bulk pipeline over `corpus` into `config.data_dir`
    /// from scratch, then opens the result.
    pub fn build_all(config: Config, corpus: impl Iterator<Item = NewDocument>) -> Result<Self> {
        crate::core::logging::init_logging();
        let tokenizer = Tokenizer::new(&config);
        writer::builder::build_all(&config, &tokenizer, corpus)?;
        Self::open(config)
    }

    /// Opens an already-built (or empty) `data_dir`. Missing index files
    /// are treated as an empty index rather than an error, so a fresh
    /// `data_dir` can be opened and then populated via `add_documents`.
    pub fn open(config: Config) -> Result<Self> {
        crate::core::logging::init_logging();
        let tokenizer = Tokenizer::new(&config);
        let lexicon = Lexicon::load_text(&config.lexicon_path())?;
        let barrels = BarrelSet::open(&config)?;
        let dense_offsets = DenseOffsets::open(&config.dense_offsets_path())?;
        let document_store = DocumentStoreReader::open(&config.dataset_path(), &config.doc_offsets_path())?;
        let metadata = MetadataStore::load(&config.metadata_path())?;
        let embedding = EmbeddingModel::load(&config.embedding_path())?;
        let state = PersistedState::load_or_infer(&config.state_path(), &metadata, &lexicon, chrono::Utc::now());
        let dynamic = DynamicIndex::new(config.dynamic_min_word_length);

        let readiness = if lexicon.is_empty() && metadata.is_empty() { Readiness::Initializing } else { Readiness::Ready };

        Ok(Engine {
            config,
            tokenizer,
            lexicon: RwLock::new(lexicon),
            barrels: RwLock::new(barrels),
            dense_offsets: RwLock::new(dense_offsets),
            document_store: RwLock::new(document_store),
            metadata: RwLock::new(metadata),
            dynamic: RwLock::new(dynamic),
            embedding,
            state: RwLock::new(state),
            counters: Counters::new(),
            readiness: RwLock::new(readiness),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one query against the on-disk index plus the in-memory
    /// dynamic index, returning up to `config.max_results` ranked hits.
    pub fn search(&self, query: &str, use_semantic: bool) -> Vec<SearchHit> {
        self.counters.query_count.fetch_add(1, Ordering::Relaxed);

        let lexicon = self.lexicon.read();
        let barrels = self.barrels.read();
        let dense_offsets = self.dense_offsets.read();
        let dynamic = self.dynamic.read();
        let metadata = self.metadata.read();

        let ctx = QueryContext {
            config: &self.config,
            tokenizer: &self.tokenizer,
            lexicon: &lexicon,
            barrels: &barrels,
            dense_offsets: &dense_offsets,
            dynamic: &dynamic,
            embedding: &self.embedding,
            metadata: &metadata,
        };
        query::search(&ctx, query, use_semantic)
    }

    /// Prefix autocomplete over the lexicon, ranked by document frequency.
    pub fn suggest(&self, prefix: &str) -> Vec<Suggestion> {
        let lexicon = self.lexicon.read();
        let dense_offsets = self.dense_offsets.read();
        search::autocomplete::suggest(&lexicon, &dense_offsets, &self.config, prefix)
    }

    /// Spell-corrects a single word against the lexicon, falling back to
    /// fuzzy and semantic suggestions when a direct edit-distance match
    /// isn't confident enough.
    pub fn correct(&self, word: &str, max_suggestions: usize) -> CorrectionResult {
        let lexicon = self.lexicon.read();
        let dense_offsets = self.dense_offsets.read();
        let barrels = self.barrels.read();
        let ctx = CorrectorContext {
            config: &self.config,
            lexicon: &lexicon,
            dense_offsets: &dense_offsets,
            barrels: &barrels,
            embedding: &self.embedding,
        };
        search::corrector::correct_word(&ctx, word, max_suggestions)
    }

    /// Fetches a document's stored content, checking the dynamic index
    /// first for synthetic doc_ids.
    pub fn content(&self, doc_id: u32) -> Result<DocumentRecord> {
        if DynamicIndex::is_dynamic(doc_id) {
            return self
                .dynamic
                .read()
                .content(doc_id)
                .ok_or_else(|| crate::core::error::Error::doc_not_found(doc_id));
        }
        self.document_store.read().content(DocId(doc_id))
    }

    /// Appends `documents` to every on-disk structure and rebuilds the
    /// inverted index, then reopens the read-side views over the grown
    /// files so subsequent searches see the new documents.
    pub fn add_documents(&self, documents: &[NewDocument]) -> Result<IngestStats> {
        let mut lexicon = self.lexicon.write();
        let mut metadata = self.metadata.write();
        let stats = writer::incremental::add_documents(&self.config, &self.tokenizer, &mut lexicon, &mut metadata, documents)?;

        *self.barrels.write() = BarrelSet::open(&self.config)?;
        *self.dense_offsets.write() = DenseOffsets::open(&self.config.dense_offsets_path())?;
        *self.document_store.write() = DocumentStoreReader::open(&self.config.dataset_path(), &self.config.doc_offsets_path())?;
        *self.state.write() = PersistedState::load_or_infer(&self.config.state_path(), &metadata, &lexicon, chrono::Utc::now());
        *self.readiness.write() = Readiness::Ready;

        self.counters.ingest_batches.fetch_add(1, Ordering::Relaxed);
        Ok(stats)
    }

    /// Adds a document to the transient in-memory index only, visible to
    /// `search` immediately but lost on restart.
    pub fn add_document_dynamic(&self, title: &str, body: &str, authors: &str) -> u32 {
        self.dynamic.write().add_document(title, body, authors)
    }

    pub fn status(&self) -> EngineStats {
        let lexicon = self.lexicon.read();
        let metadata = self.metadata.read();
        EngineStats {
            uptime_secs: self.counters.start_time.elapsed().as_secs(),
            document_count: metadata.len(),
            word_count: lexicon.len(),
            barrel_count: self.config.barrel_count,
            query_count: self.counters.query_count.load(Ordering::Relaxed),
            ingest_batches: self.counters.ingest_batches.load(Ordering::Relaxed),
            last_build_time: None,
            last_ingest_time: if self.counters.ingest_batches.load(Ordering::Relaxed) > 0 {
                Some(SystemTime::now())
            } else {
                None
            },
            embedding_loaded: self.embedding.is_loaded(),
            readiness: *self.readiness.read(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn corpus() -> Vec<NewDocument> {
        vec![
            NewDocument { title: "Quick Fox".into(), body: "the quick brown fox jumps".into(), authors: "Alice".into() },
            NewDocument { title: "Lazy Dog".into(), body: "a lazy dog sleeps all day".into(), authors: "Bob".into() },
        ]
    }

    #[test]
    fn build_then_search_finds_documents() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let engine = Engine::build_all(config, corpus().into_iter()).unwrap();

        let hits = engine.search("quick fox", false);
        assert_eq!(hits[0].doc_id, 1);
        assert_eq!(hits[0].title, "Quick Fox");
    }

    #[test]
    fn incremental_add_is_searchable_after_rebuild() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let engine = Engine::build_all(config, corpus().into_iter()).unwrap();

        let added = vec![NewDocument { title: "New Doc".into(), body: "newly indexed content".into(), authors: "".into() }];
        engine.add_documents(&added).unwrap();

        let hits = engine.search("newly indexed", false);
        assert!(hits.iter().any(|h| h.title == "New Doc"));
    }

    #[test]
    fn dynamic_add_is_immediately_searchable() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let engine = Engine::build_all(config, corpus().into_iter()).unwrap();

        let doc_id = engine.add_document_dynamic("Instant Upload", "instant visibility demo", "");
        assert!(DynamicIndex::is_dynamic(doc_id));

        let hits = engine.search("instant visibility", false);
        assert!(hits.iter().any(|h| h.doc_id == doc_id));

        let record = engine.content(doc_id).unwrap();
        assert_eq!(record.title, "Instant Upload");
    }

    #[test]
    fn opening_empty_data_dir_reports_initializing() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let engine = Engine::open(config).unwrap();
        assert_eq!(engine.status().readiness, Readiness::Initializing);
        assert!(engine.search("anything", false).is_empty());
    }
}
