use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::lexicon::Lexicon;
use crate::store::metadata::MetadataStore;

/// Indexer bookkeeping persisted between runs, so a restart doesn't need
/// to rescan every file to figure out the next doc_id or word_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub next_doc_id: u32,
    pub next_word_id: u32,
    pub timestamp: DateTime<Utc>,
    pub total_words: usize,
}

impl PersistedState {
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(self)?)?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Loads the persisted state, if any, and reconciles it against what
    /// the metadata store and lexicon actually contain: on disagreement
    /// the larger of the two values wins, since the persisted file is
    /// only ever behind truth (a crash between writing data and saving
    /// state), never ahead of it.
    pub fn load_or_infer(path: &Path, metadata: &MetadataStore, lexicon: &Lexicon, now: DateTime<Utc>) -> Self {
        let inferred_doc_id = metadata.max_doc_id().map(|id| id + 1).unwrap_or(0);
        let inferred_word_id = lexicon.next_word_id();

        let Ok(bytes) = fs::read(path) else {
            return PersistedState {
                next_doc_id: inferred_doc_id,
                next_word_id: inferred_word_id,
                timestamp: now,
                total_words: lexicon.len(),
            };
        };

        let Ok(persisted) = serde_json::from_slice::<PersistedState>(&bytes) else {
            tracing::warn!(path = %path.display(), "indexing_state.json unreadable, inferring from data files");
            return PersistedState {
                next_doc_id: inferred_doc_id,
                next_word_id: inferred_word_id,
                timestamp: now,
                total_words: lexicon.len(),
            };
        };

        let next_doc_id = persisted.next_doc_id.max(inferred_doc_id);
        let next_word_id = persisted.next_word_id.max(inferred_word_id);
        if next_doc_id != persisted.next_doc_id || next_word_id != persisted.next_word_id {
            tracing::warn!(
                persisted_doc_id = persisted.next_doc_id,
                inferred_doc_id,
                persisted_word_id = persisted.next_word_id,
                inferred_word_id,
                "indexing_state.json disagreed with data files, taking the larger value"
            );
        }

        PersistedState { next_doc_id, next_word_id, timestamp: persisted.timestamp, total_words: lexicon.len() }
    }
}
