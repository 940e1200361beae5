use std::collections::HashSet;
use std::path::PathBuf;

use crate::analysis::stopwords::default_stopwords;

/// Tunables for the engine. Changing `barrel_count` or the tokenizer
/// invalidates any index already built under the old settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,

    /// Barrel count `N`: `barrel_id = word_id mod N`.
    pub barrel_count: u32,
    pub min_word_length: usize,
    pub max_results: usize,
    pub batch_size: usize,
    pub progress_interval: usize,
    pub indexing_threads: usize,
    pub stop_words: HashSet<String>,

    /// Number of embedding neighbours pulled in per query token when
    /// semantic expansion is requested.
    pub k_expand: usize,
    pub exact_weight: f32,
    pub expanded_weight: f32,
    pub strict_and_boost: f32,
    pub dynamic_boost: f32,
    pub dynamic_min_word_length: usize,

    pub autocomplete_limit: usize,
    pub correction_max_suggestions: usize,
    pub correction_max_edit_distance: u8,
    pub metadata_title_display_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("./data"),

            barrel_count: 10,
            min_word_length: 3,
            max_results: 50,
            batch_size: 1000,
            progress_interval: 10_000,
            indexing_threads: num_cpus::get().max(1).min(8),
            stop_words: default_stopwords(),

            k_expand: 2,
            exact_weight: 1.0,
            expanded_weight: 0.5,
            strict_and_boost: 1.5,
            dynamic_boost: 2.0,
            dynamic_min_word_length: 2,

            autocomplete_limit: 10,
            correction_max_suggestions: 5,
            correction_max_edit_distance: 2,
            metadata_title_display_cap: 200,
        }
    }
}

impl Config {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn lexicon_path(&self) -> PathBuf {
        self.data_dir.join("lexicon.txt")
    }

    pub fn forward_index_path(&self) -> PathBuf {
        self.data_dir.join("forward_index.bin")
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("document_metadata.txt")
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join("dataset.jsonl")
    }

    pub fn doc_offsets_path(&self) -> PathBuf {
        self.data_dir.join("doc_offsets.bin")
    }

    pub fn dense_offsets_path(&self) -> PathBuf {
        self.data_dir.join("word_offsets_dense.bin")
    }

    pub fn barrel_path(&self, barrel_id: u32) -> PathBuf {
        self.data_dir.join(format!("barrel_{barrel_id}.bin"))
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join("indexing_state.json")
    }

    pub fn embedding_path(&self) -> PathBuf {
        self.data_dir.join("glove.txt")
    }
}
