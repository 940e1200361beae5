use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Result;

const COSINE_THRESHOLD: f32 = 0.5;

#[derive(Serialize, Deserialize)]
struct CachedMatrix {
    dim: usize,
    data: Vec<f32>,
}

/// Normalized word-embedding matrix with cosine-nearest lookup.
/// Row-major `F32[V × D]`, each row pre-normalized to unit L2 norm so
/// `similar()` reduces to a dot product.
///
/// If the model file is absent, `load` returns an unloaded model: every
/// expansion call returns an empty set and semantic search degrades
/// cleanly to exact lookup.
pub struct EmbeddingModel {
    vocab: std::collections::HashMap<String, usize>,
    words: Vec<String>,
    matrix: Vec<f32>,
    dim: usize,
    loaded: bool,
}

impl EmbeddingModel {
    pub fn empty() -> Self {
        EmbeddingModel { vocab: Default::default(), words: Vec::new(), matrix: Vec::new(), dim: 0, loaded: false }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Loads `glove_path`, preferring a binary cache (`<stem>.bin` matrix +
    /// `<stem>.vocab` word list) for instant restart instead of
    /// reparsing the text format on every startup.
    pub fn load(glove_path: &Path) -> Result<Self> {
        let stem = glove_path.with_extension("");
        let cache_path = cache_matrix_path(&stem);
        let vocab_path = cache_vocab_path(&stem);

        if cache_path.exists() && vocab_path.exists() {
            if let Ok(model) = Self::load_cache(&cache_path, &vocab_path) {
                return Ok(model);
            }
            tracing::warn!(path = %cache_path.display(), "embedding cache unreadable, reparsing text");
        }

        if !glove_path.exists() {
            tracing::warn!(path = %glove_path.display(), "embedding file not found, semantic search disabled");
            return Ok(Self::empty());
        }

        let model = Self::load_text(glove_path)?;
        if let Err(e) = model.save_cache(&cache_path, &vocab_path) {
            tracing::warn!(error = %e, "failed to write embedding cache");
        }
        Ok(model)
    }

    fn load_text(glove_path: &Path) -> Result<Self> {
        let data = fs::read_to_string(glove_path)?;
        let mut words = Vec::new();
        let mut vocab = std::collections::HashMap::new();
        let mut matrix: Vec<f32> = Vec::new();
        let mut dim = 0usize;

        for line in data.lines() {
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let values: Vec<f32> = parts.filter_map(|p| p.parse().ok()).collect();
            if values.is_empty() {
                continue;
            }
            if dim == 0 {
                dim = values.len();
            } else if values.len() != dim {
                continue;
            }

            let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
            let normalized: Vec<f32> = if norm > 0.0 { values.iter().map(|v| v / norm).collect() } else { values };

            vocab.insert(word.to_string(), words.len());
            words.push(word.to_string());
            matrix.extend(normalized);
        }

        let loaded = !words.is_empty();
        Ok(EmbeddingModel { vocab, words, matrix, dim, loaded })
    }

    fn load_cache(cache_path: &Path, vocab_path: &Path) -> Result<Self> {
        let bytes = fs::read(cache_path)?;
        let cached: CachedMatrix = bincode::deserialize(&bytes)?;
        let vocab_text = fs::read_to_string(vocab_path)?;
        let words: Vec<String> = vocab_text.lines().map(|s| s.to_string()).collect();
        let vocab = words.iter().enumerate().map(|(i, w)| (w.clone(), i)).collect();
        Ok(EmbeddingModel { vocab, words, matrix: cached.data, dim: cached.dim, loaded: true })
    }

    fn save_cache(&self, cache_path: &Path, vocab_path: &Path) -> Result<()> {
        let cached = CachedMatrix { dim: self.dim, data: self.matrix.clone() };
        fs::write(cache_path, bincode::serialize(&cached)?)?;
        fs::write(vocab_path, self.words.join("\n"))?;
        Ok(())
    }

    fn row(&self, idx: usize) -> &[f32] {
        &self.matrix[idx * self.dim..(idx + 1) * self.dim]
    }

    pub fn get_vector(&self, word: &str) -> Option<&[f32]> {
        let idx = self.vocab.get(&word.to_lowercase())?;
        Some(self.row(*idx))
    }

    /// Returns up to `k` nearest neighbours, excluding the query word,
    /// filtered to cosine `>= 0.5`, descending by score.
    pub fn similar(&self, word: &str, k: usize) -> Vec<(String, f32)> {
        if !self.loaded || k == 0 {
            return Vec::new();
        }
        let word_lower = word.to_lowercase();
        let Some(&target_idx) = self.vocab.get(&word_lower) else { return Vec::new() };
        let target = self.row(target_idx).to_vec();

        let mut scores: Vec<(usize, f32)> = (0..self.words.len())
            .filter(|&i| i != target_idx)
            .map(|i| {
                let score: f32 = self.row(i).iter().zip(target.iter()).map(|(a, b)| a * b).sum();
                (i, score)
            })
            .filter(|(_, score)| *score >= COSINE_THRESHOLD)
            .collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(k);
        scores.into_iter().map(|(i, score)| (self.words[i].clone(), score)).collect()
    }

    pub fn vocab_size(&self) -> usize {
        self.words.len()
    }
}

fn cache_matrix_path(stem: &Path) -> PathBuf {
    let mut p = stem.as_os_str().to_owned();
    p.push(".bin");
    PathBuf::from(p)
}

fn cache_vocab_path(stem: &Path) -> PathBuf {
    let mut p = stem.as_os_str().to_owned();
    p.push(".vocab");
    PathBuf::from(p)
}
