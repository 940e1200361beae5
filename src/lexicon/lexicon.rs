use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::Path;

use fst::{IntoStreamer, Map, MapBuilder, Streamer};

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::WordId;

/// Bidirectional map between surfaces and word IDs, plus an ordered view
/// for prefix search.
///
/// The ordered view is an FST built from the surfaces known at load time.
/// Surfaces interned after the FST was built (the incremental path) live
/// in a small sorted overlay until the next `rebuild_ordered_view`, since
/// an FST is immutable once constructed.
pub struct Lexicon {
    forward: std::collections::HashMap<String, WordId>,
    reverse: Vec<String>,
    ordered_fst: Map<Vec<u8>>,
    overlay: BTreeMap<String, WordId>,
    next_word_id: u32,
}

impl Lexicon {
    pub fn new() -> Self {
        Lexicon {
            forward: std::collections::HashMap::new(),
            reverse: Vec::new(),
            ordered_fst: Map::default(),
            overlay: BTreeMap::new(),
            next_word_id: 0,
        }
    }

    /// Loads the plain-text `surface\tword_id\n` form.
    pub fn load_text(path: &Path) -> Result<Self> {
        let mut lex = Lexicon::new();
        if !path.exists() {
            return Ok(lex);
        }
        let data = fs::read_to_string(path)?;
        for (lineno, line) in data.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let mut parts = line.splitn(2, '\t');
            let surface = parts.next().ok_or_else(|| {
                Error::corrupt(format!("lexicon.txt:{}: missing surface", lineno + 1))
            })?;
            let id_str = parts.next().ok_or_else(|| {
                Error::corrupt(format!("lexicon.txt:{}: missing word_id", lineno + 1))
            })?;
            let word_id: u32 = id_str
                .trim()
                .parse()
                .map_err(|_| Error::corrupt(format!("lexicon.txt:{}: bad word_id", lineno + 1)))?;
            lex.insert_known(surface, WordId(word_id));
        }
        lex.rebuild_ordered_view()?;
        Ok(lex)
    }

    /// Atomic write-to-temp-then-rename so a crash mid-write never leaves
    /// a half-written lexicon on disk.
    pub fn save_text(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("txt.tmp");
        {
            let mut f = fs::File::create(&tmp)?;
            for (idx, surface) in self.reverse.iter().enumerate() {
                writeln!(f, "{surface}\t{idx}")?;
            }
        }
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Appends newly interned surfaces to the on-disk lexicon without
    /// rewriting existing lines.
    pub fn append_text(&self, path: &Path, new_surfaces: &[String]) -> Result<()> {
        let mut f = fs::OpenOptions::new().create(true).append(true).open(path)?;
        for surface in new_surfaces {
            let id = self.forward.get(surface).ok_or_else(|| {
                Error::corrupt(format!("surface '{surface}' not interned before append"))
            })?;
            writeln!(f, "{surface}\t{}", id.0)?;
        }
        Ok(())
    }

    fn insert_known(&mut self, surface: &str, word_id: WordId) {
        if self.forward.contains_key(surface) {
            return;
        }
        self.forward.insert(surface.to_string(), word_id);
        let idx = word_id.0 as usize;
        if self.reverse.len() <= idx {
            self.reverse.resize(idx + 1, String::new());
        }
        self.reverse[idx] = surface.to_string();
        self.next_word_id = self.next_word_id.max(word_id.0 + 1);
    }

    /// `get_id(surface) -> word_id | NotInLexicon`.
    pub fn get_id(&self, surface: &str) -> Option<WordId> {
        self.forward.get(surface).copied()
    }

    pub fn get_surface(&self, word_id: WordId) -> Option<&str> {
        self.reverse.get(word_id.0 as usize).map(|s| s.as_str())
    }

    /// `intern(surface) -> word_id`, incremental path only. Never rewrites
    /// an existing assignment.
    pub fn intern(&mut self, surface: &str) -> WordId {
        if let Some(id) = self.forward.get(surface) {
            return *id;
        }
        let id = WordId(self.next_word_id);
        self.next_word_id += 1;
        self.forward.insert(surface.to_string(), id);
        self.reverse.push(surface.to_string());
        self.overlay.insert(surface.to_string(), id);
        id
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn next_word_id(&self) -> u32 {
        self.next_word_id
    }

    pub fn max_word_id(&self) -> Option<u32> {
        if self.next_word_id == 0 { None } else { Some(self.next_word_id - 1) }
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &str> {
        self.forward.keys().map(|s| s.as_str())
    }

    /// Rebuilds the FST ordered view from all currently-known surfaces and
    /// clears the overlay. Call after a bulk load or before persisting a
    /// fast-restart cache.
    pub fn rebuild_ordered_view(&mut self) -> Result<()> {
        let mut sorted: Vec<&String> = self.forward.keys().collect();
        sorted.sort();
        let mut builder = MapBuilder::memory();
        for surface in sorted {
            let id = self.forward[surface];
            builder.insert(surface.as_bytes(), id.0 as u64)?;
        }
        self.ordered_fst = builder.into_map();
        self.overlay.clear();
        Ok(())
    }

    /// `prefix_scan(prefix, limit) -> ordered surfaces`, up to `limit`
    /// surfaces `>= prefix` that start with `prefix`, lexicographic order.
    pub fn prefix_scan(&self, prefix: &str, limit: usize) -> Vec<String> {
        let mut results: Vec<String> = Vec::new();

        let mut stream = self.ordered_fst.range().ge(prefix.as_bytes()).into_stream();
        while let Some((key, _)) = stream.next() {
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            if let Ok(s) = std::str::from_utf8(key) {
                results.push(s.to_string());
            }
        }

        for surface in self.overlay.range(prefix.to_string()..) {
            if !surface.0.starts_with(prefix) {
                break;
            }
            if !results.iter().any(|r| r == surface.0) {
                results.push(surface.0.clone());
            }
        }

        results.sort();
        results.dedup();
        results.truncate(limit);
        results
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Lexicon::new()
    }
}

pub fn require_id(lex: &Lexicon, surface: &str) -> Result<WordId> {
    lex.get_id(surface)
        .ok_or_else(|| Error::new(ErrorKind::NotInLexicon, surface.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut lex = Lexicon::new();
        let a = lex.intern("quick");
        let b = lex.intern("quick");
        assert_eq!(a, b);
        assert_eq!(lex.len(), 1);
    }

    #[test]
    fn intern_assigns_dense_ids_in_first_appearance_order() {
        let mut lex = Lexicon::new();
        assert_eq!(lex.intern("quick").0, 0);
        assert_eq!(lex.intern("brown").0, 1);
        assert_eq!(lex.intern("quick").0, 0);
        assert_eq!(lex.intern("fox").0, 2);
    }

    #[test]
    fn prefix_scan_after_rebuild() {
        let mut lex = Lexicon::new();
        lex.intern("quick");
        lex.intern("quack");
        lex.intern("slow");
        lex.rebuild_ordered_view().unwrap();
        let hits = lex.prefix_scan("qu", 10);
        assert_eq!(hits, vec!["quack".to_string(), "quick".to_string()]);
    }

    #[test]
    fn prefix_scan_sees_overlay_before_rebuild() {
        let mut lex = Lexicon::new();
        lex.intern("algorithm");
        lex.rebuild_ordered_view().unwrap();
        lex.intern("algorithms");
        let hits = lex.prefix_scan("a", 10);
        assert_eq!(hits, vec!["algorithm".to_string(), "algorithms".to_string()]);
    }
}
