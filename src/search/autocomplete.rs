use crate::core::config::Config;
use crate::index::dense_offsets::DenseOffsets;
use crate::lexicon::Lexicon;

/// One autocomplete candidate, ranked by how many documents contain it.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub word: String,
    pub document_frequency: u32,
}

/// Prefix-scans the lexicon's ordered view for `prefix`, then re-ranks the
/// matches by document frequency (most-used terms surface first) rather
/// than the FST's lexicographic order.
pub fn suggest(lexicon: &Lexicon, dense_offsets: &DenseOffsets, config: &Config, prefix: &str) -> Vec<Suggestion> {
    let prefix_lower = prefix.to_lowercase();
    if prefix_lower.is_empty() {
        return Vec::new();
    }

    let candidates = lexicon.prefix_scan(&prefix_lower, config.autocomplete_limit * 4);

    let mut suggestions: Vec<Suggestion> = candidates
        .into_iter()
        .map(|word| {
            let document_frequency = lexicon
                .get_id(&word)
                .and_then(|id| dense_offsets.lookup(id))
                .map(|r| r.count)
                .unwrap_or(0);
            Suggestion { word, document_frequency }
        })
        .collect();

    suggestions.sort_by(|a, b| b.document_frequency.cmp(&a.document_frequency).then_with(|| a.word.cmp(&b.word)));
    suggestions.truncate(config.autocomplete_limit);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::barrel::build_barrels;
    use crate::index::dense_offsets::write_dense_table;
    use crate::index::forward::ForwardIndexWriter;
    use crate::core::types::DocId;
    use tempfile::tempdir;

    #[test]
    fn ranks_by_document_frequency() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let mut lexicon = Lexicon::new();

        let quick = lexicon.intern("quick");
        let quack = lexicon.intern("quack");
        lexicon.rebuild_ordered_view().unwrap();

        {
            let mut fw = ForwardIndexWriter::create(&config.forward_index_path()).unwrap();
            fw.append(DocId(1), &[quick.value()]).unwrap();
            fw.append(DocId(2), &[quick.value()]).unwrap();
            fw.append(DocId(3), &[quack.value()]).unwrap();
            fw.flush().unwrap();
        }

        let build = build_barrels(&config.forward_index_path(), &config).unwrap();
        write_dense_table(&config.dense_offsets_path(), &build.offsets, build.max_word_id.unwrap()).unwrap();
        let dense = DenseOffsets::open(&config.dense_offsets_path()).unwrap();

        let results = suggest(&lexicon, &dense, &config, "qu");
        assert_eq!(results[0].word, "quick");
        assert_eq!(results[0].document_frequency, 2);
    }

    #[test]
    fn empty_prefix_returns_nothing() {
        let dir = tempdir().unwrap();
        let config = Config::default().with_data_dir(dir.path());
        let lexicon = Lexicon::new();
        let dense = DenseOffsets::open(&config.dense_offsets_path()).unwrap();
        assert!(suggest(&lexicon, &dense, &config, "").is_empty());
    }
}
