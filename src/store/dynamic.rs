use std::collections::{BTreeSet, HashMap};

use crate::analysis::tokenizer::extract_words;
use crate::core::types::DocumentRecord;

/// Synthetic doc_ids for dynamically-added documents start here, far above
/// any realistic on-disk `doc_id` range, to avoid collisions.
pub const DYNAMIC_DOC_ID_BASE: u32 = 10_000_000;

struct DynamicDocument {
    title: String,
    body: String,
    authors: String,
}

/// A second, transient posting-list store layered on top of the on-disk
/// index, for instant-upload style ingestion. Entries are tagged with
/// synthetic high-range doc_ids and are lost on restart by design — this
/// is the intended trade-off for zero-latency visibility, not a bug.
pub struct DynamicIndex {
    postings: HashMap<String, BTreeSet<u32>>,
    documents: HashMap<u32, DynamicDocument>,
    next_doc_id: u32,
    min_word_length: usize,
}

impl DynamicIndex {
    pub fn new(min_word_length: usize) -> Self {
        DynamicIndex {
            postings: HashMap::new(),
            documents: HashMap::new(),
            next_doc_id: DYNAMIC_DOC_ID_BASE,
            min_word_length,
        }
    }

    /// Adds a document to the memory-only index and returns its synthetic
    /// doc_id immediately; there is no disk write.
    pub fn add_document(&mut self, title: &str, body: &str, authors: &str) -> u32 {
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;

        let full_text = format!("{title} {body}");
        for word in extract_words(&full_text, self.min_word_length) {
            self.postings.entry(word).or_default().insert(doc_id);
        }

        self.documents.insert(
            doc_id,
            DynamicDocument { title: title.to_string(), body: body.to_string(), authors: authors.to_string() },
        );
        doc_id
    }

    pub fn posting_list(&self, word: &str) -> Option<&BTreeSet<u32>> {
        self.postings.get(word)
    }

    pub fn content(&self, doc_id: u32) -> Option<DocumentRecord> {
        self.documents.get(&doc_id).map(|d| DocumentRecord {
            doc_id: crate::core::types::DocId(doc_id),
            title: d.title.clone(),
            body: d.body.clone(),
            authors: d.authors.clone(),
        })
    }

    pub fn title(&self, doc_id: u32) -> Option<&str> {
        self.documents.get(&doc_id).map(|d| d.title.as_str())
    }

    pub fn is_dynamic(doc_id: u32) -> bool {
        doc_id >= DYNAMIC_DOC_ID_BASE
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl Default for DynamicIndex {
    fn default() -> Self {
        DynamicIndex::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_synthetic_ids_above_base() {
        let mut idx = DynamicIndex::new(2);
        let a = idx.add_document("Quick Fox", "jumps over", "Alice");
        let b = idx.add_document("Another", "doc", "Bob");
        assert_eq!(a, DYNAMIC_DOC_ID_BASE);
        assert_eq!(b, DYNAMIC_DOC_ID_BASE + 1);
        assert!(DynamicIndex::is_dynamic(a));
        assert!(!DynamicIndex::is_dynamic(5));
    }

    #[test]
    fn indexes_title_and_body() {
        let mut idx = DynamicIndex::new(2);
        let id = idx.add_document("Quick Fox", "jumps over lazy dog", "Alice");
        assert!(idx.posting_list("quick").unwrap().contains(&id));
        assert!(idx.posting_list("jumps").unwrap().contains(&id));
    }
}
