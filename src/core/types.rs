use serde::{Deserialize, Serialize};

/// 1-based, dense, permanent document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(id: u32) -> Self {
        DocId(id)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

/// 0-based, dense, permanent word identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WordId(pub u32);

impl WordId {
    pub fn new(id: u32) -> Self {
        WordId(id)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for WordId {
    fn from(id: u32) -> Self {
        WordId(id)
    }
}

/// A document as it arrives at ingest time: title + body + optional authors.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewDocument {
    pub title: String,
    pub body: String,
    pub authors: String,
}

/// A fully stored document record, as read back from the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub doc_id: DocId,
    pub title: String,
    pub body: String,
    pub authors: String,
}
