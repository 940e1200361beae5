use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{Error, Result};
use crate::core::types::{DocId, DocumentRecord};

/// Canonical record shape this crate writes to `dataset.jsonl`. Readers
/// tolerate a looser, self-describing shape on load
/// (`body`/`abstract`/`text` are interchangeable) for corpora ingested
/// from older dataset dumps.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    doc_id: u32,
    title: String,
    body: String,
    authors: String,
}

/// Append-only document store: one JSON line per record, plus the
/// parallel `doc_offsets.bin` byte-offset table.
pub struct DocumentStoreWriter {
    dataset: BufWriter<File>,
    offsets: BufWriter<File>,
    next_offset: u64,
}

impl DocumentStoreWriter {
    pub fn create(dataset_path: &Path, offsets_path: &Path) -> Result<Self> {
        Ok(DocumentStoreWriter {
            dataset: BufWriter::new(File::create(dataset_path)?),
            offsets: BufWriter::new(File::create(offsets_path)?),
            next_offset: 0,
        })
    }

    /// Opens both files for append, computing `next_offset` from the
    /// dataset's current length (incremental path).
    pub fn open_append(dataset_path: &Path, offsets_path: &Path) -> Result<Self> {
        let next_offset = fs::metadata(dataset_path).map(|m| m.len()).unwrap_or(0);
        let dataset = OpenOptions::new().create(true).append(true).open(dataset_path)?;
        let offsets = OpenOptions::new().create(true).append(true).open(offsets_path)?;
        Ok(DocumentStoreWriter {
            dataset: BufWriter::new(dataset),
            offsets: BufWriter::new(offsets),
            next_offset,
        })
    }

    /// Appends one record. `doc_offsets[doc_id - 1]` is never rewritten
    /// once written.
    pub fn append(&mut self, doc_id: DocId, title: &str, body: &str, authors: &str) -> Result<()> {
        let record = StoredDocument { doc_id: doc_id.0, title: title.to_string(), body: body.to_string(), authors: authors.to_string() };
        let line = serde_json::to_string(&record)?;

        self.offsets.write_all(&self.next_offset.to_le_bytes())?;
        self.dataset.write_all(line.as_bytes())?;
        self.dataset.write_all(b"\n")?;
        self.next_offset += line.len() as u64 + 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.dataset.flush()?;
        self.offsets.flush()?;
        Ok(())
    }
}

/// Read-only, mmap-backed access to the document store.
pub struct DocumentStoreReader {
    dataset: Option<Mmap>,
    offsets: Option<Mmap>,
}

impl DocumentStoreReader {
    pub fn open(dataset_path: &Path, offsets_path: &Path) -> Result<Self> {
        let dataset = open_if_nonempty(dataset_path)?;
        let offsets = open_if_nonempty(offsets_path)?;
        Ok(DocumentStoreReader { dataset, offsets })
    }

    /// `content(doc_id) -> record`. Fails with `DocNotFound` if the
    /// doc_offsets slot is out of range, `CorruptStore` if the line at
    /// that offset does not parse.
    pub fn content(&self, doc_id: DocId) -> Result<DocumentRecord> {
        let offsets = self.offsets.as_ref().ok_or_else(|| Error::doc_not_found(doc_id.0))?;
        let dataset = self.dataset.as_ref().ok_or_else(|| Error::doc_not_found(doc_id.0))?;

        let slot = (doc_id.0 as usize).checked_sub(1).ok_or_else(|| Error::doc_not_found(doc_id.0))? * 8;
        if slot + 8 > offsets.len() {
            return Err(Error::doc_not_found(doc_id.0));
        }
        let byte_offset = u64::from_le_bytes(offsets[slot..slot + 8].try_into().unwrap()) as usize;
        if byte_offset > dataset.len() {
            return Err(Error::corrupt(format!("doc {} offset past end of store", doc_id.0)));
        }

        let rest = &dataset[byte_offset..];
        let end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        let line = std::str::from_utf8(&rest[..end])
            .map_err(|_| Error::corrupt(format!("doc {} is not valid UTF-8", doc_id.0)))?;

        parse_record(doc_id, line)
    }
}

fn open_if_nonempty(path: &Path) -> Result<Option<Mmap>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    Ok(Some(unsafe { Mmap::map(&file)? }))
}

fn parse_record(doc_id: DocId, line: &str) -> Result<DocumentRecord> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| Error::corrupt(format!("doc {}: {e}", doc_id.0)))?;

    let title = value.get("title").and_then(Value::as_str).unwrap_or("No Title").to_string();
    let body = value
        .get("body")
        .or_else(|| value.get("text"))
        .or_else(|| value.get("abstract"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let authors = value.get("authors").and_then(Value::as_str).unwrap_or("Unknown").to_string();

    Ok(DocumentRecord { doc_id, title, body, authors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_reads_back_verbatim() {
        let dir = tempdir().unwrap();
        let dataset = dir.path().join("dataset.jsonl");
        let offsets = dir.path().join("doc_offsets.bin");

        {
            let mut w = DocumentStoreWriter::create(&dataset, &offsets).unwrap();
            w.append(DocId(1), "Title One", "Body one", "Alice").unwrap();
            w.append(DocId(2), "Title Two", "Body two", "Bob").unwrap();
            w.flush().unwrap();
        }

        let reader = DocumentStoreReader::open(&dataset, &offsets).unwrap();
        let rec2 = reader.content(DocId(2)).unwrap();
        assert_eq!(rec2.title, "Title Two");
        assert_eq!(rec2.body, "Body two");
        assert_eq!(rec2.authors, "Bob");
    }

    #[test]
    fn unknown_doc_id_is_doc_not_found() {
        let dir = tempdir().unwrap();
        let dataset = dir.path().join("dataset.jsonl");
        let offsets = dir.path().join("doc_offsets.bin");
        {
            let mut w = DocumentStoreWriter::create(&dataset, &offsets).unwrap();
            w.append(DocId(1), "T", "B", "A").unwrap();
            w.flush().unwrap();
        }
        let reader = DocumentStoreReader::open(&dataset, &offsets).unwrap();
        assert!(reader.content(DocId(99)).is_err());
    }

    #[test]
    fn append_after_reopen_preserves_prior_offsets() {
        let dir = tempdir().unwrap();
        let dataset = dir.path().join("dataset.jsonl");
        let offsets = dir.path().join("doc_offsets.bin");
        {
            let mut w = DocumentStoreWriter::create(&dataset, &offsets).unwrap();
            w.append(DocId(1), "T1", "B1", "A1").unwrap();
            w.flush().unwrap();
        }
        {
            let mut w = DocumentStoreWriter::open_append(&dataset, &offsets).unwrap();
            w.append(DocId(2), "T2", "B2", "A2").unwrap();
            w.flush().unwrap();
        }
        let reader = DocumentStoreReader::open(&dataset, &offsets).unwrap();
        assert_eq!(reader.content(DocId(1)).unwrap().title, "T1");
        assert_eq!(reader.content(DocId(2)).unwrap().title, "T2");
    }
}
