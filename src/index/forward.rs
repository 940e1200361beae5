use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::core::error::{Error, Result};
use crate::core::types::DocId;

/// One forward-index record: a document ID and the sequence of word IDs
/// produced by the tokenizer for that document's full text, in
/// first-appearance order.
///
/// Binary layout: `u32 doc_id, u32 num_words, u32 word_id × num_words`,
/// repeated. Binary is chosen over a text form because the file is
/// rebuilt by streaming on every incremental batch, and binary avoids
/// repeated integer parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardRecord {
    pub doc_id: DocId,
    pub word_ids: Vec<u32>,
}

pub struct ForwardIndexWriter {
    file: BufWriter<File>,
}

impl ForwardIndexWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        Ok(ForwardIndexWriter { file: BufWriter::new(file) })
    }

    pub fn append_for_incremental(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(ForwardIndexWriter { file: BufWriter::new(file) })
    }

    pub fn append(&mut self, doc_id: DocId, word_ids: &[u32]) -> Result<()> {
        self.file.write_all(&doc_id.0.to_le_bytes())?;
        self.file.write_all(&(word_ids.len() as u32).to_le_bytes())?;
        for id in word_ids {
            self.file.write_all(&id.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

/// Streams `ForwardRecord`s from disk: finite, single-pass, not
/// restartable without re-opening the file.
pub struct ForwardIndexReader {
    reader: BufReader<File>,
}

impl ForwardIndexReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(ForwardIndexReader { reader: BufReader::new(file) })
    }

    fn read_record(&mut self) -> Result<Option<ForwardRecord>> {
        let mut head = [0u8; 8];
        match self.reader.read_exact(&mut head) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(Error::from(e)),
        }
        let doc_id = u32::from_le_bytes(head[0..4].try_into().unwrap());
        let num_words = u32::from_le_bytes(head[4..8].try_into().unwrap()) as usize;

        let mut word_ids = Vec::with_capacity(num_words);
        let mut buf = [0u8; 4];
        for _ in 0..num_words {
            self.reader.read_exact(&mut buf).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    Error::corrupt("forward_index.bin: truncated record")
                } else {
                    Error::from(e)
                }
            })?;
            word_ids.push(u32::from_le_bytes(buf));
        }

        Ok(Some(ForwardRecord { doc_id: DocId(doc_id), word_ids }))
    }
}

impl Iterator for ForwardIndexReader {
    type Item = Result<ForwardRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

pub fn exists(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forward_index.bin");
        {
            let mut w = ForwardIndexWriter::create(&path).unwrap();
            w.append(DocId(1), &[0, 1, 2]).unwrap();
            w.append(DocId(2), &[1, 3, 4]).unwrap();
            w.flush().unwrap();
        }
        let records: Vec<ForwardRecord> =
            ForwardIndexReader::open(&path).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].doc_id, DocId(1));
        assert_eq!(records[0].word_ids, vec![0, 1, 2]);
        assert_eq!(records[1].word_ids, vec![1, 3, 4]);
    }

    #[test]
    fn empty_document_has_zero_word_ids_and_is_skipped_by_callers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forward_index.bin");
        {
            let mut w = ForwardIndexWriter::create(&path).unwrap();
            w.append(DocId(1), &[]).unwrap();
            w.flush().unwrap();
        }
        let records: Vec<ForwardRecord> =
            ForwardIndexReader::open(&path).unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(records[0].word_ids.len(), 0);
    }
}
