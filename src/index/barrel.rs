use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::WordId;
use crate::index::dense_offsets::OffsetRecord;
use crate::index::forward::ForwardIndexReader;

/// Result of inverting a forward index: one offset record per word seen,
/// plus the highest word_id observed (needed to size the dense table).
pub struct InvertedBuild {
    pub offsets: Vec<(WordId, OffsetRecord)>,
    pub max_word_id: Option<u32>,
}

/// Streams the forward index, aggregates per-(word_id) an ascending
/// deduplicated posting list, partitions by `word_id mod N`, and writes
/// each barrel's posting lists concatenated in ascending word_id order.
/// Used both by the bulk builder and by the incremental indexer, which
/// rewrites barrels from the forward index end-to-end on every batch.
pub fn build_barrels(forward_index_path: &Path, config: &Config) -> Result<InvertedBuild> {
    let mut inverted: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();

    for record in ForwardIndexReader::open(forward_index_path)? {
        let record = record?;
        for &word_id in &record.word_ids {
            inverted.entry(word_id).or_default().insert(record.doc_id.0);
        }
    }

    let barrel_count = config.barrel_count;
    let mut writers: Vec<BufWriter<File>> = Vec::with_capacity(barrel_count as usize);
    for i in 0..barrel_count {
        writers.push(BufWriter::new(File::create(config.barrel_path(i))?));
    }
    let mut cursors = vec![0u64; barrel_count as usize];

    let mut offsets = Vec::with_capacity(inverted.len());
    for (&word_id, doc_ids) in inverted.iter() {
        let barrel_id = word_id % barrel_count;
        let count = doc_ids.len() as u32;
        let offset = cursors[barrel_id as usize];

        let writer = &mut writers[barrel_id as usize];
        for doc_id in doc_ids {
            // Invariant: posting lists are strictly ascending and unique,
            // guaranteed by aggregating into a BTreeSet above.
            writer.write_all(&doc_id.to_le_bytes())?;
        }
        cursors[barrel_id as usize] += count as u64 * 4;
        offsets.push((WordId(word_id), OffsetRecord { barrel_id, offset, count }));
    }

    for writer in &mut writers {
        writer.flush()?;
    }

    let max_word_id = inverted.keys().next_back().copied();
    Ok(InvertedBuild { offsets, max_word_id })
}

/// Zero-copy view over one posting list inside a barrel's mmap.
pub struct PostingListView<'a> {
    bytes: &'a [u8],
}

impl<'a> PostingListView<'a> {
    pub fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes.chunks_exact(4).map(|c| u32::from_le_bytes(c.try_into().unwrap()))
    }

    pub fn contains(&self, doc_id: u32) -> bool {
        // Binary search over the ascending, fixed-width posting list
        // without decoding it into a Vec first.
        let n = self.len();
        let (mut lo, mut hi) = (0usize, n);
        while lo < hi {
            let mid = (lo + hi) / 2;
            let v = u32::from_le_bytes(self.bytes[mid * 4..mid * 4 + 4].try_into().unwrap());
            match v.cmp(&doc_id) {
                std::cmp::Ordering::Equal => return true,
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        false
    }
}

/// Read-only mmap handles over every barrel file, shared by all readers.
pub struct BarrelSet {
    mmaps: Vec<Option<Mmap>>,
}

impl BarrelSet {
    pub fn open(config: &Config) -> Result<Self> {
        let mut mmaps = Vec::with_capacity(config.barrel_count as usize);
        for i in 0..config.barrel_count {
            let path = config.barrel_path(i);
            if !path.exists() {
                mmaps.push(None);
                continue;
            }
            let file = File::open(&path)?;
            if file.metadata()?.len() == 0 {
                mmaps.push(None);
                continue;
            }
            mmaps.push(Some(unsafe { Mmap::map(&file)? }));
        }
        Ok(BarrelSet { mmaps })
    }

    /// Reads `count` consecutive doc_ids from `offset` in the given
    /// barrel. Returns a `CorruptStructure` error if the record would
    /// overrun the barrel; callers treat that as "skip this word", not
    /// as a query failure.
    pub fn posting_list(&self, record: OffsetRecord) -> Result<PostingListView<'_>> {
        let mmap = self
            .mmaps
            .get(record.barrel_id as usize)
            .and_then(|m| m.as_ref())
            .ok_or_else(|| Error::corrupt(format!("barrel {} missing or empty", record.barrel_id)))?;

        let start = record.offset as usize;
        let end = start
            .checked_add(record.count as usize * 4)
            .ok_or_else(|| Error::corrupt("offset overflow"))?;
        if end > mmap.len() {
            return Err(Error::corrupt(format!(
                "posting list overruns barrel {}: offset {} + {}*4 > {}",
                record.barrel_id, record.offset, record.count, mmap.len()
            )));
        }
        Ok(PostingListView { bytes: &mmap[start..end] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;
    use crate::index::forward::ForwardIndexWriter;
    use tempfile::tempdir;

    fn config(dir: &Path) -> Config {
        Config::default().with_data_dir(dir)
    }

    #[test]
    fn partitions_postings_by_word_id_mod_barrel_count() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        let fwd_path = cfg.forward_index_path();

        // "the quick brown fox" / "quick foxes jump" after stop-word +
        // min-length filtering and interning in first-appearance order:
        // quick=0 brown=1 fox=2 foxes=3 jump=4
        {
            let mut w = ForwardIndexWriter::create(&fwd_path).unwrap();
            w.append(DocId(1), &[0, 1, 2]).unwrap();
            w.append(DocId(2), &[0, 3, 4]).unwrap();
            w.flush().unwrap();
        }

        let built = build_barrels(&fwd_path, &cfg).unwrap();
        let offsets: BTreeMap<u32, OffsetRecord> =
            built.offsets.into_iter().map(|(w, r)| (w.0, r)).collect();

        let barrels = BarrelSet::open(&cfg).unwrap();

        let quick = offsets[&0];
        assert_eq!(quick.count, 2);
        let docs: Vec<u32> = barrels.posting_list(quick).unwrap().iter().collect();
        assert_eq!(docs, vec![1, 2]);

        let brown = offsets[&1];
        assert_eq!(barrels.posting_list(brown).unwrap().iter().collect::<Vec<_>>(), vec![1]);

        let foxes = offsets[&3];
        assert_eq!(barrels.posting_list(foxes).unwrap().iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn building_twice_is_byte_identical() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        let fwd_path = cfg.forward_index_path();
        {
            let mut w = ForwardIndexWriter::create(&fwd_path).unwrap();
            w.append(DocId(1), &[0, 1, 2]).unwrap();
            w.append(DocId(2), &[0, 3, 4]).unwrap();
            w.flush().unwrap();
        }
        build_barrels(&fwd_path, &cfg).unwrap();
        let first: Vec<u8> = std::fs::read(cfg.barrel_path(0)).unwrap();
        build_barrels(&fwd_path, &cfg).unwrap();
        let second: Vec<u8> = std::fs::read(cfg.barrel_path(0)).unwrap();
        assert_eq!(first, second);
    }
}
