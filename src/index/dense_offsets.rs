use std::fs;
use std::path::Path;

use memmap2::Mmap;

use crate::core::error::Result;
use crate::core::types::WordId;

pub const RECORD_SIZE: usize = 16;

/// `(barrel_id, offset, count)` for a single word, as stored at
/// slot `word_id * 16` in the dense offset table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetRecord {
    pub barrel_id: u32,
    pub offset: u64,
    pub count: u32,
}

impl OffsetRecord {
    /// All-zero slots are indistinguishable from genuine zero-count
    /// entries; both are misses at the offset level.
    pub fn is_unused(&self) -> bool {
        self.count == 0 && self.barrel_id == 0 && self.offset == 0
    }

    fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&self.barrel_id.to_le_bytes());
        buf[4..12].copy_from_slice(&self.offset.to_le_bytes());
        buf[12..16].copy_from_slice(&self.count.to_le_bytes());
        buf
    }

    fn from_bytes(buf: &[u8]) -> Self {
        OffsetRecord {
            barrel_id: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            offset: u64::from_le_bytes(buf[4..12].try_into().unwrap()),
            count: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
        }
    }
}

/// Builds the packed dense offset table: `max(word_id) * 16 + 16` bytes,
/// one 16-byte record per word_id, unused slots zeroed.
pub fn build_dense_table(records: &[(WordId, OffsetRecord)], max_word_id: u32) -> Vec<u8> {
    let size = (max_word_id as usize + 1) * RECORD_SIZE;
    let mut buf = vec![0u8; size];
    for (word_id, record) in records {
        let slot = word_id.0 as usize * RECORD_SIZE;
        buf[slot..slot + RECORD_SIZE].copy_from_slice(&record.to_bytes());
    }
    buf
}

pub fn write_dense_table(path: &Path, records: &[(WordId, OffsetRecord)], max_word_id: u32) -> Result<()> {
    let buf = build_dense_table(records, max_word_id);
    let tmp = path.with_extension("bin.tmp");
    fs::write(&tmp, &buf)?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// Read-only mmap view over the dense offset table.
pub struct DenseOffsets {
    mmap: Option<Mmap>,
}

impl DenseOffsets {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(DenseOffsets { mmap: None });
        }
        let file = fs::File::open(path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(DenseOffsets { mmap: None });
        }
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(DenseOffsets { mmap: Some(mmap) })
    }

    /// O(1) random-access lookup. Returns `None` for a word_id past the
    /// end of the table or whose slot is unused/zero-count.
    pub fn lookup(&self, word_id: WordId) -> Option<OffsetRecord> {
        let mmap = self.mmap.as_ref()?;
        let slot = word_id.0 as usize * RECORD_SIZE;
        if slot + RECORD_SIZE > mmap.len() {
            return None;
        }
        let record = OffsetRecord::from_bytes(&mmap[slot..slot + RECORD_SIZE]);
        if record.is_unused() {
            None
        } else {
            Some(record)
        }
    }

    pub fn len_records(&self) -> usize {
        self.mmap.as_ref().map_or(0, |m| m.len() / RECORD_SIZE)
    }
}
