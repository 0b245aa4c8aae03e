// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{BlockLog, Result, StoreError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tickledger_kernel::block::BlockRecord;
use tickledger_kernel::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Stored key differs from `SHA256(previous key ++ payload)`.
    KeyMismatch,
    /// Header parent differs from the previous block's key.
    ParentMismatch,
    /// Header sequence id differs from the block's position.
    SequenceMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMismatch {
    pub index: usize,
    pub kind: MismatchKind,
}

/// Result of a full store audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreAudit {
    pub checked: usize,
    pub mismatches: Vec<StoreMismatch>,
}

impl StoreAudit {
    pub fn is_valid(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Offending block indices, ascending, each once.
    pub fn indices(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self.mismatches.iter().map(|m| m.index).collect();
        out.dedup();
        out
    }
}

/// Append-only block log plus its in-memory mirror.
///
/// Reads never touch the disk. Appends are checked against the current tip, so
/// the mirror always holds one unbroken chain starting from the zero sentinel.
pub struct BlockStore {
    log: BlockLog,
    blocks: Vec<BlockRecord>,
}

impl BlockStore {
    /// Loads every record from `path` (creating the file if missing).
    ///
    /// Loading does not audit; call [`BlockStore::verify`] before trusting the contents.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let log = BlockLog::open(path.as_ref())?;
        let blocks = BlockLog::read_all(path.as_ref())?;
        tracing::debug!("Block store {:?} loaded with {} blocks", log.path(), blocks.len());
        Ok(Self { log, blocks })
    }

    pub fn path(&self) -> &Path {
        self.log.path()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BlockRecord> {
        self.blocks.get(index)
    }

    /// Last stored block, `None` for an empty store.
    pub fn latest(&self) -> Option<&BlockRecord> {
        self.blocks.last()
    }

    /// Key the next block must name as parent: the zero sentinel when empty.
    pub fn tip_hash(&self) -> Hash {
        self.latest().map_or(Hash::ZERO, |b| b.hash)
    }

    pub fn next_sequence_id(&self) -> u64 {
        self.blocks.len() as u64
    }

    /// Index of the first block whose parent is `parent`.
    pub fn find_descendant(&self, parent: &Hash) -> Option<usize> {
        self.blocks.iter().position(|b| b.parent() == parent)
    }

    /// Blocks from `index` to the tip, in store order.
    pub fn blocks_from(&self, index: usize) -> &[BlockRecord] {
        self.blocks.get(index..).unwrap_or(&[])
    }

    /// Checks that `record` extends the current tip.
    pub fn check_extends(&self, record: &BlockRecord) -> Result<()> {
        check_link(self.tip_hash(), self.next_sequence_id(), record)
    }

    /// Durably appends one block, then mirrors it.
    pub fn append(&mut self, record: BlockRecord) -> Result<()> {
        self.check_extends(&record)?;
        self.log.append(&record)?;
        tracing::debug!("Appended block {} {}", record.seqid(), record.hash);
        self.blocks.push(record);
        Ok(())
    }

    /// Recomputes every key from the previous key and the payload.
    pub fn verify(&self) -> Result<StoreAudit> {
        audit_records(&self.blocks)
    }
}

/// Audits a run of records as a whole store, starting from the zero sentinel.
pub fn audit_records(blocks: &[BlockRecord]) -> Result<StoreAudit> {
    let mut mismatches = Vec::new();
    let mut prev = Hash::ZERO;
    for (index, record) in blocks.iter().enumerate() {
        if record.recompute_key(&prev)? != record.hash {
            mismatches.push(StoreMismatch { index, kind: MismatchKind::KeyMismatch });
        }
        if *record.parent() != prev {
            mismatches.push(StoreMismatch { index, kind: MismatchKind::ParentMismatch });
        }
        if record.seqid() != index as u64 {
            mismatches.push(StoreMismatch { index, kind: MismatchKind::SequenceMismatch });
        }
        prev = record.hash;
    }
    Ok(StoreAudit { checked: blocks.len(), mismatches })
}

/// Checks that `record` can follow the block keyed `parent` as sequence `seqid`.
pub fn check_link(parent: Hash, seqid: u64, record: &BlockRecord) -> Result<()> {
    let fail = |reason: &'static str| -> Result<()> {
        Err(StoreError::Discontinuity { seqid: record.seqid(), reason })
    };
    if *record.parent() != parent {
        return fail("parent is not the tip");
    }
    if record.seqid() != seqid {
        return fail("unexpected sequence id");
    }
    if record.recompute_key(&parent)? != record.hash {
        return fail("content key mismatch");
    }
    Ok(())
}
