// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Recorded chain and the block being filled.
//!
//! Both halves sit behind one lock in the node: the generator appends entries and
//! payloads, the block builder takes the filled block out, readers snapshot.

use crate::block::TxPayload;
use crate::keys::PublicKey;
use crate::poh::entry::HashEntry;

/// Payload accumulated since the last finalized block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InProgressBlock {
    /// Id the block is expected to take. Claims carry it until the block is sealed.
    pub sequence_id: u64,
    pub payload: Vec<TxPayload>,
    /// Pending queue positions of the payload, in the same order.
    pub claimed: Vec<usize>,
}

impl InProgressBlock {
    fn empty(sequence_id: u64) -> Self {
        Self { sequence_id, payload: Vec::new(), claimed: Vec::new() }
    }
}

#[derive(Debug, Clone)]
pub struct PohChain {
    owner: PublicKey,
    entries: Vec<HashEntry>,
    in_progress: InProgressBlock,
}

impl PohChain {
    pub fn new(owner: PublicKey) -> Self {
        Self { owner, entries: Vec::new(), in_progress: InProgressBlock::default() }
    }

    /// Resets the chain to a single origin entry.
    pub fn start(&mut self, origin: HashEntry, next_block_id: u64) {
        self.entries.clear();
        self.entries.push(origin);
        self.in_progress = InProgressBlock::empty(next_block_id);
    }

    pub fn owner(&self) -> &PublicKey {
        &self.owner
    }

    pub fn record(&mut self, entry: HashEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HashEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn data_entries(&self) -> impl Iterator<Item = &HashEntry> {
        self.entries.iter().filter(|e| e.has_data())
    }

    /// Origin entry plus the last `n` recorded entries.
    pub fn recent(&self, n: usize) -> Vec<HashEntry> {
        let Some(origin) = self.entries.first() else {
            return Vec::new();
        };
        let start = self.entries.len().saturating_sub(n).max(1);
        std::iter::once(origin.clone())
            .chain(self.entries[start..].iter().cloned())
            .collect()
    }

    pub fn in_progress(&self) -> &InProgressBlock {
        &self.in_progress
    }

    /// Adds the payload claimed from pending queue position `position`.
    pub fn include(&mut self, position: usize, payload: TxPayload) {
        self.in_progress.claimed.push(position);
        self.in_progress.payload.push(payload);
    }

    /// Takes the filled block out, leaving an empty one with the next id.
    /// Returns `None` when nothing was consumed since the last take.
    pub fn take_block(&mut self) -> Option<InProgressBlock> {
        if self.in_progress.payload.is_empty() {
            return None;
        }
        let next = InProgressBlock::empty(self.in_progress.sequence_id + 1);
        Some(std::mem::replace(&mut self.in_progress, next))
    }

    /// Puts a taken block back in front of anything consumed since.
    pub fn restore_block(&mut self, mut taken: InProgressBlock) {
        taken.payload.append(&mut self.in_progress.payload);
        taken.claimed.append(&mut self.in_progress.claimed);
        self.in_progress = taken;
    }

    pub fn set_next_block_id(&mut self, id: u64) {
        self.in_progress.sequence_id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;

    fn tx(d: &[u8]) -> TxPayload {
        TxPayload::new(d.to_vec(), vec![], vec![], vec![])
    }

    #[test]
    fn test_take_and_restore_keep_order() {
        let mut c = PohChain::new([0u8; 32]);
        c.start(HashEntry::checkpoint(Hash::ZERO, 0), 4);
        c.include(0, tx(b"a"));
        let taken = c.take_block().unwrap();
        assert_eq!(taken.sequence_id, 4);
        assert_eq!(taken.claimed, vec![0]);
        assert_eq!(c.in_progress().sequence_id, 5);
        c.include(1, tx(b"b"));
        c.restore_block(taken);
        assert_eq!(c.in_progress().sequence_id, 4);
        assert_eq!(c.in_progress().claimed, vec![0, 1]);
        let data: Vec<_> = c.in_progress().payload.iter().map(|p| p.data.clone()).collect();
        assert_eq!(data, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_take_empty_is_none() {
        let mut c = PohChain::new([0u8; 32]);
        c.start(HashEntry::checkpoint(Hash::ZERO, 0), 0);
        assert!(c.take_block().is_none());
        assert_eq!(c.in_progress().sequence_id, 0);
    }

    #[test]
    fn test_recent_keeps_origin() {
        let mut c = PohChain::new([0u8; 32]);
        c.start(HashEntry::checkpoint(Hash::ZERO, 0), 0);
        for i in 1..=20 {
            c.record(HashEntry::checkpoint(Hash::ZERO, i));
        }
        let r = c.recent(10);
        assert_eq!(r.len(), 11);
        assert_eq!(r[0].seq, 0);
        assert_eq!(r[1].seq, 11);
        assert_eq!(r[10].seq, 20);

        let mut short = PohChain::new([0u8; 32]);
        short.start(HashEntry::checkpoint(Hash::ZERO, 0), 0);
        assert_eq!(short.recent(10).len(), 1);
    }
}
