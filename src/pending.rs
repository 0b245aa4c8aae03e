// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pending Queue: submitted messages awaiting inclusion in the chain.
//!
//! Entries are never removed. A claim tags an entry with the id of the block
//! that consumes it; an entry can be claimed once. Claims follow submission
//! order, so a cursor over the arena replaces a scan for the first unclaimed slot.

use crate::block::TxPayload;
use crate::encoding;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    #[serde(with = "encoding::bytes")]
    pub sender: Vec<u8>,
    #[serde(with = "encoding::bytes")]
    pub recipient: Vec<u8>,
    #[serde(with = "encoding::bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "encoding::bytes")]
    pub data: Vec<u8>,
    pub claimed_by_block: Option<u64>,
}

impl PendingEntry {
    pub fn new(data: Vec<u8>, sender: Vec<u8>, recipient: Vec<u8>, signature: Vec<u8>) -> Self {
        Self { sender, recipient, signature, data, claimed_by_block: None }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed_by_block.is_some()
    }

    pub fn to_payload(&self) -> TxPayload {
        TxPayload::new(
            self.data.clone(),
            self.sender.clone(),
            self.recipient.clone(),
            self.signature.clone(),
        )
    }
}

#[derive(Debug, Default)]
struct Arena {
    entries: Vec<PendingEntry>,
    next_unclaimed: usize,
}

#[derive(Debug, Default)]
pub struct PendingQueue {
    arena: Mutex<Arena>,
    unclaimed: AtomicUsize,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry; returns its position.
    pub fn push(&self, mut entry: PendingEntry) -> usize {
        entry.claimed_by_block = None;
        let mut arena = self.arena.lock();
        arena.entries.push(entry);
        self.unclaimed.fetch_add(1, Ordering::Release);
        arena.entries.len() - 1
    }

    /// Lock-free check used by the generator before every tick.
    pub fn has_unclaimed(&self) -> bool {
        self.unclaimed.load(Ordering::Acquire) > 0
    }

    /// Claims the oldest unclaimed entry for `block_id`. Returns its position
    /// alongside the payload so the claim can be retagged once the block is sealed.
    pub fn claim_next(&self, block_id: u64) -> Option<(usize, TxPayload)> {
        let mut arena = self.arena.lock();
        let idx = arena.next_unclaimed;
        let entry = arena.entries.get_mut(idx)?;
        entry.claimed_by_block = Some(block_id);
        let payload = entry.to_payload();
        arena.next_unclaimed += 1;
        self.unclaimed.fetch_sub(1, Ordering::Release);
        Some((idx, payload))
    }

    /// Moves already-claimed entries at `positions` to `block_id`.
    ///
    /// Unclaimed positions are left alone: retagging never turns into a claim.
    pub fn retag(&self, positions: &[usize], block_id: u64) -> usize {
        let mut arena = self.arena.lock();
        let mut moved = 0;
        for &pos in positions {
            if let Some(entry) = arena.entries.get_mut(pos) {
                if entry.claimed_by_block.is_some() {
                    entry.claimed_by_block = Some(block_id);
                    moved += 1;
                }
            }
        }
        moved
    }

    pub fn len(&self) -> usize {
        self.arena.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unclaimed_len(&self) -> usize {
        self.unclaimed.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Vec<PendingEntry> {
        self.arena.lock().entries.clone()
    }
}
