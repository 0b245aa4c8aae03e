// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Tick state machine.
//!
//! The recorder owns the running hash. Each call advances exactly one tick and
//! hands back the entries that tick produced; storing them is the caller's job.

use crate::config::GENESIS_PREFIX;
use crate::hash::Hash;
use crate::keys::Signer;
use crate::poh::entry::HashEntry;

/// Entries produced by one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Tick {
    pub data_entry: Option<HashEntry>,
    pub checkpoint: Option<HashEntry>,
}

#[derive(Debug, Clone)]
pub struct PohRecorder {
    prev: Hash,
    tick: u64,
    stride: u64,
}

impl PohRecorder {
    /// Starts a recorder at tick 0 with `seed` as the running hash.
    pub fn new(seed: Hash, stride: u64) -> Self {
        Self { prev: seed, tick: 0, stride: stride.max(1) }
    }

    /// Seed for a fresh chain, mixing wall time with the owner's key material.
    ///
    /// The key is only reachable through `sign`, so a signature over the
    /// timestamp stands in for the private key bytes.
    pub fn genesis_seed(signer: &dyn Signer, unix_nanos: i64) -> Hash {
        let stamp = format!("{}-{}-", GENESIS_PREFIX, unix_nanos);
        let key_material = signer.sign(stamp.as_bytes());
        Hash::digest(&[stamp.as_bytes(), &key_material])
    }

    /// Seed for a chain resuming after the block with key `last_key`.
    pub fn resume_seed(last_key: &Hash) -> Hash {
        last_key.rehash()
    }

    /// Entry for tick 0, the origin every verification segment chains back to.
    pub fn origin(&self) -> HashEntry {
        HashEntry::checkpoint(self.prev, self.tick)
    }

    pub fn prev_hash(&self) -> Hash {
        self.prev
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    fn checkpoint(&self) -> Option<HashEntry> {
        (self.tick % self.stride == 0).then(|| HashEntry::checkpoint(self.prev, self.tick))
    }

    /// Tick with no payload: `prev = SHA256(prev)`.
    pub fn tick(&mut self) -> Tick {
        self.tick += 1;
        self.prev = self.prev.rehash();
        Tick { data_entry: None, checkpoint: self.checkpoint() }
    }

    /// Tick folding `data` in: `prev = SHA256(prev ++ data)`.
    pub fn tick_with(&mut self, data: Vec<u8>, signature: Vec<u8>) -> Tick {
        self.tick += 1;
        self.prev = self.prev.fold(&data);
        let entry = HashEntry::with_data(self.prev, self.tick, data, signature);
        Tick { data_entry: Some(entry), checkpoint: self.checkpoint() }
    }
}
