// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Content-addressed blocks.
//!
//! A block's key is `SHA256(parent_key ++ canonical(payload))`, where the canonical
//! encoding is the compact JSON of the payload list. The key is stored next to the
//! block rather than inside it, so a record is the `(key, block)` pair.

use crate::encoding;
use crate::error::KernelResult;
use crate::hash::Hash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One consumed message, as it appears inside a block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayload {
    #[serde(with = "encoding::bytes")]
    pub sender: Vec<u8>,
    #[serde(with = "encoding::bytes")]
    pub recipient: Vec<u8>,
    #[serde(with = "encoding::bytes")]
    pub signature: Vec<u8>,
    #[serde(with = "encoding::bytes")]
    pub data: Vec<u8>,
    #[serde(with = "encoding::bytes")]
    pub header: Vec<u8>,
    #[serde(rename = "type")]
    pub kind: u8,
    pub reserved: u8,
    #[serde(with = "encoding::bytes")]
    pub output: Vec<u8>,
}

impl TxPayload {
    pub fn new(data: Vec<u8>, sender: Vec<u8>, recipient: Vec<u8>, signature: Vec<u8>) -> Self {
        Self { sender, recipient, signature, data, ..Default::default() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent: Hash,
    pub seqid: u64,
    pub seqtime: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub payload: Vec<TxPayload>,
}

/// The persisted `(key, block)` pair. One per store line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub hash: Hash,
    pub block: Block,
}

/// Canonical byte encoding of a payload list.
pub fn canonical_payload(payload: &[TxPayload]) -> KernelResult<Vec<u8>> {
    Ok(serde_json::to_vec(payload)?)
}

/// `SHA256(parent ++ canonical(payload))`.
pub fn content_key(parent: &Hash, payload: &[TxPayload]) -> KernelResult<Hash> {
    let encoded = canonical_payload(payload)?;
    Ok(Hash::digest(&[parent.as_bytes(), &encoded]))
}

impl BlockRecord {
    /// Builds a record on top of `parent`, computing its content key.
    pub fn seal(
        parent: Hash,
        seqid: u64,
        seqtime: DateTime<Utc>,
        payload: Vec<TxPayload>,
    ) -> KernelResult<Self> {
        let hash = content_key(&parent, &payload)?;
        Ok(Self {
            hash,
            block: Block {
                header: BlockHeader { parent, seqid, seqtime },
                payload,
            },
        })
    }

    pub fn parent(&self) -> &Hash {
        &self.block.header.parent
    }

    pub fn seqid(&self) -> u64 {
        self.block.header.seqid
    }

    /// Key recomputed from an explicit parent key and this block's payload.
    pub fn recompute_key(&self, parent: &Hash) -> KernelResult<Hash> {
        content_key(parent, &self.block.payload)
    }

    /// True when the stored key matches the header's own parent and payload.
    pub fn is_self_consistent(&self) -> KernelResult<bool> {
        Ok(self.recompute_key(self.parent())? == self.hash)
    }
}
