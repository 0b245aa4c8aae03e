// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::encoding;
use crate::hash::Hash;
use serde::{Deserialize, Serialize};

/// A recorded point on the hash chain.
///
/// With `data`, `hash = SHA256(prev ++ data)` at tick `seq` and `signature` is the
/// chain owner's signature over `data`. Without it, `hash` is `prev` re-hashed once
/// per tick since the previous recorded entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashEntry {
    pub hash: Hash,
    #[serde(with = "encoding::opt_bytes", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<u8>>,
    #[serde(with = "encoding::opt_bytes", default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Vec<u8>>,
    pub seq: u64,
}

impl HashEntry {
    pub fn checkpoint(hash: Hash, seq: u64) -> Self {
        Self { hash, data: None, signature: None, seq }
    }

    pub fn with_data(hash: Hash, seq: u64, data: Vec<u8>, signature: Vec<u8>) -> Self {
        Self { hash, data: Some(data), signature: Some(signature), seq }
    }

    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }
}
