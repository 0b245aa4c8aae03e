// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::peers::PeerRecord;
use crate::store::StoreMismatch;
use serde::{Deserialize, Serialize};
use tickledger_kernel::encoding;
use tickledger_kernel::pending::PendingEntry;
use tickledger_kernel::poh::HashEntry;
use tickledger_kernel::Hash;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// Sync surface

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub rpc_host: Option<String>,
    pub rpc_port: Option<u16>,
}

/// Latest block of the responder plus its peer registry.
/// The block fields are absent when the responder's store is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub parent: Option<Hash>,
    pub hash: Option<Hash>,
    pub seqid: Option<u64>,
    #[serde(default)]
    pub peers: Vec<PeerRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    /// Resume hash: the stream starts at the first block whose parent is this.
    pub from: Hash,
}

// Chain queries

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainResponse {
    #[serde(with = "encoding::bytes")]
    pub public_key: Vec<u8>,
    pub entries: Vec<HashEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecentChainResponse {
    #[serde(with = "encoding::bytes")]
    pub public_key: Vec<u8>,
    pub count: usize,
    pub entries: Vec<HashEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    /// `host:port` of a peer whose chain should be audited instead of ours.
    pub host: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub host: Option<String>,
    pub valid: bool,
    pub failures: Vec<u64>,
    pub segments: usize,
    pub workers: usize,
    pub hash_rate: f64,
    pub hash_rate_per_core: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreVerifyResponse {
    pub valid: bool,
    pub checked: usize,
    pub indices: Vec<usize>,
    pub mismatches: Vec<StoreMismatch>,
}

// Submission

#[derive(Debug, Deserialize)]
pub struct PushRequest {
    #[serde(with = "encoding::bytes")]
    pub data: Vec<u8>,
    #[serde(with = "encoding::opt_bytes", default)]
    pub sender: Option<Vec<u8>>,
    #[serde(with = "encoding::opt_bytes", default)]
    pub recipient: Option<Vec<u8>>,
    #[serde(with = "encoding::opt_bytes", default)]
    pub signature: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PushResponse {
    pub position: usize,
    pub entry: PendingEntry,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingResponse {
    pub unclaimed: usize,
    pub entries: Vec<PendingEntry>,
}
