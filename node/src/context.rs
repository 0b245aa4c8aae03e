// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Shared node state.
//!
//! Two independent reader/writer locks: one over the chain and its in-progress
//! block, one over the block store. Code that needs both takes the chain lock
//! first.

use crate::config::NodeConfig;
use crate::errors::NodeResult;
use crate::peers::PeerRegistry;
use crate::store::BlockStore;
use crate::telemetry;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tickledger_kernel::keys::{Ed25519Verifier, Keypair, Signer};
use tickledger_kernel::pending::PendingQueue;
use tickledger_kernel::poh::{self, HashEntry, PohChain, VerificationReport};

pub type SharedContext = Arc<NodeContext>;

/// f64 stored as bits so readers never take a lock.
#[derive(Debug, Default)]
pub struct Rate(AtomicU64);

impl Rate {
    pub fn set(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
pub struct NodeStats {
    pub ticks_total: AtomicU64,
    pub hash_rate: Rate,
    pub verify_hash_rate: Rate,
    pub verify_hash_rate_per_core: Rate,
    pub packets_accepted: AtomicU64,
    pub packets_rejected: AtomicU64,
    pub blocks_appended: AtomicU64,
    pub sync_blocks_received: AtomicU64,
}

pub struct NodeContext {
    pub config: NodeConfig,
    pub keypair: Keypair,
    pub verifier: Ed25519Verifier,
    pub chain: RwLock<PohChain>,
    pub store: RwLock<BlockStore>,
    pub pending: PendingQueue,
    pub peers: PeerRegistry,
    pub stats: NodeStats,
}

impl NodeContext {
    /// Opens the block store named by `config`. The chain starts empty until
    /// the generator initializes it.
    pub fn open(config: NodeConfig, keypair: Keypair) -> NodeResult<SharedContext> {
        let store = BlockStore::open(&config.db_path)?;
        let peers = PeerRegistry::with_bootstrap(&config.bootstrap_peers, config.max_peers);
        let chain = PohChain::new(keypair.public_key());
        Ok(Arc::new(Self {
            config,
            keypair,
            verifier: Ed25519Verifier,
            chain: RwLock::new(chain),
            store: RwLock::new(store),
            pending: PendingQueue::new(),
            peers,
            stats: NodeStats::default(),
        }))
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public_key()
    }

    pub fn chain_snapshot(&self) -> Vec<HashEntry> {
        self.chain.read().entries().to_vec()
    }

    /// Re-verifies `entries` signed by `owner` and publishes the rates.
    pub fn verify_entries(&self, entries: &[HashEntry], owner: &[u8]) -> NodeResult<VerificationReport> {
        let workers = poh::worker_count(self.config.verify_workers);
        let report = poh::verify_chain(entries, owner, &self.verifier, workers)?;

        self.stats.verify_hash_rate.set(report.hash_rate);
        self.stats.verify_hash_rate_per_core.set(report.hash_rate_per_core);
        metrics::gauge!(telemetry::VERIFY_HASH_RATE, report.hash_rate);
        metrics::gauge!(telemetry::VERIFY_HASH_RATE_PER_CORE, report.hash_rate_per_core);

        if report.is_valid() {
            tracing::info!(
                "Verified {} segments at {:.0} H/s ({:.0} H/s per core)",
                report.segments,
                report.hash_rate,
                report.hash_rate_per_core
            );
        } else {
            tracing::warn!("Chain verification failed at sequences {:?}", report.failures);
        }
        Ok(report)
    }

    /// Self-audit: snapshots the local chain, then verifies it outside the lock.
    pub fn verify_local_chain(&self) -> NodeResult<VerificationReport> {
        let entries = self.chain_snapshot();
        self.verify_entries(&entries, &self.public_key())
    }
}
