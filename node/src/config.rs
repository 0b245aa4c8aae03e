// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::peers::DEFAULT_MAX_PEERS;
use tickledger_kernel::config::DEFAULT_CHECKPOINT_STRIDE;

#[derive(Clone)]
pub struct NodeConfig {
    /// HTTP query and sync surface.
    pub bind_addr: SocketAddr,
    /// UDP packet ingestion.
    pub p2p_addr: SocketAddr,
    pub db_path: PathBuf,
    pub checkpoint_stride: u64,
    pub block_interval: Duration,
    pub sync_interval: Duration,
    pub request_timeout: Duration,
    /// `None` sizes the verification pool from the core count.
    pub verify_workers: Option<usize>,
    /// Ticks per generator run.
    pub tick_batch: u64,
    pub bootstrap_peers: Vec<String>,
    /// Non-bootstrap peers kept in the registry.
    pub max_peers: usize,
    /// Failed rounds in a row before a non-bootstrap peer is dropped.
    pub peer_max_failures: u32,
    /// 32-byte Ed25519 seed; a fresh key is generated when absent.
    pub key_seed: Option<Vec<u8>>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 24816)),
            p2p_addr: SocketAddr::from(([127, 0, 0, 1], 16842)),
            db_path: PathBuf::from(".blockchain-db.jsonl"),
            checkpoint_stride: DEFAULT_CHECKPOINT_STRIDE,
            block_interval: Duration::from_millis(500),
            sync_interval: Duration::from_secs(3),
            request_timeout: Duration::from_millis(5000),
            verify_workers: None,
            tick_batch: 10_000_000,
            bootstrap_peers: vec!["127.0.0.1:24816".to_string()],
            max_peers: DEFAULT_MAX_PEERS,
            peer_max_failures: 3,
            key_seed: None,
        }
    }
}

impl std::fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConfig")
            .field("bind_addr", &self.bind_addr)
            .field("p2p_addr", &self.p2p_addr)
            .field("db_path", &self.db_path)
            .field("checkpoint_stride", &self.checkpoint_stride)
            .field("block_interval", &self.block_interval)
            .field("sync_interval", &self.sync_interval)
            .field("request_timeout", &self.request_timeout)
            .field("verify_workers", &self.verify_workers)
            .field("tick_batch", &self.tick_batch)
            .field("bootstrap_peers", &self.bootstrap_peers)
            .field("max_peers", &self.max_peers)
            .field("peer_max_failures", &self.peer_max_failures)
            .field("key_seed", &self.key_seed.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}

impl NodeConfig {
    /// Defaults overlaid with any `TICKLEDGER_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_parse("TICKLEDGER_BIND_ADDR") {
            cfg.bind_addr = v;
        }
        if let Some(v) = env_parse("TICKLEDGER_P2P_ADDR") {
            cfg.p2p_addr = v;
        }
        if let Ok(v) = std::env::var("TICKLEDGER_DB_PATH") {
            cfg.db_path = PathBuf::from(v);
        }
        if let Some(v) = env_parse("TICKLEDGER_CHECKPOINT_STRIDE") {
            cfg.checkpoint_stride = v;
        }
        if let Some(v) = env_parse("TICKLEDGER_BLOCK_INTERVAL_MS") {
            cfg.block_interval = Duration::from_millis(v);
        }
        if let Some(v) = env_parse("TICKLEDGER_SYNC_INTERVAL_SECS") {
            cfg.sync_interval = Duration::from_secs(v);
        }
        if let Some(v) = env_parse("TICKLEDGER_REQUEST_TIMEOUT_MS") {
            cfg.request_timeout = Duration::from_millis(v);
        }
        if let Some(v) = env_parse("TICKLEDGER_VERIFY_WORKERS") {
            cfg.verify_workers = Some(v);
        }
        if let Some(v) = env_parse("TICKLEDGER_TICK_BATCH") {
            cfg.tick_batch = v;
        }
        if let Ok(v) = std::env::var("TICKLEDGER_BOOTSTRAP_PEERS") {
            cfg.bootstrap_peers = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = env_parse("TICKLEDGER_MAX_PEERS") {
            cfg.max_peers = v;
        }
        if let Some(v) = env_parse("TICKLEDGER_PEER_MAX_FAILURES") {
            cfg.peer_max_failures = v;
        }
        if let Ok(v) = std::env::var("TICKLEDGER_KEY_SEED_HEX") {
            match hex::decode(v.trim()) {
                Ok(seed) => cfg.key_seed = Some(seed),
                Err(e) => tracing::warn!("Ignoring TICKLEDGER_KEY_SEED_HEX: {}", e),
            }
        }
        cfg
    }
}
