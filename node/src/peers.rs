// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-memory peer registry.
//!
//! Peers come from configuration (bootstrap) or are learned from traffic: a
//! status query names its sender, and a status response lists the responder's
//! registry. Nothing is persisted.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a peer stands relative to the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PeerSyncState {
    #[default]
    Unknown,
    /// Reachable, not yet compared (or just caught up from).
    Known,
    InSync,
    /// Local store is ahead of the peer.
    Ahead,
    /// Local store is behind the peer.
    Behind,
    /// Same sequence, different hash.
    Diverged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub host: String,
    pub port: u16,
    /// Last successful status exchange we initiated. `None` until then.
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub version: u8,
    #[serde(default)]
    pub bootstrap: bool,
    #[serde(default)]
    pub sync_state: PeerSyncState,
    /// Consecutive rounds this peer failed to answer.
    #[serde(default)]
    pub failures: u32,
}

impl PeerRecord {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            last_seen: None,
            version: tickledger_kernel::config::PROTOCOL_VERSION,
            bootstrap: false,
            sync_state: PeerSyncState::Unknown,
            failures: 0,
        }
    }

    /// Parses `host:port`.
    pub fn parse(addr: &str) -> Option<Self> {
        let (host, port) = addr.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        Some(Self::new(host, port.parse().ok()?))
    }

    pub fn key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured, or answered one of our own status queries.
    pub fn is_confirmed(&self) -> bool {
        self.bootstrap || self.last_seen.is_some()
    }
}

/// Bounded peer table.
///
/// Bootstrap peers are always kept. Everything else competes for the remaining
/// `capacity` slots and is dropped after too many failed rounds in a row.
#[derive(Debug)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<String, PeerRecord>>,
    capacity: usize,
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PEERS)
    }
}

pub const DEFAULT_MAX_PEERS: usize = 64;

impl PeerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self { peers: RwLock::new(HashMap::new()), capacity }
    }

    /// Registry seeded with `host:port` bootstrap addresses; malformed ones are skipped.
    pub fn with_bootstrap(addrs: &[String], capacity: usize) -> Self {
        let registry = Self::new(capacity);
        for addr in addrs {
            match PeerRecord::parse(addr) {
                Some(mut peer) => {
                    peer.bootstrap = true;
                    registry.peers.write().insert(peer.key(), peer);
                }
                None => tracing::warn!("Ignoring malformed bootstrap peer {:?}", addr),
            }
        }
        registry
    }

    fn has_room(peers: &HashMap<String, PeerRecord>, capacity: usize) -> bool {
        peers.values().filter(|p| !p.bootstrap).count() < capacity
    }

    /// Adds an unconfirmed peer, e.g. one that announced itself in a status
    /// query. It is polled like any other but not shared until it answers.
    pub fn propose(&self, host: &str, port: u16) -> bool {
        let mut peers = self.peers.write();
        let key = format!("{}:{}", host, port);
        if peers.contains_key(&key) || !Self::has_room(&peers, self.capacity) {
            return false;
        }
        peers.insert(key, PeerRecord::new(host, port));
        true
    }

    /// Records a successful status exchange with a peer.
    pub fn observe(&self, host: &str, port: u16) {
        let mut peers = self.peers.write();
        let key = format!("{}:{}", host, port);
        if !peers.contains_key(&key) {
            if !Self::has_room(&peers, self.capacity) {
                return;
            }
            peers.insert(key.clone(), PeerRecord::new(host, port));
        }
        if let Some(peer) = peers.get_mut(&key) {
            peer.last_seen = Some(Utc::now());
            peer.failures = 0;
        }
    }

    /// Adds peers learned second-hand, while there is room. Known entries are left untouched.
    pub fn merge(&self, learned: &[PeerRecord]) -> usize {
        let mut peers = self.peers.write();
        let mut added = 0;
        for peer in learned {
            let key = peer.key();
            if peers.contains_key(&key) {
                continue;
            }
            if !Self::has_room(&peers, self.capacity) {
                break;
            }
            let mut fresh = PeerRecord::new(peer.host.clone(), peer.port);
            fresh.version = peer.version;
            peers.insert(key, fresh);
            added += 1;
        }
        added
    }

    /// Counts a failed round for `key`. Returns true when the peer was evicted.
    pub fn record_failure(&self, key: &str, max_failures: u32) -> bool {
        let mut peers = self.peers.write();
        let Some(peer) = peers.get_mut(key) else {
            return false;
        };
        peer.failures = peer.failures.saturating_add(1);
        if !peer.bootstrap && peer.failures >= max_failures.max(1) {
            peers.remove(key);
            return true;
        }
        false
    }

    pub fn set_state(&self, key: &str, state: PeerSyncState) {
        if let Some(peer) = self.peers.write().get_mut(key) {
            peer.sync_state = state;
        }
    }

    pub fn get(&self, key: &str) -> Option<PeerRecord> {
        self.peers.read().get(key).cloned()
    }

    /// All peers, ordered by address.
    pub fn snapshot(&self) -> Vec<PeerRecord> {
        let mut out: Vec<PeerRecord> = self.peers.read().values().cloned().collect();
        out.sort_by(|a, b| a.key().cmp(&b.key()));
        out
    }

    /// Peers safe to hand to others, ordered by address.
    pub fn confirmed(&self) -> Vec<PeerRecord> {
        self.snapshot().into_iter().filter(PeerRecord::is_confirmed).collect()
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
