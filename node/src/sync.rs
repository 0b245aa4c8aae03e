// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Peer synchronization.
//!
//! Every round each known peer is asked for its latest block and classified
//! against ours. A peer that is ahead is caught up from with a StateSync: the
//! blocks descending from our tip are streamed as NDJSON and applied in
//! batches. Each batch is checked as a whole range, then appended through the
//! normal store path, so a stream cut mid-way keeps the batches before the cut.

use crate::api::StatusResponse;
use crate::context::{NodeContext, SharedContext};
use crate::errors::{NodeError, NodeResult};
use crate::network::{build_http_client, PeerClient};
use crate::peers::{PeerRecord, PeerSyncState};
use crate::store::check_link;
use crate::telemetry;
use axum::body::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tickledger_kernel::block::BlockRecord;
use tickledger_kernel::Hash;
use tokio_util::sync::CancellationToken;

/// Compares our latest block `(hash, seqid)` with a peer's status.
pub fn classify(local: Option<(Hash, u64)>, remote: &StatusResponse) -> PeerSyncState {
    let remote = remote.hash.zip(remote.seqid);
    match (local, remote) {
        (None, None) => PeerSyncState::InSync,
        (Some(_), None) => PeerSyncState::Ahead,
        (None, Some(_)) => PeerSyncState::Behind,
        (Some((lh, ls)), Some((rh, rs))) => {
            if rs > ls {
                PeerSyncState::Behind
            } else if rs < ls {
                PeerSyncState::Ahead
            } else if rh == lh {
                PeerSyncState::InSync
            } else {
                PeerSyncState::Diverged
            }
        }
    }
}

/// Status of our own latest block, as served at `/p2p/status`.
pub fn local_status(ctx: &NodeContext) -> StatusResponse {
    let store = ctx.store.read();
    let latest = store.latest();
    StatusResponse {
        parent: latest.map(|b| *b.parent()),
        hash: latest.map(|b| b.hash),
        seqid: latest.map(|b| b.seqid()),
        peers: ctx.peers.confirmed(),
    }
}

/// Checks that `range` extends our tip as one unbroken run, then appends it.
///
/// Nothing is appended unless the whole range checks out. Returns the number
/// of blocks appended.
pub fn apply_sync_range(ctx: &NodeContext, range: Vec<BlockRecord>) -> NodeResult<usize> {
    if range.is_empty() {
        return Ok(0);
    }

    let next_id = {
        let mut store = ctx.store.write();
        let mut parent = store.tip_hash();
        let mut seqid = store.next_sequence_id();
        for record in &range {
            check_link(parent, seqid, record)?;
            parent = record.hash;
            seqid += 1;
        }
        for record in range.iter().cloned() {
            store.append(record)?;
        }
        store.next_sequence_id()
    };

    {
        let mut chain = ctx.chain.write();
        if chain.in_progress().payload.is_empty() {
            chain.set_next_block_id(next_id);
        }
    }

    let appended = range.len();
    ctx.stats.sync_blocks_received.fetch_add(appended as u64, Ordering::Relaxed);
    metrics::counter!(telemetry::SYNC_BLOCKS_RECEIVED_TOTAL, appended as u64);
    Ok(appended)
}

/// Blocks validated and appended per store write during a StateSync.
pub const SYNC_BATCH: usize = 256;

/// Reader over a peer's NDJSON block stream.
///
/// There is no deadline on the whole body, only on the gap between chunks.
pub struct BlockStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: Vec<u8>,
    idle_timeout: Duration,
    finished: bool,
    deferred: Option<NodeError>,
}

impl BlockStream {
    pub async fn open(client: &PeerClient, from: &Hash, idle_timeout: Duration) -> NodeResult<Self> {
        let resp = client.stream_blocks(from).await?;
        Ok(Self {
            body: resp.bytes_stream().boxed(),
            buffer: Vec::new(),
            idle_timeout,
            finished: false,
            deferred: None,
        })
    }

    /// Up to `max` blocks in stream order; empty once the stream is done.
    ///
    /// A failure after some blocks of a batch were read is held back until the
    /// next call, so the blocks read before it are still handed out.
    pub async fn next_batch(&mut self, max: usize) -> NodeResult<Vec<BlockRecord>> {
        if let Some(e) = self.deferred.take() {
            return Err(e);
        }
        let mut batch = Vec::new();
        match self.fill(&mut batch, max.max(1)).await {
            Ok(()) => Ok(batch),
            Err(e) if batch.is_empty() => Err(e),
            Err(e) => {
                self.deferred = Some(e);
                Ok(batch)
            }
        }
    }

    async fn fill(&mut self, batch: &mut Vec<BlockRecord>, max: usize) -> NodeResult<()> {
        loop {
            while batch.len() < max {
                let Some(idx) = self.buffer.iter().position(|b| *b == b'\n') else {
                    break;
                };
                let line: Vec<u8> = self.buffer.drain(..=idx).collect();
                push_line(batch, &line)?;
            }
            if batch.len() >= max {
                return Ok(());
            }
            if self.finished {
                // Last record may lack its terminator.
                let rest = std::mem::take(&mut self.buffer);
                return push_line(batch, &rest);
            }

            match tokio::time::timeout(self.idle_timeout, self.body.next()).await {
                Ok(Some(Ok(chunk))) => self.buffer.extend_from_slice(&chunk),
                Ok(Some(Err(e))) => return Err(NodeError::Network(e.to_string())),
                Ok(None) => self.finished = true,
                Err(_) => return Err(NodeError::Network("sync stream timed out".to_string())),
            }
        }
    }
}

/// Reads the whole NDJSON block stream for `from` into memory.
pub async fn fetch_blocks(client: &PeerClient, from: &Hash, idle_timeout: Duration) -> NodeResult<Vec<BlockRecord>> {
    let mut stream = BlockStream::open(client, from, idle_timeout).await?;
    let mut blocks = Vec::new();
    loop {
        let batch = stream.next_batch(SYNC_BATCH).await?;
        if batch.is_empty() {
            return Ok(blocks);
        }
        blocks.extend(batch);
    }
}

fn push_line(blocks: &mut Vec<BlockRecord>, line: &[u8]) -> NodeResult<()> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(());
    }
    let record = serde_json::from_str(text)
        .map_err(|e| NodeError::Network(format!("bad block record in sync stream: {}", e)))?;
    blocks.push(record);
    Ok(())
}

/// StateSync: pulls every block descending from `from` and appends it, one
/// batch at a time. On error, batches already appended stay appended.
pub async fn state_sync(ctx: &SharedContext, client: &PeerClient, from: Hash) -> NodeResult<usize> {
    let mut stream = BlockStream::open(client, &from, ctx.config.request_timeout).await?;
    let mut appended = 0;

    loop {
        let batch = match stream.next_batch(SYNC_BATCH).await {
            Ok(batch) => batch,
            Err(e) => {
                if appended > 0 {
                    tracing::warn!("Sync from {} cut after {} blocks: {}", client.base_url(), appended, e);
                }
                return Err(e);
            }
        };
        if batch.is_empty() {
            break;
        }
        let worker_ctx = ctx.clone();
        appended += tokio::task::spawn_blocking(move || apply_sync_range(&worker_ctx, batch))
            .await
            .map_err(|_| NodeError::Internal)??;
    }

    if appended == 0 {
        tracing::debug!("Peer {} has nothing after {}", client.base_url(), from);
    } else {
        tracing::info!("Caught up {} blocks from {}", appended, client.base_url());
    }
    Ok(appended)
}

fn is_self(ctx: &NodeContext, peer: &PeerRecord) -> bool {
    let me = ctx.config.bind_addr;
    peer.port == me.port() && peer.host.parse::<std::net::IpAddr>().is_ok_and(|ip| ip == me.ip())
}

/// One status exchange with `peer`, followed by a StateSync if we are behind.
pub async fn poll_peer(ctx: &SharedContext, http: &reqwest::Client, peer: &PeerRecord) -> NodeResult<PeerSyncState> {
    let key = peer.key();
    let client = PeerClient::with_client(&key, http.clone(), ctx.config.request_timeout);
    let me = ctx.config.bind_addr;
    let host = me.ip().to_string();

    let status = client.status(Some((&host, me.port()))).await?;
    ctx.peers.observe(&peer.host, peer.port);
    let learned = ctx.peers.merge(&status.peers);
    if learned > 0 {
        tracing::debug!("Learned {} peers from {}", learned, key);
    }

    let local = {
        let store = ctx.store.read();
        store.latest().map(|b| (b.hash, b.seqid()))
    };
    let state = classify(local, &status);
    ctx.peers.set_state(&key, state);

    match state {
        PeerSyncState::Behind => {
            let from = local.map_or(Hash::ZERO, |(h, _)| h);
            tracing::info!("Behind {} (remote seq {:?}), syncing from {}", key, status.seqid, from);
            state_sync(ctx, &client, from).await?;
            ctx.peers.set_state(&key, PeerSyncState::Known);
            Ok(PeerSyncState::Known)
        }
        PeerSyncState::Diverged => {
            tracing::warn!("Diverged from {}: same sequence {:?}, different hash", key, status.seqid);
            Ok(state)
        }
        _ => Ok(state),
    }
}

/// Queries every known peer once, in order. A failing peer does not stop the
/// round; it is counted against the peer and may get it evicted.
pub async fn poll_round(ctx: &SharedContext, http: &reqwest::Client, cancel: &CancellationToken) {
    for peer in ctx.peers.snapshot() {
        if is_self(ctx, &peer) {
            continue;
        }
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            r = poll_peer(ctx, http, &peer) => r,
        };
        match outcome {
            Ok(state) => tracing::debug!("Peer {} is {:?}", peer.key(), state),
            Err(e) => {
                tracing::warn!("Peer {} skipped this round: {}", peer.key(), e);
                if ctx.peers.record_failure(&peer.key(), ctx.config.peer_max_failures) {
                    tracing::info!("Dropped peer {} after repeated failures", peer.key());
                }
            }
        }
    }
}

pub async fn run_sync_loop(ctx: SharedContext, cancel: CancellationToken) {
    let http = match build_http_client(ctx.config.request_timeout) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Sync disabled, HTTP client failed to build: {}", e);
            return;
        }
    };
    let mut interval = tokio::time::interval(ctx.config.sync_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!("Peer sync started, every {:?}", ctx.config.sync_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        poll_round(&ctx, &http, &cancel).await;
    }
    tracing::info!("Peer sync stopped");
}
