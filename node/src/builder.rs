// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Block Builder: seals the in-progress block on a timer and appends it.

use crate::context::{NodeContext, SharedContext};
use crate::errors::{NodeError, NodeResult};
use crate::telemetry;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tickledger_kernel::block::BlockRecord;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Finalizes the in-progress block, if it has any payload.
///
/// The block is sealed against the store's current tip and sequence, which may
/// have moved since its entries were claimed if a peer sync appended blocks in
/// between. The claims are then retagged with the id the block was sealed at.
/// On failure the payload goes back in front of the in-progress block.
pub fn build_once(ctx: &NodeContext) -> NodeResult<Option<BlockRecord>> {
    let started = Instant::now();
    let Some(taken) = ctx.chain.write().take_block() else {
        return Ok(None);
    };

    let result = {
        let mut store = ctx.store.write();
        let seqid = store.next_sequence_id();
        BlockRecord::seal(store.tip_hash(), seqid, Utc::now(), taken.payload.clone())
            .map_err(NodeError::from)
            .and_then(|record| {
                store.append(record.clone())?;
                Ok(record)
            })
    };

    match result {
        Ok(record) => {
            ctx.pending.retag(&taken.claimed, record.seqid());
            if record.seqid() != taken.sequence_id {
                tracing::debug!(
                    "Block claimed as {} sealed as {} after store moved",
                    taken.sequence_id,
                    record.seqid()
                );
                ctx.chain.write().set_next_block_id(record.seqid() + 1);
            }
            ctx.stats.blocks_appended.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::BLOCKS_APPENDED_TOTAL, 1);
            metrics::histogram!(telemetry::BLOCK_BUILD_DURATION, started.elapsed().as_secs_f64());
            tracing::info!(
                "Block {} sealed with {} entries: {}",
                record.seqid(),
                record.block.payload.len(),
                record.hash
            );
            Ok(Some(record))
        }
        Err(e) => {
            tracing::error!("Block append failed, payload returned to in-progress block: {}", e);
            ctx.chain.write().restore_block(taken);
            Err(e)
        }
    }
}

/// Calls [`build_once`] every `block_interval` until cancelled. One build is in
/// flight at a time: a slow build delays the next tick instead of overlapping it.
pub async fn run_block_builder(ctx: SharedContext, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(ctx.config.block_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!("Block builder started, period {:?}", ctx.config.block_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let ctx = ctx.clone();
        match tokio::task::spawn_blocking(move || build_once(&ctx)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!("Block build failed: {}", e),
            Err(e) => tracing::error!("Block build task panicked: {}", e),
        }
    }
    tracing::info!("Block builder stopped");
}
