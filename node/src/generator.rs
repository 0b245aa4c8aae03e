// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! PoH Generator: the single writer of the running hash.
//!
//! The recorder lives here, outside any lock. The chain lock is taken only to
//! publish an entry, so readers see a consistent snapshot while empty ticks run
//! lock-free.

use crate::context::SharedContext;
use crate::errors::{NodeError, NodeResult};
use crate::telemetry;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tickledger_kernel::keys::Signer;
use tickledger_kernel::poh::{PohRecorder, Tick};
use tokio_util::sync::CancellationToken;

/// Ticks between two cancellation checks.
const CANCEL_CHECK_EVERY: u64 = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunReport {
    pub ticks: u64,
    pub data_ticks: u64,
    /// Ticks per second over this run.
    pub hash_rate: f64,
    pub cancelled: bool,
}

pub struct PohGenerator {
    ctx: SharedContext,
    recorder: PohRecorder,
}

impl PohGenerator {
    /// Audits the block store and seeds the chain from it.
    ///
    /// Any store mismatch is fatal: the chain cannot pick a safe starting hash
    /// from a store it does not trust.
    pub fn initialize(ctx: SharedContext) -> NodeResult<Self> {
        let (seed, next_block_id) = {
            let store = ctx.store.read();
            let audit = store.verify()?;
            if !audit.is_valid() {
                tracing::error!("Block store audit failed: {:?}", audit.mismatches);
                return Err(NodeError::StoreCorrupted(audit.indices()));
            }
            match store.latest() {
                Some(last) => {
                    tracing::info!("Resuming chain after block {} {}", last.seqid(), last.hash);
                    (PohRecorder::resume_seed(&last.hash), store.next_sequence_id())
                }
                None => {
                    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
                    tracing::info!("Empty block store, deriving genesis");
                    (PohRecorder::genesis_seed(&ctx.keypair, nanos), 0)
                }
            }
        };

        let recorder = PohRecorder::new(seed, ctx.config.checkpoint_stride);
        ctx.chain.write().start(recorder.origin(), next_block_id);
        tracing::info!("Chain origin {}", recorder.prev_hash());
        Ok(Self { ctx, recorder })
    }

    pub fn recorder(&self) -> &PohRecorder {
        &self.recorder
    }

    /// Runs up to `ticks` ticks, stopping early if `cancel` fires.
    pub fn run(&mut self, ticks: u64, cancel: &CancellationToken) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::default();

        while report.ticks < ticks {
            if report.ticks % CANCEL_CHECK_EVERY == 0 && cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let tick = if self.ctx.pending.has_unclaimed() {
                self.data_tick()
            } else {
                self.recorder.tick()
            };
            if tick.data_entry.is_some() {
                report.data_ticks += 1;
            }
            if let Some(checkpoint) = tick.checkpoint {
                self.ctx.chain.write().record(checkpoint);
            }
            report.ticks += 1;
        }

        let secs = started.elapsed().as_secs_f64();
        report.hash_rate = if secs > 0.0 { report.ticks as f64 / secs } else { 0.0 };

        self.ctx.stats.ticks_total.fetch_add(report.ticks, Ordering::Relaxed);
        self.ctx.stats.hash_rate.set(report.hash_rate);
        metrics::counter!(telemetry::TICKS_TOTAL, report.ticks);
        metrics::gauge!(telemetry::HASH_RATE, report.hash_rate);
        tracing::debug!(
            "Generator ran {} ticks ({} with data) at {:.0} H/s",
            report.ticks,
            report.data_ticks,
            report.hash_rate
        );
        report
    }

    /// Claims one pending entry and folds it in.
    ///
    /// Claim, fold and inclusion happen under one chain write lock so the block
    /// builder never takes a block between the claim tag and the inclusion.
    fn data_tick(&mut self) -> Tick {
        let mut chain = self.ctx.chain.write();
        let block_id = chain.in_progress().sequence_id;
        let Some((position, payload)) = self.ctx.pending.claim_next(block_id) else {
            return self.recorder.tick();
        };

        let signature = self.ctx.keypair.sign(&payload.data);
        let tick = self.recorder.tick_with(payload.data.clone(), signature);
        if let Some(entry) = &tick.data_entry {
            tracing::debug!("Folded pending entry at tick {} into block {}", entry.seq, block_id);
            chain.record(entry.clone());
        }
        chain.include(position, payload);
        tick
    }
}

/// Runs generator batches back to back until cancelled. Blocking; spawn it on
/// a blocking thread.
pub fn run_generator_loop(mut generator: PohGenerator, cancel: CancellationToken) {
    let batch = generator.ctx.config.tick_batch.max(1);
    tracing::info!("PoH generator started, {} ticks per run", batch);
    while !cancel.is_cancelled() {
        generator.run(batch, &cancel);
    }
    tracing::info!("PoH generator stopped at tick {}", generator.recorder.current_tick());
}
