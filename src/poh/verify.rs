// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Parallel re-verification of a recorded chain.
//!
//! The chain is split into one segment per consecutive entry pair. Segments are
//! independent, so each runs as its own task on a bounded rayon pool inside a
//! scope; the scope is the drain barrier. A failing segment never stops the
//! others, every failing sequence id is reported.

use crate::error::{KernelError, KernelResult};
use crate::hash::Hash;
use crate::keys::Verifier;
use crate::poh::entry::HashEntry;
use parking_lot::Mutex;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Outcome of one verification pass.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    /// Sequence ids of every entry whose hash or signature did not check out.
    pub failures: BTreeSet<u64>,
    pub segments: usize,
    pub workers: usize,
    /// Ticks per second over the whole chain.
    pub hash_rate: f64,
    pub hash_rate_per_core: f64,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl VerificationReport {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

fn cores() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Pool size for verification.
///
/// Defaults to one worker less than the core count; explicit requests are
/// clamped to `[1, cores * 2]`.
pub fn worker_count(requested: Option<usize>) -> usize {
    let cores = cores();
    match requested {
        None => cores.saturating_sub(1).max(1),
        Some(n) => n.clamp(1, cores * 2),
    }
}

/// Recomputes `next` from `prev`. Returns false on a hash or signature mismatch.
fn check_segment(prev: &HashEntry, next: &HashEntry, owner: &[u8], verifier: &dyn Verifier) -> bool {
    if next.seq < prev.seq {
        return false;
    }
    let steps = next.seq - prev.seq;
    let data = next.data.as_deref().filter(|d| !d.is_empty());

    let recomputed = match data {
        Some(_) if steps == 0 => return false,
        Some(data) => {
            let mut h: Hash = prev.hash;
            for _ in 1..steps {
                h = h.rehash();
            }
            h.fold(data)
        }
        None => {
            let mut h: Hash = prev.hash;
            for _ in 0..steps {
                h = h.rehash();
            }
            h
        }
    };
    if recomputed != next.hash {
        return false;
    }

    match (data, next.signature.as_deref()) {
        (Some(data), Some(sig)) => verifier.verify(owner, data, sig),
        (Some(_), None) => false,
        (None, _) => true,
    }
}

/// Verifies every consecutive pair of `entries` on a pool of `workers` threads.
///
/// `owner` is the public key the chain's data entries were signed with.
pub fn verify_chain(
    entries: &[HashEntry],
    owner: &[u8],
    verifier: &dyn Verifier,
    workers: usize,
) -> KernelResult<VerificationReport> {
    let workers = workers.max(1);
    let started = Instant::now();

    if entries.len() < 2 {
        return Ok(VerificationReport {
            failures: BTreeSet::new(),
            segments: 0,
            workers,
            hash_rate: 0.0,
            hash_rate_per_core: 0.0,
            elapsed: started.elapsed(),
        });
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("poh-verify-{i}"))
        .build()
        .map_err(|e| KernelError::WorkerPool(e.to_string()))?;

    let failures = Mutex::new(BTreeSet::new());
    pool.scope(|s| {
        for pair in entries.windows(2) {
            let failures = &failures;
            s.spawn(move |_| {
                let (prev, next) = (&pair[0], &pair[1]);
                if !check_segment(prev, next, owner, verifier) {
                    failures.lock().insert(next.seq);
                }
            });
        }
    });

    let elapsed = started.elapsed();
    let last_seq = entries.last().map_or(0, |e| e.seq);
    let secs = elapsed.as_secs_f64();
    let hash_rate = if secs > 0.0 { last_seq as f64 / secs } else { 0.0 };

    Ok(VerificationReport {
        failures: failures.into_inner(),
        segments: entries.len() - 1,
        workers,
        hash_rate,
        hash_rate_per_core: hash_rate / cores() as f64,
        elapsed,
    })
}
