// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Proof of History
//!
//! - `recorder`: the tick state machine (running hash, tick counter, checkpoint stride)
//! - `chain`: recorded entries plus the block being filled
//! - `verify`: parallel re-hash of a recorded chain, one task per segment
//!
//! Only checkpoint and data-bearing ticks are recorded. Everything between two
//! recorded entries is a plain hash chain that any verifier can redo.

pub mod entry;
pub mod recorder;
pub mod chain;
pub mod verify;

pub use entry::HashEntry;
pub use recorder::{PohRecorder, Tick};
pub use chain::{InProgressBlock, PohChain};
pub use verify::{verify_chain, worker_count, VerificationReport};
