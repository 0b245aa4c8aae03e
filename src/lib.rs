// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! tickledger-kernel: the synchronous core of a proof-of-history ledger.
//!
//! Hash chain recording, parallel chain verification, content-addressed blocks,
//! the pending queue and the fixed-size wire packet. No async and no I/O live here;
//! the node crate owns files, sockets and timers.

pub mod config;
pub mod error;
pub mod encoding;
pub mod hash;
pub mod keys;
pub mod block;
pub mod pending;
pub mod packet;
pub mod poh;

pub use error::{KernelError, KernelResult};
pub use hash::Hash;

#[cfg(test)]
pub mod tests;
