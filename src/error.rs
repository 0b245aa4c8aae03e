// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
    /// Canonical encoding of a payload failed.
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Message does not fit the fixed packet payload slot.
    #[error("Payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },

    /// Datagram is not exactly one packet long.
    #[error("Malformed packet: {len} bytes (expected {expected})")]
    MalformedPacket { len: usize, expected: usize },

    /// Verification worker pool could not be started.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// Key material has the wrong shape.
    #[error("Invalid key material")]
    InvalidKey,
}

pub type KernelResult<T> = core::result::Result<T, KernelError>;
