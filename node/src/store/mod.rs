// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Block Store: append-only JSON-lines log of block records with an in-memory mirror.
//!
//! # File Format
//! ```text
//! {"hash":"<b64>","block":{"header":{...},"payload":[...]}}\n
//! {"hash":"<b64>","block":{"header":{...},"payload":[...]}}\n
//! ```
//! One record per line, in sequence order, never rewritten.

pub mod block_log;
pub mod block_store;

pub use block_log::BlockLog;
pub use block_store::{audit_records, check_link, BlockStore, MismatchKind, StoreAudit, StoreMismatch};

use thiserror::Error;
use tickledger_kernel::error::KernelError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Block {seqid} does not extend the store: {reason}")]
    Discontinuity { seqid: u64, reason: &'static str },
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Encoding(e.to_string())
    }
}

impl From<KernelError> for StoreError {
    fn from(e: KernelError) -> Self {
        StoreError::Encoding(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
