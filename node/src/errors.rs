// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tickledger_kernel::error::KernelError;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
    #[error("Block store failed verification at indices {0:?}")]
    StoreCorrupted(Vec<usize>),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = match &self {
            NodeError::Store(StoreError::Discontinuity { .. }) => StatusCode::CONFLICT,
            NodeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            NodeError::Kernel(KernelError::PayloadTooLarge { .. })
            | NodeError::Kernel(KernelError::MalformedPacket { .. })
            | NodeError::Kernel(KernelError::InvalidKey) => StatusCode::BAD_REQUEST,
            NodeError::Kernel(_) => StatusCode::INTERNAL_SERVER_ERROR,
            NodeError::StoreCorrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
            NodeError::Network(_) => StatusCode::BAD_GATEWAY,
            NodeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            NodeError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
