// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::api::*;
use crate::context::SharedContext;
use crate::errors::NodeError;
use crate::network::PeerClient;
use crate::sync;
use axum::{
    body::Body,
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tickledger_kernel::keys::Verifier;
use tickledger_kernel::pending::PendingEntry;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Entries returned by `/chain/recent` after the origin.
const RECENT_ENTRIES: usize = 10;

pub fn build_router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/", get(health))
        // Sync surface
        .route("/p2p/status", get(p2p_status))
        .route("/p2p/sync", get(p2p_sync))
        // Chain and store queries
        .route("/chain", get(chain))
        .route("/chain/recent", get(chain_recent))
        .route("/verify", get(verify))
        .route("/store/verify", get(store_verify))
        // Submission
        .route("/push", post(push))
        .route("/pending", get(pending))
        // Observability
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK".to_string() })
}

async fn p2p_status(
    State(ctx): State<SharedContext>,
    Query(params): Query<StatusQuery>,
) -> Json<StatusResponse> {
    // The caller is only a candidate until it answers a status query of ours.
    if let (Some(host), Some(port)) = (params.rpc_host.as_deref(), params.rpc_port) {
        if ctx.peers.propose(host, port) {
            tracing::debug!("Candidate peer {}:{} announced itself", host, port);
        }
    }
    Json(sync::local_status(&ctx))
}

/// Streams every block from the first descendant of `from` to the current tip
/// as NDJSON. An unknown `from` yields an empty body.
async fn p2p_sync(
    State(ctx): State<SharedContext>,
    Query(params): Query<SyncQuery>,
) -> Result<Body, NodeError> {
    let (start, end) = {
        let store = ctx.store.read();
        (store.find_descendant(&params.from), store.len())
    };
    let Some(start) = start else {
        tracing::debug!("Sync request from unknown hash {}", params.from);
        return Ok(Body::empty());
    };

    let (tx, rx) = tokio::sync::mpsc::channel::<Result<String, std::io::Error>>(100);
    tokio::spawn(async move {
        for index in start..end {
            // Lock per block so appends are never held up by a slow reader.
            let record = {
                let store = ctx.store.read();
                store.get(index).cloned()
            };
            let Some(record) = record else {
                break;
            };
            let line = match serde_json::to_string(&record) {
                Ok(json) => Ok(json + "\n"),
                Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
            };
            if tx.send(line).await.is_err() {
                tracing::warn!("Sync stream: client disconnected at block {}", index);
                return;
            }
        }
    });

    let stream = tokio_stream::wrappers::ReceiverStream::new(rx);
    Ok(Body::from_stream(stream))
}

async fn chain(State(ctx): State<SharedContext>) -> Json<ChainResponse> {
    Json(ChainResponse { public_key: ctx.public_key().to_vec(), entries: ctx.chain_snapshot() })
}

async fn chain_recent(State(ctx): State<SharedContext>) -> Json<RecentChainResponse> {
    let (count, entries) = {
        let chain = ctx.chain.read();
        (chain.len(), chain.recent(RECENT_ENTRIES))
    };
    Json(RecentChainResponse { public_key: ctx.public_key().to_vec(), count, entries })
}

async fn verify(
    State(ctx): State<SharedContext>,
    Query(params): Query<VerifyQuery>,
) -> Result<Json<VerifyResponse>, NodeError> {
    let (entries, owner) = match &params.host {
        Some(host) => {
            let client = PeerClient::new(host, ctx.config.request_timeout)?;
            let remote = client.chain().await?;
            (remote.entries, remote.public_key)
        }
        None => (ctx.chain_snapshot(), ctx.public_key().to_vec()),
    };

    let worker_ctx = ctx.clone();
    let report = tokio::task::spawn_blocking(move || worker_ctx.verify_entries(&entries, &owner))
        .await
        .map_err(|_| NodeError::Internal)??;

    Ok(Json(VerifyResponse {
        host: params.host,
        valid: report.is_valid(),
        failures: report.failures.into_iter().collect(),
        segments: report.segments,
        workers: report.workers,
        hash_rate: report.hash_rate,
        hash_rate_per_core: report.hash_rate_per_core,
    }))
}

async fn store_verify(State(ctx): State<SharedContext>) -> Result<Json<StoreVerifyResponse>, NodeError> {
    let audit = ctx.store.read().verify()?;
    if !audit.is_valid() {
        tracing::warn!("Store audit found mismatches at {:?}", audit.indices());
    }
    Ok(Json(StoreVerifyResponse {
        valid: audit.is_valid(),
        checked: audit.checked,
        indices: audit.indices(),
        mismatches: audit.mismatches,
    }))
}

async fn push(
    State(ctx): State<SharedContext>,
    Json(req): Json<PushRequest>,
) -> Result<Json<PushResponse>, NodeError> {
    if req.data.is_empty() {
        return Err(NodeError::InvalidInput("no data".to_string()));
    }
    if let (Some(sender), Some(signature)) = (&req.sender, &req.signature) {
        if !ctx.verifier.verify(sender, &req.data, signature) {
            tracing::warn!("Rejected pushed entry: signature failure");
            return Err(NodeError::InvalidInput("signature failure".to_string()));
        }
    }

    let entry = PendingEntry::new(
        req.data,
        req.sender.unwrap_or_default(),
        req.recipient.unwrap_or_default(),
        req.signature.unwrap_or_default(),
    );
    let position = ctx.pending.push(entry.clone());
    tracing::debug!("Queued pushed entry at position {}", position);
    Ok(Json(PushResponse { position, entry }))
}

async fn pending(State(ctx): State<SharedContext>) -> Json<PendingResponse> {
    Json(PendingResponse { unclaimed: ctx.pending.unclaimed_len(), entries: ctx.pending.snapshot() })
}

async fn metrics_handler() -> String {
    crate::telemetry::get_metrics()
}
