// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub const TICKS_TOTAL: &str = "tickledger_ticks_total";
pub const HASH_RATE: &str = "tickledger_hash_rate";
pub const VERIFY_HASH_RATE: &str = "tickledger_verify_hash_rate";
pub const VERIFY_HASH_RATE_PER_CORE: &str = "tickledger_verify_hash_rate_per_core";
pub const BLOCKS_APPENDED_TOTAL: &str = "tickledger_blocks_appended_total";
pub const BLOCK_BUILD_DURATION: &str = "tickledger_block_build_duration_seconds";
pub const PACKETS_ACCEPTED_TOTAL: &str = "tickledger_packets_accepted_total";
pub const PACKETS_REJECTED_TOTAL: &str = "tickledger_packets_rejected_total";
pub const SYNC_BLOCKS_RECEIVED_TOTAL: &str = "tickledger_sync_blocks_received_total";

/// Initialize telemetry (logs + metrics)
pub fn init_telemetry() {
    // 1. Logs
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tickledger_node=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Metrics
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if PROM_HANDLE.set(handle).is_err() {
                tracing::warn!("Prometheus handle already set. Telemetry re-initialized?");
            }
        }
        Err(e) => tracing::warn!("Failed to install Prometheus recorder: {}", e),
    }

    metrics::describe_counter!(TICKS_TOTAL, "Total number of PoH ticks generated");
    metrics::describe_gauge!(HASH_RATE, "Ticks per second of the last generator run");
    metrics::describe_gauge!(VERIFY_HASH_RATE, "Ticks per second re-verified by the last audit");
    metrics::describe_gauge!(VERIFY_HASH_RATE_PER_CORE, "Verification rate divided by core count");
    metrics::describe_counter!(BLOCKS_APPENDED_TOTAL, "Blocks appended to the store");
    metrics::describe_histogram!(BLOCK_BUILD_DURATION, "Time taken to seal and append a block");
    metrics::describe_counter!(PACKETS_ACCEPTED_TOTAL, "Wire packets queued for inclusion");
    metrics::describe_counter!(PACKETS_REJECTED_TOTAL, "Wire packets dropped on validation");
    metrics::describe_counter!(SYNC_BLOCKS_RECEIVED_TOTAL, "Blocks appended from peers");

    metrics::gauge!("tickledger_node_up", 1.0);
}

/// Get the Prometheus handle to render metrics
pub fn get_metrics() -> String {
    if let Some(handle) = PROM_HANDLE.get() {
        handle.render()
    } else {
        "# metrics not initialized".to_string()
    }
}
