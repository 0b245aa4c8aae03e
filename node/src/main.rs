// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::process::ExitCode;
use tickledger_kernel::keys::{Keypair, Signer};
use tickledger_node::builder::run_block_builder;
use tickledger_node::config::NodeConfig;
use tickledger_node::context::NodeContext;
use tickledger_node::generator::{run_generator_loop, PohGenerator};
use tickledger_node::ingest::run_udp_listener;
use tickledger_node::server::build_router;
use tickledger_node::sync::run_sync_loop;
use tickledger_node::telemetry;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init_telemetry();

    let cfg = NodeConfig::from_env();
    tracing::info!("Initializing TickLedger node with config: {:?}", cfg);

    let keypair = match &cfg.key_seed {
        Some(seed) => match Keypair::from_seed(seed) {
            Ok(k) => k,
            Err(e) => {
                tracing::error!("Invalid key seed: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            tracing::warn!("No key seed configured, using an ephemeral key");
            Keypair::generate()
        }
    };
    tracing::info!("Node key {}", tickledger_kernel::encoding::encode(&keypair.public_key()));

    // Startup is all-or-nothing: the chain must start from a verified store.
    let ctx = match NodeContext::open(cfg.clone(), keypair) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::error!("Failed to open block store {:?}: {}", cfg.db_path, e);
            return ExitCode::FAILURE;
        }
    };
    let generator = match PohGenerator::initialize(ctx.clone()) {
        Ok(g) => g,
        Err(e) => {
            tracing::error!("Refusing to start: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let udp = match UdpSocket::bind(cfg.p2p_addr).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind udp://{}: {}", cfg.p2p_addr, e);
            return ExitCode::FAILURE;
        }
    };
    let listener = match TcpListener::bind(cfg.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", cfg.bind_addr, e);
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();

    let generator_task = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || run_generator_loop(generator, cancel))
    };
    let builder_task = tokio::spawn(run_block_builder(ctx.clone(), cancel.clone()));
    let ingest_task = tokio::spawn(run_udp_listener(ctx.clone(), udp, cancel.clone()));
    let sync_task = tokio::spawn(run_sync_loop(ctx.clone(), cancel.clone()));

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                return;
            }
            tracing::info!("Shutdown requested");
            cancel.cancel();
        });
    }

    let app = build_router(ctx.clone());
    tracing::info!("Listening on {}", cfg.bind_addr);
    let shutdown = cancel.clone();
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        tracing::error!("HTTP server failed: {}", e);
        cancel.cancel();
    }

    for (name, task) in [("builder", builder_task), ("ingest", ingest_task), ("sync", sync_task)] {
        if let Err(e) = task.await {
            tracing::warn!("{} task ended abnormally: {}", name, e);
        }
    }
    if let Err(e) = generator_task.await {
        tracing::warn!("generator task ended abnormally: {}", e);
    }
    tracing::info!("Stopped");
    ExitCode::SUCCESS
}
