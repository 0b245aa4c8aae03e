// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! UDP packet ingestion.
//!
//! Each datagram is decoded, validated and queued; nothing is ever sent back.

use crate::context::{NodeContext, SharedContext};
use crate::telemetry;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tickledger_kernel::config::PACKET_LEN;
use tickledger_kernel::packet::{accept_datagram, Packet, Rejection};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

/// Validates one datagram and queues it. Returns the pending queue position.
pub fn handle_datagram(ctx: &NodeContext, bytes: &[u8], from: Option<SocketAddr>) -> Result<usize, Rejection> {
    match accept_datagram(bytes, &ctx.verifier) {
        Ok(entry) => {
            let position = ctx.pending.push(entry);
            ctx.stats.packets_accepted.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::PACKETS_ACCEPTED_TOTAL, 1);
            tracing::debug!("Queued packet from {:?} at position {}", from, position);
            Ok(position)
        }
        Err(reason) => {
            ctx.stats.packets_rejected.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::PACKETS_REJECTED_TOTAL, 1);
            tracing::warn!("Dropped packet from {:?} ({} bytes): {}", from, bytes.len(), reason.as_str());
            Err(reason)
        }
    }
}

/// Receive loop. Oversized datagrams are read into a buffer one byte larger
/// than a packet so they show up as malformed instead of being truncated.
pub async fn run_udp_listener(ctx: SharedContext, socket: UdpSocket, cancel: CancellationToken) {
    let mut buf = vec![0u8; PACKET_LEN + 1];
    match socket.local_addr() {
        Ok(addr) => tracing::info!("Packet listener on udp://{}", addr),
        Err(e) => tracing::warn!("Packet listener address unavailable: {}", e),
    }

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            r = socket.recv_from(&mut buf) => r,
        };
        match received {
            Ok((len, from)) => {
                let _ = handle_datagram(&ctx, &buf[..len], Some(from));
            }
            Err(e) => tracing::warn!("UDP receive failed: {}", e),
        }
    }
    tracing::info!("Packet listener stopped");
}

/// Sends one packet as a single datagram.
pub async fn send_packet(socket: &UdpSocket, target: SocketAddr, packet: &Packet) -> std::io::Result<usize> {
    socket.send_to(&packet.encode(), target).await
}
