// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Protocol constants.

/// Wire protocol version carried in the first packet byte.
pub const PROTOCOL_VERSION: u8 = 1;

/// Size of an Ed25519 public key slot in the packet.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Size of the message payload slot in the packet.
pub const PAYLOAD_LEN: usize = 376;

/// Size of the sender signature slot in the packet.
pub const SIGNATURE_LEN: usize = 64;

/// Total packet size. Fits the 508 byte "safe" UDP datagram.
pub const PACKET_LEN: usize = 1 + 3 + PUBLIC_KEY_LEN * 2 + PAYLOAD_LEN + SIGNATURE_LEN;

/// Ticks between two recorded checkpoint entries.
pub const DEFAULT_CHECKPOINT_STRIDE: u64 = 1_000_000;

/// Prefix mixed into the genesis seed of a fresh chain.
pub const GENESIS_PREFIX: &str = "GENESIS_HASH";
