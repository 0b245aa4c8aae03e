// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fixed-size message packet carried in a single UDP datagram.
//!
//! # Layout
//! ```text
//! [version: 1][reserved: 3][sender key: 32][recipient key: 32][payload: 376][signature: 64]
//! ```
//! 508 bytes total. Every field is a byte string, so the layout is the same in
//! either byte order. The sender signature covers the full 376-byte payload slot.

use crate::config::{PACKET_LEN, PAYLOAD_LEN, PROTOCOL_VERSION, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::error::{KernelError, KernelResult};
use crate::keys::{Signer, Verifier};
use crate::pending::PendingEntry;

const SENDER_AT: usize = 4;
const RECIPIENT_AT: usize = SENDER_AT + PUBLIC_KEY_LEN;
const PAYLOAD_AT: usize = RECIPIENT_AT + PUBLIC_KEY_LEN;
const SIGNATURE_AT: usize = PAYLOAD_AT + PAYLOAD_LEN;

#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    pub version: u8,
    pub reserved: [u8; 3],
    pub sender: [u8; PUBLIC_KEY_LEN],
    pub recipient: [u8; PUBLIC_KEY_LEN],
    pub payload: [u8; PAYLOAD_LEN],
    pub signature: [u8; SIGNATURE_LEN],
}

/// Why an inbound packet was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Malformed,
    EmptyPayload,
    NoSender,
    NoRecipient,
    BadSignature,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::Malformed => "malformed",
            Rejection::EmptyPayload => "no data",
            Rejection::NoSender => "no sender",
            Rejection::NoRecipient => "no recipient",
            Rejection::BadSignature => "signature failure",
        }
    }
}

fn all_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| *b == 0)
}

impl Packet {
    /// Builds a packet around `message`, zero-padded to the payload slot.
    /// Messages longer than the slot are rejected, never truncated.
    pub fn new(
        sender: [u8; PUBLIC_KEY_LEN],
        recipient: [u8; PUBLIC_KEY_LEN],
        message: &[u8],
    ) -> KernelResult<Self> {
        if message.len() > PAYLOAD_LEN {
            return Err(KernelError::PayloadTooLarge { len: message.len(), max: PAYLOAD_LEN });
        }
        let mut payload = [0u8; PAYLOAD_LEN];
        payload[..message.len()].copy_from_slice(message);
        Ok(Self {
            version: PROTOCOL_VERSION,
            reserved: [0u8; 3],
            sender,
            recipient,
            payload,
            signature: [0u8; SIGNATURE_LEN],
        })
    }

    /// Builds and signs a packet from `signer` to `recipient`.
    pub fn signed(
        signer: &dyn Signer,
        recipient: [u8; PUBLIC_KEY_LEN],
        message: &[u8],
    ) -> KernelResult<Self> {
        let mut packet = Self::new(signer.public_key(), recipient, message)?;
        let sig = signer.sign(&packet.payload);
        let n = SIGNATURE_LEN.min(sig.len());
        packet.signature[..n].copy_from_slice(&sig[..n]);
        Ok(packet)
    }

    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        out[0] = self.version;
        out[1..SENDER_AT].copy_from_slice(&self.reserved);
        out[SENDER_AT..RECIPIENT_AT].copy_from_slice(&self.sender);
        out[RECIPIENT_AT..PAYLOAD_AT].copy_from_slice(&self.recipient);
        out[PAYLOAD_AT..SIGNATURE_AT].copy_from_slice(&self.payload);
        out[SIGNATURE_AT..].copy_from_slice(&self.signature);
        out
    }

    /// Decodes exactly one packet. Short or oversized datagrams are errors.
    pub fn decode(bytes: &[u8]) -> KernelResult<Self> {
        if bytes.len() != PACKET_LEN {
            return Err(KernelError::MalformedPacket { len: bytes.len(), expected: PACKET_LEN });
        }
        let mut packet = Self {
            version: bytes[0],
            reserved: [0u8; 3],
            sender: [0u8; PUBLIC_KEY_LEN],
            recipient: [0u8; PUBLIC_KEY_LEN],
            payload: [0u8; PAYLOAD_LEN],
            signature: [0u8; SIGNATURE_LEN],
        };
        packet.reserved.copy_from_slice(&bytes[1..SENDER_AT]);
        packet.sender.copy_from_slice(&bytes[SENDER_AT..RECIPIENT_AT]);
        packet.recipient.copy_from_slice(&bytes[RECIPIENT_AT..PAYLOAD_AT]);
        packet.payload.copy_from_slice(&bytes[PAYLOAD_AT..SIGNATURE_AT]);
        packet.signature.copy_from_slice(&bytes[SIGNATURE_AT..]);
        Ok(packet)
    }

    /// Payload with the zero padding stripped.
    pub fn message(&self) -> &[u8] {
        let end = self.payload.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        &self.payload[..end]
    }

    /// Structural checks followed by the sender signature check.
    pub fn validate(&self, verifier: &dyn Verifier) -> Result<(), Rejection> {
        if self.version != PROTOCOL_VERSION {
            return Err(Rejection::Malformed);
        }
        if all_zero(&self.payload) {
            return Err(Rejection::EmptyPayload);
        }
        if all_zero(&self.sender) {
            return Err(Rejection::NoSender);
        }
        if all_zero(&self.recipient) {
            return Err(Rejection::NoRecipient);
        }
        if !verifier.verify(&self.sender, &self.payload, &self.signature) {
            return Err(Rejection::BadSignature);
        }
        Ok(())
    }

    /// Pending queue entry for an accepted packet.
    pub fn into_pending(self) -> PendingEntry {
        PendingEntry::new(
            self.payload.to_vec(),
            self.sender.to_vec(),
            self.recipient.to_vec(),
            self.signature.to_vec(),
        )
    }
}

impl core::fmt::Debug for Packet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Packet")
            .field("version", &self.version)
            .field("sender", &crate::encoding::encode(&self.sender))
            .field("recipient", &crate::encoding::encode(&self.recipient))
            .field("message_len", &self.message().len())
            .finish()
    }
}

/// Decodes and validates a raw datagram in one step.
pub fn accept_datagram(bytes: &[u8], verifier: &dyn Verifier) -> Result<PendingEntry, Rejection> {
    let packet = Packet::decode(bytes).map_err(|_| Rejection::Malformed)?;
    packet.validate(verifier)?;
    Ok(packet.into_pending())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Ed25519Verifier, Keypair};

    #[test]
    fn test_layout_offsets() {
        assert_eq!(PACKET_LEN, 508);
        let kp = Keypair::generate();
        let p = Packet::signed(&kp, [9u8; 32], b"hello").unwrap();
        let bytes = p.encode();
        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(&bytes[4..36], &kp.public_key());
        assert_eq!(&bytes[36..68], &[9u8; 32]);
        assert_eq!(&bytes[68..73], b"hello");
        assert_eq!(&bytes[444..], &p.signature);
        assert_eq!(Packet::decode(&bytes).unwrap(), p);
    }

    #[test]
    fn test_oversized_message_rejected() {
        let kp = Keypair::generate();
        let err = Packet::signed(&kp, [1u8; 32], &[7u8; PAYLOAD_LEN + 1]).unwrap_err();
        assert!(matches!(err, KernelError::PayloadTooLarge { len: 377, max: 376 }));
        assert!(Packet::signed(&kp, [1u8; 32], &[7u8; PAYLOAD_LEN]).is_ok());
    }

    #[test]
    fn test_wrong_length_datagram_malformed() {
        assert!(Packet::decode(&[0u8; 100]).is_err());
        assert!(Packet::decode(&[0u8; PACKET_LEN + 1]).is_err());
        assert_eq!(accept_datagram(&[], &Ed25519Verifier).unwrap_err(), Rejection::Malformed);
    }

    #[test]
    fn test_validate_rejections() {
        let kp = Keypair::generate();
        let v = Ed25519Verifier;

        let empty = Packet::signed(&kp, [1u8; 32], b"").unwrap();
        assert_eq!(empty.validate(&v), Err(Rejection::EmptyPayload));

        let no_recipient = Packet::signed(&kp, [0u8; 32], b"m").unwrap();
        assert_eq!(no_recipient.validate(&v), Err(Rejection::NoRecipient));

        let mut no_sender = Packet::signed(&kp, [1u8; 32], b"m").unwrap();
        no_sender.sender = [0u8; 32];
        assert_eq!(no_sender.validate(&v), Err(Rejection::NoSender));

        let mut tampered = Packet::signed(&kp, [1u8; 32], b"m").unwrap();
        tampered.payload[1] = 1;
        assert_eq!(tampered.validate(&v), Err(Rejection::BadSignature));
    }

    #[test]
    fn test_unknown_version_is_malformed() {
        let kp = Keypair::generate();
        let mut p = Packet::signed(&kp, [1u8; 32], b"m").unwrap();
        assert_eq!(p.validate(&Ed25519Verifier), Ok(()));
        for version in [0u8, PROTOCOL_VERSION + 1, u8::MAX] {
            p.version = version;
            assert_eq!(p.validate(&Ed25519Verifier), Err(Rejection::Malformed));
            assert_eq!(accept_datagram(&p.encode(), &Ed25519Verifier).unwrap_err(), Rejection::Malformed);
        }
    }

    #[test]
    fn test_accepted_packet_becomes_pending_entry() {
        let kp = Keypair::generate();
        let p = Packet::signed(&kp, [2u8; 32], b"msg").unwrap();
        let entry = accept_datagram(&p.encode(), &Ed25519Verifier).unwrap();
        assert_eq!(entry.data.len(), PAYLOAD_LEN);
        assert_eq!(&entry.data[..3], b"msg");
        assert_eq!(entry.sender, kp.public_key().to_vec());
        assert_eq!(entry.recipient, vec![2u8; 32]);
        assert!(Ed25519Verifier.verify(&entry.sender, &entry.data, &entry.signature));
        assert_eq!(p.message(), b"msg");
    }
}
