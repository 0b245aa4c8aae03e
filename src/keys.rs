// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Sign/verify capability consumed by the chain, the verifier and packet ingestion.
//!
//! Key storage is the caller's concern: a `Keypair` is built from a 32-byte seed
//! or generated fresh, and never written anywhere by this crate.

use crate::config::{PUBLIC_KEY_LEN, SIGNATURE_LEN};
use crate::error::{KernelError, KernelResult};
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::rngs::OsRng;

pub type PublicKey = [u8; PUBLIC_KEY_LEN];

/// Produces signatures with the node's private key.
pub trait Signer: Send + Sync {
    fn public_key(&self) -> PublicKey;
    fn sign(&self, data: &[u8]) -> Vec<u8>;
}

/// Checks a signature against an arbitrary public key.
pub trait Verifier: Send + Sync {
    fn verify(&self, public_key: &[u8], data: &[u8], signature: &[u8]) -> bool;
}

/// Ed25519 key pair.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self { signing: SigningKey::generate(&mut OsRng) }
    }

    pub fn from_seed(seed: &[u8]) -> KernelResult<Self> {
        let seed: [u8; 32] = seed.try_into().map_err(|_| KernelError::InvalidKey)?;
        Ok(Self { signing: SigningKey::from_bytes(&seed) })
    }
}

impl core::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &crate::encoding::encode(&self.public_key()))
            .finish_non_exhaustive()
    }
}

impl Signer for Keypair {
    fn public_key(&self) -> PublicKey {
        self.signing.verifying_key().to_bytes()
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.signing.sign(data).to_bytes().to_vec()
    }
}

/// Stateless Ed25519 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl Verifier for Ed25519Verifier {
    fn verify(&self, public_key: &[u8], data: &[u8], signature: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; PUBLIC_KEY_LEN]>::try_from(public_key) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        if signature.len() != SIGNATURE_LEN {
            return false;
        }
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(data, &sig).is_ok()
    }
}
