// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! SHA-256 hash value and the two chain steps built on it.

use crate::encoding;
use core::fmt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

pub const HASH_LEN: usize = 32;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// Genesis sentinel: parent of the first block, never a real digest.
    pub const ZERO: Hash = Hash([0u8; HASH_LEN]);

    /// SHA-256 over the concatenation of `parts`.
    pub fn digest(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        Hash(hasher.finalize().into())
    }

    /// One empty tick: `SHA256(prev)`.
    pub fn rehash(&self) -> Self {
        Hash(Sha256::digest(self.0).into())
    }

    /// One data tick: `SHA256(prev ++ data)`.
    pub fn fold(&self, data: &[u8]) -> Self {
        Self::digest(&[&self.0, data])
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; HASH_LEN]>::try_from(bytes).ok().map(Hash)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    pub fn to_base64(&self) -> String {
        encoding::encode(&self.0)
    }

    pub fn from_base64(text: &str) -> Option<Self> {
        encoding::decode(text).ok().and_then(|b| Self::from_slice(&b))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_base64())
    }
}

impl From<[u8; HASH_LEN]> for Hash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Hash(bytes)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        let bytes = encoding::decode(&text).map_err(serde::de::Error::custom)?;
        Hash::from_slice(&bytes).ok_or_else(|| {
            serde::de::Error::invalid_length(bytes.len(), &"32 bytes of SHA-256 digest")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rehash_matches_digest_of_bytes() {
        let h = Hash::digest(&[b"seed"]);
        assert_eq!(h.rehash(), Hash::digest(&[h.as_bytes()]));
    }

    #[test]
    fn test_fold_is_prev_then_data() {
        let prev = Hash::digest(&[b"a"]);
        let mut joined = prev.0.to_vec();
        joined.extend_from_slice(b"payload");
        assert_eq!(prev.fold(b"payload"), Hash::digest(&[&joined]));
    }

    #[test]
    fn test_serde_base64_roundtrip() {
        let h = Hash::digest(&[b"x"]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_base64()));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let json = format!("\"{}\"", encoding::encode(&[1u8; 31]));
        assert!(serde_json::from_str::<Hash>(&json).is_err());
    }

    #[test]
    fn test_zero_sentinel() {
        assert!(Hash::ZERO.is_zero());
        assert!(!Hash::digest(&[b""]).is_zero());
    }
}
