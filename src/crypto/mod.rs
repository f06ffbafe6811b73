//! Cryptographic Operations Module
//!
//! This module handles the cryptographic primitives of the market: keccak256
//! and sha256 hashing, secp256k1 ECDSA signing over precomputed hashes,
//! signer recovery from 65-byte `r || s || v` signatures, and Ethereum address
//! derivation.
//!
//! ## Security Requirements
//!
//! ⚠️ **CRITICAL**: Private keys must never be exposed or logged. Only low-s
//! signatures are accepted so that a signature cannot be mutated into a second
//! valid one for the same digest.

pub mod permit;

use k256::ecdsa::{
    signature::hazmat::PrehashSigner, RecoveryId, Signature as EcdsaSignature, SigningKey,
    VerifyingKey,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use sha3::{Digest, Keccak256};
use std::fmt;

use crate::error::{MarketError, Result};
use crate::types::{Address, B256};

pub use permit::{PermitDomain, TokenPermissions};

// ============================================================================
// HASHING
// ============================================================================

pub fn keccak256(data: &[u8]) -> B256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    B256::from_slice(&hasher.finalize())
}

pub fn sha256(data: &[u8]) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(data);
    B256::from_slice(&hasher.finalize())
}

/// Derives the Ethereum address of a public key.
///
/// The address is computed as keccak256(uncompressed_public_key)[12:32],
/// where the uncompressed key has its leading 0x04 tag removed.
pub fn ethereum_address(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Uncompressed format: 0x04 || x (32 bytes) || y (32 bytes)
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash.as_bytes()[12..])
}

// ============================================================================
// SIGNATURES
// ============================================================================

/// A 65-byte recoverable ECDSA signature: `r || s || v`.
///
/// `v` may be given in Ethereum form (27/28) or as a raw recovery id (0/1);
/// it is always stored as 27/28 so one signature has exactly one encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 65]);

impl Signature {
    pub const LEN: usize = 65;

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let mut array: [u8; 65] = bytes.try_into().map_err(|_| {
            MarketError::InvalidSignature(format!(
                "expected {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ))
        })?;
        array[64] = match array[64] {
            v @ (27 | 28) => v,
            v @ (0 | 1) => v + 27,
            other => {
                return Err(MarketError::InvalidSignature(format!(
                    "invalid recovery byte {}",
                    other
                )))
            }
        };
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn v(&self) -> u8 {
        self.0[64]
    }

    fn recovery_id(&self) -> Result<RecoveryId> {
        RecoveryId::from_byte(self.v().wrapping_sub(27))
            .ok_or_else(|| MarketError::InvalidSignature("invalid recovery id".to_string()))
    }

    /// Recovers the address that produced this signature over `prehash`.
    pub fn recover(&self, prehash: &B256) -> Result<Address> {
        let signature = EcdsaSignature::from_slice(&self.0[..64])
            .map_err(|e| MarketError::InvalidSignature(e.to_string()))?;
        if signature.normalize_s().is_some() {
            return Err(MarketError::InvalidSignature(
                "high-s signature".to_string(),
            ));
        }
        let key = VerifyingKey::recover_from_prehash(prehash.as_bytes(), &signature, self.recovery_id()?)
            .map_err(|e| MarketError::InvalidSignature(e.to_string()))?;
        Ok(ethereum_address(&key))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x{})", hex::encode(self.0))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)?;
        Signature::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SIGNER
// ============================================================================

/// Holds a secp256k1 private key and signs intent digests with it.
pub struct IntentSigner {
    signing_key: SigningKey,
}

impl IntentSigner {
    /// Generates a fresh key from the operating system RNG.
    pub fn random() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::rngs::OsRng),
        }
    }

    /// Loads a key from 32 hex-encoded bytes (with or without `0x`).
    pub fn from_hex(private_key: &str) -> anyhow::Result<Self> {
        let stripped = private_key.strip_prefix("0x").unwrap_or(private_key);
        let bytes = hex::decode(stripped).map_err(|e| anyhow::anyhow!("Invalid private key hex: {}", e))?;
        if bytes.len() != 32 {
            return Err(anyhow::anyhow!(
                "Invalid private key length: expected 32 bytes, got {}",
                bytes.len()
            ));
        }
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| anyhow::anyhow!("Invalid secp256k1 private key: {}", e))?;
        Ok(Self { signing_key })
    }

    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }

    pub fn address(&self) -> Address {
        ethereum_address(self.signing_key.verifying_key())
    }

    /// Signs a precomputed 32-byte digest, returning a low-s `r || s || v`
    /// signature with `v` in Ethereum form (27/28).
    pub fn sign_prehash(&self, prehash: &B256) -> Result<Signature> {
        let signature: EcdsaSignature = self
            .signing_key
            .sign_prehash(prehash.as_bytes())
            .map_err(|e| MarketError::InvalidSignature(e.to_string()))?;
        let signature = signature.normalize_s().unwrap_or(signature);

        // Find the recovery id that yields our own public key
        let own_key = self.signing_key.verifying_key();
        let mut recovery = None;
        for candidate in 0u8..=1 {
            let Some(id) = RecoveryId::from_byte(candidate) else {
                continue;
            };
            if let Ok(recovered) = VerifyingKey::recover_from_prehash(prehash.as_bytes(), &signature, id) {
                if &recovered == own_key {
                    recovery = Some(candidate);
                    break;
                }
            }
        }
        let recovery = recovery.ok_or_else(|| {
            MarketError::InvalidSignature("no recovery id matches signing key".to_string())
        })?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery + 27;
        Ok(Signature(bytes))
    }
}
