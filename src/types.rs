//! Primitive Types Module
//!
//! Ethereum-style primitives shared by every other module: 20-byte addresses,
//! 32-byte words and 256-bit amounts, plus the asset identifiers the ledger
//! keys balances by.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use ethereum_types::{H160 as Address, H256 as B256, U256, U512};

/// Deterministic identifier of an accepted intent.
pub type IntentId = B256;

// ============================================================================
// ASSETS
// ============================================================================

/// An asset the ledger can hold.
///
/// `Native` is the settlement ledger's own currency (request stakes are posted
/// in it); `Token` is a fungible token identified by its contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Native,
    Token(Address),
}

impl Asset {
    /// The address used for this asset in events and hashed fields.
    /// Native maps to the zero address.
    pub fn address(&self) -> Address {
        match self {
            Asset::Native => Address::zero(),
            Asset::Token(addr) => *addr,
        }
    }

    /// Inverse of [`Asset::address`].
    pub fn from_address(addr: Address) -> Self {
        if addr.is_zero() {
            Asset::Native
        } else {
            Asset::Token(addr)
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token(addr) => write!(f, "token {:?}", addr),
        }
    }
}

/// An amount of a specific asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub asset: Asset,
    pub amount: U256,
}

impl Holding {
    pub fn new(asset: Asset, amount: U256) -> Self {
        Self { asset, amount }
    }
}

// ============================================================================
// HEX HELPERS
// ============================================================================

/// Serde adapter encoding `Vec<u8>` as a `0x`-prefixed hex string.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        let stripped = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(stripped).map_err(serde::de::Error::custom)
    }
}
