//! Error types

use thiserror::Error;

use crate::abi::AbiError;
use crate::types::{Address, Asset, U256};

/// Every way an `accept`, `resolve` or ledger operation can be rejected.
///
/// All variants describe aborted operations: when one of them is returned no
/// asset has moved and no record has been written. A proof that simply fails
/// to verify is not an error; it is the slash outcome of `resolve`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketError {
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid time window: {0}")]
    InvalidTimeWindow(String),

    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    #[error("Auction ended: intent already has an active bid")]
    AuctionEnded,

    #[error("Invalid resolver {resolver:?}: only {expected:?} may resolve before the deadline")]
    InvalidResolver { resolver: Address, expected: Address },

    #[error("No active record for intent")]
    NoActiveRecord,

    #[error("Inputs field lies outside the submitted proof data")]
    InvalidCommitmentField,

    #[error("Partial commitment result field lies outside the submitted proof data")]
    InvalidExpectedPartialCommitmentResultField,

    #[error("Invalid verifier details: {0}")]
    InvalidVerifierDetails(#[source] AbiError),

    #[error("Permit expired at {deadline}, now {now}")]
    PermitExpired { deadline: u64, now: u64 },

    #[error("Permit nonce {nonce} already used by {owner:?}")]
    NonceAlreadyUsed { owner: Address, nonce: U256 },

    #[error("Insufficient {asset} balance for {owner:?}: have {available}, need {required}")]
    InsufficientBalance {
        asset: Asset,
        owner: Address,
        available: U256,
        required: U256,
    },

    #[error("Escrow account {0:?} cannot be withdrawn from")]
    EscrowAccount(Address),

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Call timestamp {requested} precedes current time {current}")]
    TimestampRegression { current: u64, requested: u64 },

    #[error("Engine state lock poisoned")]
    StatePoisoned,
}

pub type Result<T> = core::result::Result<T, MarketError>;
