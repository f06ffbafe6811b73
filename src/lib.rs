//! Intent Market Settlement Library
//!
//! This crate implements the settlement engine behind the Bombetta (request)
//! and Porchetta (offer) compute markets. A signer commits to a
//! computation-for-payment deal off-core; a counterparty accepts it by
//! escrowing assets; the engine later pays the provider or slashes them
//! depending on whether a submitted proof verifies before the deadline.
//!
//! ## Components
//!
//! - [`intent`]: signed request/offer records, witness hashing, intent ids
//! - [`crypto`]: keccak/sha256, secp256k1 signatures, permit-with-witness digests
//! - [`auction`]: the reward pricing function
//! - [`ledger`]: asset balances and atomic transfer batches
//! - [`storage`]: the active record table (one bid per intent)
//! - [`verification`]: verifier descriptors, submission envelopes, verifier registry
//! - [`market`]: the `accept` / `resolve` state machine
//! - [`events`]: notifications emitted on state transitions

pub mod abi;
pub mod auction;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod intent;
pub mod ledger;
pub mod market;
pub mod sequencer;
pub mod storage;
pub mod types;
pub mod validation;
pub mod verification;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use crypto::{IntentSigner, Signature};
pub use error::{MarketError, Result};
pub use events::{EventLog, EventSink, MarketEvent};
pub use intent::{IntentKind, MarketIntent, ProofOffer, ProofRequest};
pub use ledger::AssetLedger;
pub use market::{AcceptReceipt, Market, OfferMarket, RequestMarket};
pub use storage::{ActiveRecord, RecordState};
pub use types::{Address, Asset, Holding, IntentId, B256, U256};
pub use verification::{ProofVerifier, ProvingSystemId, VerifierDetails, VerifierRegistry};
