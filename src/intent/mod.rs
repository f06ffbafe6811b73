//! Intent Module
//!
//! Signed intents are the unit of trade. A request intent is signed by the
//! party that wants work done and is priced by an ascending auction; an offer
//! intent is signed by the party that will do the work and names a fixed
//! price. Both carry the same time window and verification commitment, and
//! both bind their fields into a permit-with-witness signature.

pub mod offer;
pub mod request;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

use crate::abi::Encoder;
use crate::crypto::{keccak256, IntentSigner, PermitDomain, Signature, TokenPermissions};
use crate::error::{MarketError, Result};
use crate::types::{Address, Holding, IntentId, B256, U256};
use crate::verification::{DescriptorLayout, VerifierDetails};

pub use offer::ProofOffer;
pub use request::ProofRequest;

// ============================================================================
// INTENT KINDS
// ============================================================================

/// Which side of the market signed the intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Signed by the requester, accepted by a provider (Bombetta).
    Request,
    /// Signed by the provider, accepted by a requester (Porchetta).
    Offer,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentKind::Request => write!(f, "request"),
            IntentKind::Offer => write!(f, "offer"),
        }
    }
}

/// The escrow an accepted intent creates: who plays which role, what is
/// locked, and where each locked amount comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptTerms {
    pub requester: Address,
    pub provider: Address,
    pub reward: Holding,
    pub stake: Holding,
    /// Pulled from the signer under the signed permit.
    pub from_signer: Holding,
    /// Pulled from the accepting caller.
    pub from_caller: Holding,
}

// ============================================================================
// INTENT TRAIT
// ============================================================================

/// Behaviour shared by request and offer intents.
///
/// Implementors describe their own fields and economics; hashing, permit
/// digests, ids and descriptor decoding are derived from that description.
pub trait MarketIntent:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: IntentKind;
    /// EIP-712 type string of the intent struct.
    const WITNESS_TYPE_STRING: &'static str;
    /// Completion of the permit type string naming this intent as witness.
    const PERMIT_WITNESS_TYPE_STUB: &'static str;
    const DESCRIPTOR_LAYOUT: DescriptorLayout;

    fn signer(&self) -> Address;
    fn market(&self) -> Address;
    fn nonce(&self) -> U256;
    fn start_auction_timestamp(&self) -> u64;
    fn end_auction_timestamp(&self) -> u64;
    fn proving_time(&self) -> u32;
    fn inputs_commitment(&self) -> B256;
    fn extra_data(&self) -> &[u8];

    /// Appends every field, in declaration order, with `extra_data` hashed.
    fn encode_fields(&self, enc: Encoder) -> Encoder;

    /// What the signer's permit authorizes the market to pull.
    fn permitted(&self) -> TokenPermissions;

    /// Works out the escrow created when `caller` accepts at `now`,
    /// supplying `caller_stake` of the native asset.
    fn accept_terms(&self, caller: Address, now: u64, caller_stake: U256) -> Result<AcceptTerms>;

    /// Hash of the intent's fields under its type hash.
    fn witness(&self) -> B256 {
        let type_hash = keccak256(Self::WITNESS_TYPE_STRING.as_bytes());
        keccak256(&self.encode_fields(Encoder::new().word(type_hash)).finish())
    }

    /// The digest the signer signs: a permit transfer bound to this intent.
    ///
    /// The market is the spender and the permit expires at the end of the
    /// auction.
    fn permit_digest(&self, domain: &PermitDomain) -> B256 {
        domain.witness_digest(
            Self::PERMIT_WITNESS_TYPE_STUB,
            &self.permitted(),
            self.market(),
            self.nonce(),
            self.end_auction_timestamp(),
            self.witness(),
        )
    }

    /// Deterministic id over all fields plus the signature.
    fn compute_id(&self, signature: &Signature) -> IntentId {
        let signature_hash = keccak256(signature.as_bytes());
        keccak256(&self.encode_fields(Encoder::new()).word(signature_hash).finish())
    }

    fn verifier_details(&self) -> Result<VerifierDetails> {
        VerifierDetails::decode(self.extra_data(), Self::DESCRIPTOR_LAYOUT)
            .map_err(MarketError::InvalidVerifierDetails)
    }

    fn sign(&self, signer: &IntentSigner, domain: &PermitDomain) -> Result<Signature> {
        signer.sign_prehash(&self.permit_digest(domain))
    }
}

/// Checks that `now` lies in the auction window `[start, end]`.
pub(crate) fn check_auction_open(start: u64, end: u64, now: u64) -> Result<()> {
    if now < start {
        return Err(MarketError::InvalidIntent(format!(
            "auction opens at {}, now {}",
            start, now
        )));
    }
    if now > end {
        return Err(MarketError::InvalidIntent(format!(
            "auction closed at {}, now {}",
            end, now
        )));
    }
    Ok(())
}
