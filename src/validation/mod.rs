//! Intent Validation Module
//!
//! Pre-acceptance checks a bidder (or a gossip server) runs before spending
//! anything on an intent. These are stricter than the engine's own
//! preconditions: they also reject intents that would be accepted but are
//! not worth bidding on (unsupported proving system, too little proving time,
//! stake above the bidder's risk limit, unexpected verifier).

use serde::{Deserialize, Serialize};

use crate::crypto::{PermitDomain, Signature};
use crate::error::{MarketError, Result};
use crate::intent::{MarketIntent, ProofOffer, ProofRequest};
use crate::types::{Address, B256, U256};
use crate::verification::{ProvingSystemId, VerifierDetails, VerifierRegistry};

// ============================================================================
// CONFIGURATION
// ============================================================================

fn default_minimum_proving_time() -> u32 {
    30
}

fn default_maximum_start_delay() -> u32 {
    300
}

fn default_supported_proving_systems() -> Vec<ProvingSystemId> {
    ProvingSystemId::ALL.to_vec()
}

fn unbounded() -> U256 {
    U256::MAX
}

/// Validation limits, loaded from the `[validation]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum seconds a provider must be given to produce the proof
    #[serde(default = "default_minimum_proving_time")]
    pub minimum_proving_time: u32,
    /// How far ahead of its auction start an intent may be seen
    #[serde(default = "default_maximum_start_delay")]
    pub maximum_start_delay: u32,
    #[serde(default = "default_supported_proving_systems")]
    pub supported_proving_systems: Vec<ProvingSystemId>,
    /// Upper bound on a request's `minimum_stake`
    #[serde(default = "unbounded")]
    pub maximum_allowed_stake: U256,
    /// Upper bound on an offer's `reward_amount`
    #[serde(default = "unbounded")]
    pub maximum_allowed_reward: U256,
    /// Lower bound on an offer's `stake_amount`
    #[serde(default)]
    pub minimum_allowed_stake: U256,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            minimum_proving_time: default_minimum_proving_time(),
            maximum_start_delay: default_maximum_start_delay(),
            supported_proving_systems: default_supported_proving_systems(),
            maximum_allowed_stake: unbounded(),
            maximum_allowed_reward: unbounded(),
            minimum_allowed_stake: U256::zero(),
        }
    }
}

/// Optional pins on descriptor fields; `None` accepts any value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConstraints {
    pub verifier: Option<Address>,
    pub selector: Option<[u8; 4]>,
    pub is_sha_commitment: Option<bool>,
    pub inputs_offset: Option<U256>,
    pub inputs_length: Option<U256>,
    pub has_partial_commitment_result_check: Option<bool>,
    pub submitted_partial_commitment_result_offset: Option<U256>,
    pub submitted_partial_commitment_result_length: Option<U256>,
    pub predetermined_partial_commitment: Option<B256>,
}

/// Everything a validator needs to know about the market it bids into.
pub struct ValidationContext<'a> {
    pub market: Address,
    pub domain: &'a PermitDomain,
    pub registry: &'a VerifierRegistry,
    pub config: &'a ValidationConfig,
    pub constraints: &'a VerifierConstraints,
    pub latest_timestamp: u64,
}

// ============================================================================
// VALIDATORS
// ============================================================================

fn fail<T>(reason: impl Into<String>) -> Result<T> {
    Err(MarketError::Validation(reason.into()))
}

pub fn validate_market_address<I: MarketIntent>(intent: &I, expected: Address) -> Result<()> {
    if intent.market() != expected {
        return fail("invalid market address");
    }
    Ok(())
}

/// The auction must not have ended, must start within `maximum_start_delay`
/// and must leave at least `minimum_proving_time` to prove.
pub fn validate_time_constraints<I: MarketIntent>(
    intent: &I,
    latest_timestamp: u64,
    config: &ValidationConfig,
) -> Result<()> {
    let start = intent.start_auction_timestamp();
    let end = intent.end_auction_timestamp();
    if start >= end {
        return fail("auction window is empty");
    }
    if latest_timestamp < start.saturating_sub(config.maximum_start_delay as u64)
        || latest_timestamp >= end
    {
        return fail("invalid timestamp");
    }
    if intent.proving_time() < config.minimum_proving_time {
        return fail("proving time too low");
    }
    Ok(())
}

pub fn validate_signature<I: MarketIntent>(
    intent: &I,
    signature: &Signature,
    domain: &PermitDomain,
) -> Result<()> {
    let recovered = signature
        .recover(&intent.permit_digest(domain))
        .map_err(|e| MarketError::Validation(format!("invalid signature: {}", e)))?;
    if recovered != intent.signer() {
        return fail("signature does not match intent signer");
    }
    Ok(())
}

/// The descriptor's verifier must be registered and belong to a supported
/// proving system.
pub fn validate_proving_system(
    details: &VerifierDetails,
    registry: &VerifierRegistry,
    supported: &[ProvingSystemId],
) -> Result<ProvingSystemId> {
    let target = details.target();
    let Some(system) = registry.system_of(&target) else {
        return fail(format!("no verifier registered at {}", target));
    };
    if !supported.contains(&system) {
        return fail(format!("unsupported proving system {}", system));
    }
    Ok(system)
}

fn check_pin<T: PartialEq>(pin: &Option<T>, actual: &T, field: &str) -> Result<()> {
    match pin {
        Some(expected) if expected != actual => {
            fail(format!("{} does not match constraints", field))
        }
        _ => Ok(()),
    }
}

pub fn validate_verifier_details(
    details: &VerifierDetails,
    constraints: &VerifierConstraints,
) -> Result<()> {
    check_pin(&constraints.verifier, &details.verifier, "verifier address")?;
    check_pin(&constraints.selector, &details.selector, "verifier selector")?;
    check_pin(&constraints.is_sha_commitment, &details.is_sha_commitment, "isShaCommitment flag")?;
    check_pin(&constraints.inputs_offset, &details.inputs_offset, "inputs offset")?;
    check_pin(&constraints.inputs_length, &details.inputs_length, "inputs length")?;
    check_pin(
        &constraints.has_partial_commitment_result_check,
        &details.has_partial_commitment_result_check,
        "hasPartialCommitmentResultCheck flag",
    )?;
    check_pin(
        &constraints.submitted_partial_commitment_result_offset,
        &details.submitted_partial_commitment_result_offset,
        "submittedPartialCommitmentResultOffset",
    )?;
    check_pin(
        &constraints.submitted_partial_commitment_result_length,
        &details.submitted_partial_commitment_result_length,
        "submittedPartialCommitmentResultLength",
    )?;
    check_pin(
        &constraints.predetermined_partial_commitment,
        &details.predetermined_partial_commitment,
        "predeterminedPartialCommitment",
    )
}

/// Checks shared by both intent kinds. Returns the decoded descriptor.
fn validate_common<I: MarketIntent>(
    intent: &I,
    signature: &Signature,
    ctx: &ValidationContext<'_>,
) -> Result<VerifierDetails> {
    validate_market_address(intent, ctx.market)?;
    validate_time_constraints(intent, ctx.latest_timestamp, ctx.config)?;
    let details = intent
        .verifier_details()
        .map_err(|e| MarketError::Validation(format!("failed to decode verifier details: {}", e)))?;
    validate_proving_system(&details, ctx.registry, &ctx.config.supported_proving_systems)?;
    validate_signature(intent, signature, ctx.domain)?;
    validate_verifier_details(&details, ctx.constraints)?;
    Ok(details)
}

pub fn validate_request(
    request: &ProofRequest,
    signature: &Signature,
    ctx: &ValidationContext<'_>,
) -> Result<()> {
    validate_common(request, signature, ctx)?;
    if request.max_reward_amount < request.min_reward_amount {
        return fail("reward token amounts invalid");
    }
    if U256::from(request.minimum_stake) > ctx.config.maximum_allowed_stake {
        return fail("stake amount invalid");
    }
    Ok(())
}

pub fn validate_offer(
    offer: &ProofOffer,
    signature: &Signature,
    ctx: &ValidationContext<'_>,
) -> Result<()> {
    validate_common(offer, signature, ctx)?;
    if offer.reward_amount > ctx.config.maximum_allowed_reward {
        return fail("reward amount invalid");
    }
    if offer.stake_amount < ctx.config.minimum_allowed_stake {
        return fail("stake amount invalid");
    }
    Ok(())
}
