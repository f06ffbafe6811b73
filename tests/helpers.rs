//! Shared test helpers for integration tests
//!
//! This module provides fixtures used across the integration tests.
//!
//! The module is organized into several categories:
//! - **Constants**: Timestamps, amounts and verifier targets shared by tests
//! - **Verification Routines**: Controllable `ProofVerifier` implementations
//! - **Descriptors and Submissions**: Builders for well-formed proof data
//! - **Market Fixture**: Both markets over a funded ledger with signed intents

use std::sync::Arc;

use intent_market::config::Config;
use intent_market::crypto::{keccak256, IntentSigner, PermitDomain, Signature};
use intent_market::intent::{MarketIntent, ProofOffer, ProofRequest};
use intent_market::sequencer::Sequencer;
use intent_market::types::{Address, Asset, B256, U256};
use intent_market::verification::{
    DescriptorLayout, ProofVerifier, ProvingSystemId, VerifierDetails, VerifierRegistry,
    VerifierTarget,
};

// ============================================================================
// CONSTANTS
// ============================================================================

// -------------------------------- TIME ----------------------------------

/// Auction start used by every intent built here
pub const T0: u64 = 1_700_000_000;

/// Auction length in seconds
pub const AUCTION_LENGTH: u64 = 1_000;

/// Proving time granted to the provider after acceptance
pub const PROVING_TIME: u32 = 86_400;

// ------------------------------- AMOUNTS --------------------------------

/// Initial balance of every funded account, per asset
pub const INITIAL_BALANCE: u64 = 100_000;

/// Request reward bounds
pub const MIN_REWARD: u64 = 0;
pub const MAX_REWARD: u64 = 1_000;

/// Minimum native stake a provider must post on a request
pub const MINIMUM_STAKE: u64 = 50;

/// Offer price and offer stake
pub const OFFER_REWARD: u64 = 500;
pub const OFFER_STAKE: u64 = 200;

// ------------------------------ VERIFIERS -------------------------------

/// Selector of the routine that follows the submission's verdict byte
pub const VERDICT_SELECTOR: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

/// Selector of a routine that always panics
pub const PANIC_SELECTOR: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Selector of a routine that always returns an error
pub const ERROR_SELECTOR: [u8; 4] = [0x00, 0x00, 0x00, 0x02];

/// The committed proof inputs
pub const INPUTS: [u8; 32] = [7u8; 32];

pub fn verifier_address() -> Address {
    Address::repeat_byte(0x51)
}

pub fn reward_token() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn reward_asset() -> Asset {
    Asset::Token(reward_token())
}

pub fn inputs_commitment() -> B256 {
    keccak256(&INPUTS)
}

/// Half of the partial commitment fixed by the requester
pub fn predetermined_half() -> B256 {
    keccak256(b"predetermined")
}

/// Half of the partial commitment supplied by the resolver
pub fn submitted_half() -> B256 {
    keccak256(b"submitted")
}

pub fn amount(value: u64) -> U256 {
    U256::from(value)
}

// ============================================================================
// VERIFICATION ROUTINES
// ============================================================================

/// Accepts a submission iff its last byte is 1.
pub struct VerdictVerifier;

impl ProofVerifier for VerdictVerifier {
    fn verify(&self, submission: &[u8]) -> anyhow::Result<bool> {
        Ok(submission.last() == Some(&1))
    }
}

pub struct PanickingVerifier;

impl ProofVerifier for PanickingVerifier {
    fn verify(&self, _submission: &[u8]) -> anyhow::Result<bool> {
        panic!("verifier crashed")
    }
}

pub struct FailingVerifier;

impl ProofVerifier for FailingVerifier {
    fn verify(&self, _submission: &[u8]) -> anyhow::Result<bool> {
        Err(anyhow::anyhow!("verifier backend unavailable"))
    }
}

pub fn target(selector: [u8; 4]) -> VerifierTarget {
    VerifierTarget {
        verifier: verifier_address(),
        selector,
    }
}

/// Registry with the verdict, panicking and failing routines.
pub fn build_test_registry() -> VerifierRegistry {
    let mut registry = VerifierRegistry::new();
    registry.register(
        target(VERDICT_SELECTOR),
        ProvingSystemId::Sp1,
        Arc::new(VerdictVerifier),
    );
    registry.register(
        target(PANIC_SELECTOR),
        ProvingSystemId::Risc0,
        Arc::new(PanickingVerifier),
    );
    registry.register(
        target(ERROR_SELECTOR),
        ProvingSystemId::Gnark,
        Arc::new(FailingVerifier),
    );
    registry
}

// ============================================================================
// DESCRIPTORS AND SUBMISSIONS
// ============================================================================

/// Request descriptor: inputs at `0..32`, partial result at `32..64`.
pub fn request_details(selector: [u8; 4]) -> VerifierDetails {
    VerifierDetails {
        verifier: verifier_address(),
        selector,
        is_sha_commitment: false,
        inputs_offset: U256::zero(),
        inputs_length: U256::from(32u64),
        has_partial_commitment_result_check: true,
        submitted_partial_commitment_result_offset: U256::from(32u64),
        submitted_partial_commitment_result_length: U256::from(32u64),
        predetermined_partial_commitment: predetermined_half(),
    }
}

/// Offer descriptor: inputs at `0..32`, no partial commitment.
pub fn offer_details(selector: [u8; 4]) -> VerifierDetails {
    VerifierDetails {
        has_partial_commitment_result_check: false,
        submitted_partial_commitment_result_offset: U256::zero(),
        submitted_partial_commitment_result_length: U256::zero(),
        predetermined_partial_commitment: B256::zero(),
        ..request_details(selector)
    }
}

/// `keccak(predetermined ‖ submitted)`, the expected partial result.
pub fn partial_result() -> B256 {
    let mut preimage = Vec::with_capacity(64);
    preimage.extend_from_slice(predetermined_half().as_bytes());
    preimage.extend_from_slice(submitted_half().as_bytes());
    keccak256(&preimage)
}

/// Request submission: inputs ‖ partial result ‖ verdict byte.
pub fn request_submission(inputs: &[u8; 32], verdict: bool) -> Vec<u8> {
    let mut submission = inputs.to_vec();
    submission.extend_from_slice(partial_result().as_bytes());
    submission.push(verdict as u8);
    submission
}

/// Offer submission: inputs ‖ verdict byte.
pub fn offer_submission(inputs: &[u8; 32], verdict: bool) -> Vec<u8> {
    let mut submission = inputs.to_vec();
    submission.push(verdict as u8);
    submission
}

// ============================================================================
// MARKET FIXTURE
// ============================================================================

/// Both markets over one funded ledger, plus the two trading parties.
///
/// The requester holds reward tokens and native; the provider holds native.
pub struct MarketFixture {
    pub config: Config,
    pub sequencer: Sequencer,
    pub domain: PermitDomain,
    pub requester: IntentSigner,
    pub provider: IntentSigner,
}

impl MarketFixture {
    pub fn new() -> Self {
        let config = Config::default();
        let domain = config.permit_domain();
        let sequencer = Sequencer::new(
            domain,
            config.market.request_market,
            config.market.offer_market,
            build_test_registry(),
            T0,
        );
        let requester = IntentSigner::random();
        let provider = IntentSigner::random();

        let ledger = sequencer.ledger();
        for (owner, asset) in [
            (requester.address(), reward_asset()),
            (requester.address(), Asset::Native),
            (provider.address(), Asset::Native),
        ] {
            ledger
                .deposit(owner, asset, amount(INITIAL_BALANCE))
                .expect("deposit should succeed");
        }

        Self {
            config,
            sequencer,
            domain,
            requester,
            provider,
        }
    }

    pub fn request_market(&self) -> Address {
        self.config.market.request_market
    }

    pub fn offer_market(&self) -> Address {
        self.config.market.offer_market
    }

    pub fn set_time(&self, now: u64) {
        self.sequencer.clock().set(now);
    }

    pub fn balance(&self, asset: Asset, owner: Address) -> U256 {
        self.sequencer
            .ledger()
            .balance_of(asset, owner)
            .expect("balance query should succeed")
    }

    /// A request signed-for by the requester, auction `[T0, T0 + 1000]`.
    pub fn request(&self, nonce: u64) -> ProofRequest {
        ProofRequest {
            signer: self.requester.address(),
            market: self.request_market(),
            nonce: U256::from(nonce),
            reward_token: reward_token(),
            max_reward_amount: amount(MAX_REWARD),
            min_reward_amount: amount(MIN_REWARD),
            minimum_stake: MINIMUM_STAKE as u128,
            start_auction_timestamp: T0,
            end_auction_timestamp: T0 + AUCTION_LENGTH,
            proving_time: PROVING_TIME,
            inputs_commitment: inputs_commitment(),
            extra_data: request_details(VERDICT_SELECTOR)
                .encode(DescriptorLayout::WithPartialCommitment),
        }
    }

    /// An offer by the provider: 500 reward tokens for a 200 native stake.
    pub fn offer(&self, nonce: u64) -> ProofOffer {
        ProofOffer {
            signer: self.provider.address(),
            market: self.offer_market(),
            nonce: U256::from(nonce),
            reward_token: reward_token(),
            reward_amount: amount(OFFER_REWARD),
            stake_token: Address::zero(),
            stake_amount: amount(OFFER_STAKE),
            start_auction_timestamp: T0,
            end_auction_timestamp: T0 + AUCTION_LENGTH,
            proving_time: PROVING_TIME,
            inputs_commitment: inputs_commitment(),
            extra_data: offer_details(VERDICT_SELECTOR).encode(DescriptorLayout::InputsOnly),
        }
    }

    pub fn sign<I: MarketIntent>(&self, intent: &I, signer: &IntentSigner) -> Signature {
        intent
            .sign(signer, &self.domain)
            .expect("signing should succeed")
    }
}
