//! Test module organization
//!
//! This module re-exports test helpers for use in test files.

mod helpers;

#[allow(unused_imports)]
pub use helpers::{
    amount, build_test_registry, inputs_commitment, offer_details, offer_submission,
    partial_result, predetermined_half, request_details, request_submission, reward_asset,
    reward_token, submitted_half, target, verifier_address, MarketFixture, AUCTION_LENGTH,
    ERROR_SELECTOR, INITIAL_BALANCE, INPUTS, MAX_REWARD, MINIMUM_STAKE, MIN_REWARD,
    OFFER_REWARD, OFFER_STAKE, PANIC_SELECTOR, PROVING_TIME, T0, VERDICT_SELECTOR,
};
