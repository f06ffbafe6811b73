//! Integration tests for resolving accepted request intents
//!
//! These tests cover the resolution state machine: who may resolve and when,
//! how the verification outcome routes the escrow, and that every path
//! conserves the escrowed amounts.

use intent_market::events::{MarketEvent, ResolutionOutcome};
use intent_market::intent::{IntentKind, ProofRequest};
use intent_market::storage::RecordState;
use intent_market::types::{Address, Asset, IntentId, B256, U256};
use intent_market::verification::DescriptorLayout;
use intent_market::MarketError;

#[path = "mod.rs"]
mod test_helpers;
use test_helpers::{
    amount, request_details, request_submission, reward_asset, submitted_half, MarketFixture,
    ERROR_SELECTOR, INITIAL_BALANCE, INPUTS, MINIMUM_STAKE, PANIC_SELECTOR, PROVING_TIME, T0,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Accepts `request` as the provider at `T0 + 10`, returning its id.
///
/// At that time the auction prices the reward at 10.
fn accept_at_t10(fixture: &MarketFixture, request: &ProofRequest) -> IntentId {
    let signature = fixture.sign(request, &fixture.requester);
    fixture.set_time(T0 + 10);
    fixture
        .sequencer
        .requests()
        .accept(fixture.provider.address(), request, &signature, amount(MINIMUM_STAKE))
        .expect("accept should succeed")
        .intent_id
}

fn deadline() -> u64 {
    T0 + 10 + PROVING_TIME as u64
}

/// Sum of the requester's, provider's and market's balances of `asset`.
fn tracked_total(fixture: &MarketFixture, asset: Asset) -> U256 {
    fixture.balance(asset, fixture.requester.address())
        + fixture.balance(asset, fixture.provider.address())
        + fixture.balance(asset, fixture.request_market())
}

fn assert_escrow_empty(fixture: &MarketFixture) {
    assert!(fixture.balance(reward_asset(), fixture.request_market()).is_zero());
    assert!(fixture.balance(Asset::Native, fixture.request_market()).is_zero());
}

/// Asserts the provider was paid the reward of 10 and got the stake back.
fn assert_provider_paid(fixture: &MarketFixture) {
    assert_eq!(
        fixture.balance(reward_asset(), fixture.provider.address()),
        amount(10)
    );
    assert_eq!(
        fixture.balance(Asset::Native, fixture.provider.address()),
        amount(INITIAL_BALANCE)
    );
    assert_eq!(
        fixture.balance(reward_asset(), fixture.requester.address()),
        amount(INITIAL_BALANCE - 10)
    );
    assert_escrow_empty(fixture);
}

/// Asserts the requester got the reward of 10 back plus the provider's stake.
fn assert_provider_slashed(fixture: &MarketFixture) {
    assert_eq!(
        fixture.balance(reward_asset(), fixture.requester.address()),
        amount(INITIAL_BALANCE)
    );
    assert_eq!(
        fixture.balance(Asset::Native, fixture.requester.address()),
        amount(INITIAL_BALANCE + MINIMUM_STAKE)
    );
    assert_eq!(
        fixture.balance(Asset::Native, fixture.provider.address()),
        amount(INITIAL_BALANCE - MINIMUM_STAKE)
    );
    assert!(fixture
        .balance(reward_asset(), fixture.provider.address())
        .is_zero());
    assert_escrow_empty(fixture);
}

/// A request whose descriptor points at `selector`.
fn request_with_selector(fixture: &MarketFixture, selector: [u8; 4]) -> ProofRequest {
    let mut request = fixture.request(0);
    request.extra_data =
        request_details(selector).encode(DescriptorLayout::WithPartialCommitment);
    request
}

// ============================================================================
// PAY AND SLASH SCENARIOS
// ============================================================================

/// Test that the provider is paid for a valid proof submitted in time
/// Why: Accept at T+10 with 86400s to prove, resolve at T+109 with a valid proof
#[test]
fn test_valid_proof_in_time_pays_provider() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(T0 + 109);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            Some(submitted_half()),
        )
        .expect("resolve should succeed");

    assert!(paid);
    assert_provider_paid(&fixture);

    let record = fixture
        .sequencer
        .requests()
        .active_record(&intent_id)
        .unwrap()
        .unwrap();
    assert_eq!(record.state, RecordState::Paid);
    assert_eq!(record.resolver, Some(fixture.provider.address()));
    assert_eq!(record.resolved_at, Some(T0 + 109));
    assert!(fixture
        .sequencer
        .requests()
        .escrowed(&intent_id)
        .unwrap()
        .is_empty());
}

/// Test that anyone can slash the provider once the deadline has passed
/// Why: Liveness fallback; funds never stay stuck when the provider disappears
#[test]
fn test_third_party_after_deadline_slashes_provider() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);

    let bystander = Address::repeat_byte(0x77);
    fixture.set_time(T0 + 90_000);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(bystander, &intent_id, &[], None)
        .expect("fallback resolve should succeed");

    assert!(!paid);
    assert_provider_slashed(&fixture);
    assert_eq!(
        fixture.sequencer.requests().record_state(&intent_id).unwrap(),
        Some(RecordState::Slashed)
    );
}

/// Test that a valid proof submitted after the deadline still slashes
/// Why: After the deadline the submission is ignored
#[test]
fn test_valid_proof_after_deadline_slashes_provider() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(deadline() + 1);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            Some(submitted_half()),
        )
        .unwrap();

    assert!(!paid);
    assert_provider_slashed(&fixture);
}

/// Test that the deadline itself is still within the proving window
/// Why: The deadline is inclusive for the provider
#[test]
fn test_resolve_exactly_at_deadline_pays_provider() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(deadline());
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            Some(submitted_half()),
        )
        .unwrap();

    assert!(paid);
    assert_provider_paid(&fixture);
}

/// Test that a proof the verifier rejects slashes the provider
/// Why: An invalid submission is treated exactly like a missed deadline
#[test]
fn test_rejected_proof_slashes_provider() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(T0 + 109);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, false),
            Some(submitted_half()),
        )
        .unwrap();

    assert!(!paid);
    assert_provider_slashed(&fixture);
}

// ============================================================================
// DEADLINE GATING TESTS
// ============================================================================

/// Test that only the provider may resolve before the deadline
/// Why: Others must not be able to force a slash while the provider is still proving
#[test]
fn test_non_provider_cannot_resolve_before_deadline() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);
    let market = fixture.sequencer.requests();

    fixture.set_time(T0 + 109);
    for caller in [fixture.requester.address(), Address::repeat_byte(0x77)] {
        let err = market
            .resolve(
                caller,
                &intent_id,
                &request_submission(&INPUTS, true),
                Some(submitted_half()),
            )
            .unwrap_err();
        assert_eq!(
            err,
            MarketError::InvalidResolver {
                resolver: caller,
                expected: fixture.provider.address(),
            }
        );
    }

    // The same holds at the last in-time second
    fixture.set_time(deadline());
    let err = market
        .resolve(fixture.requester.address(), &intent_id, &[], None)
        .unwrap_err();
    assert!(matches!(err, MarketError::InvalidResolver { .. }));

    assert_eq!(market.record_state(&intent_id).unwrap(), Some(RecordState::Active));
    assert_eq!(fixture.balance(reward_asset(), fixture.request_market()), amount(10));
}

/// Test that a resolved record cannot be resolved again
/// Why: Exactly one of pay or slash may ever fire per intent
#[test]
fn test_second_resolve_fails_with_no_active_record() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);
    let market = fixture.sequencer.requests();

    fixture.set_time(T0 + 109);
    assert!(market
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            Some(submitted_half()),
        )
        .unwrap());

    fixture.set_time(T0 + 90_000);
    let err = market
        .resolve(Address::repeat_byte(0x77), &intent_id, &[], None)
        .unwrap_err();
    assert_eq!(err, MarketError::NoActiveRecord);
    assert_provider_paid(&fixture);
}

/// Test that resolving an unknown intent id fails
/// Why: There is nothing to pay out
#[test]
fn test_resolve_unknown_intent_fails() {
    let fixture = MarketFixture::new();
    let err = fixture
        .sequencer
        .requests()
        .resolve(fixture.provider.address(), &B256::repeat_byte(0x42), &[], None)
        .unwrap_err();
    assert_eq!(err, MarketError::NoActiveRecord);
}

// ============================================================================
// COMMITMENT TESTS
// ============================================================================

/// Test that a proof over other inputs slashes even if the verifier accepts it
/// Why: The inputs commitment binds the proof to the requested computation
#[test]
fn test_mismatched_inputs_slash_provider() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(T0 + 109);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&[8u8; 32], true),
            Some(submitted_half()),
        )
        .unwrap();

    assert!(!paid);
    assert_provider_slashed(&fixture);
}

/// Test that a wrong partial commitment half slashes the provider
/// Why: The final result must compose the predetermined and submitted halves
#[test]
fn test_wrong_partial_commitment_slashes_provider() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(T0 + 109);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            Some(B256::repeat_byte(0x01)),
        )
        .unwrap();

    assert!(!paid);
    assert_provider_slashed(&fixture);
}

/// Test that omitting the partial commitment counts as the zero word
/// Why: A missing half must not skip the composition check
#[test]
fn test_missing_partial_commitment_slashes_provider() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(T0 + 109);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            None,
        )
        .unwrap();

    assert!(!paid);
    assert_provider_slashed(&fixture);
}

/// Test that a submission too short for the declared fields is an error
/// Why: Out-of-bounds fields are malformed input, not a verification outcome,
/// and leave the record active for a corrected submission
#[test]
fn test_out_of_bounds_fields_keep_record_active() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);
    let market = fixture.sequencer.requests();
    fixture.set_time(T0 + 109);

    // Inputs field does not fit
    let err = market
        .resolve(fixture.provider.address(), &intent_id, &INPUTS[..16], None)
        .unwrap_err();
    assert_eq!(err, MarketError::InvalidCommitmentField);

    // Inputs fit, the partial result field does not
    let err = market
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &INPUTS,
            Some(submitted_half()),
        )
        .unwrap_err();
    assert_eq!(err, MarketError::InvalidExpectedPartialCommitmentResultField);

    assert_eq!(market.record_state(&intent_id).unwrap(), Some(RecordState::Active));
    assert_eq!(fixture.sequencer.events().len(), 1);

    // A well-formed retry still succeeds
    assert!(market
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            Some(submitted_half()),
        )
        .unwrap());
    assert_provider_paid(&fixture);
}

// ============================================================================
// UNTRUSTED VERIFIER TESTS
// ============================================================================

/// Test that a panicking verifier slashes instead of crashing the market
/// Why: Verification routines are untrusted code
#[test]
fn test_panicking_verifier_slashes_provider() {
    let fixture = MarketFixture::new();
    let request = request_with_selector(&fixture, PANIC_SELECTOR);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(T0 + 109);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            Some(submitted_half()),
        )
        .unwrap();

    assert!(!paid);
    assert_provider_slashed(&fixture);
}

/// Test that a verifier returning an error slashes the provider
/// Why: Errors from the routine are a failed verification
#[test]
fn test_failing_verifier_slashes_provider() {
    let fixture = MarketFixture::new();
    let request = request_with_selector(&fixture, ERROR_SELECTOR);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(T0 + 109);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            Some(submitted_half()),
        )
        .unwrap();

    assert!(!paid);
    assert_provider_slashed(&fixture);
}

/// Test that a descriptor naming an unregistered verifier slashes the provider
/// Why: A proof nobody can check cannot be paid
#[test]
fn test_unregistered_verifier_slashes_provider() {
    let fixture = MarketFixture::new();
    let request = request_with_selector(&fixture, [0xff; 4]);
    let intent_id = accept_at_t10(&fixture, &request);

    fixture.set_time(T0 + 109);
    let paid = fixture
        .sequencer
        .requests()
        .resolve(
            fixture.provider.address(),
            &intent_id,
            &request_submission(&INPUTS, true),
            Some(submitted_half()),
        )
        .unwrap();

    assert!(!paid);
    assert_provider_slashed(&fixture);
}

// ============================================================================
// CONSERVATION AND EVENTS
// ============================================================================

/// Test that funds are conserved across several intents and outcomes
/// Why: Escrow in equals payouts out, whatever branch fires
#[test]
fn test_escrow_is_conserved_across_outcomes() {
    let fixture = MarketFixture::new();
    let market = fixture.sequencer.requests();
    let token_total = tracked_total(&fixture, reward_asset());
    let native_total = tracked_total(&fixture, Asset::Native);

    let requests: Vec<ProofRequest> = (0..3).map(|nonce| fixture.request(nonce)).collect();
    let ids: Vec<IntentId> = requests
        .iter()
        .map(|request| accept_at_t10(&fixture, request))
        .collect();
    assert_eq!(market.active_count().unwrap(), 3);
    assert_eq!(fixture.balance(reward_asset(), fixture.request_market()), amount(30));
    assert_eq!(tracked_total(&fixture, reward_asset()), token_total);

    fixture.set_time(T0 + 500);
    assert!(market
        .resolve(
            fixture.provider.address(),
            &ids[0],
            &request_submission(&INPUTS, true),
            Some(submitted_half()),
        )
        .unwrap());
    assert!(!market
        .resolve(
            fixture.provider.address(),
            &ids[1],
            &request_submission(&INPUTS, false),
            Some(submitted_half()),
        )
        .unwrap());
    fixture.set_time(deadline() + 1);
    assert!(!market
        .resolve(fixture.requester.address(), &ids[2], b"garbage", None)
        .unwrap());

    assert_eq!(market.active_count().unwrap(), 0);
    assert_escrow_empty(&fixture);
    assert_eq!(tracked_total(&fixture, reward_asset()), token_total);
    assert_eq!(tracked_total(&fixture, Asset::Native), native_total);
    // One pay, two slashes
    assert_eq!(
        fixture.balance(reward_asset(), fixture.provider.address()),
        amount(10)
    );
    assert_eq!(
        fixture.balance(Asset::Native, fixture.requester.address()),
        amount(INITIAL_BALANCE + 2 * MINIMUM_STAKE)
    );
}

/// Test that resolution emits a Resolved event naming the resolver
/// Why: Indexers learn the outcome and who triggered it from events only
#[test]
fn test_resolve_emits_resolved_event() {
    let fixture = MarketFixture::new();
    let request = fixture.request(0);
    let intent_id = accept_at_t10(&fixture, &request);

    let bystander = Address::repeat_byte(0x77);
    fixture.set_time(T0 + 90_000);
    fixture
        .sequencer
        .requests()
        .resolve(bystander, &intent_id, &[], None)
        .unwrap();

    let events: Vec<MarketEvent> = fixture
        .sequencer
        .events()
        .into_iter()
        .filter(|event| event.intent_id() == intent_id)
        .collect();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], MarketEvent::Accepted { .. }));
    assert_eq!(
        events[1],
        MarketEvent::Resolved {
            market: fixture.request_market(),
            kind: IntentKind::Request,
            signer: fixture.requester.address(),
            intent_id,
            resolver: bystander,
            outcome: ResolutionOutcome::ProviderSlashed,
        }
    );
}
