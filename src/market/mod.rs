//! Market Engine Module
//!
//! The settlement state machine shared by the request market (Bombetta) and
//! the offer market (Porchetta):
//!
//! ```text
//! signed intent --accept--> Active --resolve--> Paid     (verified in time)
//!                                   \--------> Slashed  (invalid, or deadline passed)
//! ```
//!
//! `accept` authenticates the intent's permit signature, prices the reward,
//! pulls reward and stake into escrow (held by the market address) and
//! writes the active record, all in one unit. `resolve` checks who may
//! resolve, runs verification, and releases the whole escrow to the winner.
//!
//! Verification runs without any lock held, on a snapshot of the record;
//! the payout then commits only if the record is still `Active`, so an
//! untrusted verifier cannot observe or re-enter a half-settled record.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::crypto::{PermitDomain, Signature};
use crate::error::{MarketError, Result};
use crate::events::{EventSink, MarketEvent, ResolutionOutcome};
use crate::intent::{check_auction_open, MarketIntent, ProofOffer, ProofRequest};
use crate::ledger::{AssetLedger, TransferBatch};
use crate::storage::{ActiveRecord, RecordState, RecordStore};
use crate::types::{Address, Holding, IntentId, B256, U256};
use crate::verification::{verify_submission, VerifierRegistry};

/// Request market: requesters sign, providers accept.
pub type RequestMarket = Market<ProofRequest>;

/// Offer market: providers sign, requesters accept.
pub type OfferMarket = Market<ProofOffer>;

/// Result of a successful accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptReceipt {
    pub intent_id: IntentId,
    /// Reward locked in escrow
    pub reward: U256,
    /// Last timestamp at which the provider may resolve
    pub deadline: u64,
}

/// Escrow engine for one kind of intent.
pub struct Market<I: MarketIntent> {
    address: Address,
    domain: PermitDomain,
    ledger: Arc<AssetLedger>,
    verifiers: Arc<VerifierRegistry>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    records: RecordStore,
    _intent: PhantomData<fn() -> I>,
}

impl<I: MarketIntent> Market<I> {
    pub fn new(
        address: Address,
        domain: PermitDomain,
        ledger: Arc<AssetLedger>,
        verifiers: Arc<VerifierRegistry>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            address,
            domain,
            ledger,
            verifiers,
            events,
            clock,
            records: RecordStore::new(),
            _intent: PhantomData,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn domain(&self) -> &PermitDomain {
        &self.domain
    }

    pub fn verifiers(&self) -> &VerifierRegistry {
        &self.verifiers
    }

    // ========================================================================
    // ACCEPT
    // ========================================================================

    /// Accepts (bids on) a signed intent on behalf of `caller`.
    ///
    /// `caller_stake` is the native collateral the caller puts up; request
    /// intents require at least their `minimum_stake`, offer intents require
    /// zero. On any error nothing moves and no record is written.
    pub fn accept(
        &self,
        caller: Address,
        intent: &I,
        signature: &Signature,
        caller_stake: U256,
    ) -> Result<AcceptReceipt> {
        self.try_accept(caller, intent, signature, caller_stake)
            .map_err(|e| {
                warn!(
                    "Rejected {} accept by {:?} for signer {:?}: {}",
                    I::KIND,
                    caller,
                    intent.signer(),
                    e
                );
                e
            })
    }

    fn try_accept(
        &self,
        caller: Address,
        intent: &I,
        signature: &Signature,
        caller_stake: U256,
    ) -> Result<AcceptReceipt> {
        let now = self.clock.now();

        if intent.market() != self.address {
            return Err(MarketError::InvalidIntent(format!(
                "intent is bound to market {:?}, not {:?}",
                intent.market(),
                self.address
            )));
        }
        // The market address holds every record's escrow
        if caller == self.address || intent.signer() == self.address {
            return Err(MarketError::InvalidIntent(format!(
                "market address {:?} cannot sign or accept its own intents",
                self.address
            )));
        }
        check_auction_open(
            intent.start_auction_timestamp(),
            intent.end_auction_timestamp(),
            now,
        )?;
        let verifier_details = intent.verifier_details()?;
        let terms = intent.accept_terms(caller, now, caller_stake)?;

        // Permit: the signature must authorize exactly this intent
        let digest = intent.permit_digest(&self.domain);
        let recovered = signature.recover(&digest)?;
        if recovered != intent.signer() {
            return Err(MarketError::InvalidSignature(format!(
                "signature recovers to {:?}, intent signer is {:?}",
                recovered,
                intent.signer()
            )));
        }
        let permit_deadline = intent.end_auction_timestamp();
        if now > permit_deadline {
            return Err(MarketError::PermitExpired {
                deadline: permit_deadline,
                now,
            });
        }
        let permitted = intent.permitted();
        if terms.from_signer.asset.address() != permitted.token
            || terms.from_signer.amount > permitted.amount
        {
            return Err(MarketError::InvalidIntent(format!(
                "transfer of {} {} exceeds the permitted {} of {:?}",
                terms.from_signer.amount, terms.from_signer.asset, permitted.amount, permitted.token
            )));
        }

        let intent_id = intent.compute_id(signature);
        let deadline = now
            .checked_add(intent.proving_time() as u64)
            .ok_or(MarketError::Overflow("resolution deadline"))?;

        let batch = TransferBatch::new()
            .consume_nonce(intent.signer(), intent.nonce())
            .transfer(
                terms.from_signer.asset,
                intent.signer(),
                self.address,
                terms.from_signer.amount,
            )
            .transfer(
                terms.from_caller.asset,
                caller,
                self.address,
                terms.from_caller.amount,
            );

        let record = self.records.insert_new(intent_id, || {
            self.ledger.apply(&batch)?;
            Ok(ActiveRecord {
                intent_id,
                kind: I::KIND,
                signer: intent.signer(),
                acceptor: caller,
                requester: terms.requester,
                provider: terms.provider,
                reward: terms.reward,
                stake: terms.stake,
                accepted_at: now,
                deadline,
                inputs_commitment: intent.inputs_commitment(),
                verifier_details,
                state: RecordState::Active,
                resolver: None,
                resolved_at: None,
            })
        })?;

        info!(
            "Accepted {} {:?}: acceptor {:?}, reward {} {}, stake {} {}, deadline {}",
            I::KIND,
            intent_id,
            caller,
            record.reward.amount,
            record.reward.asset,
            record.stake.amount,
            record.stake.asset,
            deadline
        );
        self.events.emit(MarketEvent::Accepted {
            market: self.address,
            kind: I::KIND,
            signer: record.signer,
            intent_id,
            acceptor: caller,
            reward_asset: record.reward.asset,
            reward_amount: record.reward.amount,
            stake_asset: record.stake.asset,
            stake_amount: record.stake.amount,
            deadline,
        });

        Ok(AcceptReceipt {
            intent_id,
            reward: record.reward.amount,
            deadline,
        })
    }

    // ========================================================================
    // RESOLVE
    // ========================================================================

    /// Resolves an active record, returning whether the provider was paid.
    ///
    /// Until the deadline only the provider may resolve, and the submission
    /// decides the outcome. After the deadline anyone may resolve, the
    /// submission is ignored and the provider is slashed.
    pub fn resolve(
        &self,
        caller: Address,
        intent_id: &IntentId,
        submission: &[u8],
        partial_commitment: Option<B256>,
    ) -> Result<bool> {
        self.try_resolve(caller, intent_id, submission, partial_commitment)
            .map_err(|e| {
                warn!(
                    "Rejected {} resolve of {:?} by {:?}: {}",
                    I::KIND,
                    intent_id,
                    caller,
                    e
                );
                e
            })
    }

    fn try_resolve(
        &self,
        caller: Address,
        intent_id: &IntentId,
        submission: &[u8],
        partial_commitment: Option<B256>,
    ) -> Result<bool> {
        let now = self.clock.now();

        let snapshot = self
            .records
            .get(intent_id)?
            .filter(|record| record.state == RecordState::Active)
            .ok_or(MarketError::NoActiveRecord)?;

        let within_deadline = now <= snapshot.deadline;
        let verified = if within_deadline {
            if caller != snapshot.provider {
                return Err(MarketError::InvalidResolver {
                    resolver: caller,
                    expected: snapshot.provider,
                });
            }
            verify_submission(
                &self.verifiers,
                snapshot.inputs_commitment,
                &snapshot.verifier_details,
                submission,
                partial_commitment,
            )?
        } else {
            false
        };

        let record = self.records.finalize(intent_id, |record| {
            let (winner, state) = if verified {
                (record.provider, RecordState::Paid)
            } else {
                (record.requester, RecordState::Slashed)
            };
            let batch = TransferBatch::new()
                .transfer(record.reward.asset, self.address, winner, record.reward.amount)
                .transfer(record.stake.asset, self.address, winner, record.stake.amount);
            self.ledger.apply(&batch)?;
            Ok((state, caller, now))
        })?;

        let outcome = if verified {
            ResolutionOutcome::ProviderPaid
        } else {
            ResolutionOutcome::ProviderSlashed
        };
        info!(
            "Resolved {} {:?} by {:?} ({}): {:?}",
            I::KIND,
            intent_id,
            caller,
            if within_deadline { "in time" } else { "after deadline" },
            outcome
        );
        self.events.emit(MarketEvent::Resolved {
            market: self.address,
            kind: I::KIND,
            signer: record.signer,
            intent_id: *intent_id,
            resolver: caller,
            outcome,
        });

        Ok(verified)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn active_record(&self, intent_id: &IntentId) -> Result<Option<ActiveRecord>> {
        self.records.get(intent_id)
    }

    pub fn record_state(&self, intent_id: &IntentId) -> Result<Option<RecordState>> {
        self.records.state_of(intent_id)
    }

    /// Amounts currently held in escrow for `intent_id`: reward then stake
    /// while the record is active, nothing otherwise.
    pub fn escrowed(&self, intent_id: &IntentId) -> Result<Vec<Holding>> {
        Ok(match self.records.get(intent_id)? {
            Some(record) if record.state == RecordState::Active => vec![record.reward, record.stake],
            _ => Vec::new(),
        })
    }

    pub fn active_count(&self) -> Result<usize> {
        self.records.active_count()
    }
}
