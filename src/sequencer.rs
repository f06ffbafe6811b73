//! Call Sequencer Module
//!
//! The markets assume a total order over calls. The sequencer is that
//! order: it owns the clock, applies a list of timestamped calls one after
//! another, and turns every outcome into a serializable receipt. Failed calls
//! produce a `failed` receipt and leave no effects.
//!
//! Deposits and withdrawals move assets across the ledger boundary. The
//! market addresses hold pooled escrow and can never be withdrawn from.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::clock::{Clock, ManualClock};
use crate::config::Config;
use crate::crypto::{PermitDomain, Signature};
use crate::error::{MarketError, Result};
use crate::events::{EventLog, EventSink, MarketEvent};
use crate::intent::{ProofOffer, ProofRequest};
use crate::ledger::AssetLedger;
use crate::market::{OfferMarket, RequestMarket};
use crate::types::{hex_bytes, Address, Asset, IntentId, B256, U256};
use crate::verification::VerifierRegistry;

/// One externally submitted call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    /// Credit an account from outside the ledger.
    Deposit {
        timestamp: u64,
        owner: Address,
        asset: Asset,
        amount: U256,
    },
    /// Debit an account to outside the ledger.
    Withdraw {
        timestamp: u64,
        owner: Address,
        asset: Asset,
        amount: U256,
    },
    AcceptRequest {
        timestamp: u64,
        caller: Address,
        intent: ProofRequest,
        signature: Signature,
        /// Native collateral sent with the bid
        #[serde(default)]
        stake: U256,
    },
    AcceptOffer {
        timestamp: u64,
        caller: Address,
        intent: ProofOffer,
        signature: Signature,
    },
    ResolveRequest {
        timestamp: u64,
        caller: Address,
        intent_id: IntentId,
        #[serde(default, with = "hex_bytes")]
        submission: Vec<u8>,
        #[serde(default)]
        partial_commitment: Option<B256>,
    },
    ResolveOffer {
        timestamp: u64,
        caller: Address,
        intent_id: IntentId,
        #[serde(default, with = "hex_bytes")]
        submission: Vec<u8>,
    },
}

impl Call {
    pub fn timestamp(&self) -> u64 {
        match self {
            Call::Deposit { timestamp, .. }
            | Call::Withdraw { timestamp, .. }
            | Call::AcceptRequest { timestamp, .. }
            | Call::AcceptOffer { timestamp, .. }
            | Call::ResolveRequest { timestamp, .. }
            | Call::ResolveOffer { timestamp, .. } => *timestamp,
        }
    }
}

/// Outcome of one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Receipt {
    Deposited {
        owner: Address,
        asset: Asset,
        balance: U256,
    },
    Withdrawn {
        owner: Address,
        asset: Asset,
        balance: U256,
    },
    Accepted {
        intent_id: IntentId,
        reward: U256,
        deadline: u64,
    },
    Resolved {
        intent_id: IntentId,
        provider_paid: bool,
    },
    Failed {
        error: String,
    },
}

/// Both markets over one ledger and one clock.
pub struct Sequencer {
    clock: Arc<ManualClock>,
    ledger: Arc<AssetLedger>,
    events: Arc<EventLog>,
    requests: RequestMarket,
    offers: OfferMarket,
}

impl Sequencer {
    pub fn new(
        domain: PermitDomain,
        request_market: Address,
        offer_market: Address,
        registry: VerifierRegistry,
        start_time: u64,
    ) -> Self {
        let clock = Arc::new(ManualClock::new(start_time));
        let ledger = Arc::new(AssetLedger::new());
        let events = Arc::new(EventLog::new());
        let registry = Arc::new(registry);

        let sink: Arc<dyn EventSink> = events.clone();
        let time: Arc<dyn Clock> = clock.clone();
        let requests = RequestMarket::new(
            request_market,
            domain,
            ledger.clone(),
            registry.clone(),
            sink.clone(),
            time.clone(),
        );
        let offers = OfferMarket::new(offer_market, domain, ledger.clone(), registry, sink, time);

        Self {
            clock,
            ledger,
            events,
            requests,
            offers,
        }
    }

    /// Builds the markets described by `config` and credits its genesis
    /// balances.
    pub fn from_config(config: &Config, start_time: u64) -> anyhow::Result<Self> {
        let sequencer = Self::new(
            config.permit_domain(),
            config.market.request_market,
            config.market.offer_market,
            config.build_registry()?,
            start_time,
        );
        for balance in &config.genesis {
            sequencer
                .ledger
                .deposit(balance.owner, balance.asset, balance.amount)?;
        }
        info!(
            "Sequencer ready: {} verifiers, {} genesis balances",
            sequencer.requests.verifiers().len(),
            config.genesis.len()
        );
        Ok(sequencer)
    }

    pub fn requests(&self) -> &RequestMarket {
        &self.requests
    }

    pub fn offers(&self) -> &OfferMarket {
        &self.offers
    }

    pub fn ledger(&self) -> &AssetLedger {
        &self.ledger
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn events(&self) -> Vec<MarketEvent> {
        self.events.events()
    }

    /// Applies one call at its timestamp.
    pub fn apply(&self, call: &Call) -> Receipt {
        match self.dispatch(call) {
            Ok(receipt) => receipt,
            Err(e) => Receipt::Failed {
                error: e.to_string(),
            },
        }
    }

    pub fn apply_all(&self, calls: &[Call]) -> Vec<Receipt> {
        calls.iter().map(|call| self.apply(call)).collect()
    }

    fn dispatch(&self, call: &Call) -> Result<Receipt> {
        self.clock.advance_to(call.timestamp())?;

        match call {
            Call::Deposit {
                owner,
                asset,
                amount,
                ..
            } => {
                let balance = self.ledger.deposit(*owner, *asset, *amount)?;
                Ok(Receipt::Deposited {
                    owner: *owner,
                    asset: *asset,
                    balance,
                })
            }
            Call::Withdraw {
                owner,
                asset,
                amount,
                ..
            } => {
                if *owner == self.requests.address() || *owner == self.offers.address() {
                    return Err(MarketError::EscrowAccount(*owner));
                }
                let balance = self.ledger.withdraw(*owner, *asset, *amount)?;
                Ok(Receipt::Withdrawn {
                    owner: *owner,
                    asset: *asset,
                    balance,
                })
            }
            Call::AcceptRequest {
                caller,
                intent,
                signature,
                stake,
                ..
            } => {
                let receipt = self.requests.accept(*caller, intent, signature, *stake)?;
                Ok(Receipt::Accepted {
                    intent_id: receipt.intent_id,
                    reward: receipt.reward,
                    deadline: receipt.deadline,
                })
            }
            Call::AcceptOffer {
                caller,
                intent,
                signature,
                ..
            } => {
                let receipt = self.offers.accept(*caller, intent, signature, U256::zero())?;
                Ok(Receipt::Accepted {
                    intent_id: receipt.intent_id,
                    reward: receipt.reward,
                    deadline: receipt.deadline,
                })
            }
            Call::ResolveRequest {
                caller,
                intent_id,
                submission,
                partial_commitment,
                ..
            } => {
                let provider_paid =
                    self.requests
                        .resolve(*caller, intent_id, submission, *partial_commitment)?;
                Ok(Receipt::Resolved {
                    intent_id: *intent_id,
                    provider_paid,
                })
            }
            Call::ResolveOffer {
                caller,
                intent_id,
                submission,
                ..
            } => {
                let provider_paid = self.offers.resolve(*caller, intent_id, submission, None)?;
                Ok(Receipt::Resolved {
                    intent_id: *intent_id,
                    provider_paid,
                })
            }
        }
    }
}
