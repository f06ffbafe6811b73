//! Market Events Module
//!
//! Notifications emitted on state transitions. They are the only channel
//! through which indexers and gossip servers observe the markets.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::intent::IntentKind;
use crate::types::{Address, Asset, IntentId, U256};

/// Terminal outcome of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// Escrow paid to the provider
    ProviderPaid,
    /// Escrow paid to the requester
    ProviderSlashed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MarketEvent {
    Accepted {
        market: Address,
        kind: IntentKind,
        signer: Address,
        intent_id: IntentId,
        acceptor: Address,
        reward_asset: Asset,
        reward_amount: U256,
        stake_asset: Asset,
        stake_amount: U256,
        deadline: u64,
    },
    Resolved {
        market: Address,
        kind: IntentKind,
        signer: Address,
        intent_id: IntentId,
        resolver: Address,
        outcome: ResolutionOutcome,
    },
}

impl MarketEvent {
    pub fn intent_id(&self) -> IntentId {
        match self {
            MarketEvent::Accepted { intent_id, .. } | MarketEvent::Resolved { intent_id, .. } => {
                *intent_id
            }
        }
    }
}

/// Receiver of market events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MarketEvent);
}

/// Keeps every emitted event in memory, in emission order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<MarketEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events emitted so far.
    pub fn events(&self) -> Vec<MarketEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: MarketEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event);
    }
}
