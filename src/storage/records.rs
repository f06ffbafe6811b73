//! Active Record Storage Module
//!
//! This module stores one record per accepted intent, keyed by intent id.
//! Records are write-once: the first accept for an id wins, and the only
//! later mutation is the single transition out of `Active` at resolution.
//! Both the insertion and the transition run caller-supplied effects while
//! the table lock is held, so the check and the effects form one unit.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{MarketError, Result};
use crate::intent::IntentKind;
use crate::types::{Address, Holding, IntentId, B256};
use crate::verification::VerifierDetails;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Lifecycle state of an accepted intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Escrow is held, waiting for resolution
    Active,
    /// Proof verified in time: escrow went to the provider
    Paid,
    /// Proof missing, late or invalid: escrow went to the requester
    Slashed,
}

/// Snapshot taken when an intent is accepted.
///
/// Economics and the verification commitment are copied from the intent so
/// that resolution never reads the intent again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRecord {
    pub intent_id: IntentId,
    pub kind: IntentKind,
    /// Address that signed the intent
    pub signer: Address,
    /// Address that accepted the intent
    pub acceptor: Address,
    pub requester: Address,
    pub provider: Address,
    /// Reward locked at acceptance (auction price for requests)
    pub reward: Holding,
    pub stake: Holding,
    pub accepted_at: u64,
    /// Last timestamp at which the provider may resolve
    pub deadline: u64,
    pub inputs_commitment: B256,
    pub verifier_details: VerifierDetails,
    pub state: RecordState,
    /// Caller of the successful resolve, once resolved
    pub resolver: Option<Address>,
    pub resolved_at: Option<u64>,
}

// ============================================================================
// STORAGE IMPLEMENTATION
// ============================================================================

/// In-memory table of active records.
///
/// Uses a HashMap for O(1) lookup by intent id. Thread-safe via Mutex.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Mutex<HashMap<IntentId, ActiveRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<IntentId, ActiveRecord>>> {
        self.records.lock().map_err(|_| MarketError::StatePoisoned)
    }

    /// Get a record by intent id.
    pub fn get(&self, intent_id: &IntentId) -> Result<Option<ActiveRecord>> {
        Ok(self.lock()?.get(intent_id).cloned())
    }

    pub fn state_of(&self, intent_id: &IntentId) -> Result<Option<RecordState>> {
        Ok(self.lock()?.get(intent_id).map(|record| record.state))
    }

    /// Number of records still waiting for resolution.
    pub fn active_count(&self) -> Result<usize> {
        Ok(self
            .lock()?
            .values()
            .filter(|record| record.state == RecordState::Active)
            .count())
    }

    /// Inserts the record built by `create` if `intent_id` is new.
    ///
    /// First come, first served: if the id is already present, in any state,
    /// the call fails with `AuctionEnded` and `create` is never run. If
    /// `create` fails nothing is inserted.
    pub fn insert_new<F>(&self, intent_id: IntentId, create: F) -> Result<ActiveRecord>
    where
        F: FnOnce() -> Result<ActiveRecord>,
    {
        let mut records = self.lock()?;
        if records.contains_key(&intent_id) {
            return Err(MarketError::AuctionEnded);
        }
        let record = create()?;
        records.insert(intent_id, record.clone());
        Ok(record)
    }

    /// Moves an `Active` record to the state returned by `settle`.
    ///
    /// Fails with `NoActiveRecord` for unknown ids and records that were
    /// already resolved. If `settle` fails the record stays `Active`.
    pub fn finalize<F>(&self, intent_id: &IntentId, settle: F) -> Result<ActiveRecord>
    where
        F: FnOnce(&ActiveRecord) -> Result<(RecordState, Address, u64)>,
    {
        let mut records = self.lock()?;
        let record = records
            .get_mut(intent_id)
            .filter(|record| record.state == RecordState::Active)
            .ok_or(MarketError::NoActiveRecord)?;

        let (state, resolver, resolved_at) = settle(record)?;
        record.state = state;
        record.resolver = Some(resolver);
        record.resolved_at = Some(resolved_at);
        Ok(record.clone())
    }
}
