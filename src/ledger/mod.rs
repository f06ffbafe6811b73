//! Asset Ledger Module
//!
//! In-memory settlement ledger: balances per `(asset, owner)` and the set of
//! consumed permit nonces. Escrow is modelled as balances held by the market
//! address itself, so every movement into or out of escrow is an ordinary
//! transfer.
//!
//! All mutations of one engine operation go through [`AssetLedger::apply`],
//! which validates the whole batch against a scratch copy before committing,
//! so a batch either moves every amount or none.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::error::{MarketError, Result};
use crate::types::{Address, Asset, U256};

// ============================================================================
// TRANSFERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub asset: Asset,
    pub from: Address,
    pub to: Address,
    pub amount: U256,
}

/// Transfers applied together, optionally consuming a permit nonce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferBatch {
    pub consume_nonce: Option<(Address, U256)>,
    pub transfers: Vec<Transfer>,
}

impl TransferBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consume_nonce(mut self, owner: Address, nonce: U256) -> Self {
        self.consume_nonce = Some((owner, nonce));
        self
    }

    /// Adds a transfer; zero amounts are skipped.
    pub fn transfer(mut self, asset: Asset, from: Address, to: Address, amount: U256) -> Self {
        if !amount.is_zero() {
            self.transfers.push(Transfer {
                asset,
                from,
                to,
                amount,
            });
        }
        self
    }
}

// ============================================================================
// LEDGER
// ============================================================================

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<(Asset, Address), U256>,
    used_nonces: HashSet<(Address, U256)>,
}

impl LedgerState {
    fn balance(&self, asset: Asset, owner: Address) -> U256 {
        self.balances
            .get(&(asset, owner))
            .copied()
            .unwrap_or_default()
    }
}

/// Thread-safe asset ledger shared by the markets.
#[derive(Debug, Default)]
pub struct AssetLedger {
    state: Mutex<LedgerState>,
}

impl AssetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|_| MarketError::StatePoisoned)
    }

    /// Credits `amount` of `asset` to `owner` from outside the ledger.
    pub fn deposit(&self, owner: Address, asset: Asset, amount: U256) -> Result<U256> {
        let mut state = self.lock()?;
        let balance = state
            .balance(asset, owner)
            .checked_add(amount)
            .ok_or(MarketError::Overflow("deposit"))?;
        state.balances.insert((asset, owner), balance);
        debug!("Deposited {} of {} to {:?}", amount, asset, owner);
        Ok(balance)
    }

    /// Debits `amount` of `asset` from `owner` to outside the ledger.
    pub fn withdraw(&self, owner: Address, asset: Asset, amount: U256) -> Result<U256> {
        let mut state = self.lock()?;
        let available = state.balance(asset, owner);
        if available < amount {
            return Err(MarketError::InsufficientBalance {
                asset,
                owner,
                available,
                required: amount,
            });
        }
        let balance = available - amount;
        state.balances.insert((asset, owner), balance);
        debug!("Withdrew {} of {} from {:?}", amount, asset, owner);
        Ok(balance)
    }

    pub fn balance_of(&self, asset: Asset, owner: Address) -> Result<U256> {
        Ok(self.lock()?.balance(asset, owner))
    }

    pub fn is_nonce_used(&self, owner: Address, nonce: U256) -> Result<bool> {
        Ok(self.lock()?.used_nonces.contains(&(owner, nonce)))
    }

    /// Sum of all balances of `asset`.
    pub fn total_supply(&self, asset: Asset) -> Result<U256> {
        let state = self.lock()?;
        state
            .balances
            .iter()
            .filter(|((a, _), _)| *a == asset)
            .try_fold(U256::zero(), |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(MarketError::Overflow("total supply"))
    }

    /// Applies every transfer of `batch` and consumes its nonce, or nothing.
    pub fn apply(&self, batch: &TransferBatch) -> Result<()> {
        let mut state = self.lock()?;

        if let Some((owner, nonce)) = batch.consume_nonce {
            if state.used_nonces.contains(&(owner, nonce)) {
                return Err(MarketError::NonceAlreadyUsed { owner, nonce });
            }
        }

        let mut scratch: HashMap<(Asset, Address), U256> = HashMap::new();
        for t in &batch.transfers {
            let from_key = (t.asset, t.from);
            let available = scratch
                .get(&from_key)
                .copied()
                .unwrap_or_else(|| state.balance(t.asset, t.from));
            if available < t.amount {
                return Err(MarketError::InsufficientBalance {
                    asset: t.asset,
                    owner: t.from,
                    available,
                    required: t.amount,
                });
            }
            scratch.insert(from_key, available - t.amount);

            let to_key = (t.asset, t.to);
            let current = scratch
                .get(&to_key)
                .copied()
                .unwrap_or_else(|| state.balance(t.asset, t.to));
            let credited = current
                .checked_add(t.amount)
                .ok_or(MarketError::Overflow("transfer"))?;
            scratch.insert(to_key, credited);
        }

        state.balances.extend(scratch);
        if let Some(key) = batch.consume_nonce {
            state.used_nonces.insert(key);
        }
        debug!("Applied batch of {} transfers", batch.transfers.len());
        Ok(())
    }
}
