//! Time sources for the markets.
//!
//! Engine logic never reads the wall clock directly; it asks a [`Clock`], so
//! that the sequencer and the tests can drive time explicitly.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{MarketError, Result};

pub trait Clock: Send + Sync {
    /// Current Unix timestamp in seconds.
    fn now(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Moves the clock to `now`, refusing to go backwards.
    pub fn advance_to(&self, now: u64) -> Result<()> {
        let current = self.now.load(Ordering::SeqCst);
        if now < current {
            return Err(MarketError::TimestampRegression {
                current,
                requested: now,
            });
        }
        self.now.store(now, Ordering::SeqCst);
        Ok(())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
