//! Auction Pricing Module
//!
//! Request intents are priced by a linear ascending auction: the reward a
//! bidder locks in grows from `min_reward` at `start` to `max_reward` at
//! `end`. The price is evaluated exactly once, at acceptance time.

use crate::error::{MarketError, Result};
use crate::types::{U256, U512};

/// Current reward of an auction at time `now`.
///
/// `min + floor((now - start) * (max - min) / (end - start))` for
/// `start <= now < end`, and `max` from `end` onwards. The product is taken
/// at 512-bit width so the division is the only rounding step; rounding is
/// always down, in favour of the signer paying the reward.
pub fn current_reward(
    now: u64,
    start: u64,
    end: u64,
    min_reward: U256,
    max_reward: U256,
) -> Result<U256> {
    if start >= end {
        return Err(MarketError::InvalidTimeWindow(format!(
            "auction start {} is not before end {}",
            start, end
        )));
    }
    if now < start {
        return Err(MarketError::InvalidTimeWindow(format!(
            "auction starts at {}, now {}",
            start, now
        )));
    }
    if max_reward < min_reward {
        return Err(MarketError::InvalidIntent(
            "max reward is below min reward".to_string(),
        ));
    }
    if now >= end {
        return Ok(max_reward);
    }

    let elapsed = U256::from(now - start);
    let duration = U512::from(U256::from(end - start));
    let range = max_reward - min_reward;

    let increment = elapsed.full_mul(range) / duration;
    // increment < range, so it always fits back into 256 bits
    let increment = U256::try_from(increment).map_err(|_| MarketError::Overflow("auction price"))?;
    min_reward
        .checked_add(increment)
        .ok_or(MarketError::Overflow("auction price"))
}

/// Earliest timestamp at which the auction price reaches `target`.
///
/// Returns `start` when `target <= min_reward` and `None` when the target
/// exceeds `max_reward`.
pub fn target_timestamp(
    target: U256,
    start: u64,
    end: u64,
    min_reward: U256,
    max_reward: U256,
) -> Result<Option<u64>> {
    if start >= end {
        return Err(MarketError::InvalidTimeWindow(format!(
            "auction start {} is not before end {}",
            start, end
        )));
    }
    if max_reward < min_reward {
        return Err(MarketError::InvalidIntent(
            "max reward is below min reward".to_string(),
        ));
    }
    if target > max_reward {
        return Ok(None);
    }
    if target <= min_reward {
        return Ok(Some(start));
    }

    // smallest e with floor(e * range / duration) >= needed, i.e. ceil(needed * duration / range)
    let needed = target - min_reward;
    let range = max_reward - min_reward;
    let duration = U256::from(end - start);
    let numerator = needed.full_mul(duration);
    let range = U512::from(range);
    let mut elapsed = numerator / range;
    if !(numerator % range).is_zero() {
        elapsed += U512::one();
    }
    let elapsed = U256::try_from(elapsed).map_err(|_| MarketError::Overflow("target timestamp"))?;
    // needed <= range, so elapsed <= duration
    Ok(Some(start + elapsed.low_u64()))
}
