//! Holder balances and reward eligibility
//!
//! Tracks per-holder token balances together with the last-acquisition
//! timestamp that gates reward claims. Eligibility is computed lazily from
//! timestamps; there are no background timers.

use std::collections::HashMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{overflow_guard, MarketError};

/// Balance and holding-clock state for one holder of one token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HolderPosition {
    pub balance: u128,
    pub last_acquisition: i64,
}

/// All holder positions for a single token.
#[derive(Debug, Default)]
pub struct HolderBook {
    positions: HashMap<Address, HolderPosition>,
}

impl HolderBook {
    pub fn balance_of(&self, holder: &Address) -> u128 {
        self.positions.get(holder).map_or(0, |p| p.balance)
    }

    pub fn position(&self, holder: &Address) -> Option<&HolderPosition> {
        self.positions.get(holder)
    }

    /// Credit tokens acquired through a trade or transfer.
    ///
    /// Any balance increase restarts the full holding clock, including a
    /// partial top-up of an existing position.
    pub fn credit(&mut self, holder: Address, amount: u128, now: i64) -> Result<(), MarketError> {
        let position = self.positions.entry(holder).or_insert(HolderPosition {
            balance: 0,
            last_acquisition: now,
        });
        position.balance = overflow_guard(position.balance.checked_add(amount))?;
        position.last_acquisition = now;
        Ok(())
    }

    /// Credit a reward payout. The holding clock is left untouched;
    /// claiming must not restart it.
    pub fn credit_payout(
        &mut self,
        holder: Address,
        amount: u128,
        now: i64,
    ) -> Result<(), MarketError> {
        let position = self.positions.entry(holder).or_insert(HolderPosition {
            balance: 0,
            last_acquisition: now,
        });
        position.balance = overflow_guard(position.balance.checked_add(amount))?;
        Ok(())
    }

    /// Debit tokens leaving the holder. The holding clock is unchanged.
    pub fn debit(&mut self, holder: &Address, amount: u128) -> Result<(), MarketError> {
        let position = self
            .positions
            .get_mut(holder)
            .ok_or(MarketError::InsufficientBalance)?;
        position.balance = position
            .balance
            .checked_sub(amount)
            .ok_or(MarketError::InsufficientBalance)?;
        Ok(())
    }

    /// `now - last_acquisition >= window`, true exactly at the boundary.
    pub fn is_eligible(&self, holder: &Address, now: i64, window: i64) -> bool {
        match self.positions.get(holder) {
            Some(position) => now.saturating_sub(position.last_acquisition) >= window,
            None => false,
        }
    }

    /// Continuous holding duration in seconds, floored at zero.
    pub fn holding_duration(&self, holder: &Address, now: i64) -> i64 {
        self.positions
            .get(holder)
            .map_or(0, |p| now.saturating_sub(p.last_acquisition).max(0))
    }

    /// Sum of balances of currently eligible holders; the denominator for
    /// pro-rata holder claims.
    pub fn eligible_supply(&self, now: i64, window: i64) -> u128 {
        self.positions
            .values()
            .filter(|p| p.balance > 0 && now.saturating_sub(p.last_acquisition) >= window)
            .map(|p| p.balance)
            .sum()
    }

    /// Sum of all holder balances, eligible or not.
    pub fn circulating(&self) -> u128 {
        self.positions.values().map(|p| p.balance).sum()
    }
}
