//! Fee Treasury
//!
//! Per-token accounting of collected trading fees and their three-way split
//! (holders / creator / platform). Claims settle against accrued pools;
//! holder claims are pro-rated by balance over the eligible supply and made
//! idempotent through a per-holder accrual cursor.

use std::collections::HashMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::constants::BPS_DENOMINATOR;
use crate::error::{overflow_guard, MarketError};
use crate::MarketParams;

/// One fee, apportioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub holders: u128,
    pub creator: u128,
    pub platform: u128,
}

/// Split a collected fee 40/40/20; the integer-rounding remainder is folded
/// into the platform share so the split always sums to the gross.
pub fn split_fee(gross: u128, params: &MarketParams) -> Result<FeeSplit, MarketError> {
    let holders = overflow_guard(gross.checked_mul(params.holder_share_bps))? / BPS_DENOMINATOR;
    let creator = overflow_guard(gross.checked_mul(params.creator_share_bps))? / BPS_DENOMINATOR;
    let platform = gross
        .checked_sub(holders)
        .and_then(|rest| rest.checked_sub(creator))
        .ok_or(MarketError::Overflow)?;
    Ok(FeeSplit {
        holders,
        creator,
        platform,
    })
}

/// Per-token fee ledger.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FeeLedger {
    pub total_fees_collected: u128,
    holder_accrued: u128,
    creator_accrued: u128,
    platform_accrued: u128,
    pub holders_claimed_total: u128,
    pub creator_claimed_total: u128,
    pub platform_claimed_total: u128,
    /// Holder-pool accrual level each holder has already settled against.
    holder_cursors: HashMap<Address, u128>,
}

impl FeeLedger {
    /// Record a collected fee into the three category pools.
    pub fn record_fee(&mut self, split: FeeSplit) -> Result<(), MarketError> {
        let gross = split
            .holders
            .checked_add(split.creator)
            .and_then(|s| s.checked_add(split.platform))
            .ok_or(MarketError::Overflow)?;
        self.total_fees_collected = overflow_guard(self.total_fees_collected.checked_add(gross))?;
        self.holder_accrued = overflow_guard(self.holder_accrued.checked_add(split.holders))?;
        self.creator_accrued = overflow_guard(self.creator_accrued.checked_add(split.creator))?;
        self.platform_accrued = overflow_guard(self.platform_accrued.checked_add(split.platform))?;
        Ok(())
    }

    /// The amount a holder could claim right now, given their balance and the
    /// eligible supply. Pure read.
    pub fn holder_claimable(&self, holder: &Address, balance: u128, eligible_supply: u128) -> u128 {
        if balance == 0 || eligible_supply == 0 {
            return 0;
        }
        let cursor = self.holder_cursors.get(holder).copied().unwrap_or(0);
        let delta = self.holder_accrued.saturating_sub(cursor);
        if delta == 0 {
            return 0;
        }
        let share = match delta.checked_mul(balance) {
            Some(scaled) => scaled / eligible_supply,
            None => return 0,
        };
        // Never pay out past the pool's unclaimed remainder
        share.min(self.holder_pool_remaining())
    }

    /// Settle a holder claim: advances the holder's cursor and books the
    /// payout against the holder pool.
    pub fn claim_holder(
        &mut self,
        holder: Address,
        balance: u128,
        eligible_supply: u128,
    ) -> Result<u128, MarketError> {
        let amount = self.holder_claimable(&holder, balance, eligible_supply);
        if amount == 0 {
            return Err(MarketError::NothingToClaim);
        }
        self.holder_cursors.insert(holder, self.holder_accrued);
        self.holders_claimed_total = overflow_guard(self.holders_claimed_total.checked_add(amount))?;
        Ok(amount)
    }

    /// Settle the creator's accumulated share.
    pub fn claim_creator(&mut self) -> Result<u128, MarketError> {
        let amount = self.creator_accrued.saturating_sub(self.creator_claimed_total);
        if amount == 0 {
            return Err(MarketError::NothingToClaim);
        }
        self.creator_claimed_total = overflow_guard(self.creator_claimed_total.checked_add(amount))?;
        Ok(amount)
    }

    /// Settle the platform's accumulated share.
    pub fn claim_platform(&mut self) -> Result<u128, MarketError> {
        let amount = self
            .platform_accrued
            .saturating_sub(self.platform_claimed_total);
        if amount == 0 {
            return Err(MarketError::NothingToClaim);
        }
        self.platform_claimed_total =
            overflow_guard(self.platform_claimed_total.checked_add(amount))?;
        Ok(amount)
    }

    /// Fee tokens still held by the treasury across all three pools.
    pub fn unclaimed_total(&self) -> u128 {
        self.holder_pool_remaining()
            + self.creator_accrued.saturating_sub(self.creator_claimed_total)
            + self
                .platform_accrued
                .saturating_sub(self.platform_claimed_total)
    }

    fn holder_pool_remaining(&self) -> u128 {
        self.holder_accrued.saturating_sub(self.holders_claimed_total)
    }

    fn claimed_total(&self) -> u128 {
        self.holders_claimed_total + self.creator_claimed_total + self.platform_claimed_total
    }

    /// Ledger invariant: collected fees always cover what was claimed.
    pub fn is_consistent(&self) -> bool {
        self.total_fees_collected >= self.claimed_total()
    }
}
