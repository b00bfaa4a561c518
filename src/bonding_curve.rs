//! Bonding Curve Implementation
//!
//! This module contains the core constant-product curve logic including:
//! - Buy/sell quoting against virtual reserves (x * y = k)
//! - Reserve updates with pool-favoring rounding
//! - Market-cap computation and the liquidity-lock criterion

use serde::{Deserialize, Serialize};

use crate::error::{overflow_guard, MarketError};

/// Per-token curve reserves.
///
/// `k` is recomputed from the reserves after every trade; because divisions
/// round toward the pool, the product never decreases across trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveState {
    pub eth_reserve: u128,
    pub token_reserve: u128,
    pub k: u128,
    pub liquidity_locked: bool,
}

impl CurveState {
    /// Seed a fresh curve from the virtual eth reserve and the curve
    /// allocation of the token supply.
    pub fn seed(eth_reserve: u128, token_reserve: u128) -> Result<Self, MarketError> {
        let k = overflow_guard(eth_reserve.checked_mul(token_reserve))?;
        Ok(Self {
            eth_reserve,
            token_reserve,
            k,
            liquidity_locked: false,
        })
    }

    /// Quote the gross token output for `eth_in`.
    ///
    /// `token_out = token_reserve - ceil(k / (eth_reserve + eth_in))`.
    pub fn quote_buy(&self, eth_in: u128) -> Result<u128, MarketError> {
        if self.liquidity_locked {
            return Err(MarketError::CurveLocked);
        }
        if eth_in == 0 {
            return Err(MarketError::InvalidAmount);
        }

        let new_eth_reserve = overflow_guard(self.eth_reserve.checked_add(eth_in))?;
        let new_token_reserve = ceil_div(self.k, new_eth_reserve)?;
        let token_out = self
            .token_reserve
            .checked_sub(new_token_reserve)
            .unwrap_or(0);
        if token_out == 0 {
            // Dust input that rounds to nothing
            return Err(MarketError::InvalidAmount);
        }

        Ok(token_out)
    }

    /// Quote the gross eth output for `token_in`.
    pub fn quote_sell(&self, token_in: u128) -> Result<u128, MarketError> {
        if self.liquidity_locked {
            return Err(MarketError::CurveLocked);
        }
        if token_in == 0 {
            return Err(MarketError::InvalidAmount);
        }
        if token_in >= self.token_reserve {
            return Err(MarketError::InsufficientReserve);
        }

        let new_token_reserve = overflow_guard(self.token_reserve.checked_add(token_in))?;
        let new_eth_reserve = ceil_div(self.k, new_token_reserve)?;
        let eth_out = self.eth_reserve.checked_sub(new_eth_reserve).unwrap_or(0);
        if eth_out == 0 {
            return Err(MarketError::InvalidAmount);
        }

        Ok(eth_out)
    }

    /// Commit a buy: eth enters the pool, `token_out` leaves it.
    pub fn apply_buy(&mut self, eth_in: u128, token_out: u128) -> Result<(), MarketError> {
        self.eth_reserve = overflow_guard(self.eth_reserve.checked_add(eth_in))?;
        self.token_reserve = self
            .token_reserve
            .checked_sub(token_out)
            .ok_or(MarketError::InsufficientReserve)?;
        self.k = overflow_guard(self.eth_reserve.checked_mul(self.token_reserve))?;
        Ok(())
    }

    /// Commit a sell: `token_in` enters the pool, eth leaves it.
    pub fn apply_sell(&mut self, token_in: u128, eth_out: u128) -> Result<(), MarketError> {
        self.token_reserve = overflow_guard(self.token_reserve.checked_add(token_in))?;
        self.eth_reserve = self
            .eth_reserve
            .checked_sub(eth_out)
            .ok_or(MarketError::InsufficientReserve)?;
        self.k = overflow_guard(self.eth_reserve.checked_mul(self.token_reserve))?;
        Ok(())
    }

    /// Market cap in eth units: `eth_reserve * total_supply / token_reserve`.
    pub fn market_cap(&self, total_supply: u128) -> Result<u128, MarketError> {
        if self.token_reserve == 0 {
            return Ok(0);
        }
        let scaled = overflow_guard(self.eth_reserve.checked_mul(total_supply))?;
        Ok(scaled / self.token_reserve)
    }

    /// Whether the lock threshold has been crossed.
    pub fn crossed_lock_threshold(
        &self,
        total_supply: u128,
        lock_threshold: u128,
    ) -> Result<bool, MarketError> {
        Ok(self.market_cap(total_supply)? >= lock_threshold)
    }
}

/// Ceiling division, rounding the kept reserve up so the pool never loses.
fn ceil_div(numerator: u128, denominator: u128) -> Result<u128, MarketError> {
    if denominator == 0 {
        return Err(MarketError::Overflow);
    }
    let quotient = numerator / denominator;
    if numerator % denominator == 0 {
        Ok(quotient)
    } else {
        overflow_guard(quotient.checked_add(1))
    }
}
