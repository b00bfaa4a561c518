//! Fair-Launch Token Market Engine
//!
//! An in-process market engine for fair-launch tokens that enables launches
//! with constant-product bonding curves and fee-based holder rewards.
//!
//! This system provides:
//! - Factory pattern for launching new tokens onto seeded curves
//! - Constant-product (x * y = k) pricing with pool-favoring rounding
//! - A 1% fee on every token movement, split 40/40/20 between holders,
//!   the creator and the platform
//! - 24-hour continuous-holding eligibility for holder reward claims
//! - Irreversible liquidity locking once a market-cap threshold is crossed
//! - Per-token keyed locking so distinct tokens trade in parallel

use alloy_primitives::Address;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub mod bonding_curve;
pub mod cache;
pub mod constants;
pub mod engine;
pub mod error;
pub mod events;
pub mod factory;
pub mod holders;
pub mod treasury;

#[cfg(test)]
pub mod tests;

pub use cache::TokenDataCache;
pub use engine::{Clock, HolderView, MarketEngine, SystemClock, TokenData, TradeReceipt, TreasuryInfo};
pub use error::MarketError;
pub use events::{EventSink, MarketEvent, TradeSide};
pub use factory::TokenMeta;

use constants::*;

/// Economic parameters for the market engine.
///
/// The defaults are the platform's launch economics; deployments override
/// individual fields through serde or struct update syntax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParams {
    /// Total supply minted per token launch.
    pub total_supply: u128,
    /// Percentage of the supply tradable on the bonding curve; the rest is
    /// reserved for the post-lock liquidity pool.
    pub curve_share_pct: u128,
    /// Virtual eth reserve seeding every new curve.
    pub initial_eth_reserve: u128,
    /// Market cap (eth units) at which the curve locks.
    pub lock_threshold: u128,
    /// Fee in basis points taken from the token leg of each movement.
    pub trade_fee_bps: u128,
    pub holder_share_bps: u128,
    pub creator_share_bps: u128,
    pub platform_share_bps: u128,
    /// Continuous holding required before reward claims, in seconds.
    pub holding_window_secs: i64,
    /// Recipient of the platform fee share and the pause authority.
    pub platform_account: Address,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            total_supply: DEFAULT_TOTAL_SUPPLY,
            curve_share_pct: DEFAULT_CURVE_SHARE_PCT,
            initial_eth_reserve: DEFAULT_INITIAL_ETH_RESERVE,
            lock_threshold: DEFAULT_LOCK_THRESHOLD,
            trade_fee_bps: DEFAULT_TRADE_FEE_BPS,
            holder_share_bps: DEFAULT_HOLDER_SHARE_BPS,
            creator_share_bps: DEFAULT_CREATOR_SHARE_BPS,
            platform_share_bps: DEFAULT_PLATFORM_SHARE_BPS,
            holding_window_secs: DEFAULT_HOLDING_WINDOW_SECS,
            platform_account: Address::ZERO,
        }
    }
}

impl MarketParams {
    /// Load parameters from a JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(raw)
            .map_err(|e| anyhow!("failed to deserialize market params: {}", e))?;
        params.validate()?;
        Ok(params)
    }

    /// Parameter validation, run once at engine construction.
    pub fn validate(&self) -> Result<()> {
        if self.total_supply == 0 {
            return Err(anyhow!("total_supply must be > 0"));
        }
        if self.curve_share_pct == 0 || self.curve_share_pct > 100 {
            return Err(anyhow!("curve_share_pct must be within 1..=100"));
        }
        if self.initial_eth_reserve == 0 {
            return Err(anyhow!("initial_eth_reserve must be > 0"));
        }
        if self.trade_fee_bps > MAX_FEE_BPS {
            return Err(anyhow!("trade_fee_bps too high (max {} bps)", MAX_FEE_BPS));
        }
        if self.holder_share_bps + self.creator_share_bps + self.platform_share_bps
            != BPS_DENOMINATOR
        {
            return Err(anyhow!("fee shares must sum to {} bps", BPS_DENOMINATOR));
        }
        if self.holding_window_secs < 0 {
            return Err(anyhow!("holding_window_secs must be >= 0"));
        }
        Ok(())
    }
}
