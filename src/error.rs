//! Typed failures for market operations
//!
//! Every error here is a local, non-retryable validation failure surfaced
//! directly to the caller. Configuration validation at construction time uses
//! `anyhow` instead; see [`crate::MarketParams::validate`].

use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketError {
    /// Trade input is zero, or rounds to a zero output
    InvalidAmount,
    /// Curve trading attempted after the liquidity lock
    CurveLocked,
    /// Sell amount meets or exceeds the curve's token reserve
    InsufficientReserve,
    /// Caller's token balance is short of the requested amount
    InsufficientBalance,
    /// Holder claim before the holding window has elapsed
    NotEligible,
    /// Claim resolved to a zero payout
    NothingToClaim,
    /// Creator- or platform-only operation called by someone else
    Unauthorized,
    /// No token registered under the given address
    UnknownToken,
    /// Token creation attempted while the factory is paused
    FactoryPaused,
    /// Creator has reached the per-creator token limit
    CreatorLimitReached,
    /// Empty or oversized token name/symbol
    InvalidMetadata,
    /// Checked arithmetic overflowed
    Overflow,
    /// A token's state lock was poisoned by a panicked writer
    LockPoisoned,
}

impl fmt::Display for MarketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            MarketError::InvalidAmount => "trade amount is zero or rounds to nothing",
            MarketError::CurveLocked => "bonding curve is locked",
            MarketError::InsufficientReserve => "sell exceeds available token reserve",
            MarketError::InsufficientBalance => "insufficient token balance",
            MarketError::NotEligible => "holding window has not elapsed",
            MarketError::NothingToClaim => "nothing to claim",
            MarketError::Unauthorized => "caller is not authorized",
            MarketError::UnknownToken => "unknown token address",
            MarketError::FactoryPaused => "factory is paused",
            MarketError::CreatorLimitReached => "creator has reached the token limit",
            MarketError::InvalidMetadata => "invalid token name or symbol",
            MarketError::Overflow => "arithmetic overflow",
            MarketError::LockPoisoned => "token state lock poisoned",
        };
        f.write_str(msg)
    }
}

impl Error for MarketError {}

/// Lifts checked arithmetic into a market result.
pub(crate) fn overflow_guard(value: Option<u128>) -> Result<u128, MarketError> {
    value.ok_or(MarketError::Overflow)
}
