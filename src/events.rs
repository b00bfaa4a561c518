//! Market events for external indexing and cache invalidation

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCreated {
    pub token: Address,
    pub creator: Address,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub token: Address,
    pub trader: Address,
    pub side: TradeSide,
    pub eth_amount: u128,
    pub token_amount: u128,
    pub fee: u128,
    pub eth_reserve: u128,
    pub token_reserve: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub amount: u128,
    pub fee: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveLocked {
    pub token: Address,
    pub eth_reserve: u128,
    pub token_reserve: u128,
    pub market_cap: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardKind {
    Holder,
    Creator,
    Platform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsClaimed {
    pub token: Address,
    pub claimant: Address,
    pub kind: RewardKind,
    pub amount: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MarketEvent {
    TokenCreated(TokenCreated),
    Trade(Trade),
    Transfer(Transfer),
    CurveLocked(CurveLocked),
    RewardsClaimed(RewardsClaimed),
}

impl MarketEvent {
    /// The token this event concerns, for keyed invalidation.
    pub fn token(&self) -> Address {
        match self {
            MarketEvent::TokenCreated(e) => e.token,
            MarketEvent::Trade(e) => e.token,
            MarketEvent::Transfer(e) => e.token,
            MarketEvent::CurveLocked(e) => e.token,
            MarketEvent::RewardsClaimed(e) => e.token,
        }
    }
}

/// Subscriber for market events. Sinks are invoked after the originating
/// token's critical section has been released.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: &MarketEvent);
}
