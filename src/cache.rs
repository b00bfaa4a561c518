//! Read-through snapshot cache
//!
//! Replaces effect-driven re-fetching with explicit caching: token snapshots
//! keyed by token, holder views keyed by (token, holder). Entries fill from
//! the engine on miss and are dropped when a market event touches their
//! token — no polling.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy_primitives::Address;

use crate::engine::{HolderView, MarketEngine, TokenData};
use crate::error::MarketError;
use crate::events::{EventSink, MarketEvent};

#[derive(Default)]
pub struct TokenDataCache {
    tokens: Mutex<HashMap<Address, TokenData>>,
    holders: Mutex<HashMap<(Address, Address), HolderView>>,
}

impl TokenDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token snapshot, served from cache when fresh.
    pub fn token_data(
        &self,
        engine: &MarketEngine,
        token: Address,
    ) -> Result<TokenData, MarketError> {
        if let Ok(cache) = self.tokens.lock() {
            if let Some(data) = cache.get(&token) {
                return Ok(data.clone());
            }
        }
        let data = engine.get_token_data(token)?;
        if let Ok(mut cache) = self.tokens.lock() {
            cache.insert(token, data.clone());
        }
        Ok(data)
    }

    /// Holder view, served from cache when fresh.
    pub fn holder_view(
        &self,
        engine: &MarketEngine,
        token: Address,
        holder: Address,
    ) -> Result<HolderView, MarketError> {
        if let Ok(cache) = self.holders.lock() {
            if let Some(view) = cache.get(&(token, holder)) {
                return Ok(*view);
            }
        }
        let view = engine.holder_view(token, holder)?;
        if let Ok(mut cache) = self.holders.lock() {
            cache.insert((token, holder), view);
        }
        Ok(view)
    }

    /// Drop everything cached for a token.
    pub fn invalidate(&self, token: Address) {
        if let Ok(mut cache) = self.tokens.lock() {
            cache.remove(&token);
        }
        if let Ok(mut cache) = self.holders.lock() {
            cache.retain(|(t, _), _| *t != token);
        }
    }

    #[cfg(test)]
    pub(crate) fn cached_token_count(&self) -> usize {
        self.tokens.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl EventSink for TokenDataCache {
    fn on_event(&self, event: &MarketEvent) {
        self.invalidate(event.token());
    }
}
