//! Token Factory
//!
//! Launches new tokens onto their bonding curves and keeps the registry of
//! everything launched. Each token gets a derived address, the 80/20
//! curve/liquidity split of its supply, and a seeded virtual eth reserve.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::bonding_curve::CurveState;
use crate::constants::{MAX_NAME_LEN, MAX_SYMBOL_LEN, MAX_TOKENS_PER_CREATOR};
use crate::error::MarketError;
use crate::holders::HolderBook;
use crate::treasury::FeeLedger;
use crate::MarketParams;

/// Immutable identity of a launched token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMeta {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub creator: Address,
    pub total_supply: u128,
    pub bonding_curve_supply: u128,
    pub liquidity_reserve: u128,
    pub created_at: i64,
}

/// Mutable per-token ledger state, guarded by the entry's mutex.
#[derive(Debug)]
pub struct TokenState {
    pub curve: CurveState,
    pub ledger: FeeLedger,
    pub holders: HolderBook,
}

/// Registry entry: immutable metadata plus the keyed mutex over state.
#[derive(Debug)]
pub struct TokenEntry {
    pub meta: TokenMeta,
    pub state: Mutex<TokenState>,
}

#[derive(Default)]
struct RegistryInner {
    tokens: HashMap<Address, Arc<TokenEntry>>,
    order: Vec<Address>,
    created_by: HashMap<Address, u64>,
}

/// Registry of launched tokens. Creation takes the write lock; lookups clone
/// the entry `Arc` under the read lock so token state is never touched while
/// the registry is held.
pub struct TokenRegistry {
    inner: RwLock<RegistryInner>,
    paused: AtomicBool,
    nonce: AtomicU64,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            paused: AtomicBool::new(false),
            nonce: AtomicU64::new(0),
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// Launch a new token for `creator`.
    pub fn create(
        &self,
        params: &MarketParams,
        creator: Address,
        name: &str,
        symbol: &str,
        description: &str,
        now: i64,
    ) -> Result<Arc<TokenEntry>, MarketError> {
        if self.is_paused() {
            return Err(MarketError::FactoryPaused);
        }
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(MarketError::InvalidMetadata);
        }
        if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
            return Err(MarketError::InvalidMetadata);
        }

        let bonding_curve_supply = params.total_supply / 100 * params.curve_share_pct;
        let liquidity_reserve = params.total_supply - bonding_curve_supply;
        let curve = CurveState::seed(params.initial_eth_reserve, bonding_curve_supply)?;

        let mut inner = self.inner.write().map_err(|_| MarketError::LockPoisoned)?;

        let created = inner.created_by.get(&creator).copied().unwrap_or(0);
        if created >= MAX_TOKENS_PER_CREATOR {
            return Err(MarketError::CreatorLimitReached);
        }

        let mut address = self.derive_address(&creator);
        while inner.tokens.contains_key(&address) {
            address = self.derive_address(&creator);
        }

        let meta = TokenMeta {
            address,
            name: name.to_string(),
            symbol: symbol.to_string(),
            description: description.to_string(),
            creator,
            total_supply: params.total_supply,
            bonding_curve_supply,
            liquidity_reserve,
            created_at: now,
        };
        let entry = Arc::new(TokenEntry {
            meta,
            state: Mutex::new(TokenState {
                curve,
                ledger: FeeLedger::default(),
                holders: HolderBook::default(),
            }),
        });

        inner.tokens.insert(address, entry.clone());
        inner.order.push(address);
        *inner.created_by.entry(creator).or_insert(0) += 1;

        Ok(entry)
    }

    pub fn get(&self, token: &Address) -> Result<Arc<TokenEntry>, MarketError> {
        let inner = self.inner.read().map_err(|_| MarketError::LockPoisoned)?;
        inner
            .tokens
            .get(token)
            .cloned()
            .ok_or(MarketError::UnknownToken)
    }

    /// All launched tokens in creation order.
    pub fn all_tokens(&self) -> Vec<Address> {
        match self.inner.read() {
            Ok(inner) => inner.order.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Token address: low 20 bytes of keccak256(creator || nonce).
    fn derive_address(&self, creator: &Address) -> Address {
        let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Keccak256::new();
        hasher.update(creator.as_slice());
        hasher.update(nonce.to_le_bytes());
        let hash = hasher.finalize();
        Address::from_slice(&hash[12..])
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}
