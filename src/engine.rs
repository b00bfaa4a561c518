//! Market Engine
//!
//! The single facade over the factory, curves, treasury and holder book.
//! Every state-mutating operation on a token executes inside that token's
//! mutex, so same-token operations are sequentially consistent while
//! different tokens trade fully in parallel. Quotes used by executes are
//! recomputed inside the critical section; a quote taken earlier is never
//! trusted at commit time.

use std::sync::{Arc, MutexGuard, RwLock};

use alloy_primitives::Address;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::BPS_DENOMINATOR;
use crate::error::{overflow_guard, MarketError};
use crate::events::{
    CurveLocked, EventSink, MarketEvent, RewardKind, RewardsClaimed, TokenCreated, Trade,
    TradeSide, Transfer,
};
use crate::factory::{TokenEntry, TokenRegistry, TokenState};
use crate::treasury::split_fee;
use crate::MarketParams;

/// Injected time source for holding-window arithmetic.
pub trait Clock: Send + Sync {
    /// Unix seconds.
    fn now(&self) -> i64;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Snapshot of a token, taken under its lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub token: Address,
    pub creator: Address,
    pub name: String,
    pub symbol: String,
    pub total_supply: u128,
    pub bonding_curve_supply: u128,
    pub eth_reserve: u128,
    pub token_reserve: u128,
    pub k: u128,
    pub liquidity_locked: bool,
    pub created_at: i64,
}

/// Fee-ledger totals, mirroring the treasury's public accounting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreasuryInfo {
    pub total_fees: u128,
    pub holders_claimed: u128,
    pub creator_claimed: u128,
    pub platform_claimed: u128,
}

/// Per-holder snapshot, taken under one lock for consistency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HolderView {
    pub balance: u128,
    pub eligible: bool,
    pub claimable: u128,
    pub holding_duration: i64,
}

/// Outcome of an executed trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub side: TradeSide,
    /// Eth paid in (buy) or received net (sell).
    pub eth_amount: u128,
    /// Tokens received net (buy) or sold gross (sell).
    pub token_amount: u128,
    /// Token-denominated fee routed to the treasury.
    pub fee: u128,
    pub eth_reserve: u128,
    pub token_reserve: u128,
    /// Whether this trade crossed the lock threshold.
    pub locked: bool,
}

/// The market engine. Cheap to share behind an `Arc`.
pub struct MarketEngine {
    params: MarketParams,
    registry: TokenRegistry,
    clock: Box<dyn Clock>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl MarketEngine {
    pub fn new(params: MarketParams) -> anyhow::Result<Self> {
        Self::with_clock(params, Box::new(SystemClock))
    }

    pub fn with_clock(params: MarketParams, clock: Box<dyn Clock>) -> anyhow::Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            registry: TokenRegistry::new(),
            clock,
            sinks: RwLock::new(Vec::new()),
        })
    }

    pub fn params(&self) -> &MarketParams {
        &self.params
    }

    /// Register an event sink. Sinks run after token locks are released.
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        if let Ok(mut sinks) = self.sinks.write() {
            sinks.push(sink);
        }
    }

    // ---- token lifecycle ----

    /// Launch a new token and seed its bonding curve.
    pub fn create_token(
        &self,
        creator: Address,
        name: &str,
        symbol: &str,
        description: &str,
    ) -> Result<Address, MarketError> {
        let now = self.clock.now();
        let entry = self
            .registry
            .create(&self.params, creator, name, symbol, description, now)?;
        let token = entry.meta.address;

        info!(%token, %creator, name, symbol, "token created");
        self.emit(MarketEvent::TokenCreated(TokenCreated {
            token,
            creator,
            name: name.to_string(),
            symbol: symbol.to_string(),
        }));
        Ok(token)
    }

    /// Pause or unpause launches. Platform-only.
    pub fn set_paused(&self, caller: Address, paused: bool) -> Result<(), MarketError> {
        if caller != self.params.platform_account {
            return Err(MarketError::Unauthorized);
        }
        self.registry.set_paused(paused);
        Ok(())
    }

    pub fn all_tokens(&self) -> Vec<Address> {
        self.registry.all_tokens()
    }

    pub fn get_token_data(&self, token: Address) -> Result<TokenData, MarketError> {
        let entry = self.registry.get(&token)?;
        let state = lock_state(&entry)?;
        Ok(token_data(&entry, &state))
    }

    // ---- quotes ----

    /// Gross curve output for `eth_in`, before the transfer fee.
    pub fn calculate_buy_amount(&self, token: Address, eth_in: u128) -> Result<u128, MarketError> {
        let entry = self.registry.get(&token)?;
        let state = lock_state(&entry)?;
        state.curve.quote_buy(eth_in)
    }

    /// Gross curve output for `token_in`, before the transfer fee.
    pub fn calculate_sell_amount(
        &self,
        token: Address,
        token_in: u128,
    ) -> Result<u128, MarketError> {
        let entry = self.registry.get(&token)?;
        let state = lock_state(&entry)?;
        state.curve.quote_sell(token_in)
    }

    // ---- trading ----

    /// Buy tokens with eth. The 1% fee is taken from the token output and
    /// routed to the treasury; crossing the market-cap threshold locks the
    /// curve permanently.
    pub fn buy_token(
        &self,
        token: Address,
        buyer: Address,
        eth_in: u128,
    ) -> Result<TradeReceipt, MarketError> {
        let entry = self.registry.get(&token)?;
        let now = self.clock.now();

        let (receipt, lock_event) = {
            let mut state = lock_state(&entry)?;

            let gross_out = state.curve.quote_buy(eth_in)?;
            let (fee, net_out) = self.take_fee(gross_out)?;
            state.curve.apply_buy(eth_in, gross_out)?;
            state.ledger.record_fee(split_fee(fee, &self.params)?)?;
            state.holders.credit(buyer, net_out, now)?;

            let mut lock_event = None;
            if state
                .curve
                .crossed_lock_threshold(entry.meta.total_supply, self.params.lock_threshold)?
            {
                state.curve.liquidity_locked = true;
                lock_event = Some(CurveLocked {
                    token,
                    eth_reserve: state.curve.eth_reserve,
                    token_reserve: state.curve.token_reserve,
                    market_cap: state.curve.market_cap(entry.meta.total_supply)?,
                });
            }

            let receipt = TradeReceipt {
                side: TradeSide::Buy,
                eth_amount: eth_in,
                token_amount: net_out,
                fee,
                eth_reserve: state.curve.eth_reserve,
                token_reserve: state.curve.token_reserve,
                locked: lock_event.is_some(),
            };
            (receipt, lock_event)
        };

        info!(%token, %buyer, eth_in, tokens_out = receipt.token_amount, "buy executed");
        self.emit(MarketEvent::Trade(Trade {
            token,
            trader: buyer,
            side: TradeSide::Buy,
            eth_amount: eth_in,
            token_amount: receipt.token_amount,
            fee: receipt.fee,
            eth_reserve: receipt.eth_reserve,
            token_reserve: receipt.token_reserve,
        }));
        if let Some(lock) = lock_event {
            info!(%token, market_cap = lock.market_cap, "liquidity locked");
            self.emit(MarketEvent::CurveLocked(lock));
        }
        Ok(receipt)
    }

    /// Sell tokens back to the curve. The 1% fee is taken from the tokens
    /// sold; the remainder enters the curve and prices the eth output.
    pub fn sell_token(
        &self,
        token: Address,
        seller: Address,
        token_in: u128,
    ) -> Result<TradeReceipt, MarketError> {
        let entry = self.registry.get(&token)?;

        let receipt = {
            let mut state = lock_state(&entry)?;

            if token_in == 0 {
                return Err(MarketError::InvalidAmount);
            }
            if state.curve.liquidity_locked {
                return Err(MarketError::CurveLocked);
            }
            if state.holders.balance_of(&seller) < token_in {
                return Err(MarketError::InsufficientBalance);
            }
            if token_in >= state.curve.token_reserve {
                return Err(MarketError::InsufficientReserve);
            }

            let (fee, net_in) = self.take_fee(token_in)?;
            let eth_out = state.curve.quote_sell(net_in)?;
            state.curve.apply_sell(net_in, eth_out)?;
            state.holders.debit(&seller, token_in)?;
            state.ledger.record_fee(split_fee(fee, &self.params)?)?;

            TradeReceipt {
                side: TradeSide::Sell,
                eth_amount: eth_out,
                token_amount: token_in,
                fee,
                eth_reserve: state.curve.eth_reserve,
                token_reserve: state.curve.token_reserve,
                locked: false,
            }
        };

        info!(%token, %seller, token_in, eth_out = receipt.eth_amount, "sell executed");
        self.emit(MarketEvent::Trade(Trade {
            token,
            trader: seller,
            side: TradeSide::Sell,
            eth_amount: receipt.eth_amount,
            token_amount: token_in,
            fee: receipt.fee,
            eth_reserve: receipt.eth_reserve,
            token_reserve: receipt.token_reserve,
        }));
        Ok(receipt)
    }

    /// Holder-to-holder transfer. Charges the 1% fee and restarts the
    /// recipient's holding clock; allowed after the liquidity lock.
    pub fn transfer(
        &self,
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<u128, MarketError> {
        let entry = self.registry.get(&token)?;
        let now = self.clock.now();

        let (fee, net) = {
            let mut state = lock_state(&entry)?;

            if amount == 0 {
                return Err(MarketError::InvalidAmount);
            }
            let (fee, net) = self.take_fee(amount)?;
            state.holders.debit(&from, amount)?;
            state.holders.credit(to, net, now)?;
            state.ledger.record_fee(split_fee(fee, &self.params)?)?;
            (fee, net)
        };

        self.emit(MarketEvent::Transfer(Transfer {
            token,
            from,
            to,
            amount,
            fee,
        }));
        Ok(net)
    }

    // ---- holder views ----

    pub fn balance_of(&self, token: Address, holder: Address) -> Result<u128, MarketError> {
        let entry = self.registry.get(&token)?;
        let state = lock_state(&entry)?;
        Ok(state.holders.balance_of(&holder))
    }

    pub fn is_eligible_for_rewards(
        &self,
        token: Address,
        holder: Address,
    ) -> Result<bool, MarketError> {
        let entry = self.registry.get(&token)?;
        let state = lock_state(&entry)?;
        Ok(state
            .holders
            .is_eligible(&holder, self.clock.now(), self.params.holding_window_secs))
    }

    pub fn get_holding_duration(&self, token: Address, holder: Address) -> Result<i64, MarketError> {
        let entry = self.registry.get(&token)?;
        let state = lock_state(&entry)?;
        Ok(state.holders.holding_duration(&holder, self.clock.now()))
    }

    /// Pure read of the holder's current claimable amount; zero for
    /// ineligible holders.
    pub fn get_holder_claimable_amount(
        &self,
        token: Address,
        holder: Address,
    ) -> Result<u128, MarketError> {
        let entry = self.registry.get(&token)?;
        let state = lock_state(&entry)?;
        let now = self.clock.now();
        let window = self.params.holding_window_secs;
        if !state.holders.is_eligible(&holder, now, window) {
            return Ok(0);
        }
        let balance = state.holders.balance_of(&holder);
        let eligible_supply = state.holders.eligible_supply(now, window);
        Ok(state.ledger.holder_claimable(&holder, balance, eligible_supply))
    }

    /// Everything the rewards surface needs about one holder, from a single
    /// consistent snapshot.
    pub fn holder_view(&self, token: Address, holder: Address) -> Result<HolderView, MarketError> {
        let entry = self.registry.get(&token)?;
        let state = lock_state(&entry)?;
        let now = self.clock.now();
        let window = self.params.holding_window_secs;

        let balance = state.holders.balance_of(&holder);
        let eligible = state.holders.is_eligible(&holder, now, window);
        let claimable = if eligible {
            let eligible_supply = state.holders.eligible_supply(now, window);
            state.ledger.holder_claimable(&holder, balance, eligible_supply)
        } else {
            0
        };
        Ok(HolderView {
            balance,
            eligible,
            claimable,
            holding_duration: state.holders.holding_duration(&holder, now),
        })
    }

    pub fn treasury_info(&self, token: Address) -> Result<TreasuryInfo, MarketError> {
        let entry = self.registry.get(&token)?;
        let state = lock_state(&entry)?;
        Ok(TreasuryInfo {
            total_fees: state.ledger.total_fees_collected,
            holders_claimed: state.ledger.holders_claimed_total,
            creator_claimed: state.ledger.creator_claimed_total,
            platform_claimed: state.ledger.platform_claimed_total,
        })
    }

    // ---- claims ----

    /// Claim the holder's pro-rata share of the holder pool. Requires the
    /// holding window to have elapsed; a repeat claim with no new accrual
    /// fails with `NothingToClaim`.
    pub fn claim_holder_rewards(
        &self,
        token: Address,
        holder: Address,
    ) -> Result<u128, MarketError> {
        let entry = self.registry.get(&token)?;
        let now = self.clock.now();
        let window = self.params.holding_window_secs;

        let amount = {
            let mut state = lock_state(&entry)?;
            if !state.holders.is_eligible(&holder, now, window) {
                return Err(MarketError::NotEligible);
            }
            let balance = state.holders.balance_of(&holder);
            let eligible_supply = state.holders.eligible_supply(now, window);
            let amount = state.ledger.claim_holder(holder, balance, eligible_supply)?;
            state.holders.credit_payout(holder, amount, now)?;
            amount
        };

        info!(%token, %holder, amount, "holder rewards claimed");
        self.emit(MarketEvent::RewardsClaimed(RewardsClaimed {
            token,
            claimant: holder,
            kind: RewardKind::Holder,
            amount,
        }));
        Ok(amount)
    }

    /// Claim the creator share. Creator-only.
    pub fn claim_creator_rewards(
        &self,
        token: Address,
        caller: Address,
    ) -> Result<u128, MarketError> {
        let entry = self.registry.get(&token)?;
        if caller != entry.meta.creator {
            return Err(MarketError::Unauthorized);
        }
        let now = self.clock.now();

        let amount = {
            let mut state = lock_state(&entry)?;
            let amount = state.ledger.claim_creator()?;
            state.holders.credit_payout(caller, amount, now)?;
            amount
        };

        info!(%token, creator = %caller, amount, "creator rewards claimed");
        self.emit(MarketEvent::RewardsClaimed(RewardsClaimed {
            token,
            claimant: caller,
            kind: RewardKind::Creator,
            amount,
        }));
        Ok(amount)
    }

    /// Claim the platform share. Platform-only.
    pub fn claim_platform_fees(
        &self,
        token: Address,
        caller: Address,
    ) -> Result<u128, MarketError> {
        if caller != self.params.platform_account {
            return Err(MarketError::Unauthorized);
        }
        let entry = self.registry.get(&token)?;
        let now = self.clock.now();

        let amount = {
            let mut state = lock_state(&entry)?;
            let amount = state.ledger.claim_platform()?;
            state.holders.credit_payout(caller, amount, now)?;
            amount
        };

        self.emit(MarketEvent::RewardsClaimed(RewardsClaimed {
            token,
            claimant: caller,
            kind: RewardKind::Platform,
            amount,
        }));
        Ok(amount)
    }

    // ---- internals ----

    fn take_fee(&self, gross: u128) -> Result<(u128, u128), MarketError> {
        let fee = overflow_guard(gross.checked_mul(self.params.trade_fee_bps))? / BPS_DENOMINATOR;
        let net = gross.checked_sub(fee).ok_or(MarketError::Overflow)?;
        Ok((fee, net))
    }

    fn emit(&self, event: MarketEvent) {
        if let Ok(sinks) = self.sinks.read() {
            for sink in sinks.iter() {
                sink.on_event(&event);
            }
        }
    }
}

fn lock_state(entry: &TokenEntry) -> Result<MutexGuard<'_, TokenState>, MarketError> {
    entry.state.lock().map_err(|_| MarketError::LockPoisoned)
}

fn token_data(entry: &TokenEntry, state: &TokenState) -> TokenData {
    TokenData {
        token: entry.meta.address,
        creator: entry.meta.creator,
        name: entry.meta.name.clone(),
        symbol: entry.meta.symbol.clone(),
        total_supply: entry.meta.total_supply,
        bonding_curve_supply: entry.meta.bonding_curve_supply,
        eth_reserve: state.curve.eth_reserve,
        token_reserve: state.curve.token_reserve,
        k: state.curve.k,
        liquidity_locked: state.curve.liquidity_locked,
        created_at: entry.meta.created_at,
    }
}
