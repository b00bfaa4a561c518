//! Engine-level tests exercising the full market surface.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use alloy_primitives::Address;
use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

use crate::constants::UNIT;
use crate::engine::{Clock, MarketEngine};
use crate::{MarketError, MarketParams, TokenDataCache, TradeSide};

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .try_init();
});

const T0: i64 = 1_700_000_000;
const DAY: i64 = 86_400;

#[derive(Clone)]
struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    fn at(start: i64) -> Self {
        Self(Arc::new(AtomicI64::new(start)))
    }

    fn set(&self, now: i64) {
        self.0.store(now, Ordering::Relaxed);
    }

    fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::Relaxed)
    }
}

fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

fn platform() -> Address {
    addr(0xfe)
}

fn setup() -> (MarketEngine, ManualClock) {
    setup_with(MarketParams {
        platform_account: platform(),
        ..MarketParams::default()
    })
}

fn setup_with(params: MarketParams) -> (MarketEngine, ManualClock) {
    Lazy::force(&TRACING);
    let clock = ManualClock::at(T0);
    let engine = MarketEngine::with_clock(params, Box::new(clock.clone())).unwrap();
    (engine, clock)
}

fn launch(engine: &MarketEngine) -> Address {
    engine
        .create_token(addr(0xc0), "Test Token", "TEST", "a test token")
        .unwrap()
}

#[test]
fn create_token_registers_and_seeds() {
    let (engine, _) = setup();
    let token = launch(&engine);

    let data = engine.get_token_data(token).unwrap();
    assert_eq!(data.creator, addr(0xc0));
    assert_eq!(data.name, "Test Token");
    assert_eq!(data.symbol, "TEST");
    assert_eq!(data.total_supply, 1_000_000_000 * UNIT);
    assert_eq!(data.bonding_curve_supply, 800_000_000 * UNIT);
    assert_eq!(data.eth_reserve, UNIT);
    assert_eq!(data.token_reserve, 800_000_000 * UNIT);
    assert!(!data.liquidity_locked);
    assert_eq!(data.created_at, T0);
    assert_eq!(engine.all_tokens(), vec![token]);
}

#[test]
fn unknown_token_is_rejected_everywhere() {
    let (engine, _) = setup();
    let ghost = addr(0x99);
    assert_eq!(engine.get_token_data(ghost).err(), Some(MarketError::UnknownToken));
    assert_eq!(
        engine.buy_token(ghost, addr(1), UNIT).err(),
        Some(MarketError::UnknownToken)
    );
    assert_eq!(
        engine.claim_holder_rewards(ghost, addr(1)).err(),
        Some(MarketError::UnknownToken)
    );
}

#[test]
fn buy_matches_the_seeded_example() {
    let (engine, _) = setup();
    let token = launch(&engine);
    let buyer = addr(0x01);

    // Quote before the trade: 800M - ceil(8e26 / 1.1e9)
    let quoted = engine.calculate_buy_amount(token, UNIT / 10).unwrap();
    assert_eq!(quoted, 72_727_272_727_272_727);

    let receipt = engine.buy_token(token, buyer, UNIT / 10).unwrap();
    assert_eq!(receipt.side, TradeSide::Buy);
    assert_eq!(receipt.fee, 727_272_727_272_727);
    assert_eq!(receipt.token_amount, 72_000_000_000_000_000);
    assert_eq!(receipt.eth_reserve, UNIT + UNIT / 10);
    assert_eq!(receipt.token_reserve, 727_272_727_272_727_273);
    assert!(!receipt.locked);

    assert_eq!(engine.balance_of(token, buyer).unwrap(), 72_000_000_000_000_000);

    let info = engine.treasury_info(token).unwrap();
    assert_eq!(info.total_fees, 727_272_727_272_727);
}

#[test]
fn buys_move_reserves_and_never_shrink_k() {
    let (engine, _) = setup();
    let token = launch(&engine);

    let mut last = engine.get_token_data(token).unwrap();
    for i in 1..=5u128 {
        engine.buy_token(token, addr(0x01), i * UNIT / 50).unwrap();
        let data = engine.get_token_data(token).unwrap();
        assert!(data.eth_reserve > last.eth_reserve);
        assert!(data.token_reserve < last.token_reserve);
        assert!(data.k >= last.k);
        last = data;
    }
}

#[test]
fn buy_then_sell_returns_less_eth_than_spent() {
    let (engine, _) = setup();
    let token = launch(&engine);
    let trader = addr(0x01);

    let spent = UNIT / 10;
    let receipt = engine.buy_token(token, trader, spent).unwrap();

    let sell = engine.sell_token(token, trader, receipt.token_amount).unwrap();
    assert_eq!(sell.side, TradeSide::Sell);
    assert!(sell.eth_amount > 0);
    assert!(sell.eth_amount < spent);
    assert_eq!(engine.balance_of(token, trader).unwrap(), 0);
}

#[test]
fn zero_amount_trades_are_rejected() {
    let (engine, _) = setup();
    let token = launch(&engine);
    assert_eq!(
        engine.buy_token(token, addr(1), 0).err(),
        Some(MarketError::InvalidAmount)
    );
    assert_eq!(
        engine.sell_token(token, addr(1), 0).err(),
        Some(MarketError::InvalidAmount)
    );
    assert_eq!(
        engine.calculate_buy_amount(token, 0).err(),
        Some(MarketError::InvalidAmount)
    );
}

#[test]
fn selling_more_than_held_is_rejected() {
    let (engine, _) = setup();
    let token = launch(&engine);
    let trader = addr(0x01);
    engine.buy_token(token, trader, UNIT / 10).unwrap();

    let balance = engine.balance_of(token, trader).unwrap();
    assert_eq!(
        engine.sell_token(token, trader, balance + 1).err(),
        Some(MarketError::InsufficientBalance)
    );
}

#[test]
fn selling_into_a_thin_reserve_is_rejected() {
    // Raise the lock threshold out of reach so a whale buy drains the curve
    // without locking it.
    let (engine, _) = setup_with(MarketParams {
        platform_account: platform(),
        lock_threshold: u128::MAX,
        ..MarketParams::default()
    });
    let token = launch(&engine);
    let whale = addr(0x01);

    engine.buy_token(token, whale, 4 * UNIT).unwrap();

    let balance = engine.balance_of(token, whale).unwrap();
    let reserve = engine.get_token_data(token).unwrap().token_reserve;
    assert!(balance > reserve);
    assert_eq!(
        engine.sell_token(token, whale, balance).err(),
        Some(MarketError::InsufficientReserve)
    );
}

#[test]
fn crossing_the_market_cap_locks_the_curve() {
    let (engine, _) = setup();
    let token = launch(&engine);
    let buyer = addr(0x01);

    // 4 ETH takes the market cap past the 20 ETH lock threshold
    let receipt = engine.buy_token(token, buyer, 4 * UNIT).unwrap();
    assert!(receipt.locked);

    let data = engine.get_token_data(token).unwrap();
    assert!(data.liquidity_locked);

    assert_eq!(
        engine.buy_token(token, buyer, UNIT).err(),
        Some(MarketError::CurveLocked)
    );
    assert_eq!(
        engine.sell_token(token, buyer, UNIT).err(),
        Some(MarketError::CurveLocked)
    );
    assert_eq!(
        engine.calculate_buy_amount(token, UNIT).err(),
        Some(MarketError::CurveLocked)
    );
    assert_eq!(
        engine.calculate_sell_amount(token, UNIT).err(),
        Some(MarketError::CurveLocked)
    );

    // Holder-to-holder movement survives the lock
    let net = engine.transfer(token, buyer, addr(0x02), 1_000_000).unwrap();
    assert_eq!(net, 990_000);
}

#[test]
fn eligibility_follows_the_holding_window() {
    let (engine, clock) = setup();
    let token = launch(&engine);
    let buyer = addr(0x01);

    engine.buy_token(token, buyer, UNIT / 10).unwrap();
    assert!(!engine.is_eligible_for_rewards(token, buyer).unwrap());
    assert_eq!(engine.get_holder_claimable_amount(token, buyer).unwrap(), 0);

    clock.set(T0 + DAY - 1);
    assert!(!engine.is_eligible_for_rewards(token, buyer).unwrap());

    clock.set(T0 + DAY);
    assert!(engine.is_eligible_for_rewards(token, buyer).unwrap());
    assert_eq!(engine.get_holding_duration(token, buyer).unwrap(), DAY);
}

#[test]
fn topping_up_restarts_the_holding_clock() {
    let (engine, clock) = setup();
    let token = launch(&engine);
    let buyer = addr(0x01);

    engine.buy_token(token, buyer, UNIT / 10).unwrap();
    clock.advance(DAY / 2);
    engine.buy_token(token, buyer, UNIT / 100).unwrap();

    clock.set(T0 + DAY);
    assert!(!engine.is_eligible_for_rewards(token, buyer).unwrap());

    clock.set(T0 + DAY / 2 + DAY);
    assert!(engine.is_eligible_for_rewards(token, buyer).unwrap());
}

#[test]
fn holder_claims_pay_once_per_accrual() {
    let (engine, clock) = setup();
    let token = launch(&engine);
    let buyer = addr(0x01);

    engine.buy_token(token, buyer, UNIT / 10).unwrap();

    // Too early
    assert_eq!(
        engine.claim_holder_rewards(token, buyer).err(),
        Some(MarketError::NotEligible)
    );

    clock.advance(DAY);
    let claimable = engine.get_holder_claimable_amount(token, buyer).unwrap();
    assert_eq!(claimable, 290_909_090_909_090);

    let paid = engine.claim_holder_rewards(token, buyer).unwrap();
    assert_eq!(paid, claimable);

    // Idempotent until new fees accrue
    assert_eq!(
        engine.claim_holder_rewards(token, buyer).err(),
        Some(MarketError::NothingToClaim)
    );

    // Payout did not reset the clock
    assert!(engine.is_eligible_for_rewards(token, buyer).unwrap());
}

#[test]
fn claims_split_between_eligible_holders() {
    let (engine, clock) = setup();
    let token = launch(&engine);
    let a = addr(0x01);
    let b = addr(0x02);

    engine.buy_token(token, a, UNIT / 10).unwrap();
    engine.buy_token(token, b, UNIT / 10).unwrap();
    clock.advance(DAY);

    let paid_a = engine.claim_holder_rewards(token, a).unwrap();
    let paid_b = engine.claim_holder_rewards(token, b).unwrap();

    // A bought earlier on the curve so holds more and earns more
    assert!(paid_a > paid_b);
    assert!(paid_b > 0);

    let info = engine.treasury_info(token).unwrap();
    assert!(info.holders_claimed <= info.total_fees);
}

#[test]
fn creator_claims_are_creator_only() {
    let (engine, _) = setup();
    let token = launch(&engine);

    engine.buy_token(token, addr(0x01), UNIT / 10).unwrap();

    assert_eq!(
        engine.claim_creator_rewards(token, addr(0x01)).err(),
        Some(MarketError::Unauthorized)
    );

    let paid = engine.claim_creator_rewards(token, addr(0xc0)).unwrap();
    assert_eq!(paid, 290_909_090_909_090);
    assert_eq!(
        engine.claim_creator_rewards(token, addr(0xc0)).err(),
        Some(MarketError::NothingToClaim)
    );
}

#[test]
fn platform_claims_are_platform_only() {
    let (engine, _) = setup();
    let token = launch(&engine);

    engine.buy_token(token, addr(0x01), UNIT / 10).unwrap();

    assert_eq!(
        engine.claim_platform_fees(token, addr(0x01)).err(),
        Some(MarketError::Unauthorized)
    );

    let paid = engine.claim_platform_fees(token, platform()).unwrap();
    assert_eq!(paid, 145_454_545_454_547);
}

#[test]
fn token_units_are_conserved() {
    let (engine, clock) = setup();
    let token = launch(&engine);
    let buyer = addr(0x01);
    let creator = addr(0xc0);

    engine.buy_token(token, buyer, UNIT / 10).unwrap();
    clock.advance(DAY);
    engine.claim_holder_rewards(token, buyer).unwrap();
    engine.claim_creator_rewards(token, creator).unwrap();
    engine.claim_platform_fees(token, platform()).unwrap();

    let data = engine.get_token_data(token).unwrap();
    let circulating = engine.balance_of(token, buyer).unwrap()
        + engine.balance_of(token, creator).unwrap()
        + engine.balance_of(token, platform()).unwrap();
    let liquidity_reserve = data.total_supply - data.bonding_curve_supply;

    // Every pool is drained, so reserves + balances + the liquidity reserve
    // must reassemble the full supply exactly.
    assert_eq!(
        data.token_reserve + circulating + liquidity_reserve,
        data.total_supply
    );
}

#[test]
fn transfers_charge_the_fee_and_reset_the_recipient_clock() {
    let (engine, clock) = setup();
    let token = launch(&engine);
    let a = addr(0x01);
    let b = addr(0x02);

    engine.buy_token(token, a, UNIT / 10).unwrap();
    clock.advance(DAY);
    assert!(engine.is_eligible_for_rewards(token, a).unwrap());

    let net = engine.transfer(token, a, b, 1_000_000).unwrap();
    assert_eq!(net, 990_000);
    assert_eq!(engine.balance_of(token, b).unwrap(), 990_000);

    // Sender keeps eligibility, recipient starts a fresh clock
    assert!(engine.is_eligible_for_rewards(token, a).unwrap());
    assert!(!engine.is_eligible_for_rewards(token, b).unwrap());

    let info = engine.treasury_info(token).unwrap();
    assert!(info.total_fees > 0);
}

#[test]
fn pause_is_platform_gated() {
    let (engine, _) = setup();

    assert_eq!(
        engine.set_paused(addr(0x01), true).err(),
        Some(MarketError::Unauthorized)
    );

    engine.set_paused(platform(), true).unwrap();
    assert_eq!(
        engine
            .create_token(addr(0xc0), "Late Token", "LATE", "")
            .err(),
        Some(MarketError::FactoryPaused)
    );

    engine.set_paused(platform(), false).unwrap();
    assert!(engine.create_token(addr(0xc0), "Late Token", "LATE", "").is_ok());
}

#[test]
fn cache_serves_and_invalidates_snapshots() {
    let (engine, _) = setup();
    let token = launch(&engine);
    let cache = Arc::new(TokenDataCache::new());
    engine.subscribe(cache.clone());

    let before = cache.token_data(&engine, token).unwrap();
    assert_eq!(cache.cached_token_count(), 1);

    // The trade event evicts the stale snapshot
    engine.buy_token(token, addr(0x01), UNIT / 10).unwrap();
    assert_eq!(cache.cached_token_count(), 0);

    let after = cache.token_data(&engine, token).unwrap();
    assert!(after.eth_reserve > before.eth_reserve);
    assert!(after.token_reserve < before.token_reserve);

    let view = cache.holder_view(&engine, token, addr(0x01)).unwrap();
    assert_eq!(view.balance, engine.balance_of(token, addr(0x01)).unwrap());
    assert!(!view.eligible);
}

#[test]
fn params_load_from_json() {
    let raw = r#"{
        "total_supply": 1000000000000000000,
        "curve_share_pct": 80,
        "initial_eth_reserve": 1000000000,
        "lock_threshold": 20000000000,
        "trade_fee_bps": 100,
        "holder_share_bps": 4000,
        "creator_share_bps": 4000,
        "platform_share_bps": 2000,
        "holding_window_secs": 86400,
        "platform_account": "0x00000000000000000000000000000000000000fe"
    }"#;
    let params = MarketParams::from_json(raw).unwrap();
    assert_eq!(params.total_supply, 1_000_000_000 * UNIT);
    assert_eq!(params.trade_fee_bps, 100);

    let bad = raw.replace("\"holder_share_bps\": 4000", "\"holder_share_bps\": 5000");
    assert!(MarketParams::from_json(&bad).is_err());
}

#[test]
fn cross_token_trading_is_independent() {
    let (engine, _) = setup();
    let token_a = engine
        .create_token(addr(0xc0), "Alpha", "ALPHA", "")
        .unwrap();
    let token_b = engine.create_token(addr(0xc1), "Beta", "BETA", "").unwrap();

    // Lock A; B keeps trading
    engine.buy_token(token_a, addr(0x01), 4 * UNIT).unwrap();
    assert!(engine.get_token_data(token_a).unwrap().liquidity_locked);

    let receipt = engine.buy_token(token_b, addr(0x01), UNIT / 10).unwrap();
    assert!(!receipt.locked);
    assert!(!engine.get_token_data(token_b).unwrap().liquidity_locked);
}
