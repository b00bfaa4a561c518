//! Shared constants for the fair-launch market engine

// Fixed-point configuration
pub const DECIMALS: u32 = 9;
pub const UNIT: u128 = 1_000_000_000; // one whole token / one whole ETH
pub const BPS_DENOMINATOR: u128 = 10_000; // 100% = 10,000 basis points

// Token launch defaults
pub const DEFAULT_TOTAL_SUPPLY: u128 = 1_000_000_000 * UNIT; // 1 billion tokens
pub const DEFAULT_CURVE_SHARE_PCT: u128 = 80; // 80% tradable on the curve
pub const DEFAULT_INITIAL_ETH_RESERVE: u128 = UNIT; // 1 ETH virtual seed
pub const DEFAULT_LOCK_THRESHOLD: u128 = 20 * UNIT; // 20 ETH market cap (~$55k)

// Trading parameters
pub const DEFAULT_TRADE_FEE_BPS: u128 = 100; // 1% on every token movement
pub const MAX_FEE_BPS: u128 = 3_000; // 30% ceiling on configured fees

// Fee split (holders / creator / platform)
pub const DEFAULT_HOLDER_SHARE_BPS: u128 = 4_000;
pub const DEFAULT_CREATOR_SHARE_BPS: u128 = 4_000;
pub const DEFAULT_PLATFORM_SHARE_BPS: u128 = 2_000;

// Reward eligibility
pub const DEFAULT_HOLDING_WINDOW_SECS: i64 = 86_400; // 24 hours

// Factory limits
pub const MAX_TOKENS_PER_CREATOR: u64 = 100; // Spam prevention
pub const MAX_NAME_LEN: usize = 64;
pub const MAX_SYMBOL_LEN: usize = 16;
