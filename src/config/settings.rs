//! Engine configuration settings and environment variable handling

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use crate::types::RiskLimits;

// Risk constants
pub const RETURN_WINDOW_SIZE: usize = 252;
pub const MIN_RETURN_SAMPLES: usize = 30;
pub const DEFAULT_VAR_CONFIDENCE: f64 = 0.95;
pub const KELLY_MULTIPLIER: f64 = 0.5;
pub const DEFAULT_LIQUID_FRACTION: Decimal = dec!(0.8);
pub const LIQUIDITY_BUDGET_FRACTION: Decimal = dec!(0.10);
pub const STRESS_SHOCKS: [(&str, Decimal); 6] = [
    ("market_crash", dec!(-0.30)),
    ("liquidity_crisis", dec!(-0.20)),
    ("protocol_exploit", dec!(-0.50)),
    ("bridge_failure", dec!(-1.00)),
    ("regulatory_shock", dec!(-0.15)),
    ("gas_spike_cascade", dec!(-0.25)),
];

// Block positioning constants
pub const SLOT_MULTIPLIERS: [Decimal; 6] = [
    dec!(1.0), dec!(1.15), dec!(1.3), dec!(1.45), dec!(1.6), dec!(1.8),
];
pub const GAS_PRICE_BUFFER: Decimal = dec!(1.1);
pub const CONGESTION_WEIGHT: Decimal = dec!(0.5);
pub const SUBMIT_FRACTION_OF_BLOCK: f64 = 0.3;
pub const DIRECT_SLOT_COMPETITOR_LIMIT: usize = 5;
pub const DEFAULT_GAS_PRICE_GWEI: u32 = 50;
pub const MAX_GAS_PRICE_GWEI: u32 = 500;

// Mirror trading constants
pub const MAX_SIGNAL_AGE_MS: i64 = 2000;
pub const MIN_JITTER_MS: u64 = 100;
pub const MAX_JITTER_MS: u64 = 500;
pub const EXPECTED_PROFIT_HAIRCUT: f64 = 0.8;
pub const OVERSIZE_DISCOUNT: f64 = 0.8;
pub const VOLATILITY_DISCOUNT: f64 = 0.8;

// Transient liquidity constants
pub const CAPTURE_RATE: f64 = 0.4;
pub const FEE_CAPTURE_SHARE: Decimal = dec!(0.10);

// Execution constants
pub const EXECUTION_TIMEOUT_SECS: u64 = 30;
pub const RECEIPT_POLL_MS: u64 = 500;

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| T::from_str(s.trim()).ok())
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct RiskConfig {
    pub limits: RiskLimits,
    pub var_confidence: f64,
    pub time_horizon_days: f64,
    pub window_size: usize,
    pub liquid_fraction: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            limits: RiskLimits::default(),
            var_confidence: DEFAULT_VAR_CONFIDENCE,
            time_horizon_days: 1.0,
            window_size: RETURN_WINDOW_SIZE,
            liquid_fraction: DEFAULT_LIQUID_FRACTION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlockConfig {
    pub block_interval: Duration,
    /// Inclusion at or beyond this index counts as a missed slot.
    pub top_n_slots: u64,
    pub max_gas_price_gwei: u32,
    /// Pending transactions at which congestion saturates at 1.0.
    pub congestion_capacity: usize,
    pub inclusion_blocks: u32,
    pub congestion_refresh: Duration,
    pub block_refresh: Duration,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            block_interval: Duration::from_secs(12),
            top_n_slots: 6,
            max_gas_price_gwei: DEFAULT_GAS_PRICE_GWEI * 4,
            congestion_capacity: 200,
            inclusion_blocks: 3,
            congestion_refresh: Duration::from_secs(5),
            block_refresh: Duration::from_secs(12),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MirrorConfig {
    pub min_win_rate: f64,
    pub min_total_profit: Decimal,
    pub min_avg_trade_size: Decimal,
    pub min_consistency: f64,
    pub min_expected_profit: Decimal,
    pub min_confidence: f64,
    pub max_open_positions: usize,
    pub max_signal_age_ms: i64,
    pub jitter_ms: (u64, u64),
    /// Budget kept free after the jitter. Signals older than
    /// `max_signal_age_ms - submit_margin_ms - jitter_ms.0` are skipped.
    pub submit_margin_ms: i64,
    pub high_volatility: f64,
    pub replica_timeout: Duration,
    pub scan_interval: Duration,
    pub tracked_accounts: Vec<Address>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            min_win_rate: 0.75,
            min_total_profit: dec!(10000),
            min_avg_trade_size: dec!(1000),
            min_consistency: 0.7,
            min_expected_profit: dec!(50),
            min_confidence: 0.8,
            max_open_positions: 5,
            max_signal_age_ms: MAX_SIGNAL_AGE_MS,
            jitter_ms: (MIN_JITTER_MS, MAX_JITTER_MS),
            submit_margin_ms: 0,
            high_volatility: 0.05,
            replica_timeout: Duration::from_secs(60),
            scan_interval: Duration::from_secs(1),
            tracked_accounts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiquidityConfig {
    pub capture_rate: f64,
    pub min_net_profit: Decimal,
    pub min_counterpart_usd: Decimal,
    pub min_price_impact: f64,
    /// Position size assumed when ranking pools during discovery.
    pub scan_position_usd: Decimal,
    pub bundle_gas_units: u64,
    pub executor: Address,
    pub watched_pools: Vec<Address>,
    /// Assumed landing probability of a bundle, fed to the risk gate.
    pub bundle_success_probability: f64,
    pub block_interval: Duration,
    pub inclusion_blocks: u32,
    pub scan_interval: Duration,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            capture_rate: CAPTURE_RATE,
            min_net_profit: dec!(0.02),
            min_counterpart_usd: dec!(100000),
            min_price_impact: 0.01,
            scan_position_usd: dec!(50000),
            bundle_gas_units: 450_000,
            executor: Address::ZERO,
            watched_pools: Vec::new(),
            bundle_success_probability: 0.65,
            block_interval: Duration::from_secs(12),
            inclusion_blocks: 2,
            scan_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub network: String,
    pub rpc_url: Option<String>,
    pub relay_url: String,
    pub signer_url: String,
    pub activity_feed_url: String,
    pub pool_data_url: String,
    pub enable_trade_execution: bool,
    pub max_consecutive_errors: u32,
    pub circuit_breaker_cooldown_secs: u64,
    pub risk_check_interval: Duration,
    pub risk: RiskConfig,
    pub block: BlockConfig,
    pub mirror: MirrorConfig,
    pub liquidity: LiquidityConfig,
}

fn parse_addresses(key: &str) -> Vec<Address> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| Address::from_str(s.trim()).ok())
        .collect()
}

impl Config {
    pub fn load() -> Self {
        let default_limits = RiskLimits::default();
        let limits = RiskLimits {
            max_position_size: env_parse::<Decimal>("MAX_POSITION_SIZE_USD")
                .unwrap_or(default_limits.max_position_size)
                .max(dec!(0)),
            max_var: env_parse::<Decimal>("MAX_VAR")
                .unwrap_or(default_limits.max_var)
                .min(dec!(1)),
            max_drawdown: env_parse::<Decimal>("MAX_DRAWDOWN")
                .unwrap_or(default_limits.max_drawdown)
                .min(dec!(1)),
            max_leverage: env_parse::<Decimal>("MAX_LEVERAGE")
                .unwrap_or(default_limits.max_leverage)
                .max(dec!(1)),
            max_concentration: env_parse::<Decimal>("MAX_CONCENTRATION")
                .unwrap_or(default_limits.max_concentration)
                .min(dec!(1)),
            min_liquidity_ratio: env_parse::<Decimal>("MIN_LIQUIDITY_RATIO")
                .unwrap_or(default_limits.min_liquidity_ratio)
                .min(dec!(1)),
        };

        let block = BlockConfig {
            block_interval: Duration::from_millis(env_parse("BLOCK_INTERVAL_MS").unwrap_or(12_000)),
            max_gas_price_gwei: env_parse("MAX_GAS_PRICE_GWEI")
                .unwrap_or(DEFAULT_GAS_PRICE_GWEI * 4)
                .min(MAX_GAS_PRICE_GWEI),
            ..Default::default()
        };

        let mirror = MirrorConfig {
            max_open_positions: env_parse("MAX_COPY_POSITIONS").unwrap_or(5),
            tracked_accounts: parse_addresses("TRACKED_ACCOUNTS"),
            ..Default::default()
        };

        let liquidity = LiquidityConfig {
            block_interval: block.block_interval,
            min_counterpart_usd: env_parse::<Decimal>("MIN_COUNTERPART_USD").unwrap_or(dec!(100000)),
            executor: env_parse("LIQUIDITY_EXECUTOR").unwrap_or(Address::ZERO),
            watched_pools: parse_addresses("WATCHED_POOLS"),
            ..Default::default()
        };

        Self {
            network: env::var("NETWORK").unwrap_or_else(|_| "mainnet".to_string()),
            rpc_url: env::var("RPC_URL").ok(),
            relay_url: env::var("BUNDLE_RELAY_URL")
                .unwrap_or_else(|_| "https://relay.flashbots.net".to_string()),
            signer_url: env::var("SIGNER_URL").unwrap_or_else(|_| "http://127.0.0.1:8645".to_string()),
            activity_feed_url: env::var("ACTIVITY_FEED_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8700".to_string()),
            pool_data_url: env::var("POOL_DATA_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8701".to_string()),
            enable_trade_execution: env_flag("ENABLE_TRADE_EXECUTION", false),
            max_consecutive_errors: 5,
            circuit_breaker_cooldown_secs: 300, // 5 minutes
            risk_check_interval: Duration::from_secs(env_parse("RISK_CHECK_INTERVAL_SECS").unwrap_or(10)),
            risk: RiskConfig {
                limits,
                var_confidence: env_parse("VAR_CONFIDENCE")
                    .unwrap_or(DEFAULT_VAR_CONFIDENCE)
                    .clamp(0.5, 0.999),
                ..Default::default()
            },
            block,
            mirror,
            liquidity,
        }
    }
}
