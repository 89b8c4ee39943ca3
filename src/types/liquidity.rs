//! Transient-liquidity pool and opportunity types

use alloy::primitives::{Address, TxHash};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pool snapshot from the pool-data service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConditions {
    pub pool: Address,
    pub token_a: Address,
    pub token_b: Address,
    pub liquidity_usd: Decimal,
    pub volume_24h_usd: Decimal,
    /// e.g. 0.003 for a 30 bps pool.
    pub fee_tier: Decimal,
    pub volatility: f64,
    pub price_a_usd: Decimal,
    pub price_b_usd: Decimal,
    pub decimals_a: u8,
    pub decimals_b: u8,
}

/// A large swap sitting in the pending pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSwap {
    pub tx_hash: TxHash,
    pub pool: Address,
    pub amount_usd: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiquidityOpportunity {
    pub pool: Address,
    pub counterpart: PendingSwap,
    pub price_impact: f64,
    pub position_value_usd: Decimal,
    /// Fractions of position value.
    pub expected_divergence: Decimal,
    pub gas_cost: Decimal,
    pub net_profit: Decimal,
    pub expected_divergence_usd: Decimal,
    pub expected_fees_usd: Decimal,
    pub gas_cost_usd: Decimal,
    pub net_profit_usd: Decimal,
    pub detected_at: DateTime<Utc>,
}
