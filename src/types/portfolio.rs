//! Portfolio state and fixed risk limits

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub asset: String,
    /// Signed USD exposure; shorts are negative.
    pub exposure_usd: Decimal,
    /// Portion of the position that can be unwound within a block, when known.
    pub liquid_usd: Option<Decimal>,
}

/// Derived entirely by `RiskGate::update_portfolio_metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioState {
    pub positions: HashMap<String, Position>,
    pub total_value: Decimal,
    pub total_exposure: Decimal,
    pub leverage: Decimal,
    pub liquidity_ratio: Decimal,
    pub largest_concentration: Decimal,
}

impl Default for PortfolioState {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            total_value: dec!(0),
            total_exposure: dec!(0),
            leverage: dec!(0),
            liquidity_ratio: dec!(1),
            largest_concentration: dec!(0),
        }
    }
}

/// Ratios (`max_var`, `max_drawdown`, `max_concentration`, `min_liquidity_ratio`)
/// are fractions of total portfolio value.
#[derive(Debug, Clone, Serialize)]
pub struct RiskLimits {
    pub max_position_size: Decimal,
    pub max_var: Decimal,
    pub max_drawdown: Decimal,
    pub max_leverage: Decimal,
    pub max_concentration: Decimal,
    pub min_liquidity_ratio: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_size: dec!(100000),
            max_var: dec!(0.05),
            max_drawdown: dec!(0.20),
            max_leverage: dec!(3),
            max_concentration: dec!(0.25),
            min_liquidity_ratio: dec!(0.30),
        }
    }
}
