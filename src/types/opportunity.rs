//! Trade opportunity as handed over by the discovery layer

use alloy::primitives::{Address, Bytes, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Transaction payload the orchestrator prepared for this opportunity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPayload {
    pub to: Address,
    pub calldata: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

/// Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOpportunity {
    pub id: String,
    pub token_in: Address,
    pub token_out: Address,
    pub buy_venue: String,
    pub sell_venue: String,
    pub loan_amount: Decimal,
    pub potential_profit: Decimal,
    pub success_probability: f64,
    pub risk_tier: RiskTier,
    pub payload: ExecutionPayload,
}

impl TradeOpportunity {
    pub fn asset_pair(&self) -> String {
        format!("{}/{}", self.token_in, self.token_out)
    }
}
