//! Strategy execution results and introspection

use alloy::primitives::TxHash;
use rust_decimal::Decimal;
use serde::Serialize;
use crate::errors::BotError;

#[derive(Debug, Clone, Serialize)]
pub struct SnipeResult {
    pub success: bool,
    pub tx_hash: Option<TxHash>,
    pub block_position: Option<u64>,
    pub error: Option<String>,
}

impl From<BotError> for SnipeResult {
    fn from(e: BotError) -> Self {
        Self {
            success: false,
            tx_hash: e.tx_hash(),
            block_position: None,
            error: Some(e.to_string()),
        }
    }
}

impl SnipeResult {
    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            tx_hash: None,
            block_position: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyResult {
    pub success: bool,
    pub tx_hash: Option<TxHash>,
    pub profit: Option<Decimal>,
    pub error: Option<String>,
}

impl From<BotError> for CopyResult {
    fn from(e: BotError) -> Self {
        Self {
            success: false,
            tx_hash: e.tx_hash(),
            profit: None,
            error: Some(e.to_string()),
        }
    }
}

impl CopyResult {
    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            tx_hash: None,
            profit: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LiquidityResult {
    pub success: bool,
    pub tx_hash: Option<TxHash>,
    pub profit: Option<Decimal>,
    pub error: Option<String>,
}

impl From<BotError> for LiquidityResult {
    fn from(e: BotError) -> Self {
        Self {
            success: false,
            tx_hash: e.tx_hash(),
            profit: None,
            error: Some(e.to_string()),
        }
    }
}

impl LiquidityResult {
    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            tx_hash: None,
            profit: None,
            error: Some(error.to_string()),
        }
    }
}

/// Receipt facts the strategies care about.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Inclusion {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub position: u64,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyStatus {
    pub name: &'static str,
    pub operational: bool,
    pub current_block: u64,
    pub congestion: f64,
    pub active_positions: usize,
    pub attempts: u64,
    pub successes: u64,
}
