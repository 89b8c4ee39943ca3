//! Mirror-trading account and position types

use alloy::primitives::{Address, Bytes, TxHash, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct AccountStats {
    pub win_rate: f64,
    pub total_profit: Decimal,
    pub avg_trade_size: Decimal,
    pub consistency_score: f64,
    /// Mean profit per unit traded.
    pub avg_return: f64,
    pub trade_count: usize,
}

impl Default for AccountStats {
    fn default() -> Self {
        Self {
            win_rate: 0.0,
            total_profit: dec!(0),
            avg_trade_size: dec!(0),
            consistency_score: 0.0,
            avg_return: 0.0,
            trade_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackedAccount {
    pub address: Address,
    pub label: Option<String>,
    pub stats: AccountStats,
    pub last_activity: Option<DateTime<Utc>>,
}

impl TrackedAccount {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            label: None,
            stats: AccountStats::default(),
            last_activity: None,
        }
    }
}

/// A completed trade by a tracked account, used to roll its statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTrade {
    pub size_usd: Decimal,
    pub profit_usd: Decimal,
}

/// Transaction seen on the account-activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedTx {
    pub hash: TxHash,
    pub from: Address,
    pub to: Address,
    #[serde(default)]
    pub token_in: Address,
    #[serde(default)]
    pub token_out: Address,
    pub input: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    pub amount_usd: Decimal,
    pub execution_price: Option<Decimal>,
    pub observed_at: DateTime<Utc>,
}

impl ObservedTx {
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.observed_at).num_milliseconds()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyAnalysis {
    pub expected_profit: Decimal,
    pub risk_score: f64,
    pub risk_bucket: RiskBucket,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CopyPositionStatus {
    Reserved,
    Submitted,
}

/// Link between an observed transaction and its replica.
#[derive(Debug, Clone, Serialize)]
pub struct CopyPosition {
    pub id: String,
    pub account: Address,
    pub observed_tx: TxHash,
    pub replica_tx: Option<TxHash>,
    pub amount_usd: Decimal,
    pub expected_profit: Decimal,
    pub status: CopyPositionStatus,
    pub opened_at: DateTime<Utc>,
}

/// Candidate surfaced by the activity monitor; execution is a separate call.
#[derive(Debug, Clone)]
pub struct CopySignal {
    pub account: TrackedAccount,
    pub tx: ObservedTx,
    pub confidence: f64,
}
