//! Pending-pool and block-slot competition types

use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A not-yet-included transaction from the pending snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTx {
    pub hash: TxHash,
    pub from: Address,
    pub to: Option<Address>,
    /// Effective gas price bid in wei.
    pub gas_price: u128,
    pub value_wei: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompetitionLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl CompetitionLevel {
    pub fn from_competitors(count: usize) -> Self {
        match count {
            0..=5 => CompetitionLevel::Low,
            6..=20 => CompetitionLevel::Moderate,
            21..=50 => CompetitionLevel::High,
            _ => CompetitionLevel::Extreme,
        }
    }
}

/// Ephemeral, one per snipe attempt.
#[derive(Debug, Clone, Serialize)]
pub struct BlockCompetitionSnapshot {
    pub block_number: u64,
    pub target_slot: usize,
    pub competitors: usize,
    pub competition_level: CompetitionLevel,
    pub congestion: f64,
    pub base_gas_price: u128,
    pub required_gas_price: u128,
    pub time_to_next_block: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SnipePhase {
    Idle,
    Analyzing,
    Pricing,
    TimedSubmit,
    Monitoring,
    Success,
    Missed,
}

/// Rolling network statistics refreshed by the telemetry tasks.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkTelemetry {
    pub block_number: u64,
    pub base_gas_price: u128,
    pub congestion: f64,
    pub pending_count: usize,
    #[serde(skip)]
    pub last_block_seen: Option<std::time::Instant>,
}

impl Default for NetworkTelemetry {
    fn default() -> Self {
        Self {
            block_number: 0,
            base_gas_price: 0,
            congestion: 0.0,
            pending_count: 0,
            last_block_seen: None,
        }
    }
}
