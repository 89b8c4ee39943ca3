//! Priority-fee auction for a top-of-block execution slot
//!
//! An attempt walks IDLE → ANALYZING → PRICING → TIMED_SUBMIT → MONITORING and
//! ends in SUCCESS or MISSED. A miss is an ordinary result: the caller may retry
//! against a fresh pending snapshot.

use alloy::primitives::Address;
use rust_decimal::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::{
    config::{
        BlockConfig, CONGESTION_WEIGHT, DIRECT_SLOT_COMPETITOR_LIMIT, GAS_PRICE_BUFFER,
        SLOT_MULTIPLIERS, SUBMIT_FRACTION_OF_BLOCK,
    },
    errors::{BotError, BotResult},
    execution::{abortable_sleep, ExecutionEngine, FeeBid},
    risk::RiskGate,
    types::{
        BlockCompetitionSnapshot, CompetitionLevel, NetworkTelemetry, PendingTx, SnipePhase,
        SnipeResult, StrategyStatus, TradeOpportunity,
    },
    utils::{gwei_to_wei, PeriodicTask},
};

pub const STRATEGY_NAME: &str = "block_positioning";

/// Slot 0 when the field is thin, otherwise the 10th-percentile competitor rank, at most 5.
pub fn target_slot(competitors: usize) -> usize {
    if competitors <= DIRECT_SLOT_COMPETITOR_LIMIT {
        return 0;
    }
    let rank = (competitors as f64 * 0.1).floor() as usize;
    rank.min(SLOT_MULTIPLIERS.len() - 1)
}

pub fn congestion_level(pending: usize, capacity: usize) -> f64 {
    if capacity == 0 {
        return 1.0;
    }
    (pending as f64 / capacity as f64).clamp(0.0, 1.0)
}

/// base × slotMultiplier × (1 + congestion × 0.5) × 1.1, capped at `cap` wei.
pub fn slot_gas_price(base_gas: u128, slot: usize, congestion: f64, cap: u128) -> u128 {
    let multiplier = SLOT_MULTIPLIERS[slot.min(SLOT_MULTIPLIERS.len() - 1)];
    let congestion = Decimal::from_f64(congestion.clamp(0.0, 1.0)).unwrap_or_default();
    let Some(base) = Decimal::from_u128(base_gas) else {
        return cap;
    };
    let price = base
        * multiplier
        * (Decimal::ONE + congestion * CONGESTION_WEIGHT)
        * GAS_PRICE_BUFFER;
    price.ceil().to_u128().unwrap_or(cap).min(cap)
}

/// Time left until ~30% into the current block interval.
pub fn submission_delay(block_interval: Duration, since_last_block: Duration) -> Duration {
    block_interval
        .mul_f64(SUBMIT_FRACTION_OF_BLOCK)
        .saturating_sub(since_last_block)
}

pub fn competitors_for(pending: &[PendingTx], target: Address) -> usize {
    pending.iter().filter(|tx| tx.to == Some(target)).count()
}

pub struct BlockPositioningStrategy {
    config: BlockConfig,
    engine: Arc<ExecutionEngine>,
    risk: Arc<RiskGate>,
    telemetry: RwLock<NetworkTelemetry>,
    in_flight: AtomicUsize,
    attempts: AtomicU64,
    successes: AtomicU64,
    missed: AtomicU64,
    cancel: CancellationToken,
}

impl BlockPositioningStrategy {
    pub fn new(config: BlockConfig, engine: Arc<ExecutionEngine>, risk: Arc<RiskGate>) -> Self {
        Self {
            config,
            engine,
            risk,
            telemetry: RwLock::new(NetworkTelemetry::default()),
            in_flight: AtomicUsize::new(0),
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            missed: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    fn gas_cap(&self) -> u128 {
        gwei_to_wei(self.config.max_gas_price_gwei)
    }

    fn transition(&self, opportunity: &TradeOpportunity, phase: SnipePhase) {
        debug!(opportunity = %opportunity.id, phase = ?phase, "Snipe phase");
    }

    pub async fn refresh_congestion(&self) -> anyhow::Result<()> {
        let ledger = self.engine.ledger();
        let pending = ledger.pending_transactions().await?;
        let gas_price = ledger.gas_price().await?;
        let congestion = congestion_level(pending.len(), self.config.congestion_capacity);

        let mut telemetry = self.telemetry.write().await;
        telemetry.pending_count = pending.len();
        telemetry.congestion = congestion;
        telemetry.base_gas_price = gas_price;
        debug!(pending = pending.len(), congestion, gas_price, "Congestion refreshed");
        Ok(())
    }

    pub async fn refresh_block(&self) -> anyhow::Result<()> {
        let block = self.engine.ledger().block_number().await?;
        let mut telemetry = self.telemetry.write().await;
        if block > telemetry.block_number {
            telemetry.block_number = block;
            telemetry.last_block_seen = Some(Instant::now());
        }
        Ok(())
    }

    pub async fn telemetry(&self) -> NetworkTelemetry {
        self.telemetry.read().await.clone()
    }

    pub async fn analyze(&self, opportunity: &TradeOpportunity) -> BotResult<BlockCompetitionSnapshot> {
        let ledger = self.engine.ledger();
        let pending = ledger.pending_transactions().await
            .map_err(|e| BotError::network("Pending snapshot failed", e))?;
        let telemetry = self.telemetry.read().await.clone();

        let base_gas_price = if telemetry.base_gas_price > 0 {
            telemetry.base_gas_price
        } else {
            ledger.gas_price().await.map_err(|e| BotError::network("Gas price fetch failed", e))?
        };

        let congestion = congestion_level(pending.len(), self.config.congestion_capacity);
        let competitors = competitors_for(&pending, opportunity.payload.to);
        let slot = target_slot(competitors);
        let since_last = telemetry.last_block_seen.map(|t| t.elapsed()).unwrap_or_default();

        Ok(BlockCompetitionSnapshot {
            block_number: telemetry.block_number,
            target_slot: slot,
            competitors,
            competition_level: CompetitionLevel::from_competitors(competitors),
            congestion,
            base_gas_price,
            required_gas_price: slot_gas_price(base_gas_price, slot, congestion, self.gas_cap()),
            time_to_next_block: self.config.block_interval.saturating_sub(since_last),
        })
    }

    pub async fn snipe(&self, opportunity: &TradeOpportunity, amount: Decimal) -> SnipeResult {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        let result = match self.try_snipe(opportunity, amount).await {
            Ok(result) => result,
            Err(e) => {
                warn!(opportunity = %opportunity.id, "Snipe failed: {}", e);
                SnipeResult::from(e)
            }
        };
        self.in_flight.fetch_sub(1, Ordering::Relaxed);

        if result.success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else if result.tx_hash.is_some() {
            self.missed.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    async fn try_snipe(&self, opportunity: &TradeOpportunity, amount: Decimal) -> BotResult<SnipeResult> {
        self.transition(opportunity, SnipePhase::Analyzing);
        self.risk.authorize(opportunity, amount).await?;
        let snapshot = self.analyze(opportunity).await?;

        self.transition(opportunity, SnipePhase::Pricing);
        let fee = FeeBid {
            max_fee_per_gas: snapshot.required_gas_price,
            max_priority_fee_per_gas: snapshot.required_gas_price.saturating_sub(snapshot.base_gas_price),
        };
        let payload = &opportunity.payload;
        let tx = self.engine.build_transaction(
            payload.to,
            payload.calldata.clone(),
            payload.value,
            payload.gas_limit,
            fee,
        );
        let raw = self.engine.sign(tx).await?;

        info!(
            opportunity = %opportunity.id,
            slot = snapshot.target_slot,
            competitors = snapshot.competitors,
            level = ?snapshot.competition_level,
            gas_price = snapshot.required_gas_price,
            "🎯 Slot priced"
        );

        self.transition(opportunity, SnipePhase::TimedSubmit);
        let since_last = self.config.block_interval.saturating_sub(snapshot.time_to_next_block);
        let delay = submission_delay(self.config.block_interval, since_last);
        let mut breach_rx = self.risk.subscribe_breaches();
        abortable_sleep(delay, &mut breach_rx, &self.cancel).await?;
        if let Some(action) = self.risk.outstanding_critical().await {
            return Err(BotError::BreachCritical { action });
        }

        let tx_hash = self.engine.broadcast(raw).await?;

        self.transition(opportunity, SnipePhase::Monitoring);
        let wait = self.config.block_interval * self.config.inclusion_blocks.max(1);
        let inclusion = match self.engine.await_inclusion(tx_hash, wait).await {
            Ok(inclusion) => inclusion,
            Err(e) => {
                self.transition(opportunity, SnipePhase::Missed);
                return Ok(SnipeResult {
                    success: false,
                    tx_hash: Some(tx_hash),
                    block_position: None,
                    error: Some(e.to_string()),
                });
            }
        };

        let landed_in_slot = inclusion.position < self.config.top_n_slots;
        let error = if !inclusion.succeeded {
            Some(format!("reverted at block {}", inclusion.block_number))
        } else if !landed_in_slot {
            Some(format!(
                "missed slot: landed at position {} (target {})",
                inclusion.position, snapshot.target_slot
            ))
        } else {
            None
        };

        let phase = if error.is_none() { SnipePhase::Success } else { SnipePhase::Missed };
        self.transition(opportunity, phase);

        Ok(SnipeResult {
            success: error.is_none(),
            tx_hash: Some(tx_hash),
            block_position: Some(inclusion.position),
            error,
        })
    }

    pub async fn status(&self) -> StrategyStatus {
        let telemetry = self.telemetry.read().await;
        StrategyStatus {
            name: STRATEGY_NAME,
            operational: !self.cancel.is_cancelled(),
            current_block: telemetry.block_number,
            congestion: telemetry.congestion,
            active_positions: self.in_flight.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
        }
    }

    pub fn missed(&self) -> u64 {
        self.missed.load(Ordering::Relaxed)
    }

    pub fn start(self: Arc<Self>) -> Vec<PeriodicTask> {
        let congestion = {
            let strategy = self.clone();
            PeriodicTask::spawn("congestion_refresh", self.config.congestion_refresh, &self.cancel, move || {
                let strategy = strategy.clone();
                async move { strategy.refresh_congestion().await }
            })
        };
        let block = {
            let strategy = self.clone();
            PeriodicTask::spawn("block_refresh", self.config.block_refresh, &self.cancel, move || {
                let strategy = strategy.clone();
                async move { strategy.refresh_block().await }
            })
        };
        vec![congestion, block]
    }

    /// Stops the telemetry tasks and aborts any attempt still in its timing phase.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}
