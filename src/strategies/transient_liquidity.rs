//! Just-in-time liquidity around a large pending swap
//!
//! The add, the counterpart swap and the remove go out as one bundle for the next
//! block. If an add is ever seen without its remove, a standalone remove is sent.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use crate::{
    config::{LiquidityConfig, FEE_CAPTURE_SHARE, GAS_PRICE_BUFFER},
    errors::{BotError, BotResult},
    execution::{AtomicBundle, BundleLeg, BundleOutcome, ExecutionEngine, FeeBid},
    network::{BundleRelay, PoolDataSource},
    risk::RiskGate,
    types::{
        ExecutionPayload, LiquidityOpportunity, LiquidityResult, PendingSwap, PoolConditions,
        RiskTier, StrategyStatus, TradeOpportunity,
    },
    utils::{gas_cost_usd, to_raw_units, PeriodicTask},
};

pub const STRATEGY_NAME: &str = "transient_liquidity";

const LEG_GAS_LIMIT: u64 = 250_000;

alloy::sol! {
    interface ILiquidityExecutor {
        function addLiquidity(address pool, address tokenA, address tokenB, uint256 amountA, uint256 amountB, uint256 deadlineBlock) external;
        function removeLiquidity(address pool, address tokenA, address tokenB, uint256 deadlineBlock) external;
    }
}

/// Fraction a trade of `trade_usd` moves a pool holding `liquidity_usd`.
pub fn predicted_price_impact(trade_usd: Decimal, liquidity_usd: Decimal) -> f64 {
    let depth = liquidity_usd + trade_usd;
    if depth <= dec!(0) {
        return 0.0;
    }
    (trade_usd / depth).to_f64().unwrap_or(0.0)
}

/// |impact| × (1 + volatility) × capture rate.
pub fn capture_fraction(price_impact: f64, volatility: f64, capture_rate: f64) -> f64 {
    price_impact.abs() * (1.0 + volatility.max(0.0)) * capture_rate
}

fn to_decimal(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or_default()
}

pub fn evaluate_capture(
    conditions: &PoolConditions,
    counterpart: &PendingSwap,
    price_impact: f64,
    position_value_usd: Decimal,
    gas_cost_usd: Decimal,
    config: &LiquidityConfig,
) -> LiquidityOpportunity {
    let expected_divergence = to_decimal(capture_fraction(price_impact, conditions.volatility, config.capture_rate));
    let gas_cost = if position_value_usd > dec!(0) {
        gas_cost_usd / position_value_usd
    } else {
        dec!(1)
    };
    let net_profit = expected_divergence - gas_cost;

    LiquidityOpportunity {
        pool: conditions.pool,
        counterpart: counterpart.clone(),
        price_impact,
        position_value_usd,
        expected_divergence,
        gas_cost,
        net_profit,
        expected_divergence_usd: expected_divergence * position_value_usd,
        expected_fees_usd: FEE_CAPTURE_SHARE * conditions.volume_24h_usd * conditions.fee_tier,
        gas_cost_usd,
        net_profit_usd: net_profit * position_value_usd,
        detected_at: Utc::now(),
    }
}

/// Splits `value_usd` evenly across both sides of the pool, in token units.
pub fn balanced_amounts(conditions: &PoolConditions, value_usd: Decimal) -> (Decimal, Decimal) {
    let half = value_usd / dec!(2);
    let side = |price: Decimal| if price > dec!(0) { half / price } else { dec!(0) };
    (side(conditions.price_a_usd), side(conditions.price_b_usd))
}

pub fn check_profitable(opportunity: &LiquidityOpportunity, config: &LiquidityConfig) -> Result<(), String> {
    if opportunity.expected_divergence <= opportunity.gas_cost {
        return Err(format!(
            "capture {:.4} does not cover gas {:.4}",
            opportunity.expected_divergence, opportunity.gas_cost
        ));
    }
    if opportunity.net_profit <= config.min_net_profit {
        return Err(format!(
            "net profit {:.4} not above {:.4}",
            opportunity.net_profit, config.min_net_profit
        ));
    }
    Ok(())
}

pub struct TransientLiquidityStrategy {
    config: LiquidityConfig,
    engine: Arc<ExecutionEngine>,
    risk: Arc<RiskGate>,
    pools: Arc<dyn PoolDataSource>,
    relay: Arc<dyn BundleRelay>,
    counterparts: RwLock<HashMap<Address, PendingSwap>>,
    proposals: RwLock<Vec<LiquidityOpportunity>>,
    active: AtomicUsize,
    attempts: AtomicU64,
    successes: AtomicU64,
    cancel: CancellationToken,
}

impl TransientLiquidityStrategy {
    pub fn new(
        config: LiquidityConfig,
        engine: Arc<ExecutionEngine>,
        risk: Arc<RiskGate>,
        pools: Arc<dyn PoolDataSource>,
        relay: Arc<dyn BundleRelay>,
    ) -> Self {
        Self {
            config,
            engine,
            risk,
            pools,
            relay,
            counterparts: RwLock::new(HashMap::new()),
            proposals: RwLock::new(Vec::new()),
            active: AtomicUsize::new(0),
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    async fn bundle_gas_usd(&self) -> anyhow::Result<(u128, Decimal)> {
        let gas_price = self.engine.ledger().gas_price().await?;
        let native = self.pools.native_price_usd().await?;
        Ok((gas_price, gas_cost_usd(self.config.bundle_gas_units, gas_price, native)))
    }

    /// Largest qualifying pending swap per pool, then proposals that clear the profit bar.
    pub async fn scan_opportunities(&self) -> anyhow::Result<Vec<LiquidityOpportunity>> {
        let pending = self.engine.ledger().pending_transactions().await?;
        let (_, gas_usd) = self.bundle_gas_usd().await?;

        let mut largest: HashMap<Address, PendingSwap> = HashMap::new();
        for tx in &pending {
            let swap = match self.pools.decode_swap(tx).await {
                Ok(Some(swap)) => swap,
                Ok(None) => continue,
                Err(e) => {
                    debug!(tx = %tx.hash, "Swap decode failed: {:#}", e);
                    continue;
                }
            };
            if !self.config.watched_pools.is_empty() && !self.config.watched_pools.contains(&swap.pool) {
                continue;
            }
            if swap.amount_usd < self.config.min_counterpart_usd {
                continue;
            }
            let replace = largest.get(&swap.pool).is_none_or(|current| swap.amount_usd > current.amount_usd);
            if replace {
                largest.insert(swap.pool, swap);
            }
        }

        let mut counterparts = HashMap::new();
        let mut proposals = Vec::new();
        for (pool, swap) in largest {
            let conditions = match self.pools.pool_conditions(pool).await {
                Ok(conditions) => conditions,
                Err(e) => {
                    warn!(pool = %pool, "Pool conditions unavailable: {:#}", e);
                    continue;
                }
            };
            let impact = predicted_price_impact(swap.amount_usd, conditions.liquidity_usd);
            if impact < self.config.min_price_impact {
                continue;
            }

            let opportunity = evaluate_capture(
                &conditions,
                &swap,
                impact,
                self.config.scan_position_usd,
                gas_usd,
                &self.config,
            );
            counterparts.insert(pool, swap);
            match check_profitable(&opportunity, &self.config) {
                Ok(()) => proposals.push(opportunity),
                Err(reason) => debug!(pool = %pool, "Pool skipped: {}", reason),
            }
        }

        proposals.sort_by(|a, b| b.net_profit.cmp(&a.net_profit));
        if !proposals.is_empty() {
            info!(count = proposals.len(), best = %proposals[0].net_profit_usd.round_dp(2), "💧 Liquidity opportunities");
        }

        *self.counterparts.write().await = counterparts;
        *self.proposals.write().await = proposals.clone();
        Ok(proposals)
    }

    pub async fn proposals(&self) -> Vec<LiquidityOpportunity> {
        self.proposals.read().await.clone()
    }

    /// Registers a counterpart swap directly, bypassing discovery.
    pub async fn set_counterpart(&self, swap: PendingSwap) {
        self.counterparts.write().await.insert(swap.pool, swap);
    }

    pub async fn provide(
        &self,
        pool: Address,
        token_a: Address,
        token_b: Address,
        amount_a: Decimal,
        amount_b: Decimal,
    ) -> LiquidityResult {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
        let result = self.try_provide(pool, token_a, token_b, amount_a, amount_b).await;
        self.active.fetch_sub(1, Ordering::Relaxed);

        match result {
            Ok(result) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                result
            }
            Err(e) => {
                warn!(pool = %pool, "Liquidity provision failed: {}", e);
                LiquidityResult::from(e)
            }
        }
    }

    async fn try_provide(
        &self,
        pool: Address,
        token_a: Address,
        token_b: Address,
        amount_a: Decimal,
        amount_b: Decimal,
    ) -> BotResult<LiquidityResult> {
        let counterpart = self.counterparts.read().await.get(&pool).cloned()
            .ok_or_else(|| BotError::validation(format!("no pending counterpart swap for pool {pool}")))?;

        let conditions = self.pools.pool_conditions(pool).await
            .map_err(|e| BotError::network("Pool conditions fetch failed", e))?;
        let (price_a, price_b, decimals_a, decimals_b) = if (token_a, token_b) == (conditions.token_a, conditions.token_b) {
            (conditions.price_a_usd, conditions.price_b_usd, conditions.decimals_a, conditions.decimals_b)
        } else if (token_a, token_b) == (conditions.token_b, conditions.token_a) {
            (conditions.price_b_usd, conditions.price_a_usd, conditions.decimals_b, conditions.decimals_a)
        } else {
            return Err(BotError::validation(format!("tokens do not match pool {pool}")));
        };
        let position_value = amount_a * price_a + amount_b * price_b;

        let (gas_price, gas_usd) = self.bundle_gas_usd().await
            .map_err(|e| BotError::network("Gas cost estimate failed", e))?;
        let impact = predicted_price_impact(counterpart.amount_usd, conditions.liquidity_usd);
        let opportunity = evaluate_capture(&conditions, &counterpart, impact, position_value, gas_usd, &self.config);
        check_profitable(&opportunity, &self.config).map_err(BotError::validation)?;

        let add_call = ILiquidityExecutor::addLiquidityCall {
            pool,
            tokenA: token_a,
            tokenB: token_b,
            amountA: to_raw_units(amount_a, decimals_a),
            amountB: to_raw_units(amount_b, decimals_b),
            deadlineBlock: U256::ZERO,
        };
        let trade = TradeOpportunity {
            id: format!("tlp-{}-{}", pool, counterpart.tx_hash),
            token_in: token_a,
            token_out: token_b,
            buy_venue: pool.to_string(),
            sell_venue: pool.to_string(),
            loan_amount: position_value,
            potential_profit: opportunity.net_profit_usd,
            success_probability: self.config.bundle_success_probability,
            risk_tier: RiskTier::Medium,
            payload: ExecutionPayload {
                to: self.config.executor,
                calldata: Bytes::from(add_call.abi_encode()),
                value: U256::ZERO,
                gas_limit: LEG_GAS_LIMIT,
            },
        };
        self.risk.authorize(&trade, position_value).await?;

        let counterpart_raw = self.engine.ledger().raw_transaction(counterpart.tx_hash).await
            .map_err(|e| BotError::network("Counterpart lookup failed", e))?
            .ok_or_else(|| BotError::validation("counterpart swap is no longer pending"))?;

        let head = self.engine.ledger().block_number().await
            .map_err(|e| BotError::network("Block number fetch failed", e))?;
        let target_block = head + 1;
        let fee = self.fee_bid(gas_price);

        let add_call = ILiquidityExecutor::addLiquidityCall { deadlineBlock: U256::from(target_block), ..add_call };
        let add_raw = self.sign_leg(add_call.abi_encode(), fee).await?;
        let remove_raw = self.sign_leg(self.remove_calldata(pool, token_a, token_b, target_block), fee).await?;

        let bundle = AtomicBundle::new()
            .push(BundleLeg::owned("add", add_raw))
            .push(BundleLeg::foreign("counterpart", counterpart_raw))
            .push(BundleLeg::owned("remove", remove_raw));
        let add_hash = bundle.leg("add").map(|l| l.hash);

        if let Some(action) = self.risk.outstanding_critical().await {
            return Err(BotError::BreachCritical { action });
        }
        let bundle_id = bundle.submit(self.relay.as_ref(), target_block).await?;
        info!(pool = %pool, bundle = %bundle_id, target_block, value = %position_value.round_dp(2), "📦 Liquidity bundle submitted");

        let last_block = target_block + self.config.inclusion_blocks.saturating_sub(1) as u64;
        let timeout = self.config.block_interval * (self.config.inclusion_blocks + 1);
        let outcome = bundle.await_outcome(&self.engine, last_block, timeout, self.engine.poll_interval()).await;
        if outcome.leaves_open("add", "remove") {
            let unwind = self.emergency_remove(pool, token_a, token_b).await;
            return Err(BotError::execution(
                add_hash,
                format!("add leg settled without remove, unwind {}", match unwind {
                    Ok(hash) => format!("sent as {hash}"),
                    Err(e) => format!("failed: {e}"),
                }),
            ));
        }

        match outcome {
            BundleOutcome::Landed(legs) => {
                if let Some((label, reverted)) = legs.iter().find(|(_, i)| !i.succeeded) {
                    return Err(BotError::execution(
                        Some(reverted.tx_hash),
                        format!("bundle {label} leg reverted at block {}", reverted.block_number),
                    ));
                }
                Ok(LiquidityResult {
                    success: true,
                    tx_hash: add_hash,
                    profit: Some(opportunity.net_profit_usd),
                    error: None,
                })
            }
            BundleOutcome::NotIncluded => Err(BotError::execution(
                None,
                format!("bundle not included by block {last_block}"),
            )),
            BundleOutcome::Partial { missing, .. } => {
                Err(BotError::execution(add_hash, format!("partial bundle inclusion, missing {missing:?}")))
            }
        }
    }

    fn fee_bid(&self, gas_price: u128) -> FeeBid {
        let max_fee = (Decimal::from_u128(gas_price).unwrap_or_default() * GAS_PRICE_BUFFER)
            .ceil()
            .to_u128()
            .unwrap_or(gas_price);
        FeeBid {
            max_fee_per_gas: max_fee,
            max_priority_fee_per_gas: max_fee.saturating_sub(gas_price),
        }
    }

    fn remove_calldata(&self, pool: Address, token_a: Address, token_b: Address, deadline_block: u64) -> Vec<u8> {
        ILiquidityExecutor::removeLiquidityCall {
            pool,
            tokenA: token_a,
            tokenB: token_b,
            deadlineBlock: U256::from(deadline_block),
        }
        .abi_encode()
    }

    async fn sign_leg(&self, calldata: Vec<u8>, fee: FeeBid) -> BotResult<Bytes> {
        let tx = self.engine.build_transaction(
            self.config.executor,
            Bytes::from(calldata),
            U256::ZERO,
            LEG_GAS_LIMIT,
            fee,
        );
        self.engine.sign(tx).await
    }

    /// Withdraws whatever liquidity the executor still holds in `pool`.
    pub async fn emergency_remove(&self, pool: Address, token_a: Address, token_b: Address) -> BotResult<TxHash> {
        let ledger = self.engine.ledger();
        let gas_price = ledger.gas_price().await
            .map_err(|e| BotError::network("Gas price fetch failed", e))?;
        let head = ledger.block_number().await
            .map_err(|e| BotError::network("Block number fetch failed", e))?;
        let deadline = head + self.config.inclusion_blocks as u64 + 1;

        let raw = self.sign_leg(self.remove_calldata(pool, token_a, token_b, deadline), self.fee_bid(gas_price)).await?;
        let hash = self.engine.broadcast(raw).await?;
        error!(pool = %pool, tx = %hash, "🚨 Emergency liquidity removal broadcast");
        Ok(hash)
    }

    pub async fn status(&self) -> StrategyStatus {
        StrategyStatus {
            name: STRATEGY_NAME,
            operational: !self.cancel.is_cancelled(),
            current_block: 0,
            congestion: 0.0,
            active_positions: self.active.load(Ordering::Relaxed),
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
        }
    }

    /// Starts periodic discovery; proposals go to `proposals`, execution stays with the receiver.
    pub fn start(self: Arc<Self>, proposals: mpsc::Sender<LiquidityOpportunity>) -> Vec<PeriodicTask> {
        let strategy = self.clone();
        let scan = PeriodicTask::spawn("liquidity_scan", self.config.scan_interval, &self.cancel, move || {
            let strategy = strategy.clone();
            let proposals = proposals.clone();
            async move {
                for opportunity in strategy.scan_opportunities().await? {
                    if let Err(e) = proposals.try_send(opportunity) {
                        debug!("Liquidity proposal dropped: {}", e);
                    }
                }
                Ok(())
            }
        });
        vec![scan]
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}
