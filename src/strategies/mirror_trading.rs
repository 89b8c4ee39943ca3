//! Replicates transactions of tracked high-performing accounts
//!
//! A copy is only attempted while the observed transaction is younger than the
//! eligibility window; the replica is submitted after a random jitter that always
//! fits inside what is left of that window.

use alloy::primitives::{Address, TxHash};
use chrono::Utc;
use rand::Rng;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::{
    config::{MirrorConfig, EXPECTED_PROFIT_HAIRCUT, GAS_PRICE_BUFFER, OVERSIZE_DISCOUNT, VOLATILITY_DISCOUNT},
    errors::{BotError, BotResult},
    execution::{abortable_sleep, ExecutionEngine, FeeBid},
    network::AccountActivityFeed,
    risk::RiskGate,
    types::{
        AccountStats, AccountTrade, CopyAnalysis, CopyPosition, CopyPositionStatus, CopyResult,
        CopySignal, ExecutionPayload, ObservedTx, Position, RiskBucket, RiskTier, StrategyStatus,
        TrackedAccount, TradeOpportunity,
    },
    utils::PeriodicTask,
    volatility::VolatilityCalculator,
};

pub const STRATEGY_NAME: &str = "mirror_trading";

const MIN_HISTORY_FOR_STATS: usize = 10;
const MAX_HISTORY: usize = 100;
const SEEN_CAPACITY: usize = 10_000;
const VOLATILITY_WINDOW: Duration = Duration::from_secs(15 * 60);
const EXPIRY_SWEEP: Duration = Duration::from_secs(10);
/// Slack past a replica's lifetime before the sweep treats its position as orphaned.
const ORPHAN_GRACE: Duration = Duration::from_secs(5);

pub fn validate_account(stats: &AccountStats, config: &MirrorConfig) -> Result<(), String> {
    if stats.win_rate <= config.min_win_rate {
        return Err(format!("win rate {:.2} not above {:.2}", stats.win_rate, config.min_win_rate));
    }
    if stats.total_profit <= config.min_total_profit {
        return Err(format!("total profit ${:.2} not above ${:.2}", stats.total_profit, config.min_total_profit));
    }
    if stats.avg_trade_size <= config.min_avg_trade_size {
        return Err(format!(
            "average trade ${:.2} not above ${:.2}",
            stats.avg_trade_size, config.min_avg_trade_size
        ));
    }
    if stats.consistency_score <= config.min_consistency {
        return Err(format!(
            "consistency {:.2} not above {:.2}",
            stats.consistency_score, config.min_consistency
        ));
    }
    Ok(())
}

/// Blend of win rate and consistency; oversized trades and volatile markets each take 20% off.
pub fn copy_confidence(stats: &AccountStats, amount: Decimal, volatility: f64, config: &MirrorConfig) -> f64 {
    let mut confidence = stats.win_rate * 0.6 + stats.consistency_score * 0.4;
    if amount > stats.avg_trade_size * dec!(2) {
        confidence *= OVERSIZE_DISCOUNT;
    }
    if volatility > config.high_volatility {
        confidence *= VOLATILITY_DISCOUNT;
    }
    confidence.clamp(0.0, 1.0)
}

pub fn analyze_copy(stats: &AccountStats, amount: Decimal, volatility: f64, config: &MirrorConfig) -> CopyAnalysis {
    let expected_profit =
        amount * Decimal::from_f64(stats.avg_return * EXPECTED_PROFIT_HAIRCUT).unwrap_or_default();

    let size_score = if stats.avg_trade_size > dec!(0) {
        (amount / (stats.avg_trade_size * dec!(5))).to_f64().unwrap_or(1.0).min(1.0)
    } else {
        1.0
    };
    let performance_score = (1.0 - stats.win_rate).clamp(0.0, 1.0);
    let volatility_score = (volatility / (config.high_volatility * 2.0)).clamp(0.0, 1.0);
    let risk_score = 0.4 * size_score + 0.3 * performance_score + 0.3 * volatility_score;
    let risk_bucket = match risk_score {
        s if s < 0.3 => RiskBucket::Low,
        s if s < 0.6 => RiskBucket::Medium,
        _ => RiskBucket::High,
    };

    CopyAnalysis {
        expected_profit,
        risk_score,
        risk_bucket,
        confidence: copy_confidence(stats, amount, volatility, config),
    }
}

/// Ages at or past the window are rejected.
pub fn check_signal_age(age_ms: i64, config: &MirrorConfig) -> BotResult<()> {
    if age_ms >= config.max_signal_age_ms {
        return Err(BotError::validation(format!(
            "observed transaction is {}ms old, window is {}ms",
            age_ms, config.max_signal_age_ms
        )));
    }
    Ok(())
}

/// Random delay that leaves `submit_margin_ms` of the window after it, or `None`
/// when even the minimum jitter no longer fits.
pub fn replication_jitter<R: Rng + ?Sized>(age_ms: i64, config: &MirrorConfig, rng: &mut R) -> Option<Duration> {
    let (min_jitter, max_jitter) = config.jitter_ms;
    let remaining = config.max_signal_age_ms - age_ms.max(0) - config.submit_margin_ms;
    if remaining < min_jitter as i64 {
        return None;
    }
    let upper = max_jitter.min(remaining as u64).max(min_jitter);
    Some(Duration::from_millis(rng.random_range(min_jitter..=upper)))
}

/// Rolls statistics over the account's recent completed trades.
pub fn rolling_stats(history: &VecDeque<AccountTrade>) -> AccountStats {
    let trade_count = history.len();
    if trade_count < MIN_HISTORY_FOR_STATS {
        return AccountStats { trade_count, ..Default::default() };
    }

    let n = Decimal::from(trade_count);
    let wins = history.iter().filter(|t| t.profit_usd > dec!(0)).count();
    let total_profit: Decimal = history.iter().map(|t| t.profit_usd).sum();
    let total_size: Decimal = history.iter().map(|t| t.size_usd).sum();

    let returns: Vec<f64> = history
        .iter()
        .filter(|t| t.size_usd > dec!(0))
        .filter_map(|t| (t.profit_usd / t.size_usd).to_f64())
        .collect();
    let (avg_return, consistency_score) = if returns.is_empty() {
        (0.0, 0.0)
    } else {
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
        let consistency = if mean > 0.0 { 1.0 / (1.0 + variance.sqrt() / mean) } else { 0.0 };
        (mean, consistency)
    };

    AccountStats {
        win_rate: wins as f64 / trade_count as f64,
        total_profit,
        avg_trade_size: total_size / n,
        consistency_score,
        avg_return,
        trade_count,
    }
}

fn bucket_tier(bucket: RiskBucket) -> RiskTier {
    match bucket {
        RiskBucket::Low => RiskTier::Low,
        RiskBucket::Medium => RiskTier::Medium,
        RiskBucket::High => RiskTier::High,
    }
}

/// Bounded set of observed hashes so each transaction is signalled once.
struct SeenHashes {
    set: HashSet<TxHash>,
    order: VecDeque<TxHash>,
}

impl SeenHashes {
    fn new() -> Self {
        Self { set: HashSet::new(), order: VecDeque::new() }
    }

    fn insert(&mut self, hash: TxHash) -> bool {
        if !self.set.insert(hash) {
            return false;
        }
        self.order.push_back(hash);
        if self.order.len() > SEEN_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        true
    }
}

struct AccountBook {
    account: TrackedAccount,
    history: VecDeque<AccountTrade>,
}

pub struct MirrorTradingStrategy {
    config: MirrorConfig,
    engine: Arc<ExecutionEngine>,
    risk: Arc<RiskGate>,
    feed: Arc<dyn AccountActivityFeed>,
    accounts: RwLock<HashMap<Address, AccountBook>>,
    positions: Mutex<HashMap<String, CopyPosition>>,
    seen: Mutex<SeenHashes>,
    volatility: RwLock<VolatilityCalculator>,
    attempts: AtomicU64,
    successes: AtomicU64,
    cancel: CancellationToken,
}

impl MirrorTradingStrategy {
    pub fn new(
        config: MirrorConfig,
        engine: Arc<ExecutionEngine>,
        risk: Arc<RiskGate>,
        feed: Arc<dyn AccountActivityFeed>,
    ) -> Self {
        let accounts = config
            .tracked_accounts
            .iter()
            .map(|address| {
                (*address, AccountBook { account: TrackedAccount::new(*address), history: VecDeque::new() })
            })
            .collect();

        Self {
            config,
            engine,
            risk,
            feed,
            accounts: RwLock::new(accounts),
            positions: Mutex::new(HashMap::new()),
            seen: Mutex::new(SeenHashes::new()),
            volatility: RwLock::new(VolatilityCalculator::new(VOLATILITY_WINDOW)),
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn track_account(&self, account: TrackedAccount) {
        info!(account = %account.address, label = ?account.label, "👀 Tracking account");
        let mut accounts = self.accounts.write().await;
        accounts
            .entry(account.address)
            .and_modify(|book| book.account = account.clone())
            .or_insert(AccountBook { account, history: VecDeque::new() });
    }

    pub async fn untrack_account(&self, address: Address) -> bool {
        self.accounts.write().await.remove(&address).is_some()
    }

    pub async fn tracked_accounts(&self) -> Vec<TrackedAccount> {
        self.accounts.read().await.values().map(|b| b.account.clone()).collect()
    }

    pub async fn account(&self, address: Address) -> Option<TrackedAccount> {
        self.accounts.read().await.get(&address).map(|b| b.account.clone())
    }

    /// Appends a completed trade and re-rolls the account's statistics.
    pub async fn record_account_trade(&self, address: Address, trade: AccountTrade) -> Option<AccountStats> {
        let mut accounts = self.accounts.write().await;
        let book = accounts.get_mut(&address)?;
        book.history.push_back(trade);
        if book.history.len() > MAX_HISTORY {
            book.history.pop_front();
        }
        book.account.stats = rolling_stats(&book.history);
        Some(book.account.stats.clone())
    }

    pub async fn current_volatility(&self) -> f64 {
        self.volatility.read().await.volatility().unwrap_or(0.0)
    }

    pub async fn open_positions(&self) -> Vec<CopyPosition> {
        self.positions.lock().await.values().cloned().collect()
    }

    /// Open copy positions as exposures for the portfolio update.
    pub async fn exposures(&self) -> Vec<Position> {
        self.positions
            .lock().await
            .values()
            .map(|p| Position {
                asset: format!("copy:{}", p.id),
                exposure_usd: p.amount_usd,
                liquid_usd: None,
            })
            .collect()
    }

    /// Polls every tracked account once and returns fresh, never-seen signals.
    pub async fn scan_signals(&self) -> Vec<CopySignal> {
        let accounts = self.tracked_accounts().await;
        let volatility = self.current_volatility().await;
        let now = Utc::now();
        let mut signals = Vec::new();

        for account in accounts {
            let txs = match self.feed.recent_transactions(account.address).await {
                Ok(txs) => txs,
                Err(e) => {
                    warn!(account = %account.address, "Activity poll failed: {:#}", e);
                    continue;
                }
            };

            let mut latest = account.last_activity;
            for tx in txs {
                if tx.from != account.address || !self.seen.lock().await.insert(tx.hash) {
                    continue;
                }
                if let Some(price) = tx.execution_price.and_then(|p| p.to_f64()) {
                    self.volatility.write().await.add_price(price);
                }
                latest = latest.max(Some(tx.observed_at));

                if tx.age_ms(now) >= self.config.max_signal_age_ms {
                    debug!(tx = %tx.hash, age_ms = tx.age_ms(now), "Observed transaction already stale");
                    continue;
                }
                let confidence = copy_confidence(&account.stats, tx.amount_usd, volatility, &self.config);
                signals.push(CopySignal { account: account.clone(), tx, confidence });
            }

            if latest != account.last_activity {
                if let Some(book) = self.accounts.write().await.get_mut(&account.address) {
                    book.account.last_activity = latest;
                }
            }
        }

        if !signals.is_empty() {
            debug!(count = signals.len(), "Copy signals found");
        }
        signals
    }

    pub async fn copy(&self, account: &TrackedAccount, observed: &ObservedTx, confidence: f64) -> CopyResult {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        match self.try_copy(account, observed, confidence).await {
            Ok(result) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                result
            }
            Err(e) => {
                warn!(account = %account.address, tx = %observed.hash, "Copy skipped: {}", e);
                CopyResult::from(e)
            }
        }
    }

    async fn try_copy(&self, account: &TrackedAccount, observed: &ObservedTx, confidence: f64) -> BotResult<CopyResult> {
        check_signal_age(observed.age_ms(Utc::now()), &self.config)?;

        validate_account(&account.stats, &self.config)
            .map_err(|reason| BotError::validation(format!("account not eligible: {reason}")))?;

        let volatility = self.current_volatility().await;
        let analysis = analyze_copy(&account.stats, observed.amount_usd, volatility, &self.config);
        let effective_confidence = analysis.confidence.min(confidence);

        if analysis.expected_profit <= self.config.min_expected_profit {
            return Err(BotError::validation(format!(
                "expected profit ${:.2} not above ${:.2}",
                analysis.expected_profit, self.config.min_expected_profit
            )));
        }
        if effective_confidence <= self.config.min_confidence {
            return Err(BotError::validation(format!(
                "confidence {:.2} not above {:.2}",
                effective_confidence, self.config.min_confidence
            )));
        }

        let position_id = self.reserve_position(account, observed, &analysis).await?;
        let lifetime = self.replica_lifetime();
        let result = match tokio::time::timeout(
            lifetime,
            self.replicate(&position_id, observed, &analysis, effective_confidence),
        ).await {
            Ok(result) => result,
            Err(_) => {
                let replica = self.positions.lock().await.get(&position_id).and_then(|p| p.replica_tx);
                Err(BotError::execution(
                    replica,
                    format!("replica unresolved after {}ms", lifetime.as_millis()),
                ))
            }
        };
        self.positions.lock().await.remove(&position_id);
        result
    }

    /// Upper bound on how long one copy may hold a position slot.
    pub fn replica_lifetime(&self) -> Duration {
        self.config.replica_timeout + Duration::from_millis(self.config.max_signal_age_ms.max(0) as u64)
    }

    async fn reserve_position(
        &self,
        account: &TrackedAccount,
        observed: &ObservedTx,
        analysis: &CopyAnalysis,
    ) -> BotResult<String> {
        let mut positions = self.positions.lock().await;
        if positions.len() >= self.config.max_open_positions {
            return Err(BotError::validation(format!(
                "concurrent copy limit of {} reached",
                self.config.max_open_positions
            )));
        }
        if positions.values().any(|p| p.observed_tx == observed.hash) {
            return Err(BotError::validation("observed transaction already being copied"));
        }

        let id = format!("copy-{}", uuid::Uuid::new_v4());
        positions.insert(id.clone(), CopyPosition {
            id: id.clone(),
            account: account.address,
            observed_tx: observed.hash,
            replica_tx: None,
            amount_usd: observed.amount_usd,
            expected_profit: analysis.expected_profit,
            status: CopyPositionStatus::Reserved,
            opened_at: Utc::now(),
        });
        Ok(id)
    }

    async fn replicate(
        &self,
        position_id: &str,
        observed: &ObservedTx,
        analysis: &CopyAnalysis,
        confidence: f64,
    ) -> BotResult<CopyResult> {
        let opportunity = TradeOpportunity {
            id: position_id.to_string(),
            token_in: observed.token_in,
            token_out: observed.token_out,
            buy_venue: observed.to.to_string(),
            sell_venue: observed.to.to_string(),
            loan_amount: observed.amount_usd,
            potential_profit: analysis.expected_profit,
            success_probability: confidence,
            risk_tier: bucket_tier(analysis.risk_bucket),
            payload: ExecutionPayload {
                to: observed.to,
                calldata: observed.input.clone(),
                value: observed.value,
                gas_limit: observed.gas_limit,
            },
        };
        self.risk.authorize(&opportunity, observed.amount_usd).await?;

        let gas_price = self.engine.ledger().gas_price().await
            .map_err(|e| BotError::network("Gas price fetch failed", e))?;
        let max_fee = (Decimal::from_u128(gas_price).unwrap_or_default() * GAS_PRICE_BUFFER)
            .ceil()
            .to_u128()
            .unwrap_or(gas_price);
        let payload = &opportunity.payload;
        let tx = self.engine.build_transaction(
            payload.to,
            payload.calldata.clone(),
            payload.value,
            payload.gas_limit,
            FeeBid { max_fee_per_gas: max_fee, max_priority_fee_per_gas: max_fee.saturating_sub(gas_price) },
        );
        let raw = self.engine.sign(tx).await?;

        let age = observed.age_ms(Utc::now());
        let jitter = replication_jitter(age, &self.config, &mut rand::rng())
            .ok_or_else(|| BotError::validation(format!("eligibility window closed at {age}ms")))?;
        debug!(position = position_id, jitter_ms = jitter.as_millis() as u64, "Replica jitter");

        let mut breach_rx = self.risk.subscribe_breaches();
        abortable_sleep(jitter, &mut breach_rx, &self.cancel).await?;
        if let Some(action) = self.risk.outstanding_critical().await {
            return Err(BotError::BreachCritical { action });
        }

        let tx_hash = self.engine.broadcast(raw).await?;
        if let Some(position) = self.positions.lock().await.get_mut(position_id) {
            position.replica_tx = Some(tx_hash);
            position.status = CopyPositionStatus::Submitted;
        }
        info!(position = position_id, original = %observed.hash, replica = %tx_hash, "🪞 Replica submitted");

        let inclusion = self.engine.await_inclusion(tx_hash, self.config.replica_timeout).await?;
        if !inclusion.succeeded {
            return Err(BotError::execution(
                Some(tx_hash),
                format!("replica reverted at block {}", inclusion.block_number),
            ));
        }

        Ok(CopyResult {
            success: true,
            tx_hash: Some(tx_hash),
            profit: Some(analysis.expected_profit),
            error: None,
        })
    }

    /// Drops positions whose copy future was dropped before releasing them.
    /// Live copies release their slot within `replica_lifetime`, so anything older is orphaned.
    pub async fn expire_positions(&self) -> usize {
        let max_age = chrono::Duration::from_std(self.replica_lifetime() + ORPHAN_GRACE).unwrap_or_default();
        let now = Utc::now();
        let mut positions = self.positions.lock().await;
        let before = positions.len();
        positions.retain(|_, p| now - p.opened_at <= max_age);
        let expired = before - positions.len();
        if expired > 0 {
            warn!(expired, "Expired stale copy positions");
        }
        expired
    }

    pub async fn status(&self) -> StrategyStatus {
        StrategyStatus {
            name: STRATEGY_NAME,
            operational: !self.cancel.is_cancelled(),
            current_block: 0,
            congestion: 0.0,
            active_positions: self.positions.lock().await.len(),
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
        }
    }

    /// Starts the activity monitor; signals go to `signals`, execution stays with the receiver.
    pub fn start(self: Arc<Self>, signals: mpsc::Sender<CopySignal>) -> Vec<PeriodicTask> {
        let monitor = {
            let strategy = self.clone();
            PeriodicTask::spawn("mirror_activity", self.config.scan_interval, &self.cancel, move || {
                let strategy = strategy.clone();
                let signals = signals.clone();
                async move {
                    for signal in strategy.scan_signals().await {
                        if let Err(e) = signals.try_send(signal) {
                            debug!("Copy signal dropped: {}", e);
                        }
                    }
                    Ok(())
                }
            })
        };
        let expiry = {
            let strategy = self.clone();
            PeriodicTask::spawn("mirror_expiry", EXPIRY_SWEEP, &self.cancel, move || {
                let strategy = strategy.clone();
                async move {
                    strategy.expire_positions().await;
                    Ok(())
                }
            })
        };
        vec![monitor, expiry]
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn strong_stats() -> AccountStats {
        AccountStats {
            win_rate: 0.9,
            total_profit: dec!(50000),
            avg_trade_size: dec!(20000),
            consistency_score: 0.9,
            avg_return: 0.01,
            trade_count: 100,
        }
    }

    #[test]
    fn account_gating() {
        let config = MirrorConfig::default();
        assert!(validate_account(&strong_stats(), &config).is_ok());

        let mut weak = strong_stats();
        weak.win_rate = 0.6;
        assert!(validate_account(&weak, &config).unwrap_err().contains("win rate"));

        let mut erratic = strong_stats();
        erratic.consistency_score = 0.5;
        assert!(validate_account(&erratic, &config).unwrap_err().contains("consistency"));

        let mut borderline = strong_stats();
        borderline.win_rate = 0.75;
        assert!(validate_account(&borderline, &config).is_err());
    }

    #[test]
    fn confidence_discounts() {
        let config = MirrorConfig::default();
        let stats = strong_stats();
        assert!((copy_confidence(&stats, dec!(20000), 0.0, &config) - 0.9).abs() < 1e-12);
        assert!((copy_confidence(&stats, dec!(50000), 0.0, &config) - 0.72).abs() < 1e-12);
        assert!((copy_confidence(&stats, dec!(50000), 0.1, &config) - 0.576).abs() < 1e-12);

        let mut mixed = strong_stats();
        mixed.win_rate = 1.0;
        mixed.consistency_score = 0.5;
        assert!((copy_confidence(&mixed, dec!(20000), 0.0, &config) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn analysis_profit_and_bucket() {
        let config = MirrorConfig::default();
        let analysis = analyze_copy(&strong_stats(), dec!(20000), 0.0, &config);
        // 20000 * 0.01 * 0.8
        assert_eq!(analysis.expected_profit.round_dp(6), dec!(160));
        // 0.4 * 0.2 + 0.3 * 0.1 + 0
        assert!((analysis.risk_score - 0.11).abs() < 1e-9);
        assert_eq!(analysis.risk_bucket, RiskBucket::Low);

        let risky = analyze_copy(&strong_stats(), dec!(200000), 0.2, &config);
        assert_eq!(risky.risk_bucket, RiskBucket::High);
    }

    #[test]
    fn age_gate_closes_at_the_window() {
        let config = MirrorConfig::default();
        assert!(check_signal_age(0, &config).is_ok());
        assert!(check_signal_age(1999, &config).is_ok());
        assert!(check_signal_age(2000, &config).unwrap_err().to_string().contains("2000ms old"));
    }

    #[test]
    fn jitter_fits_remaining_window() {
        let config = MirrorConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for age in [0i64, 500, 1200, 1500, 1700, 1850] {
            let jitter = replication_jitter(age, &config, &mut rng).unwrap();
            let ms = jitter.as_millis() as i64;
            assert!(ms >= 100 && ms <= 500);
            assert!(age + ms + config.submit_margin_ms <= config.max_signal_age_ms);
        }
        assert!(replication_jitter(1950, &config, &mut rng).is_none());

        let narrowed = MirrorConfig { submit_margin_ms: 200, ..MirrorConfig::default() };
        assert!(replication_jitter(1750, &narrowed, &mut rng).is_none());
        assert!(replication_jitter(2500, &config, &mut rng).is_none());
    }

    #[test]
    fn stats_roll_from_history() {
        let mut history = VecDeque::new();
        for i in 0..5 {
            history.push_back(AccountTrade { size_usd: dec!(1000), profit_usd: dec!(10) + Decimal::from(i) });
        }
        assert_eq!(rolling_stats(&history).win_rate, 0.0);

        for _ in 0..5 {
            history.push_back(AccountTrade { size_usd: dec!(1000), profit_usd: dec!(-5) });
        }
        let stats = rolling_stats(&history);
        assert_eq!(stats.trade_count, 10);
        assert_eq!(stats.win_rate, 0.5);
        assert_eq!(stats.avg_trade_size, dec!(1000));
        assert_eq!(stats.total_profit, dec!(35));
        assert!(stats.avg_return > 0.0);
        assert!(stats.consistency_score > 0.0 && stats.consistency_score < 1.0);
    }

    #[test]
    fn seen_hashes_are_bounded() {
        let mut seen = SeenHashes::new();
        assert!(seen.insert(TxHash::repeat_byte(1)));
        assert!(!seen.insert(TxHash::repeat_byte(1)));
        for i in 0..SEEN_CAPACITY as u64 {
            seen.insert(TxHash::left_padding_from(&(i + 10).to_be_bytes()));
        }
        assert_eq!(seen.set.len(), SEEN_CAPACITY);
        assert!(seen.insert(TxHash::repeat_byte(1)));
    }
}
