//! Aero Exec Engine - Main Entry Point
//!
//! Wires the ledger, signer and data collaborators into the shared engine, starts the
//! strategy monitors and the risk loop, and dispatches signals until Ctrl+C.

use aero_exec_engine::*;
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use aero_exec_engine::{
    errors::CircuitBreaker,
    execution::ExecutionEngine,
    network::{
        BundleRelay, HttpActivityFeed, HttpBundleRelay, HttpPoolDataSource, LedgerClient, PoolDataSource,
        RemoteSigner, RpcLedger, TransactionSigner,
    },
    risk::RiskGate,
    strategies::{
        transient_liquidity::balanced_amounts, BlockPositioningStrategy, MirrorTradingStrategy,
        TransientLiquidityStrategy,
    },
    utils::PeriodicTask,
};

const STATS_INTERVAL: Duration = Duration::from_secs(300);
const SIGNAL_QUEUE: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    let _logging_guard = utils::setup_logging()?;

    let config = CONFIG.clone();

    info!("🛩️  Aero Exec Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Network: {}", config.network);
    info!("   Max Position: ${}", config.risk.limits.max_position_size);
    info!("   Max VaR: {}%", config.risk.limits.max_var * rust_decimal_macros::dec!(100));
    info!("   Max Leverage: {}x", config.risk.limits.max_leverage);
    info!("   Max Gas Price: {} gwei", config.block.max_gas_price_gwei);
    info!("   Tracked Accounts: {}", config.mirror.tracked_accounts.len());
    info!("   Watched Pools: {}", config.liquidity.watched_pools.len());
    info!("   Trade Execution: {}", config.enable_trade_execution);
    if !config.enable_trade_execution {
        info!("   👀 Monitor-only mode: signals are logged, nothing is broadcast");
    }

    // Setup collaborators
    let provider = network::setup_provider(&config).await?;
    let ledger: Arc<dyn LedgerClient> = Arc::new(RpcLedger::new(provider));
    let signer: Arc<dyn TransactionSigner> = Arc::new(RemoteSigner::connect(&config.signer_url).await?);
    let feed = Arc::new(HttpActivityFeed::new(&config.activity_feed_url)?);
    let pools: Arc<dyn PoolDataSource> = Arc::new(HttpPoolDataSource::new(&config.pool_data_url)?);
    let relay: Arc<dyn BundleRelay> = Arc::new(HttpBundleRelay::new(&config.relay_url)?);

    let engine = Arc::new(ExecutionEngine::new(ledger.clone(), signer.clone()));
    let risk = Arc::new(RiskGate::new(config.risk.clone()));
    let circuit_breaker = Arc::new(CircuitBreaker::new(
        "dispatcher",
        config.max_consecutive_errors,
        Duration::from_secs(config.circuit_breaker_cooldown_secs),
    ));

    let block = Arc::new(BlockPositioningStrategy::new(config.block.clone(), engine.clone(), risk.clone()));
    let mirror = Arc::new(MirrorTradingStrategy::new(config.mirror.clone(), engine.clone(), risk.clone(), feed));
    let liquidity = Arc::new(TransientLiquidityStrategy::new(
        config.liquidity.clone(),
        engine.clone(),
        risk.clone(),
        pools.clone(),
        relay,
    ));

    let (copy_tx, mut copy_rx) = mpsc::channel(SIGNAL_QUEUE);
    let (proposal_tx, mut proposal_rx) = mpsc::channel(SIGNAL_QUEUE);

    let root = CancellationToken::new();
    let mut tasks: Vec<PeriodicTask> = Vec::new();
    tasks.extend(block.clone().start());
    tasks.extend(mirror.clone().start(copy_tx));
    tasks.extend(liquidity.clone().start(proposal_tx));
    tasks.push({
        let risk = risk.clone();
        let mirror = mirror.clone();
        let ledger = ledger.clone();
        let pools = pools.clone();
        let account = signer.address();
        PeriodicTask::spawn("risk_monitor", config.risk_check_interval, &root, move || {
            let risk = risk.clone();
            let mirror = mirror.clone();
            let ledger = ledger.clone();
            let pools = pools.clone();
            async move {
                let balance = ledger.balance(account).await?;
                let native = pools.native_price_usd().await?;
                let value = utils::from_raw_units(balance, 18) * native;
                risk.update_portfolio_metrics(mirror.exposures().await, value).await;
                risk.check_breaches().await;
                Ok(())
            }
        })
    });

    // Setup shutdown handler
    let shutdown = root.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("\n📛 Received shutdown signal (Ctrl+C)...");
        shutdown.cancel();
    });

    info!("\n🚀 Starting dispatcher loop...\n");
    let start_time = Instant::now();
    let mut stats_interval = time::interval(STATS_INTERVAL);
    stats_interval.tick().await;

    loop {
        tokio::select! {
            _ = root.cancelled() => {
                info!("Shutdown signal received, exiting dispatcher loop...");
                break;
            }
            Some(signal) = copy_rx.recv() => {
                info!(
                    account = %signal.account.address,
                    tx = %signal.tx.hash,
                    confidence = signal.confidence,
                    "🪞 Copy signal"
                );
                if !config.enable_trade_execution {
                    continue;
                }
                if let Err(e) = circuit_breaker.check().await {
                    debug!("Dispatch held: {}", e);
                    continue;
                }
                let mirror = mirror.clone();
                let breaker = circuit_breaker.clone();
                tokio::spawn(async move {
                    let result = mirror.copy(&signal.account, &signal.tx, signal.confidence).await;
                    if result.success {
                        breaker.record_success().await;
                    } else if result.tx_hash.is_some() {
                        breaker.record_error().await;
                    }
                });
            }
            Some(opportunity) = proposal_rx.recv() => {
                utils::print_liquidity_opportunity(&opportunity);
                if !config.enable_trade_execution {
                    continue;
                }
                if let Err(e) = circuit_breaker.check().await {
                    debug!("Dispatch held: {}", e);
                    continue;
                }
                let liquidity = liquidity.clone();
                let pools = pools.clone();
                let breaker = circuit_breaker.clone();
                tokio::spawn(async move {
                    let conditions = match pools.pool_conditions(opportunity.pool).await {
                        Ok(conditions) => conditions,
                        Err(e) => {
                            warn!(pool = %opportunity.pool, "Pool conditions unavailable: {:#}", e);
                            return;
                        }
                    };
                    let (amount_a, amount_b) = balanced_amounts(&conditions, opportunity.position_value_usd);
                    let result = liquidity
                        .provide(conditions.pool, conditions.token_a, conditions.token_b, amount_a, amount_b)
                        .await;
                    if result.success {
                        breaker.record_success().await;
                    } else if result.tx_hash.is_some() {
                        breaker.record_error().await;
                    }
                });
            }
            _ = stats_interval.tick() => {
                let statuses = vec![block.status().await, mirror.status().await, liquidity.status().await];
                utils::print_session_stats(start_time, &statuses, &circuit_breaker).await;
                utils::print_risk_report(&risk.risk_report().await);
            }
        }
    }

    block.stop();
    mirror.stop();
    liquidity.stop();
    for task in tasks {
        task.join().await;
    }

    let statuses = vec![block.status().await, mirror.status().await, liquidity.status().await];
    utils::print_session_stats(start_time, &statuses, &circuit_breaker).await;
    info!("Exec engine shutdown complete");
    Ok(())
}
