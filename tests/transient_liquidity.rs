mod common;

use aero_exec_engine::{
    config::LiquidityConfig,
    strategies::TransientLiquidityStrategy,
    types::{PendingSwap, PendingTx, PoolConditions},
};
use alloy::primitives::{Address, Bytes, TxHash};
use common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

const POOL: Address = Address::repeat_byte(0xaa);
const USDC: Address = Address::repeat_byte(0x01);
const WETH: Address = Address::repeat_byte(0x02);
const WHALE_SWAP: TxHash = TxHash::repeat_byte(0x99);

fn conditions(liquidity: Decimal) -> PoolConditions {
    PoolConditions {
        pool: POOL,
        token_a: USDC,
        token_b: WETH,
        liquidity_usd: liquidity,
        volume_24h_usd: dec!(5000000),
        fee_tier: dec!(0.003),
        volatility: 0.1,
        price_a_usd: dec!(1),
        price_b_usd: dec!(3000),
        decimals_a: 6,
        decimals_b: 18,
    }
}

struct Harness {
    ledger: Arc<FakeLedger>,
    pools: Arc<FakePools>,
    relay: Arc<FakeRelay>,
    gate: Arc<aero_exec_engine::risk::RiskGate>,
    strategy: TransientLiquidityStrategy,
}

/// A pool of `liquidity` USD with one pending swap of `swap_usd` against it.
async fn harness(liquidity: Decimal, swap_usd: Decimal, mode: RelayMode, config: LiquidityConfig) -> Harness {
    let ledger = FakeLedger::new(500, 10 * GWEI);
    let signer = FakeSigner::new();
    let pools = FakePools::new(dec!(3000));
    let relay = FakeRelay::new(ledger.clone(), mode);
    let gate = funded_gate(dec!(1000000)).await;

    pools.conditions.lock().unwrap().insert(POOL, conditions(liquidity));
    pools.swaps.lock().unwrap().insert(WHALE_SWAP, PendingSwap { tx_hash: WHALE_SWAP, pool: POOL, amount_usd: swap_usd });
    ledger.add_pending(
        PendingTx {
            hash: WHALE_SWAP,
            from: Address::repeat_byte(0xee),
            to: Some(POOL),
            gas_price: 12 * GWEI,
            value_wei: 0,
        },
        Bytes::from_static(b"whale-swap"),
    );

    let strategy = TransientLiquidityStrategy::new(
        config,
        engine(ledger.clone(), signer),
        gate.clone(),
        pools.clone(),
        relay.clone(),
    );
    Harness { ledger, pools, relay, gate, strategy }
}

fn fast_config() -> LiquidityConfig {
    LiquidityConfig {
        block_interval: Duration::from_millis(100),
        ..Default::default()
    }
}

#[tokio::test]
async fn small_impact_pool_is_not_proposed() {
    // 150k into 30M moves the price about 0.5%
    let config = LiquidityConfig { min_price_impact: 0.001, ..fast_config() };
    let h = harness(dec!(30000000), dec!(150000), RelayMode::LandAll, config).await;

    let proposals = h.strategy.scan_opportunities().await.unwrap();

    assert!(proposals.is_empty());
    assert!(h.strategy.proposals().await.is_empty());
}

#[tokio::test]
async fn large_swap_into_thin_pool_is_proposed() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::LandAll, fast_config()).await;

    let proposals = h.strategy.scan_opportunities().await.unwrap();

    assert_eq!(proposals.len(), 1);
    let best = &proposals[0];
    assert_eq!(best.pool, POOL);
    assert_eq!(best.counterpart.tx_hash, WHALE_SWAP);
    assert!(best.net_profit > dec!(0.02));
    // 450k gas at 10 gwei and $3000
    assert_eq!(best.gas_cost_usd, dec!(13.5));
}

#[tokio::test]
async fn swaps_below_the_size_floor_are_ignored() {
    let h = harness(dec!(1000000), dec!(50000), RelayMode::LandAll, fast_config()).await;

    assert!(h.strategy.scan_opportunities().await.unwrap().is_empty());
    let result = h.strategy.provide(POOL, USDC, WETH, dec!(25000), dec!(8)).await;
    assert!(result.error.unwrap().contains("no pending counterpart"));
}

#[tokio::test]
async fn bundle_wraps_the_counterpart_and_lands() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::LandAll, fast_config()).await;
    h.strategy.scan_opportunities().await.unwrap();

    let result = h.strategy.provide(POOL, USDC, WETH, dec!(25000), dec!(8)).await;

    assert!(result.success, "{:?}", result.error);
    assert!(result.tx_hash.is_some());
    assert!(result.profit.unwrap() > dec!(0));

    let bundles = h.relay.bundles.lock().unwrap().clone();
    assert_eq!(bundles.len(), 1);
    let (txs, target_block) = &bundles[0];
    assert_eq!(*target_block, 501);
    assert_eq!(txs.len(), 3);
    assert_eq!(txs[1], Bytes::from_static(b"whale-swap"));
    assert_eq!(h.ledger.broadcast_count(), 0);

    let status = h.strategy.status().await;
    assert_eq!((status.attempts, status.successes, status.active_positions), (1, 1, 0));
}

#[tokio::test]
async fn reversed_token_order_is_accepted() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::LandAll, fast_config()).await;
    h.strategy.scan_opportunities().await.unwrap();

    let result = h.strategy.provide(POOL, WETH, USDC, dec!(8), dec!(25000)).await;
    assert!(result.success, "{:?}", result.error);
}

#[tokio::test]
async fn foreign_tokens_are_rejected() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::LandAll, fast_config()).await;
    h.strategy.scan_opportunities().await.unwrap();

    let result = h.strategy.provide(POOL, USDC, Address::repeat_byte(0x03), dec!(25000), dec!(8)).await;
    assert!(result.error.unwrap().contains("tokens do not match"));
    assert_eq!(h.relay.bundle_count(), 0);
}

#[tokio::test]
async fn missed_bundle_reports_failure() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::Drop, fast_config()).await;
    h.strategy.scan_opportunities().await.unwrap();

    let result = h.strategy.provide(POOL, USDC, WETH, dec!(25000), dec!(8)).await;

    assert!(!result.success);
    assert!(result.tx_hash.is_none());
    assert!(result.error.unwrap().contains("not included"));
    assert_eq!(h.ledger.broadcast_count(), 0);
}

#[tokio::test]
async fn relay_refusal_is_an_execution_failure() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::Reject, fast_config()).await;
    h.strategy.scan_opportunities().await.unwrap();

    let result = h.strategy.provide(POOL, USDC, WETH, dec!(25000), dec!(8)).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("relay refused bundle"));
}

#[tokio::test]
async fn add_without_remove_triggers_an_unwind() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::LandFirstOnly, fast_config()).await;
    h.strategy.scan_opportunities().await.unwrap();

    let result = h.strategy.provide(POOL, USDC, WETH, dec!(25000), dec!(8)).await;

    assert!(!result.success);
    assert!(result.tx_hash.is_some());
    assert!(result.error.unwrap().contains("unwind sent"));
    assert_eq!(h.ledger.broadcast_count(), 1);
}

#[tokio::test]
async fn reverted_remove_leg_triggers_an_unwind() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::RevertLast, fast_config()).await;
    h.strategy.scan_opportunities().await.unwrap();

    let result = h.strategy.provide(POOL, USDC, WETH, dec!(25000), dec!(8)).await;

    assert!(!result.success);
    assert!(result.tx_hash.is_some());
    assert!(result.error.unwrap().contains("unwind sent"));
    assert_eq!(h.relay.bundle_count(), 1);
    assert_eq!(h.ledger.broadcast_count(), 1);
}

#[tokio::test]
async fn counterpart_that_left_the_pool_is_rejected() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::LandAll, fast_config()).await;
    h.strategy.scan_opportunities().await.unwrap();
    h.ledger.raw.lock().unwrap().clear();

    let result = h.strategy.provide(POOL, USDC, WETH, dec!(25000), dec!(8)).await;

    assert!(result.error.unwrap().contains("no longer pending"));
    assert_eq!(h.relay.bundle_count(), 0);
}

#[tokio::test]
async fn critical_breach_blocks_the_bundle() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::LandAll, fast_config()).await;
    h.strategy.scan_opportunities().await.unwrap();
    trip_leverage_breach(&h.gate, dec!(1000000)).await;

    let result = h.strategy.provide(POOL, USDC, WETH, dec!(25000), dec!(8)).await;

    assert!(result.error.unwrap().contains("Critical portfolio breach"));
    assert_eq!(h.relay.bundle_count(), 0);
}

#[tokio::test]
async fn explicit_counterpart_skips_discovery() {
    let h = harness(dec!(10000000), dec!(1000000), RelayMode::LandAll, fast_config()).await;
    let swap = h.pools.swaps.lock().unwrap().get(&WHALE_SWAP).cloned().unwrap();
    h.strategy.set_counterpart(swap).await;

    let result = h.strategy.provide(POOL, USDC, WETH, dec!(25000), dec!(8)).await;
    assert!(result.success, "{:?}", result.error);
}
