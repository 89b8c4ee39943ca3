//! In-memory collaborators for the strategy tests

#![allow(dead_code)]

use aero_exec_engine::{
    execution::ExecutionEngine,
    network::{AccountActivityFeed, BundleRelay, LedgerClient, PoolDataSource, TransactionSigner},
    risk::RiskGate,
    config::RiskConfig,
    types::{Inclusion, ObservedTx, PendingSwap, PendingTx, PoolConditions, Position},
};
use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::rpc::types::eth::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GWEI: u128 = 1_000_000_000;

pub struct FakeLedger {
    pub block: AtomicU64,
    pub gas_price: Mutex<u128>,
    pub balance: Mutex<U256>,
    pub pending: Mutex<Vec<PendingTx>>,
    pub raw: Mutex<HashMap<TxHash, Bytes>>,
    pub receipts: Mutex<HashMap<TxHash, Inclusion>>,
    pub broadcasts: Mutex<Vec<Bytes>>,
    /// When set, every broadcast is mined at (position, succeeded).
    pub auto_include: Mutex<Option<(u64, bool)>>,
    /// Held before every broadcast returns.
    pub broadcast_delay: Mutex<Duration>,
}

impl FakeLedger {
    pub fn new(block: u64, gas_price: u128) -> Arc<Self> {
        Arc::new(Self {
            block: AtomicU64::new(block),
            gas_price: Mutex::new(gas_price),
            balance: Mutex::new(U256::ZERO),
            pending: Mutex::new(Vec::new()),
            raw: Mutex::new(HashMap::new()),
            receipts: Mutex::new(HashMap::new()),
            broadcasts: Mutex::new(Vec::new()),
            auto_include: Mutex::new(None),
            broadcast_delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn include_broadcasts_at(&self, position: u64, succeeded: bool) {
        *self.auto_include.lock().unwrap() = Some((position, succeeded));
    }

    pub fn include(&self, hash: TxHash, block_number: u64, position: u64) {
        self.include_with_status(hash, block_number, position, true);
    }

    pub fn include_with_status(&self, hash: TxHash, block_number: u64, position: u64, succeeded: bool) {
        self.receipts.lock().unwrap().insert(hash, Inclusion { tx_hash: hash, block_number, position, succeeded });
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }

    pub fn add_pending(&self, tx: PendingTx, raw: Bytes) {
        self.raw.lock().unwrap().insert(tx.hash, raw);
        self.pending.lock().unwrap().push(tx);
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.block.load(Ordering::SeqCst))
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(*self.gas_price.lock().unwrap())
    }

    async fn balance(&self, _account: Address) -> Result<U256> {
        Ok(*self.balance.lock().unwrap())
    }

    async fn pending_transactions(&self) -> Result<Vec<PendingTx>> {
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn raw_transaction(&self, hash: TxHash) -> Result<Option<Bytes>> {
        Ok(self.raw.lock().unwrap().get(&hash).cloned())
    }

    async fn broadcast(&self, raw: Bytes) -> Result<TxHash> {
        let delay = *self.broadcast_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let hash = keccak256(&raw);
        self.broadcasts.lock().unwrap().push(raw);
        if let Some((position, succeeded)) = *self.auto_include.lock().unwrap() {
            let block_number = self.block.load(Ordering::SeqCst) + 1;
            self.receipts.lock().unwrap().insert(hash, Inclusion { tx_hash: hash, block_number, position, succeeded });
        }
        Ok(hash)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<Inclusion>> {
        Ok(self.receipts.lock().unwrap().get(&hash).copied())
    }
}

pub struct FakeSigner {
    pub address: Address,
    pub signed: Mutex<Vec<TransactionRequest>>,
    counter: AtomicU64,
}

impl FakeSigner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            address: Address::repeat_byte(0x5e),
            signed: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        })
    }

    pub fn last_signed(&self) -> Option<TransactionRequest> {
        self.signed.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.signed.lock().unwrap().push(tx);
        Ok(Bytes::from(format!("signed-{n}").into_bytes()))
    }
}

#[derive(Default)]
pub struct FakeFeed {
    pub txs: Mutex<HashMap<Address, Vec<ObservedTx>>>,
}

#[async_trait]
impl AccountActivityFeed for FakeFeed {
    async fn recent_transactions(&self, account: Address) -> Result<Vec<ObservedTx>> {
        Ok(self.txs.lock().unwrap().get(&account).cloned().unwrap_or_default())
    }
}

pub struct FakePools {
    pub conditions: Mutex<HashMap<Address, PoolConditions>>,
    pub swaps: Mutex<HashMap<TxHash, PendingSwap>>,
    pub native_price: Decimal,
}

impl FakePools {
    pub fn new(native_price: Decimal) -> Arc<Self> {
        Arc::new(Self {
            conditions: Mutex::new(HashMap::new()),
            swaps: Mutex::new(HashMap::new()),
            native_price,
        })
    }
}

#[async_trait]
impl PoolDataSource for FakePools {
    async fn pool_conditions(&self, pool: Address) -> Result<PoolConditions> {
        self.conditions.lock().unwrap().get(&pool).cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown pool {pool}"))
    }

    async fn native_price_usd(&self) -> Result<Decimal> {
        Ok(self.native_price)
    }

    async fn decode_swap(&self, tx: &PendingTx) -> Result<Option<PendingSwap>> {
        Ok(self.swaps.lock().unwrap().get(&tx.hash).cloned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    LandAll,
    Drop,
    LandFirstOnly,
    /// Mines every leg but the last one reverts.
    RevertLast,
    Reject,
}

/// Relay that mines bundle legs straight into the ledger's receipts.
pub struct FakeRelay {
    pub ledger: Arc<FakeLedger>,
    pub mode: Mutex<RelayMode>,
    pub bundles: Mutex<Vec<(Vec<Bytes>, u64)>>,
}

impl FakeRelay {
    pub fn new(ledger: Arc<FakeLedger>, mode: RelayMode) -> Arc<Self> {
        Arc::new(Self { ledger, mode: Mutex::new(mode), bundles: Mutex::new(Vec::new()) })
    }

    pub fn bundle_count(&self) -> usize {
        self.bundles.lock().unwrap().len()
    }
}

#[async_trait]
impl BundleRelay for FakeRelay {
    async fn send_bundle(&self, txs: Vec<Bytes>, target_block: u64) -> Result<String> {
        let mode = *self.mode.lock().unwrap();
        if mode == RelayMode::Reject {
            return Err(anyhow::anyhow!("bundle simulation failed"));
        }
        self.bundles.lock().unwrap().push((txs.clone(), target_block));

        let landing = match mode {
            RelayMode::LandAll | RelayMode::RevertLast => txs.len(),
            RelayMode::LandFirstOnly => 1,
            _ => 0,
        };
        for (position, raw) in txs.iter().take(landing).enumerate() {
            let reverts = mode == RelayMode::RevertLast && position + 1 == txs.len();
            self.ledger.include_with_status(keccak256(raw), target_block, position as u64, !reverts);
        }
        Ok(format!("0xbundle{}", self.bundle_count()))
    }
}

pub fn engine(ledger: Arc<FakeLedger>, signer: Arc<FakeSigner>) -> Arc<ExecutionEngine> {
    Arc::new(ExecutionEngine::new(ledger, signer).with_poll_interval(Duration::from_millis(10)))
}

/// Risk gate whose portfolio holds `value` in cash and nothing else.
pub async fn funded_gate(value: Decimal) -> Arc<RiskGate> {
    let gate = Arc::new(RiskGate::new(RiskConfig::default()));
    gate.update_portfolio_metrics(Vec::new(), value).await;
    gate
}

/// Pushes the gate into a critical leverage breach and publishes it.
pub async fn trip_leverage_breach(gate: &RiskGate, value: Decimal) {
    let positions = vec![Position {
        asset: "levered".to_string(),
        exposure_usd: value * Decimal::from(5),
        liquid_usd: Some(value),
    }];
    gate.update_portfolio_metrics(positions, value).await;
    gate.check_breaches().await;
}
