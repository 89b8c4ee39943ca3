//! Seams to the external services the engine depends on

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::eth::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use crate::types::{Inclusion, ObservedTx, PendingSwap, PendingTx, PoolConditions};

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn block_number(&self) -> Result<u64>;
    async fn gas_price(&self) -> Result<u128>;
    async fn balance(&self, account: Address) -> Result<U256>;
    async fn pending_transactions(&self) -> Result<Vec<PendingTx>>;
    async fn raw_transaction(&self, hash: TxHash) -> Result<Option<Bytes>>;
    /// Irrevocable once it returns Ok.
    async fn broadcast(&self, raw: Bytes) -> Result<TxHash>;
    async fn receipt(&self, hash: TxHash) -> Result<Option<Inclusion>>;
}

/// Key material lives behind this trait, never in the engine.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;
    async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes>;
}

#[async_trait]
pub trait AccountActivityFeed: Send + Sync {
    async fn recent_transactions(&self, account: Address) -> Result<Vec<ObservedTx>>;
}

#[async_trait]
pub trait PoolDataSource: Send + Sync {
    async fn pool_conditions(&self, pool: Address) -> Result<PoolConditions>;
    async fn native_price_usd(&self) -> Result<Decimal>;
    /// `None` when the transaction is not a swap against a known pool.
    async fn decode_swap(&self, tx: &PendingTx) -> Result<Option<PendingSwap>>;
}

/// Bundles land atomically in the target block or not at all.
#[async_trait]
pub trait BundleRelay: Send + Sync {
    async fn send_bundle(&self, txs: Vec<Bytes>, target_block: u64) -> Result<String>;
}
