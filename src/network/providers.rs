//! Network provider setup and the alloy-backed ledger client

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    providers::{Provider, ProviderBuilder},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::{
    config::Config,
    network::{
        collaborators::LedgerClient,
        retry::{retry_with_backoff, RetryConfig},
    },
    types::{Inclusion, PendingTx},
    ConcreteProvider,
};

pub async fn setup_provider(config: &Config) -> Result<Arc<ConcreteProvider>> {
    let rpc_url = config.rpc_url.as_ref()
        .ok_or_else(|| anyhow::anyhow!("RPC_URL is required"))?;

    let provider: Arc<ConcreteProvider> = Arc::new(
        ProviderBuilder::new()
            .on_http(rpc_url.parse()?)
            .boxed()
    );

    info!("🔗 Testing connection to {}...", config.network);
    let block = retry_with_backoff(
        || async {
            provider.get_block_number().await
                .context("Failed to get block number")
        },
        &RetryConfig {
            max_attempts: 5,
            initial_delay_ms: 500,
            max_delay_ms: 10000,
            exponential_base: 2.0,
        },
        "ledger connection",
    ).await
    .map_err(|e| {
        warn!("⚠️ Network connection attempt failed: {}", e);
        anyhow::anyhow!("Network connection failed: {}", e)
    })?;

    info!("✅ Connected to {} at block {}", config.network, block);
    Ok(provider)
}

pub struct RpcLedger {
    provider: Arc<ConcreteProvider>,
}

impl RpcLedger {
    pub fn new(provider: Arc<ConcreteProvider>) -> Self {
        Self { provider }
    }
}

/// Every read goes through `RetryConfig::fast()`; broadcasts are sent once.
#[async_trait]
impl LedgerClient for RpcLedger {
    async fn block_number(&self) -> Result<u64> {
        let block = retry_with_backoff(
            || async { self.provider.get_block_number().await.context("Failed to get block number") },
            &RetryConfig::fast(),
            "block number fetch",
        ).await?;
        Ok(block)
    }

    async fn gas_price(&self) -> Result<u128> {
        let price = retry_with_backoff(
            || async { self.provider.get_gas_price().await.context("Failed to get gas price") },
            &RetryConfig::fast(),
            "gas price fetch",
        ).await?;
        Ok(price)
    }

    async fn balance(&self, account: Address) -> Result<U256> {
        let balance = retry_with_backoff(
            || async move { self.provider.get_balance(account).await.context("Failed to get balance") },
            &RetryConfig::fast(),
            "balance fetch",
        ).await?;
        Ok(balance)
    }

    async fn pending_transactions(&self) -> Result<Vec<PendingTx>> {
        let block: Value = retry_with_backoff(
            || async {
                self.provider
                    .raw_request("eth_getBlockByNumber".into(), ("pending", true))
                    .await
                    .context("Failed to fetch pending block")
            },
            &RetryConfig::fast(),
            "pending block fetch",
        ).await?;
        Ok(parse_pending_block(&block))
    }

    async fn raw_transaction(&self, hash: TxHash) -> Result<Option<Bytes>> {
        let raw = retry_with_backoff(
            || async move {
                self.provider
                    .raw_request("eth_getRawTransactionByHash".into(), (hash,))
                    .await
                    .context("Failed to fetch raw transaction")
            },
            &RetryConfig::fast(),
            "raw transaction fetch",
        ).await?;
        Ok(raw)
    }

    async fn broadcast(&self, raw: Bytes) -> Result<TxHash> {
        let pending = self.provider
            .send_raw_transaction(&raw)
            .await
            .context("Failed to send transaction")?;
        let tx_hash = *pending.tx_hash();
        info!("📡 Transaction broadcast: {}", tx_hash);
        Ok(tx_hash)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<Inclusion>> {
        let receipt: Option<Value> = retry_with_backoff(
            || async move {
                self.provider
                    .raw_request("eth_getTransactionReceipt".into(), (hash,))
                    .await
                    .context("Failed to fetch receipt")
            },
            &RetryConfig::fast(),
            "receipt fetch",
        ).await?;
        Ok(receipt.as_ref().and_then(|r| parse_receipt(hash, r)))
    }
}

fn hex_u128(value: &Value) -> Option<u128> {
    let s = value.as_str()?;
    u128::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

fn hex_u64(value: &Value) -> Option<u64> {
    hex_u128(value).and_then(|v| u64::try_from(v).ok())
}

/// Extracts the pending snapshot from a hydrated `eth_getBlockByNumber` response.
pub fn parse_pending_block(block: &Value) -> Vec<PendingTx> {
    let Some(txs) = block.get("transactions").and_then(Value::as_array) else {
        return Vec::new();
    };

    let parsed: Vec<PendingTx> = txs
        .iter()
        .filter_map(|tx| {
            let hash = TxHash::from_str(tx.get("hash")?.as_str()?).ok()?;
            let from = Address::from_str(tx.get("from")?.as_str()?).ok()?;
            let to = tx.get("to")
                .and_then(Value::as_str)
                .and_then(|s| Address::from_str(s).ok());
            // EIP-1559 transactions bid through maxFeePerGas
            let gas_price = tx.get("maxFeePerGas")
                .and_then(hex_u128)
                .or_else(|| tx.get("gasPrice").and_then(hex_u128))
                .unwrap_or(0);
            let value_wei = tx.get("value").and_then(hex_u128).unwrap_or(0);
            Some(PendingTx { hash, from, to, gas_price, value_wei })
        })
        .collect();

    if parsed.len() < txs.len() {
        debug!("Skipped {} malformed pending transactions", txs.len() - parsed.len());
    }
    parsed
}

/// `None` while the receipt is incomplete (no block assigned yet).
pub fn parse_receipt(tx_hash: TxHash, receipt: &Value) -> Option<Inclusion> {
    let block_number = receipt.get("blockNumber").and_then(hex_u64)?;
    let position = receipt.get("transactionIndex").and_then(hex_u64)?;
    let succeeded = receipt.get("status").and_then(hex_u64).map(|s| s == 1).unwrap_or(false);
    Some(Inclusion { tx_hash, block_number, position, succeeded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_pending_block_mixing_fee_styles() {
        let block = json!({
            "number": null,
            "transactions": [
                {
                    "hash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                    "from": "0x00000000000000000000000000000000000000aa",
                    "to": "0x00000000000000000000000000000000000000bb",
                    "gasPrice": "0x3b9aca00",
                    "value": "0x0"
                },
                {
                    "hash": "0x2222222222222222222222222222222222222222222222222222222222222222",
                    "from": "0x00000000000000000000000000000000000000cc",
                    "to": null,
                    "maxFeePerGas": "0x77359400",
                    "gasPrice": "0x3b9aca00",
                    "value": "0xde0b6b3a7640000"
                },
                { "hash": "not-a-hash" }
            ]
        });

        let txs = parse_pending_block(&block);
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].gas_price, 1_000_000_000);
        assert_eq!(txs[1].gas_price, 2_000_000_000);
        assert!(txs[1].to.is_none());
        assert_eq!(txs[1].value_wei, 1_000_000_000_000_000_000);
    }

    fn ledger_at(url: &str) -> RpcLedger {
        let provider: Arc<ConcreteProvider> = Arc::new(ProviderBuilder::new().on_http(url.parse().unwrap()).boxed());
        RpcLedger::new(provider)
    }

    #[tokio::test]
    async fn reads_retry_before_giving_up() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let err = ledger_at(&server.url()).gas_price().await.unwrap_err();

        assert!(err.to_string().contains("gas price fetch failed after 2 attempts"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn broadcast_is_sent_exactly_once() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let result = ledger_at(&server.url()).broadcast(Bytes::from_static(&[0x02, 0x01])).await;

        assert!(result.is_err());
        mock.assert_async().await;
    }

    #[test]
    fn receipt_requires_block_assignment() {
        let hash = TxHash::repeat_byte(0x11);
        let pending = json!({ "blockNumber": null, "transactionIndex": null, "status": null });
        assert!(parse_receipt(hash, &pending).is_none());

        let mined = json!({ "blockNumber": "0x10", "transactionIndex": "0x2", "status": "0x1" });
        let inclusion = parse_receipt(hash, &mined).unwrap();
        assert_eq!(inclusion.block_number, 16);
        assert_eq!(inclusion.position, 2);
        assert!(inclusion.succeeded);

        let reverted = json!({ "blockNumber": "0x10", "transactionIndex": "0x0", "status": "0x0" });
        assert!(!parse_receipt(hash, &reverted).unwrap().succeeded);
    }
}
