//! HTTP-backed collaborators: signing service, activity feed, pool data, bundle relay

use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::eth::TransactionRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use crate::{
    network::{
        collaborators::{AccountActivityFeed, BundleRelay, PoolDataSource, TransactionSigner},
        retry::{retry_with_backoff, RetryConfig},
    },
    types::{ObservedTx, PendingSwap, PendingTx, PoolConditions},
};

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

async fn get_json<T: serde::de::DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let response = client.get(url).send().await
        .context("HTTP request failed")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow::anyhow!("{} returned {}: {}", url, status, body));
    }

    response.json::<T>().await
        .with_context(|| format!("Failed to parse response from {}", url))
}

#[derive(Deserialize)]
struct SignerAddress {
    address: Address,
}

#[derive(Deserialize)]
struct SignedTransaction {
    raw: Bytes,
}

/// Client for an external signing service; the engine only handles signed bytes.
pub struct RemoteSigner {
    client: Client,
    base_url: String,
    address: Address,
}

impl RemoteSigner {
    pub async fn connect(base_url: &str) -> Result<Self> {
        let client = build_client(Duration::from_secs(2))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        let url = format!("{}/address", base_url);

        let identity: SignerAddress = retry_with_backoff(
            || get_json(&client, &url),
            &RetryConfig::default(),
            "signer address lookup",
        ).await?;

        info!("🔑 Signing service ready for {}", identity.address);
        Ok(Self { client, base_url, address: identity.address })
    }
}

#[async_trait]
impl TransactionSigner for RemoteSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_transaction(&self, tx: TransactionRequest) -> Result<Bytes> {
        let response = self.client
            .post(format!("{}/sign", self.base_url))
            .json(&json!({ "transaction": tx }))
            .send()
            .await
            .context("Signing request failed")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Signing service returned {}", response.status()));
        }

        let signed: SignedTransaction = response.json().await
            .context("Failed to parse signed transaction")?;
        Ok(signed.raw)
    }
}

pub struct HttpActivityFeed {
    client: Client,
    base_url: String,
}

impl HttpActivityFeed {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(2))?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AccountActivityFeed for HttpActivityFeed {
    async fn recent_transactions(&self, account: Address) -> Result<Vec<ObservedTx>> {
        let url = format!("{}/accounts/{}/transactions", self.base_url, account);
        let txs = retry_with_backoff(
            || get_json::<Vec<ObservedTx>>(&self.client, &url),
            &RetryConfig::fast(),
            "account activity fetch",
        ).await?;
        Ok(txs)
    }
}

#[derive(Deserialize)]
struct NativePrice {
    price_usd: Decimal,
}

pub struct HttpPoolDataSource {
    client: Client,
    base_url: String,
}

impl HttpPoolDataSource {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(3))?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PoolDataSource for HttpPoolDataSource {
    async fn pool_conditions(&self, pool: Address) -> Result<PoolConditions> {
        let url = format!("{}/pools/{}", self.base_url, pool);
        let conditions = retry_with_backoff(
            || get_json::<PoolConditions>(&self.client, &url),
            &RetryConfig::default(),
            "pool conditions fetch",
        ).await?;
        Ok(conditions)
    }

    async fn native_price_usd(&self) -> Result<Decimal> {
        let url = format!("{}/prices/native", self.base_url);
        let price = retry_with_backoff(
            || get_json::<NativePrice>(&self.client, &url),
            &RetryConfig::default(),
            "native price fetch",
        ).await?;
        Ok(price.price_usd)
    }

    async fn decode_swap(&self, tx: &PendingTx) -> Result<Option<PendingSwap>> {
        let response = self.client
            .post(format!("{}/swaps/decode", self.base_url))
            .json(tx)
            .send()
            .await
            .context("Swap decode request failed")?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await
                .context("Failed to parse decoded swap")?)),
            status => Err(anyhow::anyhow!("Swap decoder returned {}", status)),
        }
    }
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleReceipt {
    bundle_hash: String,
}

/// `eth_sendBundle` relay client.
pub struct HttpBundleRelay {
    client: Client,
    url: String,
}

impl HttpBundleRelay {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: build_client(Duration::from_secs(3))?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl BundleRelay for HttpBundleRelay {
    async fn send_bundle(&self, txs: Vec<Bytes>, target_block: u64) -> Result<String> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_sendBundle",
            "params": [{
                "txs": txs,
                "blockNumber": format!("0x{:x}", target_block),
            }],
        });

        let response: RpcResponse<BundleReceipt> = self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .context("Bundle submission failed")?
            .json()
            .await
            .context("Failed to parse relay response")?;

        if let Some(error) = response.error {
            return Err(anyhow::anyhow!("Relay rejected bundle: {}", error));
        }

        let receipt = response.result
            .ok_or_else(|| anyhow::anyhow!("Relay response missing result"))?;
        debug!(bundle = %receipt.bundle_hash, target_block, "Bundle accepted by relay");
        Ok(receipt.bundle_hash)
    }
}
