//! Transaction execution engine: sign, broadcast, bounded receipt wait

use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    rpc::types::eth::TransactionRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use crate::{
    config::RECEIPT_POLL_MS,
    errors::{BotError, BotResult},
    network::{LedgerClient, TransactionSigner},
    types::Inclusion,
};

/// Fee bid for a single transaction, in wei.
#[derive(Debug, Clone, Copy)]
pub struct FeeBid {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

pub struct ExecutionEngine {
    ledger: Arc<dyn LedgerClient>,
    signer: Arc<dyn TransactionSigner>,
    poll_interval: Duration,
}

impl ExecutionEngine {
    pub fn new(ledger: Arc<dyn LedgerClient>, signer: Arc<dyn TransactionSigner>) -> Self {
        Self {
            ledger,
            signer,
            poll_interval: Duration::from_millis(RECEIPT_POLL_MS),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub fn account(&self) -> Address {
        self.signer.address()
    }

    pub fn build_transaction(
        &self,
        to: Address,
        calldata: Bytes,
        value: U256,
        gas_limit: u64,
        fee: FeeBid,
    ) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.signer.address())
            .to(to)
            .value(value)
            .input(calldata.into())
            .gas_limit(gas_limit)
            .max_fee_per_gas(fee.max_fee_per_gas)
            .max_priority_fee_per_gas(fee.max_priority_fee_per_gas)
    }

    pub async fn sign(&self, tx: TransactionRequest) -> BotResult<Bytes> {
        self.signer
            .sign_transaction(tx)
            .await
            .map_err(|e| BotError::network("Signing service request failed", e))
    }

    /// Broadcast is irrevocable and never retried.
    pub async fn submit(&self, tx: TransactionRequest) -> BotResult<TxHash> {
        let raw = self.sign(tx).await?;
        self.broadcast(raw).await
    }

    pub async fn broadcast(&self, raw: Bytes) -> BotResult<TxHash> {
        self.ledger
            .broadcast(raw)
            .await
            .map_err(|e| BotError::execution(None, format!("broadcast rejected: {e}")))
    }

    /// Polls for a receipt until `timeout`; a reverted receipt is still returned.
    pub async fn await_inclusion(&self, tx_hash: TxHash, timeout: Duration) -> BotResult<Inclusion> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.ledger.receipt(tx_hash).await {
                Ok(Some(inclusion)) => {
                    info!(
                        tx = %tx_hash,
                        block = inclusion.block_number,
                        position = inclusion.position,
                        succeeded = inclusion.succeeded,
                        "✅ Transaction included"
                    );
                    return Ok(inclusion);
                }
                Ok(None) => debug!(tx = %tx_hash, "Receipt not yet available"),
                Err(e) => warn!(tx = %tx_hash, "Receipt poll failed: {}", e),
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(BotError::execution(
                    Some(tx_hash),
                    format!("not included within {}ms", timeout.as_millis()),
                ));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
