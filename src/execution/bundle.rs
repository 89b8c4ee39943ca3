//! All-or-nothing transaction bundles

use alloy::primitives::{keccak256, Bytes, TxHash};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use crate::{
    errors::{BotError, BotResult},
    execution::ExecutionEngine,
    network::BundleRelay,
    types::Inclusion,
};

#[derive(Debug, Clone)]
pub struct BundleLeg {
    pub label: &'static str,
    pub raw: Bytes,
    pub hash: TxHash,
    /// Legs we signed ourselves; foreign legs are not tracked for inclusion.
    pub owned: bool,
}

impl BundleLeg {
    pub fn owned(label: &'static str, raw: Bytes) -> Self {
        Self { label, hash: keccak256(&raw), raw, owned: true }
    }

    pub fn foreign(label: &'static str, raw: Bytes) -> Self {
        Self { label, hash: keccak256(&raw), raw, owned: false }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AtomicBundle {
    pub legs: Vec<BundleLeg>,
}

#[derive(Debug, Clone)]
pub enum BundleOutcome {
    Landed(Vec<(&'static str, Inclusion)>),
    NotIncluded,
    /// Some owned legs landed without the others.
    Partial {
        landed: Vec<(&'static str, Inclusion)>,
        missing: Vec<&'static str>,
    },
}

impl BundleOutcome {
    /// True when `open` was mined successfully but `close` is missing or reverted.
    pub fn leaves_open(&self, open: &str, close: &str) -> bool {
        let landed = match self {
            BundleOutcome::Landed(landed) | BundleOutcome::Partial { landed, .. } => landed,
            BundleOutcome::NotIncluded => return false,
        };
        let settled = |label: &str| landed.iter().any(|(l, i)| *l == label && i.succeeded);
        settled(open) && !settled(close)
    }
}

impl AtomicBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, leg: BundleLeg) -> Self {
        self.legs.push(leg);
        self
    }

    pub fn raw_transactions(&self) -> Vec<Bytes> {
        self.legs.iter().map(|l| l.raw.clone()).collect()
    }

    pub fn leg(&self, label: &str) -> Option<&BundleLeg> {
        self.legs.iter().find(|l| l.label == label)
    }

    pub async fn submit(&self, relay: &dyn BundleRelay, target_block: u64) -> BotResult<String> {
        relay
            .send_bundle(self.raw_transactions(), target_block)
            .await
            .map_err(|e| BotError::execution(None, format!("relay refused bundle: {e}")))
    }

    /// Polls every owned leg until all land, the timeout passes, or `last_block` is mined.
    pub async fn await_outcome(
        &self,
        engine: &ExecutionEngine,
        last_block: u64,
        timeout: Duration,
        poll_interval: Duration,
    ) -> BundleOutcome {
        let deadline = Instant::now() + timeout;
        let owned: Vec<&BundleLeg> = self.legs.iter().filter(|l| l.owned).collect();

        loop {
            let mut landed = Vec::new();
            let mut missing = Vec::new();
            for leg in &owned {
                match engine.ledger().receipt(leg.hash).await {
                    Ok(Some(inclusion)) => landed.push((leg.label, inclusion)),
                    Ok(None) => missing.push(leg.label),
                    Err(e) => {
                        warn!(leg = leg.label, "Receipt poll failed: {}", e);
                        missing.push(leg.label);
                    }
                }
            }

            if missing.is_empty() {
                return BundleOutcome::Landed(landed);
            }

            let head = engine.ledger().block_number().await.unwrap_or(0);
            if head > last_block || Instant::now() + poll_interval > deadline {
                debug!(landed = landed.len(), missing = missing.len(), head, "Bundle window closed");
                return if landed.is_empty() {
                    BundleOutcome::NotIncluded
                } else {
                    BundleOutcome::Partial { landed, missing }
                };
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
