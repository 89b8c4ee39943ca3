//! Custom error types for the engine

use alloy::primitives::TxHash;
use std::time::Duration;
use thiserror::Error;
use crate::types::{RemediationAction, RiskEvaluation};

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        retry_count: u32,
    },

    #[error("Validation failed: {reason}")]
    Validation { reason: String },

    #[error("Risk gate rejected {}: score {}", .evaluation.opportunity_id, .evaluation.risk_score)]
    RiskRejected { evaluation: Box<RiskEvaluation> },

    #[error("Critical portfolio breach outstanding, remediation {action:?} required")]
    BreachCritical { action: RemediationAction },

    #[error("Execution failed{}: {cause}", .tx_hash.map(|h| format!(" ({h})")).unwrap_or_default())]
    Execution {
        tx_hash: Option<TxHash>,
        cause: String,
    },

    #[error("Aborted before broadcast: {reason}")]
    Aborted { reason: String },

    #[error("Circuit breaker active: {reason}")]
    CircuitBreakerOpen {
        reason: String,
        cooldown_remaining: Duration,
    },
}

impl BotError {
    pub fn validation(reason: impl Into<String>) -> Self {
        BotError::Validation { reason: reason.into() }
    }

    pub fn execution(tx_hash: Option<TxHash>, cause: impl Into<String>) -> Self {
        BotError::Execution { tx_hash, cause: cause.into() }
    }

    pub fn network(message: impl Into<String>, source: anyhow::Error) -> Self {
        BotError::Network {
            message: message.into(),
            source: Some(source),
            retry_count: 0,
        }
    }

    /// Set once a transaction has been broadcast.
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            BotError::Execution { tx_hash, .. } => *tx_hash,
            _ => None,
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
