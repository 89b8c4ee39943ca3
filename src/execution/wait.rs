//! Pre-broadcast waits that can be cut short

use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use crate::errors::{BotError, BotResult};

/// Sleeps for `duration` unless a critical breach is published or `cancel` fires first.
pub async fn abortable_sleep(
    duration: Duration,
    breach_rx: &mut watch::Receiver<bool>,
    cancel: &CancellationToken,
) -> BotResult<()> {
    if *breach_rx.borrow() {
        return Err(BotError::Aborted { reason: "critical breach outstanding".to_string() });
    }

    let breach = async {
        let closed = breach_rx.wait_for(|critical| *critical).await.is_err();
        if closed {
            // Without a risk gate there is nothing left to wait on.
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BotError::Aborted { reason: "strategy stopped".to_string() }),
        _ = breach => Err(BotError::Aborted { reason: "critical breach detected".to_string() }),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_when_nothing_interrupts() {
        let (_tx, mut rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        assert!(abortable_sleep(Duration::from_millis(5), &mut rx, &cancel).await.is_ok());
    }

    #[tokio::test]
    async fn breach_during_wait_aborts() {
        let (tx, mut rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            tx.send_replace(true);
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let started = std::time::Instant::now();
        let result = abortable_sleep(Duration::from_secs(5), &mut rx, &cancel).await;
        assert!(matches!(result, Err(BotError::Aborted { .. })));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn outstanding_breach_aborts_immediately() {
        let (_tx, mut rx) = watch::channel(true);
        let cancel = CancellationToken::new();
        let result = abortable_sleep(Duration::from_secs(5), &mut rx, &cancel).await;
        assert!(matches!(result, Err(BotError::Aborted { .. })));
    }

    #[tokio::test]
    async fn cancellation_aborts() {
        let (_tx, mut rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = abortable_sleep(Duration::from_secs(5), &mut rx, &cancel).await;
        assert!(matches!(result, Err(BotError::Aborted { .. })));
    }

    #[tokio::test]
    async fn dropped_gate_does_not_abort() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let cancel = CancellationToken::new();
        assert!(abortable_sleep(Duration::from_millis(5), &mut rx, &cancel).await.is_ok());
    }
}
