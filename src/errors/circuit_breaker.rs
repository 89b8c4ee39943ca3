//! Circuit breaker implementation

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info};
use crate::errors::{BotError, BotResult};

pub struct CircuitBreaker {
    pub name: String,
    pub consecutive_errors: Arc<RwLock<u32>>,
    pub is_open: Arc<RwLock<bool>>,
    pub last_error_time: Arc<RwLock<Option<Instant>>>,
    pub max_consecutive_errors: u32,
    pub cooldown_duration: Duration,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, max_consecutive_errors: u32, cooldown: Duration) -> Self {
        Self {
            name: name.into(),
            consecutive_errors: Arc::new(RwLock::new(0)),
            is_open: Arc::new(RwLock::new(false)),
            last_error_time: Arc::new(RwLock::new(None)),
            max_consecutive_errors,
            cooldown_duration: cooldown,
        }
    }

    pub async fn record_success(&self) {
        *self.consecutive_errors.write().await = 0;
        *self.is_open.write().await = false;
    }

    /// Returns true when this error opened the breaker.
    pub async fn record_error(&self) -> bool {
        let mut errors = self.consecutive_errors.write().await;
        *errors += 1;

        if *errors >= self.max_consecutive_errors && !*self.is_open.read().await {
            *self.is_open.write().await = true;
            *self.last_error_time.write().await = Some(Instant::now());
            error!("Circuit breaker [{}] OPEN after {} consecutive errors", self.name, *errors);
            return true;
        }
        false
    }

    pub async fn can_proceed(&self) -> bool {
        let is_open = *self.is_open.read().await;
        if !is_open {
            return true;
        }

        if let Some(last_error) = *self.last_error_time.read().await {
            if last_error.elapsed() > self.cooldown_duration {
                info!("Circuit breaker [{}] cooldown complete, resetting", self.name);
                *self.is_open.write().await = false;
                *self.consecutive_errors.write().await = 0;
                return true;
            }
        }
        false
    }

    /// `can_proceed` as a result, carrying the remaining cooldown when open.
    pub async fn check(&self) -> BotResult<()> {
        if self.can_proceed().await {
            return Ok(());
        }
        let elapsed = self.last_error_time.read().await.map(|t| t.elapsed()).unwrap_or_default();
        Err(BotError::CircuitBreakerOpen {
            reason: format!("[{}] open after {} consecutive errors", self.name, *self.consecutive_errors.read().await),
            cooldown_remaining: self.cooldown_duration.saturating_sub(elapsed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_and_resets_on_success() {
        let breaker = CircuitBreaker::new("test", 3, Duration::from_secs(60));
        assert!(!breaker.record_error().await);
        assert!(!breaker.record_error().await);
        assert!(breaker.record_error().await);
        assert!(!breaker.can_proceed().await);

        breaker.record_success().await;
        assert!(breaker.can_proceed().await);
        assert_eq!(*breaker.consecutive_errors.read().await, 0);
    }

    #[tokio::test]
    async fn closes_after_cooldown() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_millis(10));
        assert!(breaker.record_error().await);
        assert!(!breaker.can_proceed().await);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(breaker.can_proceed().await);
    }

    #[tokio::test]
    async fn check_reports_remaining_cooldown() {
        let breaker = CircuitBreaker::new("dispatcher", 2, Duration::from_secs(30));
        assert!(breaker.check().await.is_ok());
        breaker.record_error().await;
        breaker.record_error().await;

        match breaker.check().await {
            Err(BotError::CircuitBreakerOpen { reason, cooldown_remaining }) => {
                assert!(reason.contains("[dispatcher] open after 2"));
                assert!(cooldown_remaining > Duration::from_secs(29));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
