//! Rolling price volatility over a fixed time window

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const MIN_SAMPLES: usize = 10;

pub struct VolatilityCalculator {
    window: VecDeque<(Instant, f64)>,
    max_age: Duration,
}

impl VolatilityCalculator {
    pub fn new(max_age: Duration) -> Self {
        VolatilityCalculator {
            window: VecDeque::new(),
            max_age,
        }
    }

    pub fn add_price(&mut self, price: f64) {
        self.add_price_at(Instant::now(), price);
    }

    pub fn add_price_at(&mut self, at: Instant, price: f64) {
        if !price.is_finite() || price <= 0.0 {
            return;
        }
        self.window.push_back((at, price));

        while let Some((timestamp, _)) = self.window.front() {
            if at.saturating_duration_since(*timestamp) > self.max_age {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Standard deviation over mean of the windowed prices, as a fraction.
    pub fn volatility(&self) -> Option<f64> {
        if self.window.len() < MIN_SAMPLES {
            return None;
        }

        let n = self.window.len() as f64;
        let mean = self.window.iter().map(|(_, p)| p).sum::<f64>() / n;
        if mean <= 0.0 {
            return None;
        }
        let variance = self.window.iter().map(|(_, p)| (p - mean).powi(2)).sum::<f64>() / n;

        Some(variance.sqrt() / mean)
    }

    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
