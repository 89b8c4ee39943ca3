//! Historical-simulation risk metrics over a rolling return window
//!
//! Every function here is total: with too little data it returns 0 rather
//! than an error, so callers can treat "unknown" and "no risk measured" alike.

use rust_decimal::prelude::*;
use std::collections::VecDeque;
use crate::{
    config::MIN_RETURN_SAMPLES,
    types::{RiskIssue, RiskMetrics},
};

const PERIODS_PER_YEAR: f64 = 252.0;

/// Fixed-capacity window of periodic returns; the oldest sample is evicted on overflow.
#[derive(Debug, Clone)]
pub struct ReturnWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl ReturnWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, samples: I) {
        for s in samples {
            self.push(s);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

fn sorted_ascending(returns: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn tail_index(n: usize, confidence: f64) -> usize {
    let index = ((1.0 - confidence) * n as f64).floor() as usize;
    index.min(n.saturating_sub(1))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Loss fraction at `confidence`, scaled by the square root of the horizon.
pub fn historical_var(returns: &[f64], confidence: f64, horizon_days: f64) -> f64 {
    let sorted = sorted_ascending(returns);
    if sorted.len() < MIN_RETURN_SAMPLES {
        return 0.0;
    }
    let index = tail_index(sorted.len(), confidence);
    sorted[index].abs() * horizon_days.max(0.0).sqrt()
}

/// Mean of the tail at and below the VaR index.
pub fn expected_shortfall(returns: &[f64], confidence: f64, horizon_days: f64) -> f64 {
    let sorted = sorted_ascending(returns);
    if sorted.len() < MIN_RETURN_SAMPLES {
        return 0.0;
    }
    let index = tail_index(sorted.len(), confidence);
    mean(&sorted[..=index]).abs() * horizon_days.max(0.0).sqrt()
}

pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    let sd = std_dev(returns);
    if sd == 0.0 {
        return 0.0;
    }
    mean(returns) / sd * PERIODS_PER_YEAR.sqrt()
}

pub fn sortino_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside = (returns.iter().map(|r| r.min(0.0).powi(2)).sum::<f64>() / returns.len() as f64).sqrt();
    if downside == 0.0 {
        return 0.0;
    }
    mean(returns) / downside * PERIODS_PER_YEAR.sqrt()
}

/// Largest peak-to-trough decline of the compounded equity curve, as a fraction.
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity = 1.0_f64;
    let mut peak = 1.0_f64;
    let mut worst = 0.0_f64;
    for r in returns {
        equity *= 1.0 + r;
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst.clamp(0.0, 1.0)
}

pub fn calmar_ratio(returns: &[f64]) -> f64 {
    let mdd = max_drawdown(returns);
    if mdd == 0.0 {
        return 0.0;
    }
    mean(returns) * PERIODS_PER_YEAR / mdd
}

/// Full Kelly fraction for win probability `p` and payoff ratio `b`, floored at 0.
pub fn kelly_fraction(p: f64, b: f64) -> f64 {
    if !p.is_finite() || !b.is_finite() || b <= 0.0 {
        return 0.0;
    }
    let p = p.clamp(0.0, 1.0);
    let q = 1.0 - p;
    ((p * b - q) / b).max(0.0)
}

/// 100 minus severity penalties, clamped to [0, 100].
pub fn risk_score(issues: &[RiskIssue]) -> u32 {
    let penalty: u32 = issues.iter().map(|i| i.severity.penalty()).sum();
    100u32.saturating_sub(penalty).min(100)
}

pub fn compute_metrics(
    returns: &[f64],
    confidence: f64,
    horizon_days: f64,
    portfolio_value: Decimal,
) -> RiskMetrics {
    let var_95 = historical_var(returns, confidence, horizon_days);
    let var_99 = historical_var(returns, 0.99, horizon_days);
    let es_95 = expected_shortfall(returns, confidence, horizon_days);
    let to_usd = |fraction: f64| {
        Decimal::from_f64(fraction).unwrap_or_default() * portfolio_value
    };

    RiskMetrics {
        sample_count: returns.len(),
        var_95,
        var_99,
        expected_shortfall_95: es_95,
        var_95_usd: to_usd(var_95),
        expected_shortfall_95_usd: to_usd(es_95),
        sharpe_ratio: sharpe_ratio(returns),
        sortino_ratio: sortino_ratio(returns),
        max_drawdown: max_drawdown(returns),
        calmar_ratio: calmar_ratio(returns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IssueKind, Severity};
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use rust_decimal_macros::dec;

    fn trading_year(seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..252).map(|_| 0.0005 + rng.random_range(-0.02..0.02)).collect()
    }

    fn issue(severity: Severity) -> RiskIssue {
        RiskIssue { kind: IssueKind::PositionSize, severity, message: String::new() }
    }

    #[test]
    fn year_of_returns_has_nonzero_tail_risk() {
        let returns = trading_year(7);
        let metrics = compute_metrics(&returns, 0.95, 1.0, dec!(100000));

        assert!(metrics.var_95 > 0.0);
        assert!(metrics.expected_shortfall_95 > 0.0);
        assert!(metrics.expected_shortfall_95 >= metrics.var_95);
        assert!(metrics.var_99 >= metrics.var_95);
        assert!(metrics.var_95_usd > dec!(0));
        assert!(metrics.expected_shortfall_95_usd >= metrics.var_95_usd);
    }

    #[test]
    fn var_uses_floor_index_of_sorted_sample() {
        // 40 samples: -0.40, -0.39, ... ; index floor(0.05 * 40) = 2
        let returns: Vec<f64> = (0..40).map(|i| -0.40 + i as f64 * 0.01).collect();
        let var = historical_var(&returns, 0.95, 1.0);
        assert!((var - 0.38).abs() < 1e-12);

        let es = expected_shortfall(&returns, 0.95, 1.0);
        assert!((es - 0.39).abs() < 1e-12);

        let four_day = historical_var(&returns, 0.95, 4.0);
        assert!((four_day - 0.76).abs() < 1e-12);
    }

    #[test]
    fn window_evicts_oldest_sample() {
        let mut window = ReturnWindow::new(3);
        window.extend([0.1, 0.2, 0.3, 0.4]);
        assert_eq!(window.to_vec(), vec![0.2, 0.3, 0.4]);

        window.push(f64::NAN);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn drawdown_tracks_peak_to_trough() {
        let returns = [0.10, -0.50, 0.20];
        assert!((max_drawdown(&returns) - 0.5).abs() < 1e-12);
        assert_eq!(max_drawdown(&[0.01, 0.02]), 0.0);
        assert_eq!(calmar_ratio(&[0.01, 0.02]), 0.0);
    }

    #[test]
    fn kelly_zero_without_edge() {
        // p*b = 0.5 * 1.0 equals q
        assert_eq!(kelly_fraction(0.5, 1.0), 0.0);
        assert_eq!(kelly_fraction(0.3, 1.0), 0.0);
        assert!((kelly_fraction(0.6, 1.0) - 0.2).abs() < 1e-12);
        assert_eq!(kelly_fraction(0.9, 0.0), 0.0);
    }

    #[test]
    fn score_penalties_by_severity() {
        assert_eq!(risk_score(&[]), 100);
        assert_eq!(risk_score(&[issue(Severity::High)]), 80);
        assert_eq!(risk_score(&[issue(Severity::Critical), issue(Severity::Medium), issue(Severity::Low)]), 55);
    }

    proptest! {
        #[test]
        fn short_series_have_no_tail_metrics(returns in prop::collection::vec(-0.5f64..0.5, 0..30)) {
            prop_assert_eq!(historical_var(&returns, 0.95, 1.0), 0.0);
            prop_assert_eq!(expected_shortfall(&returns, 0.95, 1.0), 0.0);
        }

        #[test]
        fn shortfall_never_below_var_on_loss_tails(returns in prop::collection::vec(-0.2f64..-0.001, 30..300)) {
            let var = historical_var(&returns, 0.95, 1.0);
            let es = expected_shortfall(&returns, 0.95, 1.0);
            prop_assert!(es + 1e-12 >= var);
        }

        #[test]
        fn score_always_within_bounds(severities in prop::collection::vec(0u8..4, 0..40)) {
            let issues: Vec<RiskIssue> = severities.iter().map(|s| issue(match s {
                0 => Severity::Low,
                1 => Severity::Medium,
                2 => Severity::High,
                _ => Severity::Critical,
            })).collect();
            prop_assert!(risk_score(&issues) <= 100);
        }

        #[test]
        fn kelly_fraction_bounded(p in 0.0f64..=1.0, b in 0.0001f64..100.0) {
            let k = kelly_fraction(p, b);
            prop_assert!(k >= 0.0);
            prop_assert!(k <= 1.0);
            if p * b <= 1.0 - p {
                prop_assert_eq!(k, 0.0);
            }
        }
    }
}
