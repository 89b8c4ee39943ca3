//! Portfolio-wide risk gate consulted by every strategy before submission

use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};
use crate::{
    config::{RiskConfig, KELLY_MULTIPLIER, LIQUIDITY_BUDGET_FRACTION},
    errors::{BotError, BotResult},
    risk::{
        metrics::{compute_metrics, kelly_fraction, risk_score, ReturnWindow},
        stress::run_stress_tests,
    },
    types::{
        Breach, BreachKind, IssueKind, PortfolioState, Position, RemediationAction, RiskEvaluation,
        RiskIssue, RiskLimits, RiskMetrics, RiskReport, RiskTier, ScenarioResult, Severity,
        TradeOpportunity,
    },
};

/// Everything derived by the metrics update; written only by `update_portfolio_metrics`
/// and `seed_returns`.
struct RiskBook {
    portfolio: PortfolioState,
    returns: ReturnWindow,
    metrics: RiskMetrics,
    last_value: Option<Decimal>,
}

pub struct RiskGate {
    config: RiskConfig,
    book: RwLock<RiskBook>,
    breaches: RwLock<Vec<Breach>>,
    critical_tx: watch::Sender<bool>,
}

fn to_decimal(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or_default()
}

/// Loss fraction assumed for a failed trade when the return history is too short.
fn tier_loss_rate(tier: RiskTier) -> f64 {
    match tier {
        RiskTier::Low => 0.01,
        RiskTier::Medium => 0.03,
        RiskTier::High => 0.05,
    }
}

impl RiskGate {
    pub fn new(config: RiskConfig) -> Self {
        let (critical_tx, _) = watch::channel(false);
        Self {
            book: RwLock::new(RiskBook {
                portfolio: PortfolioState::default(),
                returns: ReturnWindow::new(config.window_size),
                metrics: RiskMetrics::default(),
                last_value: None,
            }),
            breaches: RwLock::new(Vec::new()),
            critical_tx,
            config,
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.config.limits
    }

    /// Flips to `true` while a critical breach is outstanding.
    pub fn subscribe_breaches(&self) -> watch::Receiver<bool> {
        self.critical_tx.subscribe()
    }

    pub async fn portfolio(&self) -> PortfolioState {
        self.book.read().await.portfolio.clone()
    }

    pub async fn metrics(&self) -> RiskMetrics {
        self.book.read().await.metrics.clone()
    }

    pub async fn outstanding_critical(&self) -> Option<RemediationAction> {
        self.breaches.read().await
            .iter()
            .find(|b| b.is_critical())
            .map(|b| b.action)
    }

    pub async fn evaluate(&self, opportunity: &TradeOpportunity) -> RiskEvaluation {
        let outstanding = self.outstanding_critical().await;
        let book = self.book.read().await;
        let evaluation = assess_opportunity(
            &self.config.limits,
            &book.portfolio,
            &book.metrics,
            outstanding,
            opportunity,
        );
        debug!(
            opportunity = %opportunity.id,
            score = evaluation.risk_score,
            approved = evaluation.approved,
            issues = evaluation.issues.len(),
            "Risk evaluation"
        );
        evaluation
    }

    pub async fn optimal_position_size(&self, opportunity: &TradeOpportunity) -> Decimal {
        let total_value = self.book.read().await.portfolio.total_value;
        half_kelly_size(total_value, opportunity, self.config.limits.max_position_size)
    }

    /// The pre-submission check every strategy goes through.
    pub async fn authorize(
        &self,
        opportunity: &TradeOpportunity,
        amount: Decimal,
    ) -> BotResult<RiskEvaluation> {
        if let Some(action) = self.outstanding_critical().await {
            return Err(BotError::BreachCritical { action });
        }

        if amount > self.config.limits.max_position_size {
            return Err(BotError::validation(format!(
                "Requested ${:.2} exceeds max position size ${:.2}",
                amount, self.config.limits.max_position_size
            )));
        }

        let mut sized = opportunity.clone();
        sized.loan_amount = amount;
        let evaluation = self.evaluate(&sized).await;

        if !evaluation.approved {
            return Err(BotError::RiskRejected { evaluation: Box::new(evaluation) });
        }
        Ok(evaluation)
    }

    pub async fn update_portfolio_metrics(&self, positions: Vec<Position>, total_value: Decimal) {
        let mut book = self.book.write().await;

        if let Some(previous) = book.last_value {
            if previous > dec!(0) {
                let sample = ((total_value - previous) / previous).to_f64().unwrap_or(0.0);
                book.returns.push(sample);
            }
        }
        book.last_value = Some(total_value);

        book.portfolio = derive_portfolio(positions, total_value, self.config.liquid_fraction);
        let returns = book.returns.to_vec();
        book.metrics = compute_metrics(
            &returns,
            self.config.var_confidence,
            self.config.time_horizon_days,
            total_value,
        );

        debug!(
            value = %total_value,
            leverage = %book.portfolio.leverage.round_dp(3),
            liquidity = %book.portfolio.liquidity_ratio.round_dp(3),
            samples = book.metrics.sample_count,
            "Portfolio metrics updated"
        );
    }

    /// Rebuilds the return window after a restart.
    pub async fn seed_returns(&self, samples: &[f64]) {
        let mut book = self.book.write().await;
        book.returns.extend(samples.iter().copied());
        let returns = book.returns.to_vec();
        let value = book.portfolio.total_value;
        book.metrics = compute_metrics(
            &returns,
            self.config.var_confidence,
            self.config.time_horizon_days,
            value,
        );
        info!("📈 Seeded risk window with {} return samples", book.returns.len());
    }

    pub async fn check_breaches(&self) -> Vec<Breach> {
        let found = {
            let book = self.book.read().await;
            detect_breaches(&self.config.limits, &book.portfolio, &book.metrics)
        };

        for breach in &found {
            if breach.is_critical() {
                error!(
                    kind = ?breach.kind,
                    current = %breach.current,
                    limit = %breach.limit,
                    action = ?breach.action,
                    "🚨 Critical risk breach"
                );
            } else {
                warn!(kind = ?breach.kind, current = %breach.current, limit = %breach.limit, "⚠️ Risk breach");
            }
        }

        let critical = found.iter().any(Breach::is_critical);
        *self.breaches.write().await = found.clone();
        self.critical_tx.send_if_modified(|state| {
            let changed = *state != critical;
            *state = critical;
            changed
        });

        found
    }

    pub async fn run_stress_tests(&self, portfolio_value: Decimal) -> Vec<ScenarioResult> {
        run_stress_tests(portfolio_value, self.config.limits.max_drawdown)
    }

    pub async fn risk_report(&self) -> RiskReport {
        let (portfolio, metrics) = {
            let book = self.book.read().await;
            (book.portfolio.clone(), book.metrics.clone())
        };
        let breaches = self.breaches.read().await.clone();
        let stress_results = run_stress_tests(portfolio.total_value, self.config.limits.max_drawdown);
        let recommendations = report_recommendations(&self.config.limits, &metrics, &breaches, &stress_results);

        RiskReport {
            generated_at: Utc::now(),
            portfolio,
            metrics,
            breaches,
            stress_results,
            recommendations,
        }
    }
}

pub fn half_kelly_size(
    portfolio_value: Decimal,
    opportunity: &TradeOpportunity,
    max_position_size: Decimal,
) -> Decimal {
    if opportunity.loan_amount <= dec!(0) || portfolio_value <= dec!(0) {
        return dec!(0);
    }
    let b = (opportunity.potential_profit / opportunity.loan_amount).to_f64().unwrap_or(0.0);
    let fraction = kelly_fraction(opportunity.success_probability, b) * KELLY_MULTIPLIER;
    (portfolio_value * to_decimal(fraction))
        .min(max_position_size)
        .max(dec!(0))
}

fn derive_portfolio(positions: Vec<Position>, total_value: Decimal, liquid_fraction: Decimal) -> PortfolioState {
    let total_exposure: Decimal = positions.iter().map(|p| p.exposure_usd.abs()).sum();
    let known_liquid: Vec<Decimal> = positions.iter().filter_map(|p| p.liquid_usd).collect();
    let liquid_assets = if known_liquid.is_empty() {
        total_value * liquid_fraction
    } else {
        known_liquid.iter().copied().sum()
    };

    let (leverage, liquidity_ratio, largest_concentration) = if total_value > dec!(0) {
        let largest = positions.iter().map(|p| p.exposure_usd.abs()).max().unwrap_or_default();
        (
            total_exposure / total_value,
            (liquid_assets / total_value).min(dec!(1)),
            largest / total_value,
        )
    } else {
        (dec!(0), dec!(0), dec!(0))
    };

    PortfolioState {
        positions: positions.into_iter().map(|p| (p.asset.clone(), p)).collect::<HashMap<_, _>>(),
        total_value,
        total_exposure,
        leverage,
        liquidity_ratio,
        largest_concentration,
    }
}

pub fn assess_opportunity(
    limits: &RiskLimits,
    portfolio: &PortfolioState,
    metrics: &RiskMetrics,
    outstanding_critical: Option<RemediationAction>,
    opportunity: &TradeOpportunity,
) -> RiskEvaluation {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();
    let amount = opportunity.loan_amount;
    let value = portfolio.total_value;

    if let Some(action) = outstanding_critical {
        issues.push(RiskIssue {
            kind: IssueKind::OutstandingBreach,
            severity: Severity::Critical,
            message: format!("Critical portfolio breach outstanding ({:?})", action),
        });
        recommendations.push("Resolve the outstanding breach before opening new positions".to_string());
    }

    if amount > limits.max_position_size {
        issues.push(RiskIssue {
            kind: IssueKind::PositionSize,
            severity: Severity::High,
            message: format!("Position ${:.2} exceeds max ${:.2}", amount, limits.max_position_size),
        });
        recommendations.push(format!("Reduce size to at most ${:.2}", limits.max_position_size));
    }

    if value > dec!(0) {
        let existing = portfolio.positions
            .get(&opportunity.asset_pair())
            .map(|p| p.exposure_usd.abs())
            .unwrap_or_default();
        let concentration = (existing + amount) / value;
        if concentration > limits.max_concentration {
            let severity = if concentration > limits.max_concentration * dec!(2) {
                Severity::High
            } else {
                Severity::Medium
            };
            issues.push(RiskIssue {
                kind: IssueKind::Concentration,
                severity,
                message: format!(
                    "Concentration {:.1}% exceeds {:.1}%",
                    concentration * dec!(100), limits.max_concentration * dec!(100)
                ),
            });
            recommendations.push("Diversify across venues or split the trade".to_string());
        }

        let loss_rate = if metrics.var_95 > 0.0 {
            metrics.var_95
        } else {
            tier_loss_rate(opportunity.risk_tier)
        };
        let projected_var = metrics.var_95_usd + amount * to_decimal(loss_rate);
        let var_limit = limits.max_var * value;
        if projected_var > var_limit {
            let severity = if projected_var > var_limit * dec!(2) {
                Severity::Critical
            } else {
                Severity::High
            };
            issues.push(RiskIssue {
                kind: IssueKind::VarLimit,
                severity,
                message: format!("Projected VaR ${:.2} exceeds limit ${:.2}", projected_var, var_limit),
            });
            recommendations.push("Hedge existing exposure or wait for VaR to decay".to_string());
        }

        let projected_leverage = (portfolio.total_exposure + amount) / value;
        if projected_leverage > limits.max_leverage {
            issues.push(RiskIssue {
                kind: IssueKind::Leverage,
                severity: Severity::High,
                message: format!(
                    "Projected leverage {:.2}x exceeds {:.2}x",
                    projected_leverage, limits.max_leverage
                ),
            });
        }
    } else {
        issues.push(RiskIssue {
            kind: IssueKind::Concentration,
            severity: Severity::Medium,
            message: "Portfolio value unknown; concentration cannot be bounded".to_string(),
        });
    }

    let liquidity_budget = value.max(dec!(0)) * portfolio.liquidity_ratio;
    if amount > liquidity_budget * LIQUIDITY_BUDGET_FRACTION {
        issues.push(RiskIssue {
            kind: IssueKind::LiquidityBudget,
            severity: Severity::Medium,
            message: format!(
                "Capital ${:.2} exceeds 10% of liquidity budget ${:.2}",
                amount, liquidity_budget
            ),
        });
    }

    if opportunity.success_probability < 0.5 {
        issues.push(RiskIssue {
            kind: IssueKind::SuccessProbability,
            severity: Severity::Medium,
            message: format!("Success probability {:.0}% below 50%", opportunity.success_probability * 100.0),
        });
    }

    if opportunity.risk_tier == RiskTier::High {
        issues.push(RiskIssue {
            kind: IssueKind::RiskTier,
            severity: Severity::Low,
            message: "Opportunity classified as high risk".to_string(),
        });
    }

    if !issues.is_empty() {
        let suggested = half_kelly_size(value, opportunity, limits.max_position_size);
        recommendations.push(format!("Half-Kelly size: ${:.2}", suggested));
    }

    let approved = !issues.iter().any(|i| i.severity == Severity::Critical);
    RiskEvaluation {
        opportunity_id: opportunity.id.clone(),
        approved,
        risk_score: risk_score(&issues),
        issues,
        recommendations,
    }
}

pub fn detect_breaches(limits: &RiskLimits, portfolio: &PortfolioState, metrics: &RiskMetrics) -> Vec<Breach> {
    let mut breaches = Vec::new();
    if portfolio.total_value <= dec!(0) {
        return breaches;
    }
    let now = Utc::now();
    let mut push = |kind, severity, current, limit, action| {
        breaches.push(Breach { kind, severity, current, limit, action, detected_at: now });
    };

    if portfolio.leverage > limits.max_leverage {
        push(
            BreachKind::Leverage,
            Severity::Critical,
            portfolio.leverage,
            limits.max_leverage,
            RemediationAction::ImmediateReduction,
        );
    }

    if portfolio.liquidity_ratio < limits.min_liquidity_ratio {
        push(
            BreachKind::Liquidity,
            Severity::High,
            portfolio.liquidity_ratio,
            limits.min_liquidity_ratio,
            RemediationAction::IncreaseLiquidity,
        );
    }

    let var = to_decimal(metrics.var_95);
    if var > limits.max_var {
        push(BreachKind::Var, Severity::High, var, limits.max_var, RemediationAction::ReduceRisk);
    }

    let drawdown = to_decimal(metrics.max_drawdown);
    if drawdown > limits.max_drawdown {
        push(
            BreachKind::Drawdown,
            Severity::Critical,
            drawdown,
            limits.max_drawdown,
            RemediationAction::HaltTrading,
        );
    }

    if portfolio.largest_concentration > limits.max_concentration {
        push(
            BreachKind::Concentration,
            Severity::Medium,
            portfolio.largest_concentration,
            limits.max_concentration,
            RemediationAction::Rebalance,
        );
    }

    breaches
}

fn report_recommendations(
    limits: &RiskLimits,
    metrics: &RiskMetrics,
    breaches: &[Breach],
    stress: &[ScenarioResult],
) -> Vec<String> {
    let mut recs: Vec<String> = breaches
        .iter()
        .map(|b| match b.action {
            RemediationAction::ImmediateReduction => {
                format!("Reduce exposure immediately: leverage {:.2}x over {:.2}x", b.current, b.limit)
            }
            RemediationAction::HaltTrading => {
                format!("Halt trading: drawdown {:.1}% over {:.1}%", b.current * dec!(100), b.limit * dec!(100))
            }
            RemediationAction::IncreaseLiquidity => {
                format!("Raise liquid reserves: ratio {:.2} under {:.2}", b.current, b.limit)
            }
            RemediationAction::ReduceRisk => {
                format!("Cut position sizes: VaR {:.2}% over {:.2}%", b.current * dec!(100), b.limit * dec!(100))
            }
            RemediationAction::Rebalance => "Rebalance the largest position".to_string(),
        })
        .collect();

    if metrics.sample_count < crate::config::MIN_RETURN_SAMPLES {
        recs.push(format!(
            "Only {} return samples; VaR/ES reported as zero until 30 are collected",
            metrics.sample_count
        ));
    } else if metrics.sharpe_ratio < 1.0 {
        recs.push(format!("Sharpe ratio {:.2} is weak; favour higher-probability setups", metrics.sharpe_ratio));
    }

    let breaching = stress.iter().filter(|s| s.breaches_drawdown_limit).count();
    if breaching > 0 {
        recs.push(format!(
            "{} of {} stress scenarios exceed the {:.0}% drawdown limit",
            breaching,
            stress.len(),
            limits.max_drawdown * dec!(100)
        ));
    }

    recs
}
