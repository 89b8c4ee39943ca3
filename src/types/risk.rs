//! Risk evaluation, breach and stress-test types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use super::PortfolioState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn penalty(&self) -> u32 {
        match self {
            Severity::Critical => 30,
            Severity::High => 20,
            Severity::Medium => 10,
            Severity::Low => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    PositionSize,
    Concentration,
    VarLimit,
    LiquidityBudget,
    Leverage,
    SuccessProbability,
    RiskTier,
    OutstandingBreach,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskEvaluation {
    pub opportunity_id: String,
    pub approved: bool,
    /// Always within [0, 100].
    pub risk_score: u32,
    pub issues: Vec<RiskIssue>,
    pub recommendations: Vec<String>,
}

impl RiskEvaluation {
    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BreachKind {
    Leverage,
    Liquidity,
    Var,
    Drawdown,
    Concentration,
}

/// Tag the orchestrator acts on when a breach is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemediationAction {
    ImmediateReduction,
    HaltTrading,
    IncreaseLiquidity,
    ReduceRisk,
    Rebalance,
}

#[derive(Debug, Clone, Serialize)]
pub struct Breach {
    pub kind: BreachKind,
    pub severity: Severity,
    pub current: Decimal,
    pub limit: Decimal,
    pub action: RemediationAction,
    pub detected_at: DateTime<Utc>,
}

impl Breach {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecoveryTime {
    Days,
    OneWeek,
    TwoToFourWeeks,
    OneToThreeMonths,
    ThreeToSixMonthsPlus,
}

impl RecoveryTime {
    pub fn from_loss_fraction(loss: Decimal) -> Self {
        use rust_decimal_macros::dec;
        match loss {
            l if l < dec!(0.05) => RecoveryTime::Days,
            l if l < dec!(0.10) => RecoveryTime::OneWeek,
            l if l < dec!(0.20) => RecoveryTime::TwoToFourWeeks,
            l if l < dec!(0.50) => RecoveryTime::OneToThreeMonths,
            _ => RecoveryTime::ThreeToSixMonthsPlus,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecoveryTime::Days => "days",
            RecoveryTime::OneWeek => "1 week",
            RecoveryTime::TwoToFourWeeks => "2-4 weeks",
            RecoveryTime::OneToThreeMonths => "1-3 months",
            RecoveryTime::ThreeToSixMonthsPlus => "3-6 months+",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub scenario: String,
    pub shock: Decimal,
    pub stressed_value: Decimal,
    pub loss: Decimal,
    pub loss_fraction: Decimal,
    pub breaches_drawdown_limit: bool,
    pub recovery: RecoveryTime,
}

/// All-zero until enough samples exist.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RiskMetrics {
    pub sample_count: usize,
    /// Fractions of portfolio value.
    pub var_95: f64,
    pub var_99: f64,
    pub expected_shortfall_95: f64,
    pub var_95_usd: Decimal,
    pub expected_shortfall_95_usd: Decimal,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub calmar_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub generated_at: DateTime<Utc>,
    pub portfolio: PortfolioState,
    pub metrics: RiskMetrics,
    pub breaches: Vec<Breach>,
    pub stress_results: Vec<ScenarioResult>,
    pub recommendations: Vec<String>,
}
