use aero_exec_engine::{
    config::RiskConfig,
    risk::RiskGate,
    types::{BreachKind, ExecutionPayload, IssueKind, RemediationAction, RiskTier, Severity, TradeOpportunity},
};
use alloy::primitives::{Address, Bytes, U256};
use rust_decimal_macros::dec;

fn opportunity(amount: rust_decimal::Decimal) -> TradeOpportunity {
    TradeOpportunity {
        id: "opp".to_string(),
        token_in: Address::repeat_byte(1),
        token_out: Address::repeat_byte(2),
        buy_venue: "a".to_string(),
        sell_venue: "b".to_string(),
        loan_amount: amount,
        potential_profit: amount / dec!(50),
        success_probability: 0.7,
        risk_tier: RiskTier::Medium,
        payload: ExecutionPayload {
            to: Address::repeat_byte(3),
            calldata: Bytes::new(),
            value: U256::ZERO,
            gas_limit: 100_000,
        },
    }
}

/// One 6% loss in every ten samples puts the 95% tail at exactly -6%.
fn six_percent_tail() -> Vec<f64> {
    (0..100).map(|i| if i % 10 == 0 { -0.06 } else { 0.01 }).collect()
}

#[tokio::test]
async fn var_over_limit_is_a_high_breach_that_does_not_block() {
    let gate = RiskGate::new(RiskConfig::default());
    gate.update_portfolio_metrics(Vec::new(), dec!(1000000)).await;
    gate.seed_returns(&six_percent_tail()).await;

    let metrics = gate.metrics().await;
    assert!((metrics.var_95 - 0.06).abs() < 1e-12);
    assert_eq!(metrics.var_95_usd.round_dp(2), dec!(60000));

    let breaches = gate.check_breaches().await;
    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].kind, BreachKind::Var);
    assert_eq!(breaches[0].severity, Severity::High);
    assert_eq!(breaches[0].action, RemediationAction::ReduceRisk);
    assert!(gate.outstanding_critical().await.is_none());

    let evaluation = gate.evaluate(&opportunity(dec!(1000))).await;
    assert!(evaluation.approved);
    assert!(evaluation.issues.iter().any(|i| i.kind == IssueKind::VarLimit && i.severity == Severity::High));
    assert!(gate.authorize(&opportunity(dec!(1000)), dec!(1000)).await.is_ok());
}

#[tokio::test]
async fn report_carries_metrics_breaches_and_scenarios() {
    let gate = RiskGate::new(RiskConfig::default());
    gate.update_portfolio_metrics(Vec::new(), dec!(1000000)).await;
    gate.seed_returns(&six_percent_tail()).await;
    gate.check_breaches().await;

    let report = gate.risk_report().await;
    assert_eq!(report.metrics.sample_count, 100);
    assert_eq!(report.breaches.len(), 1);
    assert_eq!(report.stress_results.len(), 6);
    assert!(report.stress_results.iter().any(|s| s.breaches_drawdown_limit));
    assert!(!report.recommendations.is_empty());
}

#[tokio::test]
async fn breach_watch_flips_with_critical_state() {
    let gate = RiskGate::new(RiskConfig::default());
    let rx = gate.subscribe_breaches();
    gate.update_portfolio_metrics(Vec::new(), dec!(100000)).await;
    gate.check_breaches().await;
    assert!(!*rx.borrow());

    let levered = vec![aero_exec_engine::types::Position {
        asset: "perp".to_string(),
        exposure_usd: dec!(450000),
        liquid_usd: Some(dec!(100000)),
    }];
    gate.update_portfolio_metrics(levered, dec!(100000)).await;
    gate.check_breaches().await;
    assert!(*rx.borrow());
    assert_eq!(gate.outstanding_critical().await, Some(RemediationAction::ImmediateReduction));

    gate.update_portfolio_metrics(Vec::new(), dec!(100000)).await;
    gate.check_breaches().await;
    assert!(!*rx.borrow());
}
