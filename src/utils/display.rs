//! Display and printing utilities

use std::time::Instant;
use tracing::{error, info, warn};
use crate::{
    errors::CircuitBreaker,
    types::{LiquidityOpportunity, RiskReport, StrategyStatus},
};

pub async fn print_session_stats(start_time: Instant, statuses: &[StrategyStatus], circuit_breaker: &CircuitBreaker) {
    let runtime = start_time.elapsed().as_secs() / 60;

    info!("\n📊 Session Statistics ({} minutes)", runtime);
    for status in statuses {
        info!("   🚀 {}:", status.name.to_uppercase());
        info!("     Operational: {}", status.operational);
        info!("     Attempts: {}", status.attempts);
        info!("     Successful: {}", status.successes);
        info!("     Success rate: {:.1}%",
            if status.attempts > 0 {
                (status.successes as f64 / status.attempts as f64) * 100.0
            } else {
                0.0
            }
        );
        info!("     Active positions: {}", status.active_positions);
        if status.current_block > 0 {
            info!("     Block: {} (congestion {:.0}%)", status.current_block, status.congestion * 100.0);
        }
    }

    info!("   ⚙️  SYSTEM:");
    info!("     Circuit breaker: {}",
        if *circuit_breaker.is_open.read().await { "OPEN" } else { "CLOSED" }
    );
    info!("");
}

pub fn print_risk_report(report: &RiskReport) {
    let portfolio = &report.portfolio;
    let metrics = &report.metrics;

    info!("\n🛡️  RISK REPORT {}", report.generated_at.format("%Y-%m-%d %H:%M:%S"));
    info!("💼 Portfolio:");
    info!("   Value: ${:.2}", portfolio.total_value);
    info!("   Exposure: ${:.2} ({} positions)", portfolio.total_exposure, portfolio.positions.len());
    info!("   Leverage: {:.2}x", portfolio.leverage);
    info!("   Liquidity: {:.1}%", portfolio.liquidity_ratio * rust_decimal_macros::dec!(100));
    info!("   Largest position: {:.1}%", portfolio.largest_concentration * rust_decimal_macros::dec!(100));

    if metrics.sample_count > 0 {
        info!("📊 Metrics ({} samples):", metrics.sample_count);
        info!("   VaR 95%: {:.2}% (${:.2})", metrics.var_95 * 100.0, metrics.var_95_usd);
        info!("   VaR 99%: {:.2}%", metrics.var_99 * 100.0);
        info!("   ES 95%:  {:.2}% (${:.2})", metrics.expected_shortfall_95 * 100.0, metrics.expected_shortfall_95_usd);
        info!("   Sharpe: {:.2}  Sortino: {:.2}  Calmar: {:.2}",
            metrics.sharpe_ratio, metrics.sortino_ratio, metrics.calmar_ratio
        );
        info!("   Max drawdown: {:.2}%", metrics.max_drawdown * 100.0);
    } else {
        info!("📊 Metrics: not enough return history yet");
    }

    for breach in &report.breaches {
        if breach.is_critical() {
            error!("🚨 {:?} breach: {:.4} vs limit {:.4} -> {:?}", breach.kind, breach.current, breach.limit, breach.action);
        } else {
            warn!("⚠️  {:?} breach ({:?}): {:.4} vs limit {:.4} -> {:?}",
                breach.kind, breach.severity, breach.current, breach.limit, breach.action
            );
        }
    }

    info!("🧪 Stress scenarios:");
    for result in &report.stress_results {
        let marker = if result.breaches_drawdown_limit { "❌" } else { "✅" };
        info!("   {} {:<18} loss ${:.2} ({:.0}%), recovery {}",
            marker,
            result.scenario,
            result.loss,
            result.loss_fraction * rust_decimal_macros::dec!(100),
            result.recovery.label()
        );
    }

    if !report.recommendations.is_empty() {
        info!("📝 Recommendations:");
        for recommendation in &report.recommendations {
            info!("   {}", recommendation);
        }
    }
    info!("");
}

pub fn print_liquidity_opportunity(opportunity: &LiquidityOpportunity) {
    warn!("\n💧 LIQUIDITY OPPORTUNITY");
    warn!("📍 Pool: {}", opportunity.pool);
    warn!("🐋 Counterpart: {} (${:.2})", opportunity.counterpart.tx_hash, opportunity.counterpart.amount_usd);
    warn!("💰 Capture Analysis:");
    warn!("   Price impact: {:.3}%", opportunity.price_impact * 100.0);
    warn!("   Position: ${:.2}", opportunity.position_value_usd);
    warn!("   Expected capture: ${:.2}", opportunity.expected_divergence_usd);
    warn!("   Fee estimate: ${:.2}", opportunity.expected_fees_usd);
    warn!("   Gas: ${:.2}", opportunity.gas_cost_usd);
    warn!("   Net: ${:.2} ({:.2}%)", opportunity.net_profit_usd, opportunity.net_profit * rust_decimal_macros::dec!(100));
}
