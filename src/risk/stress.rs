//! Fixed-shock stress scenarios

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use crate::{
    config::STRESS_SHOCKS,
    types::{RecoveryTime, ScenarioResult},
};

pub fn run_stress_tests(portfolio_value: Decimal, max_drawdown: Decimal) -> Vec<ScenarioResult> {
    let value = portfolio_value.max(dec!(0));

    STRESS_SHOCKS
        .iter()
        .map(|(name, shock)| {
            let stressed_value = (value * (dec!(1) + *shock)).max(dec!(0));
            let loss = value - stressed_value;
            let loss_fraction = if value > dec!(0) { loss / value } else { dec!(0) };

            ScenarioResult {
                scenario: name.to_string(),
                shock: *shock,
                stressed_value,
                loss,
                loss_fraction,
                breaches_drawdown_limit: loss_fraction > max_drawdown,
                recovery: RecoveryTime::from_loss_fraction(loss_fraction),
            }
        })
        .collect()
}
