//! Mathematical and unit-conversion helpers

use alloy::primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::str::FromStr;

pub fn pow10(n: i32) -> Decimal {
    match n {
        0 => dec!(1),
        6 => dec!(1_000_000),
        9 => dec!(1_000_000_000),
        18 => dec!(1_000_000_000_000_000_000),
        _ => {
            let mut result = dec!(1);
            if n > 0 {
                for _ in 0..n {
                    result *= dec!(10);
                }
            } else {
                for _ in 0..(-n) {
                    result /= dec!(10);
                }
            }
            result
        }
    }
}

/// Token amount in human units -> raw integer units; truncates dust below one unit.
pub fn to_raw_units(amount: Decimal, decimals: u8) -> U256 {
    if amount <= dec!(0) {
        return U256::ZERO;
    }
    let raw = (amount * pow10(decimals as i32)).trunc();
    U256::from_str(&raw.to_string()).unwrap_or(U256::ZERO)
}

pub fn from_raw_units(raw: U256, decimals: u8) -> Decimal {
    Decimal::from_str(&raw.to_string()).unwrap_or_default() / pow10(decimals as i32)
}

pub fn wei_to_gwei(wei: u128) -> Decimal {
    Decimal::from_u128(wei).unwrap_or_default() / pow10(9)
}

pub fn gwei_to_wei(gwei: u32) -> u128 {
    gwei as u128 * 1_000_000_000
}

/// Native-token cost of `gas_units` at `gas_price` wei, in USD.
pub fn gas_cost_usd(gas_units: u64, gas_price: u128, native_price_usd: Decimal) -> Decimal {
    let wei = Decimal::from_u128(gas_price).unwrap_or_default() * Decimal::from(gas_units);
    wei / pow10(18) * native_price_usd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_unit_conversion_truncates() {
        assert_eq!(to_raw_units(dec!(1.5), 6), U256::from(1_500_000u64));
        assert_eq!(to_raw_units(dec!(0.0000001), 6), U256::ZERO);
        assert_eq!(to_raw_units(dec!(-1), 18), U256::ZERO);
        assert_eq!(from_raw_units(U256::from(2_500_000u64), 6), dec!(2.5));
    }

    #[test]
    fn gas_cost_in_usd() {
        // 200k gas at 10 gwei = 0.002 ETH
        let cost = gas_cost_usd(200_000, 10_000_000_000, dec!(3000));
        assert_eq!(cost, dec!(6));
        assert_eq!(wei_to_gwei(gwei_to_wei(25)), dec!(25));
    }
}
