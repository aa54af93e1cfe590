//! Decimal helpers for money figures

use bigdecimal::{BigDecimal, RoundingMode};

/// Round half away from zero to `scale` decimal places
pub fn round_amount(amount: &BigDecimal, scale: i64) -> BigDecimal {
    amount.with_scale_round(scale, RoundingMode::HalfUp)
}

/// Sum a sequence of amounts, zero when empty
pub fn sum_amounts<'a, I>(amounts: I) -> BigDecimal
where
    I: IntoIterator<Item = &'a BigDecimal>,
{
    amounts
        .into_iter()
        .fold(BigDecimal::from(0), |acc, amount| acc + amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_amount_half_up() {
        let amount = BigDecimal::from_str("10.125").unwrap();
        assert_eq!(round_amount(&amount, 2), BigDecimal::from_str("10.13").unwrap());

        let negative = BigDecimal::from_str("-4.005").unwrap();
        assert_eq!(round_amount(&negative, 2), BigDecimal::from_str("-4.01").unwrap());
    }

    #[test]
    fn test_sum_amounts() {
        let amounts = vec![
            BigDecimal::from_str("1.10").unwrap(),
            BigDecimal::from_str("2.20").unwrap(),
        ];
        assert_eq!(sum_amounts(&amounts), BigDecimal::from_str("3.30").unwrap());
        assert_eq!(sum_amounts(std::iter::empty()), BigDecimal::from(0));
    }
}
