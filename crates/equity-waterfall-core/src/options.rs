use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cap_table::CapTable;
use crate::error::EquityError;
use crate::types::{dec_shares, Money, Shares};
use crate::EquityResult;

/// Intrinsic value of the employee's option grant at a given common price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionValuation {
    pub options: Shares,
    pub strike_price: Money,
    pub price_per_common_share: Money,
    /// max(0, price - strike)
    pub value_per_option: Money,
    pub total_value: Money,
    /// Cash needed to exercise the whole grant
    pub exercise_cost: Money,
    pub in_the_money: bool,
}

/// Value per option: the holder never exercises at a loss.
pub fn intrinsic_value(price_per_common_share: Money, strike_price: Money) -> Money {
    (price_per_common_share - strike_price).max(Decimal::ZERO)
}

/// Value the cap table's option grant at `price_per_common_share`.
///
/// Fails only when the grant's value leaves the decimal range, which takes
/// an exit near `Decimal::MAX` spread over few common shares.
pub fn value_options(
    cap_table: &CapTable,
    price_per_common_share: Money,
) -> EquityResult<OptionValuation> {
    let strike = cap_table.strike_price();
    let options = cap_table.employee_options();
    let value_per_option = intrinsic_value(price_per_common_share, strike);
    let total_value = value_per_option
        .checked_mul(dec_shares(options))
        .ok_or_else(|| EquityError::InvalidInput {
            field: "exit_valuation".into(),
            reason: "Option grant value exceeds the representable range".into(),
        })?;

    Ok(OptionValuation {
        options,
        strike_price: strike,
        price_per_common_share,
        value_per_option,
        total_value,
        exercise_cost: cap_table.investment_cost(),
        in_the_money: price_per_common_share > strike,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap_table::CapTableBuilder;
    use rust_decimal_macros::dec;

    #[test]
    fn test_in_the_money_grant() {
        let table = CapTableBuilder::new(10_000_000)
            .employee_options(50_000)
            .strike_price(dec!(0.10))
            .build()
            .unwrap();
        let val = value_options(&table, dec!(5)).unwrap();

        assert_eq!(val.value_per_option, dec!(4.90));
        assert_eq!(val.total_value, dec!(245_000));
        assert_eq!(val.exercise_cost, dec!(5_000));
        assert!(val.in_the_money);
    }

    #[test]
    fn test_underwater_grant_is_worth_zero() {
        assert_eq!(intrinsic_value(dec!(0.05), dec!(0.10)), Decimal::ZERO);
        assert_eq!(intrinsic_value(Decimal::ZERO, dec!(1)), Decimal::ZERO);
    }

    #[test]
    fn test_at_the_money_is_not_in_the_money() {
        let table = CapTableBuilder::new(100)
            .employee_options(10)
            .strike_price(dec!(1))
            .build()
            .unwrap();
        let val = value_options(&table, dec!(1)).unwrap();
        assert_eq!(val.total_value, Decimal::ZERO);
        assert!(!val.in_the_money);
    }

    #[test]
    fn test_grant_value_overflow_is_an_error() {
        let table = CapTableBuilder::new(1_000_000)
            .employee_options(1_000)
            .build()
            .unwrap();
        let result = value_options(&table, Decimal::MAX / dec!(10));
        assert!(matches!(result, Err(EquityError::InvalidInput { .. })));
    }
}
