use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cap_table::{CapTable, CapTableInput};
use crate::error::EquityError;
use crate::types::*;
use crate::waterfall::{cap_table_warnings, run_waterfall};
use crate::EquityResult;

const MAX_ITERATIONS: u32 = 200;

/// Bisection stops once the bracket is narrower than this.
const TOLERANCE: Money = dec!(1);

/// Input for break-even analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakEvenInput {
    pub cap_table: CapTableInput,
}

/// Exit valuation at which the option grant starts to carry value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreakEvenOutput {
    /// Smallest exit found (to within one currency unit) at which the common
    /// share price exceeds the strike
    pub break_even_exit: Money,
    pub price_at_break_even: Money,
    /// Strike x total shares: ignores preferences entirely
    pub naive_break_even_exit: Money,
    pub break_even_price_per_share: Money,
    /// Total preference stack senior to common
    pub preference_overhang: Money,
    pub iterations: u32,
}

fn common_price(cap_table: &CapTable, exit: Money) -> EquityResult<Money> {
    Ok(run_waterfall(cap_table, exit)?.price_per_common_share)
}

/// Find the break-even exit by bracketing then bisecting on the waterfall.
///
/// Assumes the common price is non-decreasing in the exit valuation.
pub fn break_even_exit(cap_table: &CapTable) -> EquityResult<BreakEvenOutput> {
    let strike = cap_table.strike_price();
    let naive = strike
        .checked_mul(dec_shares(cap_table.total_shares()))
        .ok_or_else(|| EquityError::InvalidInput {
            field: "strike_price".into(),
            reason: "Strike price x total shares exceeds the representable range".into(),
        })?;
    let in_money = |exit: Money| -> EquityResult<bool> { Ok(common_price(cap_table, exit)? > strike) };

    // Surfaces an unusable cap table before any searching.
    common_price(cap_table, Decimal::ZERO)?;

    let mut iterations = 0u32;
    let mut lo = Decimal::ZERO;
    let mut hi = naive.max(Decimal::ONE);

    while !in_money(hi)? {
        iterations += 1;
        lo = hi;
        hi = match hi.checked_mul(dec!(2)) {
            Some(next) if iterations < MAX_ITERATIONS => next,
            _ => {
                return Err(EquityError::ConvergenceFailure {
                    function: "break_even_exit (bracketing)".into(),
                    iterations,
                    last_delta: hi - lo,
                })
            }
        };
    }

    while hi - lo > TOLERANCE {
        iterations += 1;
        if iterations > MAX_ITERATIONS {
            return Err(EquityError::ConvergenceFailure {
                function: "break_even_exit (bisection)".into(),
                iterations,
                last_delta: hi - lo,
            });
        }
        let mid = lo + (hi - lo) / dec!(2);
        if in_money(mid)? {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    let preference_overhang = cap_table
        .rounds()
        .iter()
        .filter(|r| r.is_active())
        .map(|r| r.liquidation_preference())
        .sum();

    Ok(BreakEvenOutput {
        break_even_exit: hi,
        price_at_break_even: common_price(cap_table, hi)?,
        naive_break_even_exit: naive,
        break_even_price_per_share: strike,
        preference_overhang,
        iterations,
    })
}

/// Break-even analysis wrapped in the computation envelope.
pub fn analyze_break_even(input: &BreakEvenInput) -> EquityResult<ComputationOutput<BreakEvenOutput>> {
    let start = Instant::now();
    let cap_table = input.cap_table.build()?;
    let mut warnings = cap_table_warnings(&cap_table);
    if cap_table.employee_options() == 0 {
        warnings.push("No option grant; break-even refers to the common share price only".into());
    }

    let output = break_even_exit(&cap_table)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Break-even Exit Valuation (bracketed bisection on the liquidation waterfall)",
        &serde_json::json!({
            "strike_price": cap_table.strike_price().to_string(),
            "total_shares": cap_table.total_shares(),
            "tolerance": TOLERANCE.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
