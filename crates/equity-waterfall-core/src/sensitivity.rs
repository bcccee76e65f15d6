use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cap_table::{CapTable, CapTableInput};
use crate::error::EquityError;
use crate::options::value_options;
use crate::types::*;
use crate::waterfall::{cap_table_warnings, run_waterfall};
use crate::EquityResult;

/// Exit multipliers applied to the base exit when none are given.
pub const DEFAULT_EXIT_MULTIPLIERS: [Decimal; 6] = [
    dec!(0.5),
    dec!(0.75),
    dec!(1.0),
    dec!(1.25),
    dec!(1.5),
    dec!(2.0),
];

/// Input for an exit-valuation sensitivity sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub cap_table: CapTableInput,
    pub base_exit_valuation: Money,
    /// Multipliers of the base exit; defaults to 0.5x..2.0x
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multipliers: Option<Vec<Decimal>>,
}

/// One point of the sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensitivityPoint {
    pub multiplier: Decimal,
    pub exit_valuation: Money,
    pub common_proceeds: Money,
    pub price_per_common_share: Money,
    pub option_value: Money,
}

/// Output of an exit-valuation sensitivity sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub base_exit_valuation: Money,
    pub points: Vec<SensitivityPoint>,
    pub min_option_value: Money,
    pub max_option_value: Money,
}

/// Run the full waterfall at `base_exit * m` for every multiplier `m`.
pub fn exit_sensitivity(
    cap_table: &CapTable,
    base_exit: Money,
    multipliers: &[Decimal],
) -> EquityResult<Vec<SensitivityPoint>> {
    if base_exit <= Decimal::ZERO {
        return Err(EquityError::InvalidInput {
            field: "base_exit_valuation".into(),
            reason: "Base exit valuation must be positive".into(),
        });
    }
    if multipliers.is_empty() {
        return Err(EquityError::InsufficientData(
            "At least one exit multiplier required".into(),
        ));
    }
    if let Some(bad) = multipliers.iter().find(|m| **m <= Decimal::ZERO) {
        return Err(EquityError::InvalidInput {
            field: "multipliers".into(),
            reason: format!("Multiplier {} must be positive", bad),
        });
    }

    multipliers
        .iter()
        .map(|&multiplier| {
            let exit_valuation = base_exit.checked_mul(multiplier).ok_or_else(|| {
                EquityError::InvalidInput {
                    field: "multipliers".into(),
                    reason: format!(
                        "{} x {} exceeds the representable range",
                        base_exit, multiplier
                    ),
                }
            })?;
            let waterfall = run_waterfall(cap_table, exit_valuation)?;
            let options = value_options(cap_table, waterfall.price_per_common_share)?;
            Ok(SensitivityPoint {
                multiplier,
                exit_valuation,
                common_proceeds: waterfall.common_proceeds,
                price_per_common_share: waterfall.price_per_common_share,
                option_value: options.total_value,
            })
        })
        .collect()
}

/// Sensitivity sweep wrapped in the computation envelope.
pub fn analyze_exit_sensitivity(
    input: &SensitivityInput,
) -> EquityResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let cap_table = input.cap_table.build()?;
    let mut warnings = cap_table_warnings(&cap_table);

    let multipliers: &[Decimal] = match &input.multipliers {
        Some(m) => m.as_slice(),
        None => &DEFAULT_EXIT_MULTIPLIERS[..],
    };
    let points = exit_sensitivity(&cap_table, input.base_exit_valuation, multipliers)?;

    let min_option_value = points
        .iter()
        .map(|p| p.option_value)
        .min()
        .unwrap_or(Decimal::ZERO);
    let max_option_value = points
        .iter()
        .map(|p| p.option_value)
        .max()
        .unwrap_or(Decimal::ZERO);
    if max_option_value.is_zero() && cap_table.employee_options() > 0 {
        warnings.push("Options are out of the money across the whole sweep".into());
    }

    let output = SensitivityOutput {
        base_exit_valuation: input.base_exit_valuation,
        points,
        min_option_value,
        max_option_value,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Exit Valuation Sensitivity (full liquidation waterfall per point)",
        &serde_json::json!({
            "base_exit_valuation": input.base_exit_valuation.to_string(),
            "multipliers": multipliers.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
