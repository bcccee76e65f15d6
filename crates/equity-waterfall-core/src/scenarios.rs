use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::cap_table::{CapTable, CapTableInput, LiquidationSummary};
use crate::error::EquityError;
use crate::options::value_options;
use crate::types::*;
use crate::waterfall::{cap_table_warnings, run_waterfall, WaterfallOutput};
use crate::EquityResult;

/// Stand-in for an unbounded ROI (free options that end up worth something).
pub const ROI_INFINITE: Rate = dec!(999_999);

/// A named exit valuation to test the cap table against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExitScenario {
    pub name: String,
    pub exit_valuation: Money,
}

impl ExitScenario {
    pub fn new(name: impl Into<String>, exit_valuation: Money) -> Self {
        Self {
            name: name.into(),
            exit_valuation,
        }
    }
}

/// Outcome of one exit scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub exit_valuation: Money,
    /// Total intrinsic value of the option grant
    pub option_value: Money,
    pub value_per_option: Money,
    pub price_per_share: Money,
    pub common_proceeds: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waterfall: Option<WaterfallOutput>,
}

impl ScenarioResult {
    /// Return on the exercise cost, in percent.
    pub fn roi_pct(&self, investment_cost: Money) -> Rate {
        if investment_cost <= Decimal::ZERO {
            return if self.option_value > Decimal::ZERO {
                ROI_INFINITE
            } else {
                Decimal::ZERO
            };
        }
        // Past the decimal range the grant is as good as free.
        (self.option_value - investment_cost)
            .checked_div(investment_cost)
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .unwrap_or(ROI_INFINITE)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Run one scenario through the waterfall and value the option grant.
///
/// Never fails: an unusable cap table, or an exit too large to value, yields
/// a zero-valued result carrying the error message.
pub fn evaluate_scenario(cap_table: &CapTable, scenario: &ExitScenario) -> ScenarioResult {
    let valued = run_waterfall(cap_table, scenario.exit_valuation).and_then(|waterfall| {
        let options = value_options(cap_table, waterfall.price_per_common_share)?;
        Ok((waterfall, options))
    });

    match valued {
        Ok((waterfall, options)) => ScenarioResult {
            scenario_name: scenario.name.clone(),
            exit_valuation: scenario.exit_valuation,
            option_value: options.total_value,
            value_per_option: options.value_per_option,
            price_per_share: waterfall.price_per_common_share,
            common_proceeds: waterfall.common_proceeds,
            error: None,
            waterfall: Some(waterfall),
        },
        Err(e) => {
            let message = match e {
                EquityError::InvalidCapTable(msg) => msg,
                other => other.to_string(),
            };
            ScenarioResult {
                scenario_name: scenario.name.clone(),
                exit_valuation: scenario.exit_valuation,
                option_value: Decimal::ZERO,
                value_per_option: Decimal::ZERO,
                price_per_share: Decimal::ZERO,
                common_proceeds: Decimal::ZERO,
                error: Some(message),
                waterfall: None,
            }
        }
    }
}

/// Evaluate every scenario with a positive exit valuation, in input order.
/// Non-positive valuations are skipped.
pub fn evaluate_scenarios(cap_table: &CapTable, scenarios: &[ExitScenario]) -> Vec<ScenarioResult> {
    #[cfg(feature = "parallel")]
    {
        scenarios
            .par_iter()
            .filter(|s| s.exit_valuation > Decimal::ZERO)
            .map(|s| evaluate_scenario(cap_table, s))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        scenarios
            .iter()
            .filter(|s| s.exit_valuation > Decimal::ZERO)
            .map(|s| evaluate_scenario(cap_table, s))
            .collect()
    }
}

/// Scenario with the highest option value; the first one wins ties.
pub fn best_scenario(results: &[ScenarioResult]) -> Option<&ScenarioResult> {
    results.iter().fold(None, |best: Option<&ScenarioResult>, r| match best {
        Some(b) if b.option_value >= r.option_value => Some(b),
        _ => Some(r),
    })
}

// ---------------------------------------------------------------------------
// Multi-scenario analysis
// ---------------------------------------------------------------------------

/// Input for a multi-scenario analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAnalysisInput {
    pub cap_table: CapTableInput,
    pub scenarios: Vec<ExitScenario>,
}

/// ROI of the option grant in one scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoiRow {
    pub scenario_name: String,
    /// Percent; [`ROI_INFINITE`] when the grant cost nothing
    pub roi_pct: Rate,
    pub absolute_gain: Money,
}

/// Output of a multi-scenario analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAnalysisOutput {
    pub results: Vec<ScenarioResult>,
    pub investment_cost: Money,
    pub roi: Vec<RoiRow>,
    /// Scenario with the highest option value, for a detailed breakdown
    pub best_scenario: Option<ScenarioResult>,
    pub summary: LiquidationSummary,
}

/// Evaluate a list of exit scenarios against a cap table and derive ROI and
/// best-case figures.
pub fn analyze_exit_scenarios(
    input: &ScenarioAnalysisInput,
) -> EquityResult<ComputationOutput<ScenarioAnalysisOutput>> {
    let start = Instant::now();
    let cap_table = input.cap_table.build()?;
    let mut warnings = cap_table_warnings(&cap_table);

    let scenarios: Vec<ExitScenario> = input
        .scenarios
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let name = s.name.trim();
            let name = if name.is_empty() {
                format!("Scenario {}", i + 1)
            } else {
                name.to_string()
            };
            ExitScenario::new(name, s.exit_valuation)
        })
        .collect();

    for s in scenarios.iter().filter(|s| s.exit_valuation <= Decimal::ZERO) {
        warnings.push(format!(
            "Scenario '{}' skipped: exit valuation must be positive",
            s.name
        ));
    }

    let results = evaluate_scenarios(&cap_table, &scenarios);
    if results.is_empty() {
        warnings.push("No scenario has a positive exit valuation".into());
    }
    if let Some(err) = results.iter().find_map(|r| r.error.as_deref()) {
        warnings.push(format!("Cap table could not be evaluated: {}", err));
    }

    let investment_cost = cap_table.investment_cost();
    let roi = results
        .iter()
        .map(|r| RoiRow {
            scenario_name: r.scenario_name.clone(),
            roi_pct: r.roi_pct(investment_cost),
            absolute_gain: r.option_value - investment_cost,
        })
        .collect();
    let best = best_scenario(&results).cloned();

    let output = ScenarioAnalysisOutput {
        investment_cost,
        roi,
        best_scenario: best,
        summary: cap_table.liquidation_summary(),
        results,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Multi-Scenario Exit Analysis (liquidation waterfall + option intrinsic value)",
        &serde_json::json!({
            "num_scenarios": input.scenarios.len(),
            "total_shares": cap_table.total_shares(),
            "employee_options": cap_table.employee_options(),
            "strike_price": cap_table.strike_price().to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cap_table::CapTableBuilder;
    use rust_decimal_macros::dec;

    fn seed_table() -> CapTable {
        CapTableBuilder::new(10_000_000)
            .employee_options(50_000)
            .strike_price(dec!(0.10))
            .round("Seed", 2_000_000, dec!(2_000_000))
            .build()
            .unwrap()
    }

    #[test]
    fn test_evaluate_scenario_known_answer() {
        let r = evaluate_scenario(&seed_table(), &ExitScenario::new("Base", dec!(50_000_000)));
        assert_eq!(r.price_per_share, dec!(5));
        assert_eq!(r.common_proceeds, dec!(40_000_000));
        assert_eq!(r.option_value, dec!(245_000));
        assert_eq!(r.value_per_option, dec!(4.90));
        assert!(r.error.is_none());
        assert!(r.waterfall.is_some());
    }

    #[test]
    fn test_invalid_cap_table_becomes_error_result() {
        let table = CapTableBuilder::new(1_000)
            .employee_options(10)
            .round("Seed", 1_200, dec!(100))
            .build()
            .unwrap();
        let r = evaluate_scenario(&table, &ExitScenario::new("Any", dec!(1_000_000)));

        assert!(r.is_error());
        assert_eq!(r.error.as_deref(), Some("Preferred shares exceed total shares"));
        assert_eq!(r.option_value, Decimal::ZERO);
        assert!(r.waterfall.is_none());
    }

    #[test]
    fn test_exit_too_large_to_value_becomes_error_result() {
        // Inert seed shares leave 1,000 common shares to carry the whole exit.
        let table = CapTableBuilder::new(1_000_000)
            .employee_options(100_000)
            .round("Seed", 999_000, Decimal::ZERO)
            .build()
            .unwrap();
        let r = evaluate_scenario(&table, &ExitScenario::new("Huge", Decimal::MAX));

        assert!(r.is_error());
        assert!(r.error.as_deref().unwrap().contains("representable range"));
        assert_eq!(r.option_value, Decimal::ZERO);
        assert!(r.waterfall.is_none());
    }

    #[test]
    fn test_skips_non_positive_scenarios() {
        let scenarios = vec![
            ExitScenario::new("Zero", Decimal::ZERO),
            ExitScenario::new("Low", dec!(5_000_000)),
            ExitScenario::new("Negative", dec!(-10)),
            ExitScenario::new("High", dec!(50_000_000)),
        ];
        let results = evaluate_scenarios(&seed_table(), &scenarios);
        let names: Vec<&str> = results.iter().map(|r| r.scenario_name.as_str()).collect();
        assert_eq!(names, vec!["Low", "High"]);
    }

    #[test]
    fn test_roi_with_cost() {
        let r = evaluate_scenario(&seed_table(), &ExitScenario::new("Base", dec!(50_000_000)));
        // (245000 - 5000) / 5000 * 100 = 4800%
        assert_eq!(r.roi_pct(dec!(5_000)), dec!(4800));
    }

    #[test]
    fn test_roi_sentinel_for_free_options() {
        let mut r = evaluate_scenario(&seed_table(), &ExitScenario::new("Base", dec!(50_000_000)));
        assert_eq!(r.roi_pct(Decimal::ZERO), ROI_INFINITE);
        r.option_value = Decimal::ZERO;
        assert_eq!(r.roi_pct(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_roi_beyond_decimal_range_is_sentinel() {
        let mut r = evaluate_scenario(&seed_table(), &ExitScenario::new("Base", dec!(50_000_000)));
        r.option_value = Decimal::MAX / dec!(2);
        assert_eq!(r.roi_pct(dec!(0.0001)), ROI_INFINITE);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_evaluation_keeps_input_order() {
        let scenarios: Vec<ExitScenario> = (0..500u32)
            .map(|i| {
                let exit = if i % 7 == 0 {
                    Decimal::ZERO
                } else {
                    Decimal::from(500 - i) * dec!(250_000)
                };
                ExitScenario::new(format!("S{i}"), exit)
            })
            .collect();
        let results = evaluate_scenarios(&seed_table(), &scenarios);

        let kept: Vec<&ExitScenario> = scenarios
            .iter()
            .filter(|s| s.exit_valuation > Decimal::ZERO)
            .collect();
        assert_eq!(results.len(), kept.len());
        for (r, s) in results.iter().zip(kept) {
            assert_eq!(r, &evaluate_scenario(&seed_table(), s));
        }
    }

    #[test]
    fn test_best_scenario_first_wins_ties() {
        let table = CapTableBuilder::new(1_000).employee_options(10).build().unwrap();
        let results = evaluate_scenarios(
            &table,
            &[
                ExitScenario::new("A", dec!(100)),
                ExitScenario::new("B", dec!(300)),
                ExitScenario::new("C", dec!(300)),
            ],
        );
        assert_eq!(best_scenario(&results).unwrap().scenario_name, "B");
        assert!(best_scenario(&[]).is_none());
    }

    #[test]
    fn test_analysis_names_blank_scenarios_and_warns() {
        let input = ScenarioAnalysisInput {
            cap_table: CapTableInput {
                total_shares: Some(10_000_000),
                employee_options: Some(50_000),
                strike_price: Some(dec!(0.10)),
                rounds: vec![],
            },
            scenarios: vec![
                ExitScenario::new("", dec!(25_000_000)),
                ExitScenario::new("Moon Shot", Decimal::ZERO),
            ],
        };
        let out = analyze_exit_scenarios(&input).unwrap();

        assert_eq!(out.result.results.len(), 1);
        assert_eq!(out.result.results[0].scenario_name, "Scenario 1");
        assert!(out.warnings.iter().any(|w| w.contains("Moon Shot")));
        assert_eq!(out.result.investment_cost, dec!(5_000));
    }

    #[test]
    fn test_analysis_with_no_positive_scenarios_is_empty_not_error() {
        let input = ScenarioAnalysisInput {
            cap_table: CapTableInput {
                total_shares: Some(1_000),
                ..Default::default()
            },
            scenarios: vec![ExitScenario::new("Nothing", Decimal::ZERO)],
        };
        let out = analyze_exit_scenarios(&input).unwrap();

        assert!(out.result.results.is_empty());
        assert!(out.result.best_scenario.is_none());
        assert!(out
            .warnings
            .iter()
            .any(|w| w.contains("No scenario has a positive exit valuation")));
    }
}
