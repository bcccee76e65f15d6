use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use equity_waterfall_core::breakeven::{self, BreakEvenInput};
use equity_waterfall_core::sensitivity::{self, SensitivityInput};

use crate::input;

/// Arguments for the exit-valuation sensitivity sweep
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated exit multipliers (e.g. "0.5,1,2,4")
    #[arg(long, value_delimiter = ',')]
    pub multipliers: Option<Vec<Decimal>>,
}

/// Arguments for break-even analysis
#[derive(Args)]
pub struct BreakEvenArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sens_input: SensitivityInput =
        input::load(args.input.as_deref(), "sensitivity analysis")?;
    if args.multipliers.is_some() {
        sens_input.multipliers = args.multipliers;
    }
    let result = sensitivity::analyze_exit_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_break_even(args: BreakEvenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let be_input: BreakEvenInput = input::load(args.input.as_deref(), "break-even analysis")?;
    let result = breakeven::analyze_break_even(&be_input)?;
    Ok(serde_json::to_value(result)?)
}
