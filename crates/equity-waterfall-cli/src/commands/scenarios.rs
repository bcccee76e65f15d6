use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use equity_waterfall_core::scenarios::{self, ScenarioAnalysisInput};
use equity_waterfall_core::ExitScenario;

use crate::input;

/// Arguments for multi-scenario exit analysis
#[derive(Args)]
pub struct ScenariosArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Extra scenario as name=valuation (e.g. "IPO=250000000"); repeatable
    #[arg(long = "scenario", value_parser = parse_scenario)]
    pub scenarios: Vec<ExitScenario>,
}

fn parse_scenario(arg: &str) -> Result<ExitScenario, String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("Scenario must be name=valuation, got '{}'", arg))?;
    let exit_valuation: Decimal = value
        .trim()
        .replace('_', "")
        .parse()
        .map_err(|e| format!("Invalid valuation '{}': {}", value, e))?;
    Ok(ExitScenario::new(name.trim(), exit_valuation))
}

pub fn run_scenarios(args: ScenariosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sc_input: ScenarioAnalysisInput =
        input::load(args.input.as_deref(), "scenario analysis")?;
    sc_input.scenarios.extend(args.scenarios);

    let result = scenarios::analyze_exit_scenarios(&sc_input)?;
    Ok(serde_json::to_value(result)?)
}
