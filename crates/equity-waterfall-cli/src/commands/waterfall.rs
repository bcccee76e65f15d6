use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use equity_waterfall_core::cap_table::CapTableInput;
use equity_waterfall_core::waterfall::{self, WaterfallInput};

use crate::input;

/// Arguments for a single-exit waterfall
#[derive(Args)]
pub struct WaterfallArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Exit valuation, overriding the one in the input document
    #[arg(long)]
    pub exit: Option<Decimal>,
}

/// Arguments for the liquidation summary
#[derive(Args)]
pub struct SummaryArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Any input document carrying a cap table; other fields are ignored.
#[derive(Deserialize)]
struct CapTableDocument {
    cap_table: CapTableInput,
}

/// Waterfall document whose exit valuation may come from the command line.
#[derive(Deserialize)]
struct WaterfallDocument {
    cap_table: CapTableInput,
    #[serde(default)]
    exit_valuation: Option<Decimal>,
}

pub fn run_waterfall(args: WaterfallArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: WaterfallDocument = input::load(args.input.as_deref(), "waterfall")?;
    let exit_valuation = args
        .exit
        .or(doc.exit_valuation)
        .ok_or("exit_valuation missing: set it in the input document or pass --exit")?;

    let wf_input = WaterfallInput {
        cap_table: doc.cap_table,
        exit_valuation,
    };
    let result = waterfall::calculate_liquidation_waterfall(&wf_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_summary(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: CapTableDocument = input::load(args.input.as_deref(), "liquidation summary")?;
    let cap_table = doc.cap_table.build()?;
    Ok(serde_json::to_value(cap_table.liquidation_summary())?)
}
