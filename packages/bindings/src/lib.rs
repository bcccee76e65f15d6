use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use equity_waterfall_core::{CapTableInput, ExitScenario};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Waterfall
// ---------------------------------------------------------------------------

#[napi]
pub fn liquidation_waterfall(input_json: String) -> NapiResult<String> {
    let input: equity_waterfall_core::waterfall::WaterfallInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = equity_waterfall_core::waterfall::calculate_liquidation_waterfall(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn liquidation_summary(input_json: String) -> NapiResult<String> {
    let input: CapTableInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let cap_table = input.build().map_err(to_napi_error)?;
    serde_json::to_string(&cap_table.liquidation_summary()).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ScenarioBatch {
    cap_table: CapTableInput,
    scenarios: Vec<ExitScenario>,
}

/// Bare per-scenario results, without ROI or the analysis envelope.
#[napi]
pub fn evaluate_scenarios(input_json: String) -> NapiResult<String> {
    let input: ScenarioBatch = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let cap_table = input.cap_table.build().map_err(to_napi_error)?;
    let results = equity_waterfall_core::evaluate_scenarios(&cap_table, &input.scenarios);
    serde_json::to_string(&results).map_err(to_napi_error)
}

#[napi]
pub fn exit_scenarios(input_json: String) -> NapiResult<String> {
    let input: equity_waterfall_core::scenarios::ScenarioAnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = equity_waterfall_core::scenarios::analyze_exit_scenarios(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Sensitivity & break-even
// ---------------------------------------------------------------------------

#[napi]
pub fn exit_sensitivity(input_json: String) -> NapiResult<String> {
    let input: equity_waterfall_core::sensitivity::SensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = equity_waterfall_core::sensitivity::analyze_exit_sensitivity(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn break_even(input_json: String) -> NapiResult<String> {
    let input: equity_waterfall_core::breakeven::BreakEvenInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        equity_waterfall_core::breakeven::analyze_break_even(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
