use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::cap_table::{CapTable, CapTableInput, Participation};
use crate::error::EquityError;
use crate::types::*;
use crate::EquityResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Input for a single-exit liquidation waterfall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterfallInput {
    pub cap_table: CapTableInput,
    /// Total proceeds of the exit event
    pub exit_valuation: Money,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// How a single funding round fared in the waterfall.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundDistribution {
    pub round_name: String,
    /// 1 = paid first
    pub payout_rank: usize,
    pub participation: Participation,
    pub shares: Shares,
    pub liquidation_preference: Money,
    /// False for rounds with no shares or no capital; they receive nothing.
    pub active: bool,
    /// Preference paid in the first pass, before any conversion refund
    pub preference_received: Money,
    /// Preference kept by the round (zero once it converts)
    pub preference_payout: Money,
    /// Pro-rata value of the round's shares at the exit valuation
    pub conversion_value: Money,
    pub converted: bool,
    /// Pro-rata share of the residual for participating rounds
    pub participation_payout: Money,
    /// Residual share received as converted common
    pub conversion_payout: Money,
    pub total_payout: Money,
}

/// What a waterfall step represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WaterfallStepKind {
    Preference,
    ConversionRefund,
    Participation,
    Conversion,
    Common,
}

/// One movement of cash through the waterfall.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaterfallStep {
    pub label: String,
    pub kind: WaterfallStepKind,
    /// Cash paid out (or returned to the pool for refunds)
    pub amount: Money,
    /// Proceeds remaining after this step
    pub remaining: Money,
}

/// Full liquidation waterfall for one exit valuation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaterfallOutput {
    pub exit_valuation: Money,
    /// Per-round breakdown in payout order
    pub rounds: Vec<RoundDistribution>,
    pub steps: Vec<WaterfallStep>,
    pub common_shares: Shares,
    /// Common + participating + converted shares sharing the residual
    pub eligible_shares: Shares,
    /// Residual after preferences and conversion refunds
    pub residual_proceeds: Money,
    pub price_per_eligible_share: Money,
    pub common_proceeds: Money,
    pub price_per_common_share: Money,
}

impl WaterfallOutput {
    /// Everything paid to preferred rounds, in any form.
    pub fn total_to_preferred(&self) -> Money {
        self.rounds.iter().map(|r| r.total_payout).sum()
    }

    pub fn total_distributed(&self) -> Money {
        self.total_to_preferred() + self.common_proceeds
    }

    pub fn round(&self, name: &str) -> Option<&RoundDistribution> {
        self.rounds.iter().find(|r| r.round_name == name)
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Distribute `exit_valuation` across a cap table.
///
/// 1. Preferences are paid latest round first, each capped by what is left.
/// 2. Each non-participating round converts to common when its pro-rata
///    share of the exit beats the preference it actually received; the
///    preference goes back into the pool.
/// 3. The residual is split per share across common, participating and
///    converted shares.
pub fn run_waterfall(cap_table: &CapTable, exit_valuation: Money) -> EquityResult<WaterfallOutput> {
    if !cap_table.has_common_stock() {
        return Err(EquityError::InvalidCapTable(
            "Preferred shares exceed total shares".into(),
        ));
    }
    if exit_valuation < Decimal::ZERO {
        return Err(EquityError::InvalidInput {
            field: "exit_valuation".into(),
            reason: "Exit valuation cannot be negative".into(),
        });
    }

    let total_shares = dec_shares(cap_table.total_shares());
    let common_shares = cap_table.common_shares();

    let mut rows: Vec<RoundDistribution> = cap_table
        .payout_order()
        .into_iter()
        .enumerate()
        .map(|(rank, idx)| {
            let round = &cap_table.rounds()[idx];
            RoundDistribution {
                round_name: round.name.clone(),
                payout_rank: rank + 1,
                participation: round.participation,
                shares: round.shares_issued,
                liquidation_preference: round.liquidation_preference(),
                active: round.is_active(),
                preference_received: Decimal::ZERO,
                preference_payout: Decimal::ZERO,
                conversion_value: Decimal::ZERO,
                converted: false,
                participation_payout: Decimal::ZERO,
                conversion_payout: Decimal::ZERO,
                total_payout: Decimal::ZERO,
            }
        })
        .collect();

    let mut steps: Vec<WaterfallStep> = Vec::new();
    let mut remaining = exit_valuation;

    // --- Phase 1: liquidation preferences ---
    for row in rows.iter_mut().filter(|r| r.active) {
        let payout = remaining.min(row.liquidation_preference);
        remaining -= payout;
        row.preference_received = payout;
        row.preference_payout = payout;
        debug!(round = %row.round_name, %payout, %remaining, "preference paid");
        steps.push(WaterfallStep {
            label: format!("{} (Pref)", row.round_name),
            kind: WaterfallStepKind::Preference,
            amount: payout,
            remaining,
        });
    }

    // --- Phase 2: non-participating conversion ---
    let mut eligible_shares = common_shares;
    for row in rows.iter_mut().filter(|r| r.active) {
        if row.participation == Participation::Participating {
            eligible_shares += row.shares;
            continue;
        }
        row.conversion_value = safe_div(dec_shares(row.shares), total_shares) * exit_valuation;
        if row.conversion_value > row.preference_received {
            let refund = row.preference_received;
            remaining += refund;
            row.preference_payout = Decimal::ZERO;
            row.converted = true;
            eligible_shares += row.shares;
            debug!(
                round = %row.round_name,
                conversion_value = %row.conversion_value,
                %refund,
                "round converts to common"
            );
            steps.push(WaterfallStep {
                label: format!("{} (Refund)", row.round_name),
                kind: WaterfallStepKind::ConversionRefund,
                amount: refund,
                remaining,
            });
        }
    }

    // --- Phase 3: residual to common, participating and converted ---
    let residual_proceeds = remaining;
    let price_per_eligible_share = safe_div(remaining, dec_shares(eligible_shares));
    let common_proceeds = if eligible_shares > 0 {
        for row in rows.iter_mut().filter(|r| r.active) {
            let share_of_residual = price_per_eligible_share * dec_shares(row.shares);
            let (label, kind) = if row.participation == Participation::Participating {
                row.participation_payout = share_of_residual;
                (format!("{} (Part.)", row.round_name), WaterfallStepKind::Participation)
            } else if row.converted {
                row.conversion_payout = share_of_residual;
                (format!("{} (Conv.)", row.round_name), WaterfallStepKind::Conversion)
            } else {
                continue;
            };
            remaining -= share_of_residual;
            steps.push(WaterfallStep {
                label,
                kind,
                amount: share_of_residual,
                remaining,
            });
        }
        price_per_eligible_share * dec_shares(common_shares)
    } else {
        remaining
    };
    remaining -= common_proceeds;
    steps.push(WaterfallStep {
        label: "Common Stock".into(),
        kind: WaterfallStepKind::Common,
        amount: common_proceeds,
        remaining,
    });

    for row in rows.iter_mut() {
        row.total_payout = row.preference_payout + row.participation_payout + row.conversion_payout;
    }

    let price_per_common_share = safe_div(common_proceeds, dec_shares(common_shares));
    debug!(%exit_valuation, %common_proceeds, %price_per_common_share, "waterfall complete");

    Ok(WaterfallOutput {
        exit_valuation,
        rounds: rows,
        steps,
        common_shares,
        eligible_shares,
        residual_proceeds,
        price_per_eligible_share,
        common_proceeds,
        price_per_common_share,
    })
}

/// Build the cap table from `input` and run the waterfall, wrapped in the
/// standard computation envelope.
pub fn calculate_liquidation_waterfall(
    input: &WaterfallInput,
) -> EquityResult<ComputationOutput<WaterfallOutput>> {
    let start = Instant::now();
    let cap_table = input.cap_table.build()?;
    let warnings = cap_table_warnings(&cap_table);

    let output = run_waterfall(&cap_table, input.exit_valuation)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Liquidation Preference Waterfall (reverse-chronological, non-participating conversion)",
        &serde_json::json!({
            "exit_valuation": input.exit_valuation.to_string(),
            "total_shares": cap_table.total_shares(),
            "common_shares": cap_table.common_shares(),
            "num_rounds": cap_table.rounds().len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Caveats about how the cap table will be treated by the engine.
pub(crate) fn cap_table_warnings(cap_table: &CapTable) -> Vec<String> {
    let mut warnings = Vec::new();
    for round in cap_table.rounds() {
        if !round.is_active() {
            warnings.push(format!(
                "Round '{}' has no shares or no capital and is excluded from the waterfall",
                round.name
            ));
        } else if round.seniority().is_none() {
            warnings.push(format!(
                "Round '{}' has no known seniority; its preference is paid after all known rounds",
                round.name
            ));
        }
    }
    warnings
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
