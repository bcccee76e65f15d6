use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EquityError;
use crate::types::{dec_shares, safe_div, Money, Multiple, Rate, Shares};
use crate::EquityResult;

/// Financing rounds with a known seniority, earliest first. Later rounds are
/// paid their preference before earlier ones.
pub const KNOWN_ROUND_ORDER: [&str; 4] = ["Seed", "Series A", "Series B", "Series C"];

// ─── Enums ───────────────────────────────────────────────────────────────────

/// Liquidation preference type for a preferred-stock round.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Participation {
    /// Investor takes its preference OR converts to common, whichever is larger.
    #[default]
    NonParticipating,
    /// Investor takes its preference AND shares pro-rata in what is left.
    Participating,
}

// ─── Structs ─────────────────────────────────────────────────────────────────

/// A preferred financing round on the cap table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FundingRound {
    /// Round label, e.g. "Series A".
    pub name: String,
    pub shares_issued: Shares,
    pub capital_raised: Money,
    /// Preference as a multiple of capital raised (1.0 = money back).
    pub liquidation_multiple: Multiple,
    pub participation: Participation,
}

impl FundingRound {
    /// A 1x non-participating round.
    pub fn new(name: impl Into<String>, shares_issued: Shares, capital_raised: Money) -> Self {
        Self {
            name: name.into(),
            shares_issued,
            capital_raised,
            liquidation_multiple: Decimal::ONE,
            participation: Participation::NonParticipating,
        }
    }

    pub fn with_multiple(mut self, multiple: Multiple) -> Self {
        self.liquidation_multiple = multiple;
        self
    }

    pub fn with_participation(mut self, participation: Participation) -> Self {
        self.participation = participation;
        self
    }

    /// Capital raised x liquidation multiple.
    pub fn liquidation_preference(&self) -> Money {
        self.capital_raised * self.liquidation_multiple
    }

    pub fn is_participating(&self) -> bool {
        self.participation == Participation::Participating
    }

    /// Rounds without both shares and capital take no part in the waterfall.
    pub fn is_active(&self) -> bool {
        self.shares_issued > 0 && self.capital_raised > Decimal::ZERO
    }

    /// Seniority rank among the known round names, `None` for anything else.
    pub fn seniority(&self) -> Option<usize> {
        KNOWN_ROUND_ORDER.iter().position(|n| *n == self.name)
    }
}

/// A validated capitalization table. Build one with [`CapTableBuilder`] or
/// from a [`CapTableInput`] document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CapTable {
    total_shares: Shares,
    employee_options: Shares,
    strike_price: Money,
    rounds: Vec<FundingRound>,
}

impl CapTable {
    /// Fully diluted share count.
    pub fn total_shares(&self) -> Shares {
        self.total_shares
    }

    pub fn employee_options(&self) -> Shares {
        self.employee_options
    }

    pub fn strike_price(&self) -> Money {
        self.strike_price
    }

    /// Rounds in financing order.
    pub fn rounds(&self) -> &[FundingRound] {
        &self.rounds
    }

    pub fn total_preferred_shares(&self) -> Shares {
        self.rounds
            .iter()
            .fold(0u64, |acc, r| acc.saturating_add(r.shares_issued))
    }

    /// Total shares less preferred; zero when preferred stock covers the
    /// whole company.
    pub fn common_shares(&self) -> Shares {
        self.total_shares
            .saturating_sub(self.total_preferred_shares())
    }

    /// Whether any common stock is left after the preferred rounds.
    pub fn has_common_stock(&self) -> bool {
        self.common_shares() > 0
    }

    /// Employee options as a percentage of fully diluted shares.
    pub fn employee_equity_pct(&self) -> Rate {
        safe_div(
            dec_shares(self.employee_options),
            dec_shares(self.total_shares),
        ) * dec!(100)
    }

    /// Cash needed to exercise the whole grant.
    pub fn investment_cost(&self) -> Money {
        dec_shares(self.employee_options) * self.strike_price
    }

    /// Indices into [`rounds`](Self::rounds) in liquidation payout order:
    /// known rounds latest-first, then unknown names in financing order.
    pub fn payout_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.rounds.len()).collect();
        // Stable sort keeps financing order among unknown names.
        order.sort_by_key(|&i| match self.rounds[i].seniority() {
            Some(rank) => (0, KNOWN_ROUND_ORDER.len() - rank),
            None => (1, 0),
        });
        order
    }

    /// Cap-table facts shown alongside scenario results.
    pub fn liquidation_summary(&self) -> LiquidationSummary {
        let participation_status = self
            .rounds
            .iter()
            .filter(|r| r.shares_issued > 0)
            .map(|r| RoundStatus {
                name: r.name.clone(),
                participation: r.participation,
            })
            .collect();

        LiquidationSummary {
            total_shares: self.total_shares,
            common_shares: self.common_shares(),
            preferred_shares: self.total_preferred_shares(),
            employee_options: self.employee_options,
            employee_equity_pct: self.employee_equity_pct(),
            strike_price: self.strike_price,
            participation_status,
            break_even_price_per_share: self.strike_price,
        }
    }
}

/// Participation terms of one round, for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundStatus {
    pub name: String,
    pub participation: Participation,
}

/// Summary of the liquidation terms on a cap table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiquidationSummary {
    pub total_shares: Shares,
    pub common_shares: Shares,
    pub preferred_shares: Shares,
    pub employee_options: Shares,
    /// Percentage (0.5 = 0.5%).
    pub employee_equity_pct: Rate,
    pub strike_price: Money,
    /// Rounds that issued shares, in financing order.
    pub participation_status: Vec<RoundStatus>,
    /// Common price per share needed before the options are worth anything.
    pub break_even_price_per_share: Money,
}

// ─── Builder ─────────────────────────────────────────────────────────────────

/// Validated construction of a [`CapTable`].
///
/// Defaults: no options, zero strike, 1x non-participating rounds.
#[derive(Debug, Clone, Default)]
pub struct CapTableBuilder {
    total_shares: Shares,
    employee_options: Shares,
    strike_price: Money,
    rounds: Vec<FundingRound>,
}

impl CapTableBuilder {
    pub fn new(total_shares: Shares) -> Self {
        Self {
            total_shares,
            ..Self::default()
        }
    }

    pub fn employee_options(mut self, options: Shares) -> Self {
        self.employee_options = options;
        self
    }

    pub fn strike_price(mut self, strike: Money) -> Self {
        self.strike_price = strike;
        self
    }

    /// Append a 1x non-participating round.
    pub fn round(mut self, name: impl Into<String>, shares: Shares, capital: Money) -> Self {
        self.rounds.push(FundingRound::new(name, shares, capital));
        self
    }

    /// Set the liquidation multiple of the most recently added round.
    pub fn multiple(mut self, multiple: Multiple) -> Self {
        if let Some(last) = self.rounds.last_mut() {
            last.liquidation_multiple = multiple;
        }
        self
    }

    /// Mark the most recently added round as participating preferred.
    pub fn participating(mut self) -> Self {
        if let Some(last) = self.rounds.last_mut() {
            last.participation = Participation::Participating;
        }
        self
    }

    pub fn add_round(mut self, round: FundingRound) -> Self {
        self.rounds.push(round);
        self
    }

    pub fn build(self) -> EquityResult<CapTable> {
        if self.total_shares == 0 {
            return Err(EquityError::InvalidInput {
                field: "total_shares".into(),
                reason: "Total shares must be greater than zero".into(),
            });
        }
        if self.employee_options > self.total_shares {
            return Err(EquityError::InvalidInput {
                field: "employee_options".into(),
                reason: format!(
                    "Option grant ({}) exceeds total shares ({})",
                    self.employee_options, self.total_shares
                ),
            });
        }
        if self.strike_price < Decimal::ZERO {
            return Err(EquityError::InvalidInput {
                field: "strike_price".into(),
                reason: "Strike price cannot be negative".into(),
            });
        }

        if self
            .strike_price
            .checked_mul(dec_shares(self.total_shares))
            .is_none()
        {
            return Err(EquityError::InvalidInput {
                field: "strike_price".into(),
                reason: "Strike price x total shares exceeds the representable range".into(),
            });
        }

        let mut rounds = Vec::with_capacity(self.rounds.len());
        let mut preference_stack = Decimal::ZERO;
        for mut round in self.rounds {
            round.name = round.name.trim().to_string();
            if round.name.is_empty() {
                return Err(EquityError::InvalidInput {
                    field: "rounds.name".into(),
                    reason: "Round name cannot be empty".into(),
                });
            }
            if round.capital_raised < Decimal::ZERO {
                return Err(EquityError::InvalidInput {
                    field: format!("{}.capital_raised", round.name),
                    reason: "Capital raised cannot be negative".into(),
                });
            }
            if round.liquidation_multiple < Decimal::ZERO {
                return Err(EquityError::InvalidInput {
                    field: format!("{}.liquidation_multiple", round.name),
                    reason: "Liquidation multiple cannot be negative".into(),
                });
            }
            // Empty rounds are form placeholders, not financings.
            if round.shares_issued == 0 && round.capital_raised.is_zero() {
                continue;
            }
            // The engine sums preferences unchecked; the whole stack must fit.
            preference_stack = round
                .capital_raised
                .checked_mul(round.liquidation_multiple)
                .and_then(|pref| preference_stack.checked_add(pref))
                .ok_or_else(|| EquityError::InvalidInput {
                    field: format!("{}.liquidation_multiple", round.name),
                    reason: "Liquidation preference exceeds the representable range".into(),
                })?;
            rounds.push(round);
        }

        Ok(CapTable {
            total_shares: self.total_shares,
            employee_options: self.employee_options,
            strike_price: self.strike_price,
            rounds,
        })
    }
}

// ─── Input documents ─────────────────────────────────────────────────────────

/// One funding round as supplied by a caller. Missing fields take the
/// builder defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundingRoundInput {
    pub name: String,
    #[serde(default)]
    pub shares_issued: Option<Shares>,
    #[serde(default)]
    pub capital_raised: Option<Money>,
    #[serde(default)]
    pub liquidation_multiple: Option<Multiple>,
    #[serde(default)]
    pub participation: Option<Participation>,
}

/// Cap table as supplied by a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapTableInput {
    #[serde(default)]
    pub total_shares: Option<Shares>,
    #[serde(default)]
    pub employee_options: Option<Shares>,
    #[serde(default)]
    pub strike_price: Option<Money>,
    #[serde(default)]
    pub rounds: Vec<FundingRoundInput>,
}

impl CapTableInput {
    pub fn build(&self) -> EquityResult<CapTable> {
        let total_shares = self.total_shares.ok_or_else(|| EquityError::InvalidInput {
            field: "total_shares".into(),
            reason: "Total shares is required".into(),
        })?;

        let mut builder = CapTableBuilder::new(total_shares)
            .employee_options(self.employee_options.unwrap_or(0))
            .strike_price(self.strike_price.unwrap_or(Decimal::ZERO));

        for r in &self.rounds {
            let round = FundingRound::new(
                r.name.clone(),
                r.shares_issued.unwrap_or(0),
                r.capital_raised.unwrap_or(Decimal::ZERO),
            )
            .with_multiple(r.liquidation_multiple.unwrap_or(Decimal::ONE))
            .with_participation(r.participation.unwrap_or_default());
            builder = builder.add_round(round);
        }

        builder.build()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn names(table: &CapTable) -> Vec<&str> {
        table
            .payout_order()
            .into_iter()
            .map(|i| table.rounds()[i].name.as_str())
            .collect()
    }

    #[test]
    fn test_derived_share_counts() {
        let table = CapTableBuilder::new(10_000_000)
            .employee_options(50_000)
            .strike_price(dec!(0.10))
            .round("Seed", 2_000_000, dec!(2_000_000))
            .round("Series A", 1_500_000, dec!(10_000_000))
            .build()
            .unwrap();

        assert_eq!(table.total_preferred_shares(), 3_500_000);
        assert_eq!(table.common_shares(), 6_500_000);
        assert_eq!(table.employee_equity_pct(), dec!(0.5));
        assert_eq!(table.investment_cost(), dec!(5000));
    }

    #[test]
    fn test_liquidation_preference_uses_multiple() {
        let round = FundingRound::new("Series B", 1_000, dec!(4_000_000)).with_multiple(dec!(2.5));
        assert_eq!(round.liquidation_preference(), dec!(10_000_000));
    }

    #[test]
    fn test_payout_order_latest_first() {
        let table = CapTableBuilder::new(100)
            .round("Seed", 1, dec!(1))
            .round("Series A", 1, dec!(1))
            .round("Series C", 1, dec!(1))
            .round("Series B", 1, dec!(1))
            .build()
            .unwrap();
        assert_eq!(names(&table), vec!["Series C", "Series B", "Series A", "Seed"]);
    }

    #[test]
    fn test_unknown_round_names_paid_last_in_financing_order() {
        let table = CapTableBuilder::new(100)
            .round("Bridge", 1, dec!(1))
            .round("Seed", 1, dec!(1))
            .round("Series D", 1, dec!(1))
            .round("Series A", 1, dec!(1))
            .build()
            .unwrap();
        assert_eq!(names(&table), vec!["Series A", "Seed", "Bridge", "Series D"]);
    }

    #[test]
    fn test_builder_drops_empty_rounds() {
        let table = CapTableBuilder::new(1_000)
            .round("Seed", 0, Decimal::ZERO)
            .round("Series A", 100, dec!(500))
            .build()
            .unwrap();
        assert_eq!(table.rounds().len(), 1);
        assert_eq!(table.rounds()[0].name, "Series A");
    }

    #[test]
    fn test_builder_keeps_half_empty_rounds() {
        // Shares without capital stay on the table but are inert.
        let table = CapTableBuilder::new(1_000)
            .round("Seed", 100, Decimal::ZERO)
            .build()
            .unwrap();
        assert_eq!(table.rounds().len(), 1);
        assert!(!table.rounds()[0].is_active());
        assert_eq!(table.common_shares(), 900);
    }

    #[test]
    fn test_builder_modifiers_apply_to_last_round() {
        let table = CapTableBuilder::new(1_000)
            .round("Seed", 100, dec!(100))
            .round("Series A", 100, dec!(100))
            .multiple(dec!(2))
            .participating()
            .build()
            .unwrap();
        assert_eq!(table.rounds()[0].liquidation_multiple, Decimal::ONE);
        assert!(!table.rounds()[0].is_participating());
        assert_eq!(table.rounds()[1].liquidation_multiple, dec!(2));
        assert!(table.rounds()[1].is_participating());
    }

    #[test]
    fn test_builder_rejects_zero_total_shares() {
        let err = CapTableBuilder::new(0).build().unwrap_err();
        match err {
            EquityError::InvalidInput { field, .. } => assert_eq!(field, "total_shares"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_rejects_options_above_total() {
        let result = CapTableBuilder::new(100).employee_options(101).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_negative_terms() {
        assert!(CapTableBuilder::new(100)
            .strike_price(dec!(-0.01))
            .build()
            .is_err());
        assert!(CapTableBuilder::new(100)
            .round("Seed", 10, dec!(-1))
            .build()
            .is_err());
        assert!(CapTableBuilder::new(100)
            .round("Seed", 10, dec!(1))
            .multiple(dec!(-1))
            .build()
            .is_err());
        assert!(CapTableBuilder::new(100).round("  ", 10, dec!(1)).build().is_err());
    }

    #[test]
    fn test_builder_rejects_overflowing_preference() {
        let err = CapTableBuilder::new(10_000_000)
            .round("Seed", 2_000_000, dec!(10_000_000_000_000_000_000_000_000_000))
            .multiple(dec!(10))
            .build()
            .unwrap_err();
        match err {
            EquityError::InvalidInput { field, .. } => {
                assert_eq!(field, "Seed.liquidation_multiple")
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_rejects_overflowing_preference_stack() {
        // Each preference fits on its own; their sum does not.
        let half = Decimal::MAX / dec!(2) + Decimal::ONE;
        let result = CapTableBuilder::new(10_000_000)
            .round("Seed", 1_000_000, half)
            .add_round(
                FundingRound::new("Series A", 1_000_000, half)
                    .with_participation(Participation::Participating),
            )
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_overflowing_strike() {
        let result = CapTableBuilder::new(10_000_000)
            .employee_options(1)
            .strike_price(Decimal::MAX / dec!(2))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_allows_preferred_above_total() {
        // The engine, not the builder, refuses a table with no common stock.
        let table = CapTableBuilder::new(100)
            .round("Seed", 150, dec!(1))
            .build()
            .unwrap();
        assert_eq!(table.common_shares(), 0);
        assert!(!table.has_common_stock());
    }

    #[test]
    fn test_input_document_defaults() {
        let json = r#"{
            "total_shares": 1000,
            "rounds": [
                {"name": "Seed", "shares_issued": 100, "capital_raised": "250"}
            ]
        }"#;
        let input: CapTableInput = serde_json::from_str(json).unwrap();
        let table = input.build().unwrap();

        assert_eq!(table.employee_options(), 0);
        assert_eq!(table.strike_price(), Decimal::ZERO);
        let seed = &table.rounds()[0];
        assert_eq!(seed.liquidation_multiple, Decimal::ONE);
        assert_eq!(seed.participation, Participation::NonParticipating);
    }

    #[test]
    fn test_input_document_requires_total_shares() {
        let input = CapTableInput::default();
        assert!(input.build().is_err());
    }

    #[test]
    fn test_liquidation_summary() {
        let table = CapTableBuilder::new(10_000_000)
            .employee_options(100_000)
            .strike_price(dec!(0.25))
            .round("Seed", 2_000_000, dec!(1_000_000))
            .round("Series A", 1_000_000, Decimal::ZERO)
            .participating()
            .build()
            .unwrap();
        let summary = table.liquidation_summary();

        assert_eq!(summary.common_shares, 7_000_000);
        assert_eq!(summary.preferred_shares, 3_000_000);
        assert_eq!(summary.employee_equity_pct, dec!(1));
        assert_eq!(summary.break_even_price_per_share, dec!(0.25));
        assert_eq!(summary.participation_status.len(), 2);
        assert_eq!(
            summary.participation_status[1].participation,
            Participation::Participating
        );
    }
}
