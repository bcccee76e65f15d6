pub mod breakeven;
pub mod cap_table;
pub mod error;
pub mod options;
pub mod scenarios;
pub mod sensitivity;
pub mod types;
pub mod waterfall;

pub use cap_table::{CapTable, CapTableBuilder, CapTableInput, FundingRound, Participation};
pub use error::EquityError;
pub use scenarios::{evaluate_scenario, evaluate_scenarios, ExitScenario, ScenarioResult};
pub use types::*;
pub use waterfall::{run_waterfall, WaterfallOutput};

/// Standard result type for all equity-waterfall operations
pub type EquityResult<T> = Result<T, EquityError>;
