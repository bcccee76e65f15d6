use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EquityError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// The cap table cannot be run through the waterfall (e.g. preferred
    /// shares leave no common stock).
    #[error("Invalid cap table: {0}")]
    InvalidCapTable(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for EquityError {
    fn from(e: serde_json::Error) -> Self {
        EquityError::SerializationError(e.to_string())
    }
}
