use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdcError {
    #[error("Invalid financing terms ({field}): {reason}")]
    InvalidFinancingTerms { field: String, reason: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Invalid schedule length: {installments} installments left to amortize")]
    InvalidScheduleLength { installments: i64 },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Cancelled after {iterations} iterations: {reason}")]
    Cancelled { iterations: u32, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CdcError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        CdcError::InvalidFinancingTerms {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CdcError {
    fn from(e: serde_json::Error) -> Self {
        CdcError::SerializationError(e.to_string())
    }
}
