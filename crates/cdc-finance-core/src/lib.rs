pub mod error;
pub mod financing;
pub mod rounding;
pub mod types;

pub use error::CdcError;
pub use types::*;

/// Standard result type for all CDC financing operations
pub type CdcResult<T> = Result<T, CdcError>;
