pub mod rate;
pub mod schedule;
pub mod valuation;

use cdc_finance_core::financing::SolverConfig;
use clap::Args;
use rust_decimal::Decimal;

/// Solver overrides shared by every command that may solve for a rate.
#[derive(Args, Debug, Clone, Default)]
pub struct SolverArgs {
    /// Initial guess for the periodic rate (decimal)
    #[arg(long)]
    pub initial_guess: Option<Decimal>,

    /// Absolute tolerance on the change in rate between iterations
    #[arg(long)]
    pub tolerance: Option<Decimal>,

    /// Maximum Newton-Raphson iterations
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Abort the solver after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

impl SolverArgs {
    /// Layer the flags over an existing configuration.
    pub fn apply(&self, mut config: SolverConfig) -> SolverConfig {
        if let Some(guess) = self.initial_guess {
            config.initial_guess = guess;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(max) = self.max_iterations {
            config.max_iterations = max;
        }
        if self.timeout_ms.is_some() {
            config.timeout_ms = self.timeout_ms;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_flags_override_only_what_is_set() {
        let args = SolverArgs {
            max_iterations: Some(10),
            tolerance: Some(dec!(0.000001)),
            ..SolverArgs::default()
        };
        let config = args.apply(SolverConfig::default());
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.tolerance, dec!(0.000001));
        assert_eq!(config.initial_guess, dec!(0.1));
        assert!(config.timeout_ms.is_none());
    }
}
