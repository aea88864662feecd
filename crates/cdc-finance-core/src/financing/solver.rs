use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::checked::{mul, sub};
use super::coefficient::discount_factor;
use crate::error::CdcError;
use crate::types::{Money, Rate};
use crate::CdcResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Starting point of the Newton-Raphson iteration (10% per period).
pub const DEFAULT_INITIAL_GUESS: Decimal = dec!(0.1);

/// Absolute tolerance on the change in rate between two iterations.
pub const DEFAULT_TOLERANCE: Decimal = dec!(0.0001);

/// Hard iteration bound; well-posed inputs settle in under 20.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

const SOLVER_NAME: &str = "CDC rate Newton-Raphson";

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// The two known price points the implied rate is recovered from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateSolveInput {
    pub present_value: Money,
    pub future_value: Money,
    pub installments: u32,
    pub has_down_payment: bool,
}

/// Tuning knobs for the rate solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub initial_guess: Rate,
    pub tolerance: Decimal,
    pub max_iterations: u32,
    /// Wall-clock budget, checked once per iteration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: DEFAULT_INITIAL_GUESS,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSolution {
    pub rate: Rate,
    pub iterations: u32,
    /// Size of the final Newton step.
    pub last_step: Decimal,
}

// ---------------------------------------------------------------------------
// Equation of value
// ---------------------------------------------------------------------------

fn per_installment(input: &RateSolveInput) -> CdcResult<Money> {
    if input.installments == 0 {
        return Err(CdcError::DivisionByZero {
            context: "equation of value (zero installments)".into(),
        });
    }
    Ok(input.future_value / Decimal::from(input.installments))
}

/// Balance condition whose root is the implied periodic rate.
///
/// With a down payment: `PV·r - (FV/n)·((1+r) - (1+r)^(1-n))`, which is
/// `PV·r·(1+r)^(n-1) - (FV/n)·((1+r)^n - 1)` divided through by `(1+r)^(n-1)`.
/// Without: `PV·r - (FV/n)·(1 - (1+r)^-n)`.
///
/// Only discount factors appear, so long schedules stay inside the Decimal range.
pub fn equation_of_value(input: &RateSolveInput, rate: Rate) -> CdcResult<Decimal> {
    const CTX: &str = "equation of value";
    let n = i64::from(input.installments);
    let installment = per_installment(input)?;
    let financed = mul(input.present_value, rate, CTX)?;

    let outstanding = if input.has_down_payment {
        let tail = discount_factor(rate, n - 1)?;
        sub(Decimal::ONE + rate, tail, CTX)?
    } else {
        Decimal::ONE - discount_factor(rate, n)?
    };
    sub(financed, mul(installment, outstanding, CTX)?, CTX)
}

/// First derivative of [`equation_of_value`] with respect to the rate.
///
/// With a down payment: `PV - (FV/n)·(1 + (n-1)·(1+r)^-n)`.
/// Without: `PV - FV·(1+r)^-(n+1)`.
pub fn equation_of_value_derivative(input: &RateSolveInput, rate: Rate) -> CdcResult<Decimal> {
    const CTX: &str = "equation of value derivative";
    let n = i64::from(input.installments);

    if input.has_down_payment {
        let installment = per_installment(input)?;
        let tail = mul(Decimal::from(n - 1), discount_factor(rate, n)?, CTX)?;
        sub(
            input.present_value,
            mul(installment, Decimal::ONE + tail, CTX)?,
            CTX,
        )
    } else {
        let tail = discount_factor(rate, n + 1)?;
        sub(input.present_value, mul(input.future_value, tail, CTX)?, CTX)
    }
}

// ---------------------------------------------------------------------------
// Newton-Raphson
// ---------------------------------------------------------------------------

fn validate(input: &RateSolveInput) -> CdcResult<()> {
    if input.installments == 0 {
        return Err(CdcError::invalid(
            "installments",
            "At least one installment is required",
        ));
    }
    if input.present_value < Decimal::ZERO {
        return Err(CdcError::invalid(
            "present_value",
            "Present value cannot be negative",
        ));
    }
    if input.future_value <= Decimal::ZERO {
        return Err(CdcError::invalid(
            "future_value",
            "A positive future value is required to solve for the rate",
        ));
    }
    Ok(())
}

/// Solve for the implied rate with the default configuration.
pub fn solve_rate(input: &RateSolveInput) -> CdcResult<RateSolution> {
    solve_rate_with(input, &SolverConfig::default(), None)
}

/// Solve for the implied rate: `r <- r - f(r)/f'(r)` until `|Δr| < tolerance`.
///
/// `cancel` and `config.timeout_ms` are both checked at the top of every
/// iteration; either one aborts with [`CdcError::Cancelled`].
pub fn solve_rate_with(
    input: &RateSolveInput,
    config: &SolverConfig,
    cancel: Option<&AtomicBool>,
) -> CdcResult<RateSolution> {
    validate(input)?;
    if config.max_iterations == 0 {
        return Err(CdcError::invalid(
            "max_iterations",
            "The solver needs at least one iteration",
        ));
    }

    let started = Instant::now();
    let budget = config.timeout_ms.map(Duration::from_millis);
    let mut rate = config.initial_guess;
    let mut step = Decimal::ZERO;

    for iteration in 1..=config.max_iterations {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            warn!(iteration, "rate solver cancelled");
            return Err(CdcError::Cancelled {
                iterations: iteration - 1,
                reason: "cancellation requested".into(),
            });
        }
        if let Some(budget) = budget {
            if started.elapsed() >= budget {
                warn!(iteration, ?budget, "rate solver timed out");
                return Err(CdcError::Cancelled {
                    iterations: iteration - 1,
                    reason: format!("timeout of {} ms exceeded", budget.as_millis()),
                });
            }
        }

        let evaluated = equation_of_value(input, rate).and_then(|value| {
            equation_of_value_derivative(input, rate).map(|slope| (value, slope))
        });
        let (value, slope) = match evaluated {
            Ok(pair) => pair,
            // Inputs were validated up front, so this is the iterate running away.
            Err(CdcError::InvalidFinancingTerms { reason, .. }) => {
                return Err(out_of_range(iteration, rate, &reason));
            }
            Err(e) => return Err(e),
        };

        if slope.is_zero() {
            return Err(CdcError::DivisionByZero {
                context: format!("{SOLVER_NAME} derivative at rate {rate}"),
            });
        }

        let delta = value
            .checked_div(slope)
            .ok_or_else(|| out_of_range(iteration, rate, "Newton step overflowed"))?;
        rate = rate
            .checked_sub(delta)
            .ok_or_else(|| out_of_range(iteration, rate, "Newton step overflowed"))?;
        step = delta.abs();

        debug!(iteration, %rate, %step, "rate solver step");

        if step < config.tolerance {
            return Ok(RateSolution {
                rate,
                iterations: iteration,
                last_step: step,
            });
        }
        if rate <= -Decimal::ONE {
            return Err(diverged(iteration, step));
        }
    }

    Err(diverged(config.max_iterations, step))
}

/// The iterate left the range where the equation of value can be evaluated.
fn out_of_range(iteration: u32, rate: Rate, reason: &str) -> CdcError {
    warn!(iteration, %rate, reason, "rate solver iterate out of range");
    CdcError::invalid(
        "periodic_rate",
        format!("{SOLVER_NAME} iterate {rate} out of range at iteration {iteration}: {reason}"),
    )
}

fn diverged(iterations: u32, last_delta: Decimal) -> CdcError {
    warn!(iterations, %last_delta, "rate solver failed to converge");
    CdcError::ConvergenceFailure {
        function: SOLVER_NAME.into(),
        iterations,
        last_delta,
    }
}
