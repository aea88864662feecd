//! Installment-financing engine.
//!
//! Leaves first: `coefficient` and `valuation` hold the closed-form formulas,
//! `solver` recovers an implied rate from two price points, `amortization`
//! builds the price table, and `calculator` strings them together for a single
//! request.

pub mod amortization;
pub mod calculator;
mod checked;
pub mod coefficient;
pub mod solver;
pub mod valuation;

pub use amortization::{
    apply_down_payment, build_amortization_table, AmortizationRow, AmortizationTable,
    DownPaymentAdjustment, RowLabel, ScheduleInput, TABLE_HEADER,
};
pub use calculator::{
    calculate_financing, calculate_financing_with, FinancingRequest, FinancingResult,
    FinancingTerms,
};
pub use solver::{solve_rate, solve_rate_with, RateSolution, RateSolveInput, SolverConfig};
