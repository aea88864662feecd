use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use cdc_finance_core::financing::{solve_rate_with, RateSolution, RateSolveInput, SolverConfig};
use cdc_finance_core::with_metadata;

use super::SolverArgs;
use crate::input;

/// Arguments for solving the implied periodic rate
#[derive(Args)]
pub struct RateArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash price
    #[arg(long)]
    pub present_value: Option<Decimal>,

    /// Credit price
    #[arg(long)]
    pub future_value: Option<Decimal>,

    /// Number of installments
    #[arg(long)]
    pub installments: Option<u32>,

    /// First installment is paid upfront
    #[arg(long)]
    pub down_payment: bool,

    #[command(flatten)]
    pub solver: SolverArgs,
}

#[derive(Debug, Deserialize)]
struct RateRequest {
    #[serde(flatten)]
    input: RateSolveInput,
    #[serde(default)]
    solver: SolverConfig,
}

#[derive(Debug, Serialize)]
struct RateOutput {
    #[serde(flatten)]
    solution: RateSolution,
    rate_percent: Decimal,
}

pub fn run_rate(args: RateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let (solve_input, config) = match input::read_request::<RateRequest>(args.input.as_deref())? {
        Some(request) => (request.input, args.solver.apply(request.solver)),
        None => {
            let input = RateSolveInput {
                present_value: args
                    .present_value
                    .ok_or("--present-value is required (or provide --input)")?,
                future_value: args
                    .future_value
                    .ok_or("--future-value is required (or provide --input)")?,
                installments: args
                    .installments
                    .ok_or("--installments is required (or provide --input)")?,
                has_down_payment: args.down_payment,
            };
            (input, args.solver.apply(SolverConfig::default()))
        }
    };

    let solution = solve_rate_with(&solve_input, &config, None)?;
    let output = RateOutput {
        rate_percent: solution.rate * dec!(100),
        solution,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(serde_json::to_value(with_metadata(
        "Newton-Raphson on the CDC equation of value",
        &serde_json::json!({ "input": solve_input, "solver": config }),
        Vec::new(),
        elapsed,
        output,
    ))?)
}
