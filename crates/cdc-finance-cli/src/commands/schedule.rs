use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use cdc_finance_core::financing::{calculate_financing, FinancingRequest, FinancingTerms};

use super::SolverArgs;
use crate::input;

/// Arguments for the full price-table calculation
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to JSON request file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash price
    #[arg(long)]
    pub present_value: Option<Decimal>,

    /// Credit price; omit to derive it from the rate
    #[arg(long)]
    pub future_value: Option<Decimal>,

    /// Periodic rate as a decimal (0.02 = 2%); omit to solve from the future value
    #[arg(long, conflicts_with = "rate_percent")]
    pub rate: Option<Decimal>,

    /// Periodic rate as a percentage (2 = 2%)
    #[arg(long)]
    pub rate_percent: Option<Decimal>,

    /// Number of installments
    #[arg(long)]
    pub installments: Option<u32>,

    /// First installment is paid upfront
    #[arg(long)]
    pub down_payment: bool,

    /// Installments to bring forward for the early-payoff figures
    #[arg(long, default_value_t = 0)]
    pub months_back: u32,

    /// Round every figure to its display precision
    #[arg(long)]
    pub rounded: bool,

    #[command(flatten)]
    pub solver: SolverArgs,
}

impl ScheduleArgs {
    fn to_request(&self) -> Result<FinancingRequest, Box<dyn std::error::Error>> {
        let present_value = self
            .present_value
            .ok_or("--present-value is required (or provide --input)")?;
        let installments = self
            .installments
            .ok_or("--installments is required (or provide --input)")?;

        let mut terms = FinancingTerms {
            present_value,
            future_value: self.future_value.unwrap_or(Decimal::ZERO),
            periodic_rate: self.rate.unwrap_or(Decimal::ZERO),
            installments,
            has_down_payment: self.down_payment,
        };
        if let Some(percent) = self.rate_percent {
            terms = terms.with_rate_percent(percent);
        }

        Ok(FinancingRequest {
            terms,
            months_to_go_back: self.months_back,
            solver: self.solver.apply(Default::default()),
        })
    }
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = match input::read_request::<FinancingRequest>(args.input.as_deref())? {
        Some(mut request) => {
            request.solver = args.solver.apply(request.solver);
            request
        }
        None => args.to_request()?,
    };

    let mut output = calculate_financing(&request)?;
    if args.rounded {
        output.result = output.result.rounded();
    }
    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn args() -> ScheduleArgs {
        ScheduleArgs {
            input: None,
            present_value: Some(dec!(1000)),
            future_value: None,
            rate: None,
            rate_percent: Some(dec!(2)),
            installments: Some(12),
            down_payment: false,
            months_back: 3,
            rounded: false,
            solver: SolverArgs::default(),
        }
    }

    #[test]
    fn test_rate_percent_flag_becomes_decimal() {
        let request = args().to_request().unwrap();
        assert_eq!(request.terms.periodic_rate, dec!(0.02));
        assert_eq!(request.months_to_go_back, 3);
        assert!(request.terms.future_value.is_zero());
    }

    #[test]
    fn test_missing_installments_is_reported() {
        let mut missing = args();
        missing.installments = None;
        let err = missing.to_request().unwrap_err();
        assert!(err.to_string().contains("--installments"));
    }
}
