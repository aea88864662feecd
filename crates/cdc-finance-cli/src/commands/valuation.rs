use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use cdc_finance_core::financing::coefficient::{
    applied_factor, financing_coefficient, financing_coefficient_raw, future_value_from_present,
    normalize_rate, payment_amount,
};
use cdc_finance_core::financing::valuation::{
    annualized_rate_percent, discounted_payoff, nominal_payoff,
};

/// Arguments for the financing coefficient
#[derive(Args)]
pub struct CoefficientArgs {
    /// Periodic rate; values above 1 are read as percentages unless --strict
    #[arg(long)]
    pub rate: Decimal,

    /// Number of installments
    #[arg(long)]
    pub installments: u32,

    /// Treat --rate as a decimal no matter its size
    #[arg(long)]
    pub strict: bool,

    /// Cash price, to also report the payment and credit price
    #[arg(long)]
    pub present_value: Option<Decimal>,

    /// First installment is paid upfront
    #[arg(long)]
    pub down_payment: bool,
}

pub fn run_coefficient(args: CoefficientArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let coefficient = if args.strict {
        financing_coefficient(args.rate, args.installments)?
    } else {
        financing_coefficient_raw(args.rate, args.installments)?
    };
    let rate = if args.strict {
        args.rate
    } else {
        normalize_rate(args.rate)
    };
    let factor = applied_factor(args.down_payment, args.installments, coefficient, rate)?;

    let mut result = json!({
        "rate": rate,
        "installments": args.installments,
        "financing_coefficient": coefficient,
        "applied_factor": factor,
    });

    if let Some(pv) = args.present_value {
        let fv = future_value_from_present(
            coefficient,
            rate,
            pv,
            args.installments,
            args.down_payment,
        )?;
        result["payment_amount"] = json!(payment_amount(pv, coefficient)?);
        result["future_value"] = json!(fv);
    }

    Ok(json!({ "result": result }))
}

/// Arguments for early-payoff figures
#[derive(Args)]
pub struct PayoffArgs {
    /// Level installment amount
    #[arg(long)]
    pub payment: Decimal,

    /// Installments remaining in the schedule
    #[arg(long)]
    pub installments: u32,

    /// Installments to bring forward
    #[arg(long)]
    pub months_back: u32,

    /// Decimal periodic rate used for discounting
    #[arg(long)]
    pub rate: Decimal,
}

pub fn run_payoff(args: PayoffArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let nominal = nominal_payoff(args.months_back, args.payment, args.installments)?;
    let discounted =
        discounted_payoff(args.months_back, args.payment, args.installments, args.rate)?;
    Ok(json!({
        "result": {
            "months_back": args.months_back,
            "nominal_payoff": nominal,
            "discounted_payoff": discounted,
        }
    }))
}

/// Arguments for annualising a monthly rate
#[derive(Args)]
pub struct AnnualizeArgs {
    /// Monthly rate in percent (2 = 2% a month)
    #[arg(long)]
    pub monthly_percent: Decimal,
}

pub fn run_annualize(args: AnnualizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let annual = annualized_rate_percent(args.monthly_percent)?;
    Ok(json!({
        "result": {
            "monthly_rate_percent": args.monthly_percent,
            "annualized_rate_percent": annual,
        }
    }))
}
