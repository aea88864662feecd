use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::checked;
use super::coefficient::growth_factor;
use crate::error::CdcError;
use crate::rounding::{round_to, PERCENT_DP};
use crate::types::{Money, Percent, Rate};
use crate::CdcResult;

/// Compound a monthly rate given in percent into an annual rate in percent.
pub fn annualized_rate_percent(monthly_rate_percent: Percent) -> CdcResult<Percent> {
    let annual = growth_factor(monthly_rate_percent / dec!(100), 12)? - Decimal::ONE;
    let percent = checked::mul(annual, dec!(100), "annualized rate")?;
    Ok(round_to(percent, PERCENT_DP))
}

fn payoff_window_is_open(months_back: u32, installments: u32) -> bool {
    months_back > 0 && months_back < installments
}

/// Undiscounted sum of the next `months_back` payments.
///
/// Zero when nothing is being brought forward or when the window would cover the
/// whole schedule.
pub fn nominal_payoff(months_back: u32, payment: Money, installments: u32) -> CdcResult<Money> {
    if !payoff_window_is_open(months_back, installments) {
        return Ok(Decimal::ZERO);
    }
    checked::mul(payment, Decimal::from(months_back), "nominal payoff")
}

/// Nominal payoff discounted by `(1 + rate)^months_back`.
pub fn discounted_payoff(
    months_back: u32,
    payment: Money,
    installments: u32,
    rate: Rate,
) -> CdcResult<Money> {
    let nominal = nominal_payoff(months_back, payment, installments)?;
    if nominal.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let growth = growth_factor(rate, i64::from(months_back))?;
    if growth.is_zero() {
        return Err(CdcError::DivisionByZero {
            context: "discounted payoff growth factor".into(),
        });
    }
    checked::div(nominal, growth, "discounted payoff")
}

/// Interest embedded in the credit price, as a percentage of the cash price.
pub fn embedded_interest_percent(present_value: Money, future_value: Money) -> CdcResult<Percent> {
    if present_value.is_zero() {
        return Err(CdcError::DivisionByZero {
            context: "embedded interest (zero present value)".into(),
        });
    }
    percent_of(future_value, present_value, present_value, "embedded interest")
}

/// Discount obtained by paying cash, as a percentage of the credit price.
pub fn discount_percent(present_value: Money, future_value: Money) -> CdcResult<Percent> {
    if future_value.is_zero() {
        return Err(CdcError::DivisionByZero {
            context: "discount (zero future value)".into(),
        });
    }
    percent_of(future_value, present_value, future_value, "discount")
}

/// `(future_value - present_value) / base × 100`, rounded to percent precision.
fn percent_of(
    future_value: Money,
    present_value: Money,
    base: Money,
    context: &str,
) -> CdcResult<Percent> {
    let spread = checked::sub(future_value, present_value, context)?;
    let ratio = checked::div(spread, base, context)?;
    Ok(round_to(checked::mul(ratio, dec!(100), context)?, PERCENT_DP))
}
