use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use super::checked;
use crate::error::CdcError;
use crate::rounding::{round_to, MONEY_DP};
use crate::types::{Money, Rate};
use crate::CdcResult;

// ---------------------------------------------------------------------------
// Rate helpers
// ---------------------------------------------------------------------------

/// Interpret a raw rate that may have been entered as a percentage.
///
/// Anything whose magnitude exceeds 1 is taken to be a percentage and divided by
/// 100; smaller values are assumed to be decimals already.
pub fn normalize_rate(rate: Rate) -> Rate {
    if rate.abs() > Decimal::ONE {
        rate / dec!(100)
    } else {
        rate
    }
}

/// `(1 + rate)^exponent`, with negative exponents allowed.
pub(crate) fn growth_factor(rate: Rate, exponent: i64) -> CdcResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powi(exponent)
        .ok_or_else(|| {
            CdcError::invalid(
                "periodic_rate",
                format!("(1 + {rate})^{exponent} is not representable"),
            )
        })
}

/// `(1 + rate)^-periods`. A growth factor beyond the representable range
/// discounts to zero.
pub(crate) fn discount_factor(rate: Rate, periods: i64) -> CdcResult<Decimal> {
    let base = Decimal::ONE + rate;
    match base.checked_powi(periods) {
        Some(growth) if growth.is_zero() => Err(CdcError::DivisionByZero {
            context: format!("discount factor (1 + {rate})^-{periods}"),
        }),
        Some(growth) => checked::div(Decimal::ONE, growth, "discount factor"),
        None if base > Decimal::ONE && periods > 0 => Ok(Decimal::ZERO),
        None => Err(CdcError::invalid(
            "periodic_rate",
            format!("(1 + {rate})^-{periods} is not representable"),
        )),
    }
}

/// Down-payment adjustment factor: `1 + rate` when the first installment is paid
/// upfront, otherwise 1.
pub fn down_payment_factor(has_down_payment: bool, rate: Rate) -> Decimal {
    if has_down_payment {
        Decimal::ONE + rate
    } else {
        Decimal::ONE
    }
}

// ---------------------------------------------------------------------------
// Coefficient & valuation
// ---------------------------------------------------------------------------

/// Financing coefficient `rate / (1 - (1 + rate)^-n)` for a decimal rate.
pub fn financing_coefficient(rate: Rate, installments: u32) -> CdcResult<Decimal> {
    let discount = discount_factor(rate, i64::from(installments))?;
    let denominator = Decimal::ONE - discount;

    if denominator.is_zero() {
        return Err(CdcError::DivisionByZero {
            context: format!("financing coefficient (rate {rate}, {installments} installments)"),
        });
    }

    checked::div(rate, denominator, "financing coefficient")
}

/// Financing coefficient for a rate that may still be in percent form.
pub fn financing_coefficient_raw(rate: Rate, installments: u32) -> CdcResult<Decimal> {
    financing_coefficient(normalize_rate(rate), installments)
}

/// Level periodic payment for a principal.
pub fn payment_amount(present_value: Money, coefficient: Decimal) -> CdcResult<Money> {
    checked::mul(present_value, coefficient, "payment amount")
}

/// Factor applied to the cash price to reach the credit price: `f / (n × coefficient)`.
pub fn applied_factor(
    has_down_payment: bool,
    installments: u32,
    coefficient: Decimal,
    rate: Rate,
) -> CdcResult<Decimal> {
    let denominator = checked::mul(
        Decimal::from(installments),
        coefficient,
        "applied factor denominator",
    )?;
    if denominator.is_zero() {
        return Err(CdcError::DivisionByZero {
            context: "applied factor (installments × coefficient)".into(),
        });
    }

    checked::div(
        down_payment_factor(has_down_payment, rate),
        denominator,
        "applied factor",
    )
}

/// Recover the cash price from a credit price: `(FV / n) × (f / coefficient)`.
pub fn present_value_from_future(
    coefficient: Decimal,
    rate: Rate,
    future_value: Money,
    installments: u32,
    has_down_payment: bool,
) -> CdcResult<Money> {
    if installments == 0 {
        return Err(CdcError::DivisionByZero {
            context: "present value (zero installments)".into(),
        });
    }
    if coefficient.is_zero() {
        return Err(CdcError::DivisionByZero {
            context: "present value (zero financing coefficient)".into(),
        });
    }

    const CTX: &str = "present value";
    let f = down_payment_factor(has_down_payment, rate);
    let per_installment = checked::div(future_value, Decimal::from(installments), CTX)?;
    checked::mul(per_installment, checked::div(f, coefficient, CTX)?, CTX)
}

/// Credit price implied by a cash price, rounded to cents: `PV × n × coefficient / f`.
pub fn future_value_from_present(
    coefficient: Decimal,
    rate: Rate,
    present_value: Money,
    installments: u32,
    has_down_payment: bool,
) -> CdcResult<Money> {
    let factor = applied_factor(has_down_payment, installments, coefficient, rate)?;
    if factor.is_zero() {
        return Err(CdcError::DivisionByZero {
            context: "future value (zero applied factor)".into(),
        });
    }

    let future_value = checked::div(present_value, factor, "future value")?;
    Ok(round_to(future_value, MONEY_DP))
}
