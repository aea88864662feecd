use rust_decimal::Decimal;

use crate::error::CdcError;
use crate::CdcResult;

pub(crate) fn overflow(context: &str) -> CdcError {
    CdcError::invalid("amount", format!("{context} overflowed"))
}

pub(crate) fn add(a: Decimal, b: Decimal, context: &str) -> CdcResult<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(context))
}

pub(crate) fn sub(a: Decimal, b: Decimal, context: &str) -> CdcResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| overflow(context))
}

pub(crate) fn mul(a: Decimal, b: Decimal, context: &str) -> CdcResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(context))
}

/// Callers guard zero divisors themselves so they can report `DivisionByZero`.
pub(crate) fn div(a: Decimal, b: Decimal, context: &str) -> CdcResult<Decimal> {
    a.checked_div(b).ok_or_else(|| overflow(context))
}
