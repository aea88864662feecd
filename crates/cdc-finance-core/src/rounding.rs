//! Single rounding path shared by the engine and every presentation layer.
//!
//! Rounding is half away from zero at `dp` decimal places. The string form is
//! produced from the already-rounded value, so a displayed figure can never
//! disagree with the number it was printed from.

use rust_decimal::{Decimal, RoundingStrategy};

/// Payments, amortization, balances, present/future values, payoffs.
pub const MONEY_DP: u32 = 2;

/// Interest column and the interest total.
pub const INTEREST_DP: u32 = 3;

/// Financing coefficient and applied factor.
pub const COEFFICIENT_DP: u32 = 6;

/// Periodic rate, shown as a decimal fraction.
pub const RATE_DP: u32 = 4;

/// Any figure already expressed in percent.
pub const PERCENT_DP: u32 = 2;

/// Round `value` to `dp` decimal places, midpoints away from zero.
pub fn round_to(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// [`round_to`], then carried at exactly `dp` places so that serialized and
/// printed forms keep their trailing zeros (`20.000`, `0.00`).
pub fn at_precision(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = round_to(value, dp);
    // -0.00 prints as 0.00
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }
    rounded.rescale(dp);
    rounded
}

/// Fixed-width decimal string with exactly `dp` digits after the point.
pub fn to_fixed(value: Decimal, dp: u32) -> String {
    at_precision(value, dp).to_string()
}
