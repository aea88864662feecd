use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use super::amortization::{
    apply_down_payment, build_amortization_table, AmortizationTable, ScheduleInput,
};
use super::checked;
use super::coefficient::{
    applied_factor, financing_coefficient, future_value_from_present, payment_amount,
};
use super::solver::{solve_rate_with, RateSolveInput, SolverConfig};
use super::valuation::{
    annualized_rate_percent, discount_percent, discounted_payoff, embedded_interest_percent,
    nominal_payoff,
};
use crate::error::CdcError;
use crate::rounding::{at_precision, COEFFICIENT_DP, MONEY_DP, PERCENT_DP, RATE_DP};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate};
use crate::CdcResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Terms of one installment sale. A zero `future_value` or `periodic_rate`
/// marks that figure as unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingTerms {
    /// Cash price.
    pub present_value: Money,
    /// Credit price; zero means derive it from the rate.
    #[serde(default)]
    pub future_value: Money,
    /// Decimal periodic rate; zero means solve for it.
    #[serde(default)]
    pub periodic_rate: Rate,
    pub installments: u32,
    #[serde(default)]
    pub has_down_payment: bool,
}

impl FinancingTerms {
    /// Set the periodic rate from a percentage (2 = 2% per period).
    pub fn with_rate_percent(mut self, percent: Percent) -> Self {
        self.periodic_rate = percent / dec!(100);
        self
    }

    pub fn validate(&self) -> CdcResult<()> {
        if self.installments == 0 {
            return Err(CdcError::invalid(
                "installments",
                "At least one installment is required",
            ));
        }
        if self.present_value <= Decimal::ZERO {
            return Err(CdcError::invalid(
                "present_value",
                "Cash price must be positive",
            ));
        }
        if self.future_value < Decimal::ZERO {
            return Err(CdcError::invalid(
                "future_value",
                "Credit price cannot be negative",
            ));
        }
        if self.periodic_rate < Decimal::ZERO {
            return Err(CdcError::invalid(
                "periodic_rate",
                "Periodic rate cannot be negative",
            ));
        }
        if self.periodic_rate.is_zero() && self.future_value.is_zero() {
            return Err(CdcError::invalid(
                "periodic_rate",
                "Either a periodic rate or a future value must be supplied",
            ));
        }
        Ok(())
    }
}

/// A full price-table request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingRequest {
    pub terms: FinancingTerms,
    /// Installments to bring forward for the early-payoff figures.
    #[serde(default)]
    pub months_to_go_back: u32,
    #[serde(default)]
    pub solver: SolverConfig,
}

impl From<FinancingTerms> for FinancingRequest {
    fn from(terms: FinancingTerms) -> Self {
        Self {
            terms,
            months_to_go_back: 0,
            solver: SolverConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingResult {
    /// Decimal periodic rate, supplied or solved.
    pub resolved_rate: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver_iterations: Option<u32>,
    pub financing_coefficient: Decimal,
    pub applied_factor: Decimal,
    pub present_value: Money,
    /// Credit price, supplied or derived.
    pub future_value: Money,
    pub has_down_payment: bool,
    /// Upfront payment; zero without a down payment.
    pub down_payment: Money,
    /// Level installment used in the table.
    pub payment_amount: Money,
    /// Principal amortized by the table.
    pub financed_principal: Money,
    /// Installments in the table (one fewer than requested with a down payment).
    pub scheduled_installments: u32,
    pub amortization_table: AmortizationTable,
    pub months_to_go_back: u32,
    pub nominal_payoff: Money,
    pub discounted_payoff: Money,
    /// Table balance with `months_to_go_back` installments remaining.
    pub adjusted_balance: Money,
    pub annualized_rate_percent: Percent,
    pub embedded_interest_percent: Percent,
    pub discount_percent: Percent,
}

impl FinancingResult {
    /// Copy with every figure rounded to its display precision.
    pub fn rounded(&self) -> Self {
        Self {
            resolved_rate: at_precision(self.resolved_rate, RATE_DP),
            financing_coefficient: at_precision(self.financing_coefficient, COEFFICIENT_DP),
            applied_factor: at_precision(self.applied_factor, COEFFICIENT_DP),
            present_value: at_precision(self.present_value, MONEY_DP),
            future_value: at_precision(self.future_value, MONEY_DP),
            down_payment: at_precision(self.down_payment, MONEY_DP),
            payment_amount: at_precision(self.payment_amount, MONEY_DP),
            financed_principal: at_precision(self.financed_principal, MONEY_DP),
            nominal_payoff: at_precision(self.nominal_payoff, MONEY_DP),
            discounted_payoff: at_precision(self.discounted_payoff, MONEY_DP),
            adjusted_balance: at_precision(self.adjusted_balance, MONEY_DP),
            annualized_rate_percent: at_precision(self.annualized_rate_percent, PERCENT_DP),
            embedded_interest_percent: at_precision(self.embedded_interest_percent, PERCENT_DP),
            discount_percent: at_precision(self.discount_percent, PERCENT_DP),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Supplied rate when the credit price is unknown, solved rate otherwise.
fn resolve_rate(
    terms: &FinancingTerms,
    solver: &SolverConfig,
    cancel: Option<&AtomicBool>,
    warnings: &mut Vec<String>,
) -> CdcResult<(Rate, Option<u32>)> {
    if terms.future_value.is_zero() {
        return Ok((terms.periodic_rate, None));
    }

    if !terms.periodic_rate.is_zero() {
        warnings.push(format!(
            "Supplied periodic rate {} ignored; rate solved from the future value",
            terms.periodic_rate
        ));
    }

    let input = RateSolveInput {
        present_value: terms.present_value,
        future_value: terms.future_value,
        installments: terms.installments,
        has_down_payment: terms.has_down_payment,
    };
    let solution = solve_rate_with(&input, solver, cancel)?;
    Ok((solution.rate, Some(solution.iterations)))
}

/// Run the full calculation: rate, coefficient, payment, table and summary.
pub fn calculate_financing(
    request: &FinancingRequest,
) -> CdcResult<ComputationOutput<FinancingResult>> {
    calculate_financing_with(request, None)
}

/// [`calculate_financing`] with a cancellation flag forwarded to the rate solver.
pub fn calculate_financing_with(
    request: &FinancingRequest,
    cancel: Option<&AtomicBool>,
) -> CdcResult<ComputationOutput<FinancingResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    let terms = &request.terms;

    terms.validate()?;

    let (rate, solver_iterations) = resolve_rate(terms, &request.solver, cancel, &mut warnings)?;
    let coefficient = financing_coefficient(rate, terms.installments)?;
    let factor = applied_factor(terms.has_down_payment, terms.installments, coefficient, rate)?;

    let future_value = if terms.future_value.is_zero() {
        future_value_from_present(
            coefficient,
            rate,
            terms.present_value,
            terms.installments,
            terms.has_down_payment,
        )?
    } else {
        terms.future_value
    };

    let mut schedule = ScheduleInput {
        present_value: terms.present_value,
        payment: payment_amount(terms.present_value, coefficient)?,
        installments: terms.installments,
        rate,
        has_down_payment: terms.has_down_payment,
    };
    if terms.has_down_payment {
        let adjusted = apply_down_payment(
            schedule.present_value,
            schedule.payment,
            schedule.installments,
            rate,
        )?;
        schedule.present_value = adjusted.present_value;
        schedule.payment = adjusted.payment;
        schedule.installments = adjusted.installments;
    }

    let table = build_amortization_table(&schedule)?;

    let months = request.months_to_go_back;
    if months >= schedule.installments && months > 0 {
        warnings.push(format!(
            "months_to_go_back ({months}) covers the whole schedule of {} installments; payoff figures are zero",
            schedule.installments
        ));
    }
    let nominal = nominal_payoff(months, schedule.payment, schedule.installments)?;
    let discounted = discounted_payoff(months, schedule.payment, schedule.installments, rate)?;
    let adjusted_balance = table.outstanding_balance_with_remaining(months);

    let output = FinancingResult {
        resolved_rate: rate,
        solver_iterations,
        financing_coefficient: coefficient,
        applied_factor: factor,
        present_value: terms.present_value,
        future_value,
        has_down_payment: terms.has_down_payment,
        down_payment: if terms.has_down_payment {
            schedule.payment
        } else {
            Decimal::ZERO
        },
        payment_amount: schedule.payment,
        financed_principal: schedule.present_value,
        scheduled_installments: schedule.installments,
        amortization_table: table,
        months_to_go_back: months,
        nominal_payoff: nominal,
        discounted_payoff: discounted,
        adjusted_balance,
        annualized_rate_percent: annualized_rate_percent(checked::mul(
            rate,
            dec!(100),
            "periodic rate in percent",
        )?)?,
        embedded_interest_percent: embedded_interest_percent(terms.present_value, future_value)?,
        discount_percent: discount_percent(terms.present_value, future_value)?,
    };

    let rate_source = if solver_iterations.is_some() {
        "solved"
    } else {
        "supplied"
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "CDC Price Table (level-payment amortization)",
        &serde_json::json!({
            "present_value": terms.present_value.to_string(),
            "future_value": terms.future_value.to_string(),
            "periodic_rate": terms.periodic_rate.to_string(),
            "installments": terms.installments,
            "has_down_payment": terms.has_down_payment,
            "rate_source": rate_source,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rounding::round_to;

    fn two_percent_terms() -> FinancingTerms {
        FinancingTerms {
            present_value: dec!(1000),
            future_value: Decimal::ZERO,
            periodic_rate: dec!(0.02),
            installments: 12,
            has_down_payment: false,
        }
    }

    #[test]
    fn test_supplied_rate_derives_future_value() {
        let out = calculate_financing(&two_percent_terms().into()).unwrap();
        let r = &out.result;
        assert_eq!(r.resolved_rate, dec!(0.02));
        assert!(r.solver_iterations.is_none());
        assert_eq!(r.future_value, dec!(1134.72));
        assert_eq!(round_to(r.payment_amount, MONEY_DP), dec!(94.56));
        assert_eq!(r.annualized_rate_percent, dec!(26.82));
        assert_eq!(r.embedded_interest_percent, dec!(13.47));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_future_value_triggers_solver() {
        let terms = FinancingTerms {
            future_value: dec!(1300),
            periodic_rate: Decimal::ZERO,
            installments: 10,
            ..two_percent_terms()
        };
        let out = calculate_financing(&terms.into()).unwrap();
        assert!(out.result.solver_iterations.is_some());
        assert_eq!(out.result.future_value, dec!(1300));
        assert_eq!(out.result.discount_percent, dec!(23.08));
        assert_eq!(out.result.embedded_interest_percent, dec!(30));
    }

    #[test]
    fn test_both_supplied_warns_and_solves() {
        let terms = FinancingTerms {
            future_value: dec!(1134.72),
            ..two_percent_terms()
        };
        let out = calculate_financing(&terms.into()).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!((out.result.resolved_rate - dec!(0.02)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_both_unknown_is_invalid() {
        let terms = FinancingTerms {
            periodic_rate: Decimal::ZERO,
            ..two_percent_terms()
        };
        assert!(matches!(
            calculate_financing(&terms.into()),
            Err(CdcError::InvalidFinancingTerms { .. })
        ));
    }

    #[test]
    fn test_with_rate_percent() {
        let terms = two_percent_terms().with_rate_percent(dec!(2.5));
        assert_eq!(terms.periodic_rate, dec!(0.025));
    }

    #[test]
    fn test_down_payment_shortens_schedule() {
        let terms = FinancingTerms {
            has_down_payment: true,
            ..two_percent_terms()
        };
        let out = calculate_financing(&terms.into()).unwrap();
        let r = &out.result;
        assert_eq!(r.scheduled_installments, 11);
        assert_eq!(r.amortization_table.rows.len(), 12);
        assert_eq!(r.down_payment, r.payment_amount);
        assert_eq!(
            r.amortization_table.periods()[10].outstanding_balance,
            Decimal::ZERO
        );
    }

    #[test]
    fn test_down_payment_summary_is_relative_to_cash_price() {
        let terms = FinancingTerms {
            has_down_payment: true,
            ..two_percent_terms()
        };
        let r = calculate_financing(&terms.into()).unwrap().result;
        assert_eq!(r.future_value, dec!(1112.47));
        assert!(r.financed_principal < r.present_value);
        assert_eq!(r.embedded_interest_percent, dec!(11.25));
        assert_eq!(r.discount_percent, dec!(10.11));
    }

    #[test]
    fn test_oversized_cash_price_is_error_not_panic() {
        let terms = FinancingTerms {
            present_value: dec!(75000000000000000000000000000),
            ..two_percent_terms()
        };
        assert!(matches!(
            calculate_financing(&terms.into()),
            Err(CdcError::InvalidFinancingTerms { .. })
        ));
    }

    #[test]
    fn test_single_installment_down_payment_fails() {
        let terms = FinancingTerms {
            installments: 1,
            has_down_payment: true,
            ..two_percent_terms()
        };
        assert!(matches!(
            calculate_financing(&terms.into()),
            Err(CdcError::InvalidScheduleLength { .. })
        ));
    }

    #[test]
    fn test_payoff_figures() {
        let request = FinancingRequest {
            months_to_go_back: 2,
            ..two_percent_terms().into()
        };
        let r = calculate_financing(&request).unwrap().result;
        assert_eq!(r.nominal_payoff, r.payment_amount * dec!(2));
        assert!(r.discounted_payoff < r.nominal_payoff);
        assert_eq!(
            r.adjusted_balance,
            r.amortization_table.periods()[9].outstanding_balance
        );
    }

    #[test]
    fn test_rounded_summary() {
        let r = calculate_financing(&two_percent_terms().into())
            .unwrap()
            .result
            .rounded();
        assert_eq!(r.financing_coefficient, dec!(0.094560));
        assert_eq!(r.payment_amount, dec!(94.56));
        assert_eq!(r.resolved_rate, dec!(0.02));
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: FinancingRequest = serde_json::from_str(
            r#"{"terms": {"present_value": "1000", "periodic_rate": "0.02", "installments": 12}}"#,
        )
        .unwrap();
        assert_eq!(request.months_to_go_back, 0);
        assert!(!request.terms.has_down_payment);
        assert!(request.terms.future_value.is_zero());
        assert_eq!(request.solver.max_iterations, 100);
    }
}
