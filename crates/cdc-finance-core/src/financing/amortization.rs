use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::checked;
use crate::error::CdcError;
use crate::rounding::{at_precision, to_fixed, INTEREST_DP, MONEY_DP};
use crate::types::{Money, Rate};
use crate::CdcResult;

/// Column labels of the price table, in row-field order.
pub const TABLE_HEADER: [&str; 5] = [
    "Month",
    "Payment",
    "Interest",
    "Amortization",
    "Outstanding Balance",
];

/// First column of a price-table row. Serialized as the cell text: `"1"`, `"2"`, …, `"Total"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum RowLabel {
    Period(u32),
    Total,
}

impl From<RowLabel> for String {
    fn from(label: RowLabel) -> Self {
        label.to_string()
    }
}

impl TryFrom<String> for RowLabel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.eq_ignore_ascii_case("total") {
            return Ok(RowLabel::Total);
        }
        value
            .parse::<u32>()
            .map(RowLabel::Period)
            .map_err(|_| format!("invalid price-table row label '{value}'"))
    }
}

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowLabel::Period(p) => write!(f, "{p}"),
            RowLabel::Total => f.write_str("Total"),
        }
    }
}

/// One row of the price table, stored at display precision
/// (interest to 3 places, everything else to 2) and serialized with that many digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    pub period: RowLabel,
    pub payment: Money,
    pub interest: Money,
    pub amortization: Money,
    pub outstanding_balance: Money,
}

impl AmortizationRow {
    fn rounded(
        period: RowLabel,
        payment: Money,
        interest: Money,
        amortization: Money,
        outstanding_balance: Money,
    ) -> Self {
        Self {
            period,
            payment: at_precision(payment, MONEY_DP),
            interest: at_precision(interest, INTEREST_DP),
            amortization: at_precision(amortization, MONEY_DP),
            outstanding_balance: at_precision(outstanding_balance, MONEY_DP),
        }
    }

    /// Fixed-decimal strings in [`TABLE_HEADER`] order.
    pub fn display(&self) -> [String; 5] {
        [
            self.period.to_string(),
            to_fixed(self.payment, MONEY_DP),
            to_fixed(self.interest, INTEREST_DP),
            to_fixed(self.amortization, MONEY_DP),
            to_fixed(self.outstanding_balance, MONEY_DP),
        ]
    }
}

/// Period rows followed by a single trailing totals row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationTable {
    pub rows: Vec<AmortizationRow>,
}

impl AmortizationTable {
    /// The period rows, without the totals row.
    pub fn periods(&self) -> &[AmortizationRow] {
        match self.rows.split_last() {
            Some((_, periods)) => periods,
            None => &[],
        }
    }

    pub fn totals(&self) -> Option<&AmortizationRow> {
        self.rows.last().filter(|row| row.period == RowLabel::Total)
    }

    /// Balance still owed when `remaining` installments are left, i.e. after
    /// period `n - remaining`. Zero outside `1..n`.
    pub fn outstanding_balance_with_remaining(&self, remaining: u32) -> Money {
        let periods = self.periods();
        let n = periods.len();
        let remaining = remaining as usize;
        if remaining == 0 || remaining >= n {
            return Decimal::ZERO;
        }
        periods[n - remaining - 1].outstanding_balance
    }
}

/// Inputs of the table builder, already adjusted for any down payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub present_value: Money,
    pub payment: Money,
    pub installments: u32,
    /// Decimal periodic rate (0.02 = 2%).
    pub rate: Rate,
    /// Seeds the paid total with one extra payment already made upfront.
    pub has_down_payment: bool,
}

/// Caller-side down-payment adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownPaymentAdjustment {
    pub present_value: Money,
    pub payment: Money,
    pub installments: u32,
}

/// Turn the first installment into an upfront payment: the payment is divided by
/// `1 + rate`, one installment is removed, and the upfront payment leaves the
/// financed principal.
pub fn apply_down_payment(
    present_value: Money,
    payment: Money,
    installments: u32,
    rate: Rate,
) -> CdcResult<DownPaymentAdjustment> {
    let growth = Decimal::ONE + rate;
    if growth.is_zero() {
        return Err(CdcError::DivisionByZero {
            context: "down payment adjustment (rate of -100%)".into(),
        });
    }
    if installments <= 1 {
        return Err(CdcError::InvalidScheduleLength {
            installments: i64::from(installments) - 1,
        });
    }

    const CTX: &str = "down payment adjustment";
    let adjusted_payment = checked::div(payment, growth, CTX)?;
    Ok(DownPaymentAdjustment {
        present_value: checked::sub(present_value, adjusted_payment, CTX)?,
        payment: adjusted_payment,
        installments: installments - 1,
    })
}

/// Build the period-by-period price table.
pub fn build_amortization_table(input: &ScheduleInput) -> CdcResult<AmortizationTable> {
    if input.installments == 0 {
        return Err(CdcError::InvalidScheduleLength { installments: 0 });
    }
    if input.present_value < Decimal::ZERO {
        return Err(CdcError::invalid(
            "present_value",
            "Financed principal cannot be negative",
        ));
    }
    if input.payment < Decimal::ZERO {
        return Err(CdcError::invalid("payment", "Payment cannot be negative"));
    }

    let mut rows = Vec::with_capacity(input.installments as usize + 1);
    let mut balance = input.present_value;
    let mut total_interest = Decimal::ZERO;
    let mut total_amortization = Decimal::ZERO;
    let mut total_paid = if input.has_down_payment {
        input.payment
    } else {
        Decimal::ZERO
    };

    const CTX: &str = "price table";
    for period in 1..=input.installments {
        let interest = checked::mul(balance, input.rate, CTX)?;
        let amortization = checked::sub(input.payment, interest, CTX)?;
        balance = checked::sub(balance, amortization, CTX)?.max(Decimal::ZERO);

        rows.push(AmortizationRow::rounded(
            RowLabel::Period(period),
            input.payment,
            interest,
            amortization,
            balance,
        ));

        total_interest = checked::add(total_interest, interest, CTX)?;
        total_amortization = checked::add(total_amortization, amortization, CTX)?;
        total_paid = checked::add(total_paid, input.payment, CTX)?;
    }

    rows.push(AmortizationRow::rounded(
        RowLabel::Total,
        total_paid,
        total_interest,
        total_amortization,
        balance,
    ));

    debug!(
        periods = input.installments,
        %total_interest,
        final_balance = %balance,
        "built amortization table"
    );

    Ok(AmortizationTable { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financing::coefficient::{financing_coefficient, payment_amount};
    use rust_decimal_macros::dec;

    fn twelve_month_input() -> ScheduleInput {
        let coefficient = financing_coefficient(dec!(0.02), 12).unwrap();
        ScheduleInput {
            present_value: dec!(1000),
            payment: payment_amount(dec!(1000), coefficient).unwrap(),
            installments: 12,
            rate: dec!(0.02),
            has_down_payment: false,
        }
    }

    #[test]
    fn test_twelve_month_table_shape_and_totals() {
        let table = build_amortization_table(&twelve_month_input()).unwrap();
        assert_eq!(table.rows.len(), 13);
        assert_eq!(table.periods().len(), 12);

        let first = &table.rows[0];
        assert_eq!(first.period, RowLabel::Period(1));
        assert_eq!(first.payment, dec!(94.56));
        assert_eq!(first.interest, dec!(20.000));
        assert_eq!(first.amortization, dec!(74.56));
        assert_eq!(first.outstanding_balance, dec!(925.44));

        assert_eq!(table.periods()[11].outstanding_balance, Decimal::ZERO);

        let totals = table.totals().unwrap();
        assert!((totals.interest - dec!(134.72)).abs() < dec!(0.01));
        assert_eq!(totals.amortization, dec!(1000.00));
        assert_eq!(totals.payment, dec!(1134.72));
    }

    #[test]
    fn test_balance_never_negative_when_overpaying() {
        let input = ScheduleInput {
            present_value: dec!(100),
            payment: dec!(60),
            installments: 3,
            rate: dec!(0.01),
            has_down_payment: false,
        };
        let table = build_amortization_table(&input).unwrap();
        for row in table.periods() {
            assert!(row.outstanding_balance >= Decimal::ZERO);
        }
        assert_eq!(table.periods()[2].outstanding_balance, Decimal::ZERO);
    }

    #[test]
    fn test_down_payment_seeds_total_paid() {
        let adjustment =
            apply_down_payment(dec!(1000), dec!(102), 12, dec!(0.02)).unwrap();
        assert_eq!(adjustment.payment, dec!(100));
        assert_eq!(adjustment.present_value, dec!(900));
        assert_eq!(adjustment.installments, 11);

        let table = build_amortization_table(&ScheduleInput {
            present_value: adjustment.present_value,
            payment: adjustment.payment,
            installments: adjustment.installments,
            rate: dec!(0.02),
            has_down_payment: true,
        })
        .unwrap();
        assert_eq!(table.totals().unwrap().payment, dec!(1200.00));
    }

    #[test]
    fn test_single_installment_down_payment_is_invalid_length() {
        let err = apply_down_payment(dec!(1000), dec!(1020), 1, dec!(0.02)).unwrap_err();
        assert!(matches!(err, CdcError::InvalidScheduleLength { installments: 0 }));
    }

    #[test]
    fn test_rejects_empty_and_negative_inputs() {
        let mut input = twelve_month_input();
        input.installments = 0;
        assert!(matches!(
            build_amortization_table(&input),
            Err(CdcError::InvalidScheduleLength { .. })
        ));

        let mut input = twelve_month_input();
        input.payment = dec!(-1);
        assert!(matches!(
            build_amortization_table(&input),
            Err(CdcError::InvalidFinancingTerms { .. })
        ));

        let mut input = twelve_month_input();
        input.present_value = dec!(-1);
        assert!(matches!(
            build_amortization_table(&input),
            Err(CdcError::InvalidFinancingTerms { .. })
        ));
    }

    #[test]
    fn test_display_uses_output_precision() {
        let table = build_amortization_table(&twelve_month_input()).unwrap();
        let cells = table.rows[0].display();
        assert_eq!(cells, ["1", "94.56", "20.000", "74.56", "925.44"]);
        assert_eq!(table.totals().unwrap().display()[0], "Total");
    }

    #[test]
    fn test_rows_serialize_at_fixed_precision() {
        let table = build_amortization_table(&twelve_month_input()).unwrap();
        let first = serde_json::to_value(&table.rows[0]).unwrap();
        assert_eq!(first["interest"], "20.000");
        assert_eq!(first["payment"], "94.56");
        let last = serde_json::to_value(&table.periods()[11]).unwrap();
        assert_eq!(last["outstanding_balance"], "0.00");
        let totals = serde_json::to_value(table.totals().unwrap()).unwrap();
        assert_eq!(totals["outstanding_balance"], "0.00");
        assert_eq!(totals["amortization"], "1000.00");
    }

    #[test]
    fn test_overflowing_totals_are_an_error() {
        let half = Decimal::MAX / dec!(2);
        let input = ScheduleInput {
            present_value: half,
            payment: half,
            installments: 3,
            rate: dec!(0.01),
            has_down_payment: false,
        };
        assert!(matches!(
            build_amortization_table(&input),
            Err(CdcError::InvalidFinancingTerms { .. })
        ));
    }

    #[test]
    fn test_row_label_serializes_as_cell_text() {
        assert_eq!(serde_json::to_string(&RowLabel::Period(3)).unwrap(), r#""3""#);
        assert_eq!(serde_json::to_string(&RowLabel::Total).unwrap(), r#""Total""#);
        let parsed: RowLabel = serde_json::from_str(r#""Total""#).unwrap();
        assert_eq!(parsed, RowLabel::Total);
        assert!(serde_json::from_str::<RowLabel>(r#""Month""#).is_err());
    }

    #[test]
    fn test_outstanding_balance_with_remaining() {
        let table = build_amortization_table(&twelve_month_input()).unwrap();
        assert_eq!(table.outstanding_balance_with_remaining(0), Decimal::ZERO);
        assert_eq!(table.outstanding_balance_with_remaining(12), Decimal::ZERO);
        // One installment left: balance after period 11 is the last payment's principal.
        let one_left = table.outstanding_balance_with_remaining(1);
        assert_eq!(one_left, table.periods()[10].outstanding_balance);
        assert!((one_left - dec!(92.71)).abs() <= dec!(0.01));
    }
}
