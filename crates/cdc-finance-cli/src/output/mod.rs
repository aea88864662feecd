pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use cdc_finance_core::financing::AmortizationTable;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Display cells of a price table embedded in a result object, if any.
///
/// Rows go back through [`AmortizationRow::display`] so every renderer prints
/// the table at its fixed precision whatever scale the JSON carried.
///
/// [`AmortizationRow::display`]: cdc_finance_core::financing::AmortizationRow::display
pub(crate) fn schedule_cells(result: &Value) -> Option<Vec<[String; 5]>> {
    let table = result.get("amortization_table")?;
    let table: AmortizationTable = serde_json::from_value(table.clone()).ok()?;
    Some(table.rows.iter().map(|row| row.display()).collect())
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdc_finance_core::financing::{calculate_financing, FinancingTerms};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_schedule_cells_keep_fixed_precision() {
        let terms = FinancingTerms {
            present_value: dec!(1000),
            future_value: Decimal::ZERO,
            periodic_rate: dec!(0.02),
            installments: 12,
            has_down_payment: false,
        };
        let out = calculate_financing(&terms.into()).unwrap();
        let value = serde_json::to_value(&out).unwrap();

        let cells = schedule_cells(&value["result"]).unwrap();
        assert_eq!(cells.len(), 13);
        assert_eq!(cells[0], ["1", "94.56", "20.000", "74.56", "925.44"]);
        assert_eq!(cells[11][0], "12");
        assert_eq!(cells[11][4], "0.00");
        assert_eq!(cells[12][0], "Total");
        assert_eq!(cells[12][4], "0.00");
    }

    #[test]
    fn test_schedule_cells_absent_without_table() {
        assert!(schedule_cells(&serde_json::json!({ "rate": "0.02" })).is_none());
    }
}
