use cdc_finance_core::financing::TABLE_HEADER;
use serde_json::Value;
use std::io;

use super::{format_value, schedule_cells};

/// Write output as CSV to stdout: the price table when the result has one,
/// otherwise `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value.get("result").unwrap_or(value);
    if let Some(rows) = schedule_cells(result) {
        let _ = wtr.write_record(TABLE_HEADER);
        for cells in &rows {
            let _ = wtr.write_record(cells);
        }
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &format_value(val)]);
        }
    } else {
        let _ = wtr.write_record([&format_value(result)]);
    }

    let _ = wtr.flush();
}
