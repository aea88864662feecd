use cdc_finance_core::financing::TABLE_HEADER;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_value, schedule_cells};

/// Summary fields as a two-column table, then the price table if present.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result_table(result, map),
            None => print_summary(map),
        },
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    let Value::Object(res_map) = result else {
        print_summary(envelope);
        return;
    };

    print_summary(res_map);

    if let Some(rows) = schedule_cells(result) {
        println!("\nPrice Table");
        print_schedule(rows);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_summary(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if key == "amortization_table" {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_schedule(rows: Vec<[String; 5]>) {
    let mut builder = Builder::default();
    builder.push_record(TABLE_HEADER);
    for cells in rows {
        builder.push_record(cells);
    }
    println!("{}", Table::from(builder));
}
