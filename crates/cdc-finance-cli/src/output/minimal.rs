use serde_json::Value;

use super::format_value;

/// Print the single most useful figure of a result.
pub fn print_minimal(value: &Value) {
    let result_obj = value.get("result").unwrap_or(value);

    let priority_keys = [
        "payment_amount",
        "rate",
        "financing_coefficient",
        "annualized_rate_percent",
        "discounted_payoff",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_value(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_value(val));
            return;
        }
    }

    println!("{}", format_value(result_obj));
}
