use serde_json::Value;

/// Key output fields, in order of priority.
const PRIORITY_KEYS: [&str; 6] = [
    "option_value",
    "break_even_exit",
    "total_value",
    "price_per_common_share",
    "max_option_value",
    "break_even_price_per_share",
];

/// Print just the key answer value from the output.
///
/// Scenario results print one `name: option_value` line each; otherwise the
/// first well-known field present wins, then the first field of the result.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    for line in minimal_lines(result_obj) {
        println!("{}", line);
    }
}

fn minimal_lines(result_obj: &Value) -> Vec<String> {
    if let Value::Object(map) = result_obj {
        if let Some(Value::Array(results)) = map.get("results") {
            return results
                .iter()
                .filter_map(|r| {
                    let name = r.get("scenario_name")?;
                    let value = match r.get("error") {
                        Some(Value::String(e)) => format!("error ({})", e),
                        _ => format_minimal(r.get("option_value")?),
                    };
                    Some(format!("{}: {}", format_minimal(name), value))
                })
                .collect();
        }

        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key) {
                if !val.is_null() {
                    return vec![format_minimal(val)];
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            return vec![format!("{}: {}", key, format_minimal(val))];
        }
    }

    vec![format_minimal(result_obj)]
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
