use serde_json::{Map, Value};
use std::io;

/// Keys whose arrays are the primary rows of a result, in priority order.
const ROW_KEYS: [&str; 3] = ["results", "points", "rounds"];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            let body = match map.get("result") {
                Some(Value::Object(result)) => result,
                _ => map,
            };
            if let Some(rows) = primary_rows(body) {
                write_array_csv(&mut wtr, rows);
            } else {
                write_fields_csv(&mut wtr, body);
            }
        }
        Value::Array(arr) => {
            write_array_csv(&mut wtr, arr);
        }
        _ => {
            let _ = wtr.write_record([&format_csv_value(value)]);
        }
    }

    let _ = wtr.flush();
}

fn primary_rows(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    ROW_KEYS.iter().find_map(|k| match map.get(*k) {
        Some(Value::Array(arr)) if !arr.is_empty() => Some(arr),
        _ => None,
    })
}

fn write_fields_csv<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
    }
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if arr.is_empty() {
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first
            .iter()
            .filter(|(_, v)| !v.is_object() && !v.is_array())
            .map(|(k, _)| k.as_str())
            .collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        match value {
            Value::Object(map) => match primary_rows(map) {
                Some(rows) => write_array_csv(&mut wtr, rows),
                None => write_fields_csv(&mut wtr, map),
            },
            _ => unreachable!(),
        }
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_rows_skip_nested_columns() {
        let out = render(&json!({
            "results": [
                {"scenario_name": "Base", "option_value": "245000", "waterfall": {"x": 1}}
            ]
        }));
        assert_eq!(out, "scenario_name,option_value\nBase,245000\n");
    }

    #[test]
    fn test_fields_when_no_rows() {
        let out = render(&json!({"break_even_exit": "2800000.5"}));
        assert_eq!(out, "field,value\nbreak_even_exit,2800000.5\n");
    }
}
