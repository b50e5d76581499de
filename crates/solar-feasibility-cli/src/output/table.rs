use serde_json::{Map, Value};
use tabled::{Table, builder::Builder};

/// Format output as tables using the tabled crate.
///
/// Scalar fields of the result go into one Field/Value table; each
/// array of rows (cash-flow ledger, loan schedule, projected rates) gets a
/// table of its own underneath.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(map, None);
            }
        }
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_object(res_map, None),
        other => println!("{}", format_value(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_object(map: &Map<String, Value>, title: Option<&str>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    let mut row_sets: Vec<(&str, &Vec<Value>)> = Vec::new();
    let mut sections: Vec<(&str, &Map<String, Value>)> = Vec::new();

    for (key, val) in map {
        match val {
            Value::Array(rows) if rows.first().is_some_and(Value::is_object) => {
                row_sets.push((key.as_str(), rows));
            }
            Value::Object(inner) if title.is_none() && is_section(inner) => {
                sections.push((key.as_str(), inner));
            }
            _ => builder.push_record([key.as_str(), &format_value(val)]),
        }
    }

    if let Some(t) = title {
        println!("\n{}:", t);
    }
    println!("{}", Table::from(builder));

    for (key, inner) in sections {
        print_object(inner, Some(key));
    }
    for (key, rows) in row_sets {
        println!("\n{}:", key);
        print_rows(rows);
    }
}

/// Nested objects big enough to deserve their own table
fn is_section(map: &Map<String, Value>) -> bool {
    map.len() > 3
}

fn print_rows(arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        if arr.is_empty() {
            println!("(empty)");
        }
        for item in arr {
            println!("{}", format_value(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);

    for map in arr.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }

    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
