//! Arbitrary JSON objects exported without a typed schema.

use serde_json::{Map, Value};

use super::{join_non_empty, non_empty, ExportRecord, RowGroup, Section, TableRow, MISSING};

const ID_KEYS: [&str; 3] = ["id", "_id", "notion_id"];
const TITLE_KEYS: [&str; 3] = ["name", "title", "project_name"];

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => non_empty(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Renders any value on one line, nested values as compact JSON.
fn inline_text(value: &Value) -> String {
    if is_scalar(value) {
        scalar_text(value).unwrap_or_else(|| MISSING.to_string())
    } else {
        value.to_string()
    }
}

fn object_lines(object: &Map<String, Value>, separator: &str) -> String {
    object
        .iter()
        .map(|(key, value)| format!("{}: {}", key, inline_text(value)))
        .collect::<Vec<_>>()
        .join(separator)
}

fn as_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn first_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(scalar_text)
}

impl ExportRecord for Value {
    fn record_id(&self) -> String {
        as_object(self)
            .and_then(|object| first_text(object, &ID_KEYS))
            .unwrap_or_default()
    }

    fn title(&self) -> String {
        let name = as_object(self)
            .and_then(|object| first_text(object, &TITLE_KEYS))
            .unwrap_or_else(|| MISSING.to_string());
        format!("Record: {}", name)
    }

    fn sections(&self) -> Vec<Section> {
        let Some(object) = as_object(self) else {
            return vec![Section::new("Value", inline_text(self))];
        };

        object
            .iter()
            .map(|(key, value)| {
                let body = match value {
                    Value::Object(inner) if inner.is_empty() => MISSING.to_string(),
                    Value::Object(inner) => object_lines(inner, "\n"),
                    Value::Array(items) if items.iter().all(is_scalar) => {
                        let texts: Vec<String> = items.iter().filter_map(scalar_text).collect();
                        join_non_empty(&texts, ", ").unwrap_or_else(|| MISSING.to_string())
                    }
                    Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            Value::Object(inner) => object_lines(inner, "\n"),
                            other => inline_text(other),
                        })
                        .collect::<Vec<_>>()
                        .join("\n\n"),
                    scalar => scalar_text(scalar).unwrap_or_else(|| MISSING.to_string()),
                };
                Section::new(key.clone(), body)
            })
            .collect()
    }

    fn table_row(&self) -> TableRow {
        let mut row = TableRow::default();
        let Some(object) = as_object(self) else {
            row.cell("value", scalar_text(self));
            return row;
        };

        for (key, value) in object {
            match value {
                Value::Object(inner) => {
                    row.group(RowGroup {
                        label: Some(key.clone()),
                        items: inner
                            .iter()
                            .map(|(k, v)| format!("{}: {}", k, inline_text(v)))
                            .collect(),
                    });
                }
                Value::Array(items) if items.iter().all(is_scalar) => {
                    let texts: Vec<String> = items.iter().filter_map(scalar_text).collect();
                    row.cell(key, join_non_empty(&texts, ", "));
                }
                Value::Array(items) => {
                    for item in items {
                        let group = match item {
                            Value::Object(inner) => RowGroup {
                                label: Some(key.clone()),
                                items: inner
                                    .iter()
                                    .map(|(k, v)| format!("{}: {}", k, inline_text(v)))
                                    .collect(),
                            },
                            other => RowGroup {
                                label: Some(key.clone()),
                                items: vec![inline_text(other)],
                            },
                        };
                        row.group(group);
                    }
                }
                scalar => {
                    row.cell(key, scalar_text(scalar));
                }
            }
        }

        row
    }
}
