//! Flattening of the remote store's typed property envelopes into plain
//! key-value objects, plus builders for going the other way.

use serde_json::{json, Map, Value};

/// Join the plain-text runs of a rich-text array.
pub fn extract_plain_text(rich_text: &Value) -> String {
    match rich_text.as_array() {
        Some(parts) => parts
            .iter()
            .filter_map(|t| t.get("plain_text").and_then(Value::as_str))
            .collect(),
        None => String::new(),
    }
}

/// Flatten one raw page into `{id, created_time, last_edited_time, <field>: <plain value>}`.
/// Unknown property types pass through with their raw envelope so nothing is
/// silently dropped.
pub fn flatten_record(page: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    for key in ["id", "created_time", "last_edited_time"] {
        if let Some(v) = page.get(key) {
            out.insert(key.to_string(), v.clone());
        }
    }

    let Some(props) = page.get("properties").and_then(Value::as_object) else {
        return out;
    };

    for (name, prop) in props {
        let kind = prop.get("type").and_then(Value::as_str).unwrap_or("");
        let flat = match kind {
            "title" => Value::String(extract_plain_text(&prop["title"])),
            "rich_text" => Value::String(extract_plain_text(&prop["rich_text"])),
            "number" => prop["number"].clone(),
            "select" => prop["select"]
                .get("name")
                .cloned()
                .unwrap_or(Value::Null),
            "multi_select" => Value::Array(
                prop["multi_select"]
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|i| i.get("name").cloned())
                            .collect()
                    })
                    .unwrap_or_default(),
            ),
            "date" => prop["date"].clone(),
            "checkbox" => prop["checkbox"].clone(),
            "email" => prop["email"].clone(),
            "phone_number" => prop["phone_number"].clone(),
            "url" => prop["url"].clone(),
            "status" => prop["status"]
                .get("name")
                .cloned()
                .unwrap_or(Value::Null),
            _ => prop.clone(),
        };
        out.insert(name.clone(), flat);
    }
    out
}

// Property-envelope builders used when writing records back.

pub fn title(content: &str) -> Value {
    json!({ "title": [{ "text": { "content": content } }] })
}

pub fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

/// An empty rich-text array, used to clear a text field.
pub fn clear_rich_text() -> Value {
    json!({ "rich_text": [] })
}

pub fn select(name: &str) -> Value {
    json!({ "select": { "name": name } })
}

pub fn status(name: &str) -> Value {
    json!({ "status": { "name": name } })
}

pub fn number(value: f64) -> Value {
    json!({ "number": value })
}

pub fn checkbox(value: bool) -> Value {
    json!({ "checkbox": value })
}

pub fn email(value: &str) -> Value {
    json!({ "email": value })
}

pub fn phone(value: &str) -> Value {
    json!({ "phone_number": value })
}

pub fn date(start: &str) -> Value {
    json!({ "date": { "start": start } })
}

/// Parse a string field as f64, tolerating payloads that send numbers as
/// strings. Returns None for anything unparseable.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
