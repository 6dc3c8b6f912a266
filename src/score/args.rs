use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::{
    error::{Result, bench_error::BenchError},
    utils::string_util::StripCodeBlock,
};

/// Argument map in comparison form: every value rendered to its canonical string.
pub type NormalizedArgs = BTreeMap<String, String>;

pub fn normalize_arguments(arguments: &Map<String, Value>) -> NormalizedArgs {
    arguments
        .iter()
        .map(|(key, value)| (key.clone(), canonical_string(value)))
        .collect()
}

/// Render a scalar or composite value so that `3`, `3.0` and `"3"` compare equal.
///
/// Strings are taken verbatim, integral floats print without a fraction, and composite
/// values print as compact JSON with sorted keys.
pub fn canonical_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => canonical_json(other),
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                    (f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
        }
        Value::String(s) => Value::String(s.clone()).to_string(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let inner: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
    }
}

/// Decode a model-emitted argument blob into an argument map.
///
/// Blank input is an empty map. Code fences are stripped and a JSON string holding a JSON
/// object is unwrapped once. Anything that still is not an object is an `ArgumentDecode`
/// error; callers substitute an empty map.
pub fn decode_arguments(raw: &str) -> Result<Map<String, Value>> {
    let body = raw.strip_code_block();
    if body.is_empty() {
        return Ok(Map::new());
    }

    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| BenchError::ArgumentDecode(format!("{e}: {}", preview(body))))?;

    match parsed {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::String(inner) => match serde_json::from_str::<Value>(&inner) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(BenchError::ArgumentDecode(format!(
                "expected an object, got string {}",
                preview(&inner)
            ))
            .into()),
        },
        other => Err(BenchError::ArgumentDecode(format!(
            "expected an object, got {}",
            preview(&other.to_string())
        ))
        .into()),
    }
}

fn preview(s: &str) -> String {
    if s.chars().count() > 80 {
        let head: String = s.chars().take(80).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}
