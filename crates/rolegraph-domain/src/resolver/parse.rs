//! Parsing of free-form model output into a [`ResolvedIntent`].

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::intent::ResolvedIntent;

/// Extracts a resolved intent from text containing a JSON object.
///
/// The object spans from the first `{` to the last `}` in `text`, so prose
/// or code fences around it are ignored. Recognized fields:
/// - `action`: the intent kind; missing or non-string becomes `unknown`
/// - `parameters`: object of values; non-string values are stringified and
///   nulls dropped
/// - `confidence`: number clamped to `0..=1`; anything else becomes `0`
///
/// Never fails: output with no parseable object resolves to `unknown`.
pub fn parse_structured_output(text: &str) -> ResolvedIntent {
    let object = match extract_object(text) {
        Some(object) => object,
        None => {
            debug!("no JSON object in resolver output");
            return ResolvedIntent::unknown();
        }
    };

    let kind = object
        .get("action")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string();

    let parameters = object
        .get("parameters")
        .and_then(Value::as_object)
        .map(|params| {
            params
                .iter()
                .filter_map(|(key, value)| stringify(value).map(|v| (key.clone(), v)))
                .collect()
        })
        .unwrap_or_else(BTreeMap::new);

    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(0.0);

    ResolvedIntent {
        kind,
        parameters,
        confidence,
    }
}

fn extract_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "resolver output is not valid JSON");
            None
        }
    }
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
