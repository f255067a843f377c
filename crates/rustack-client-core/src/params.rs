//! Query parameter flattening.
//!
//! AWS query APIs take a flat `key=value` list, with list members and nested
//! structures encoded into the key itself (`Filter.1.Name`, `Filter.1.Value.2`).
//! [`flatten`] turns a nested JSON-shaped parameter tree into that flat form.
//! Both signature versions sign the flattened map, so it must run before any
//! signer sees the request.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// The marker in a parameter key that is replaced with the 1-based list index.
pub const INDEX_PLACEHOLDER: char = '?';

/// A flat, byte-order sorted parameter map.
pub type ParamMap = BTreeMap<String, String>;

/// Flatten a nested parameter tree into AWS's dotted/indexed convention.
///
/// For every `(mask, value)` pair the value is treated as a sequence (a scalar
/// is a one-element sequence). When there is more than one element and the
/// mask has no `?` yet, `.?` is appended. Each element then gets the mask with
/// its first `?` replaced by the element's 1-based position; mappings recurse
/// and contribute `key.subkey` entries, scalars are emitted as-is.
///
/// `null` values and empty sequences or mappings emit nothing. A sequence
/// nested directly inside another sequence has no AWS encoding and is emitted
/// as its JSON text.
///
/// # Examples
///
/// ```
/// use rustack_client_core::flatten;
/// use serde_json::json;
///
/// let params = json!({"Param.?.X": ["d", "e"], "Single": "a"});
/// let flat = flatten(params.as_object().unwrap());
/// assert_eq!(flat["Param.1.X"], "d");
/// assert_eq!(flat["Param.2.X"], "e");
/// assert_eq!(flat["Single"], "a");
/// ```
#[must_use]
pub fn flatten(params: &Map<String, Value>) -> ParamMap {
    let mut result = ParamMap::new();
    for (mask, value) in params {
        flatten_entry(mask, value, &mut result);
    }
    result
}

/// Flatten an arbitrary JSON value. Anything that is not an object yields an
/// empty map.
#[must_use]
pub fn flatten_value(params: &Value) -> ParamMap {
    params.as_object().map(flatten).unwrap_or_default()
}

fn flatten_entry(mask: &str, value: &Value, result: &mut ParamMap) {
    let values: Vec<&Value> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mask = if values.len() > 1 && !mask.contains(INDEX_PLACEHOLDER) {
        format!("{mask}.{INDEX_PLACEHOLDER}")
    } else {
        mask.to_owned()
    };

    for (idx, item) in values.into_iter().enumerate() {
        let key = mask.replacen(INDEX_PLACEHOLDER, &(idx + 1).to_string(), 1);
        match item {
            Value::Object(nested) => {
                for (subkey, subvalue) in flatten(nested) {
                    result.insert(format!("{key}.{subkey}"), subvalue);
                }
            }
            Value::Null => {}
            scalar => {
                result.insert(key, scalar_to_string(scalar));
            }
        }
    }
}

/// Render a scalar parameter value the way it goes on the wire.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
