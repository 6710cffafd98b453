use std::collections::HashMap;

use serde_json::{Map, Value};

/// Case-insensitive view over one feature's raw attribute map.
///
/// Upstream schemas drift across jurisdictions, so every logical field is
/// resolved through an ordered list of candidate keys rather than a fixed
/// schema. The lookup table is built once per feature.
pub struct AttrMap {
    lower: HashMap<String, Value>,
}

impl AttrMap {
    pub fn new(attrs: &Map<String, Value>) -> Self {
        Self {
            lower: attrs.iter().map(|(k, v)| (k.to_lowercase(), v.clone())).collect(),
        }
    }

    /// Return the value for the first candidate key that is present.
    pub fn get(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().find_map(|key| self.lower.get(&key.to_lowercase()))
    }

    /// First present candidate as a trimmed string; null or absent yields "".
    pub fn get_str(&self, keys: &[&str]) -> String {
        self.get(keys).map(value_text).unwrap_or_default()
    }

    /// First present candidate parsed as a float, if it parses.
    pub fn get_f64(&self, keys: &[&str]) -> Option<f64> {
        let value = self.get(keys)?;
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Trimmed string form of an attribute value. Null maps to the empty string
/// so that absence and explicit null are indistinguishable downstream.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
