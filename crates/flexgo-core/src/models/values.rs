use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::api::ApiError;
use crate::datapoints::full_path;

#[derive(Debug, Clone, Deserialize)]
struct ValuesResponse {
    values: HashMap<String, ValueEnvelope>,
}

#[derive(Debug, Clone, Deserialize)]
struct ValueEnvelope {
    #[serde(default)]
    value: Value,
}

/// Result of one bulk read, keyed by full datapoint path.
///
/// Device datapoints carry their value directly in the envelope; sensor
/// datapoints nest it one level deeper next to `presentPriority`.
#[derive(Debug, Clone)]
pub struct DatapointValues {
    plant_id: String,
    values: HashMap<String, ValueEnvelope>,
}

impl DatapointValues {
    pub fn from_response(plant_id: &str, response: Value) -> Result<Self, ApiError> {
        let parsed: ValuesResponse = serde_json::from_value(response)
            .map_err(|e| ApiError::InvalidResponse(format!("values response: {}", e)))?;
        Ok(Self {
            plant_id: plant_id.to_string(),
            values: parsed.values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Envelope `value` of a datapoint.
    pub fn raw(&self, suffix: &str) -> Result<&Value, ApiError> {
        let key = full_path(&self.plant_id, suffix);
        self.values
            .get(&key)
            .map(|envelope| &envelope.value)
            .ok_or_else(|| ApiError::InvalidResponse(format!("missing datapoint {}", key)))
    }

    pub fn device_str(&self, suffix: &str) -> Result<String, ApiError> {
        let raw = self.raw(suffix)?;
        as_string(raw).ok_or_else(|| mistyped(suffix, "string", raw))
    }

    pub fn device_int(&self, suffix: &str) -> Result<i64, ApiError> {
        let raw = self.raw(suffix)?;
        as_int(raw).ok_or_else(|| mistyped(suffix, "integer", raw))
    }

    fn sensor(&self, suffix: &str, field: &str) -> Result<&Value, ApiError> {
        self.raw(suffix)?.get(field).ok_or_else(|| {
            ApiError::InvalidResponse(format!("datapoint {} has no {:?}", suffix, field))
        })
    }

    pub fn sensor_str(&self, suffix: &str) -> Result<String, ApiError> {
        let raw = self.sensor(suffix, "value")?;
        as_string(raw).ok_or_else(|| mistyped(suffix, "string", raw))
    }

    pub fn sensor_int(&self, suffix: &str) -> Result<i64, ApiError> {
        let raw = self.sensor(suffix, "value")?;
        as_int(raw).ok_or_else(|| mistyped(suffix, "integer", raw))
    }

    pub fn sensor_bool(&self, suffix: &str) -> Result<bool, ApiError> {
        let raw = self.sensor(suffix, "value")?;
        as_bool(raw).ok_or_else(|| mistyped(suffix, "boolean", raw))
    }

    /// Float value rounded to one decimal.
    pub fn sensor_float(&self, suffix: &str) -> Result<f64, ApiError> {
        let raw = self.sensor(suffix, "value")?;
        as_float(raw)
            .map(round1)
            .ok_or_else(|| mistyped(suffix, "number", raw))
    }

    pub fn present_priority(&self, suffix: &str) -> Result<i64, ApiError> {
        let raw = self.sensor(suffix, "presentPriority")?;
        as_int(raw).ok_or_else(|| mistyped(suffix, "priority", raw))
    }
}

fn mistyped(suffix: &str, expected: &str, raw: &Value) -> ApiError {
    ApiError::InvalidResponse(format!("datapoint {} is not a {}: {}", suffix, expected, raw))
}

/// One decimal, halves away from zero: `-3.25` becomes `-3.3`, not the
/// banker's `-3.2`.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        other => as_float(other).map(|f| f != 0.0),
    }
}
