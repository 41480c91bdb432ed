use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::SaveError;

/// A response body that parsed as a JSON object with a truthy `success` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SaveResponse(Map<String, Value>);

impl SaveResponse {
    pub fn parse(body: &str) -> Result<Self, SaveError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| SaveError::InvalidResponse(format!("body is not JSON: {e}")))?;
        let Value::Object(map) = value else {
            return Err(SaveError::InvalidResponse(
                "body is not a JSON object".to_string(),
            ));
        };
        match map.get("success") {
            Some(flag) if is_truthy(flag) => Ok(Self(map)),
            Some(_) => Err(SaveError::InvalidResponse(
                "server reported failure".to_string(),
            )),
            None => Err(SaveError::InvalidResponse(
                "missing `success` field".to_string(),
            )),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
