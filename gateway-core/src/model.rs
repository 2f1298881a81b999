use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::GatewayError;

/// One inbound call: `{ id, method, params }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperationRequest {
    /// Opaque caller identifier, echoed on every event.
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default, deserialize_with = "params_object")]
    pub params: Map<String, Value>,
}

fn params_object<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(serde::de::Error::custom(format!(
            "params must be an object, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl OperationRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { id: id.into(), method: method.into(), params }
    }

    /// Decode a raw request body.
    ///
    /// On failure the best-effort `id` is returned alongside the error so the
    /// caller can still address its error event.
    pub fn from_slice(body: &[u8]) -> Result<Self, (Value, GatewayError)> {
        serde_json::from_slice(body).map_err(|err| {
            let id = serde_json::from_slice::<Value>(body)
                .ok()
                .and_then(|v| v.get("id").cloned())
                .unwrap_or(Value::Null);
            (id, GatewayError::InvalidRequest(err.to_string()))
        })
    }
}

/// A resolved position; decodes from the provider's `{lat, lon}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// A single event on a response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingEvent {
    Result { id: Value, payload: Value },
    Done { id: Value },
    Error { id: Value, message: String },
}

impl OutgoingEvent {
    pub fn id(&self) -> &Value {
        match self {
            Self::Result { id, .. } | Self::Done { id } | Self::Error { id, .. } => id,
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Result { .. })
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Wire<'a> {
    Result { id: &'a Value, result: &'a Value },
    Done { id: &'a Value, done: bool },
    Error { id: &'a Value, error: &'a str },
}

impl Serialize for OutgoingEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Self::Result { id, payload } => Wire::Result { id, result: payload },
            Self::Done { id } => Wire::Done { id, done: true },
            Self::Error { id, message } => Wire::Error { id, error: message },
        };
        wire.serialize(serializer)
    }
}
