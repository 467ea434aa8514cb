//! Remote object representation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransportError;

/// A resource as last observed from the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteObject {
    /// The service's opaque identifier.
    pub id: String,
    /// Every other field of the object, as returned.
    pub attributes: Map<String, Value>,
}

impl RemoteObject {
    /// Creates a new `RemoteObject`.
    #[must_use]
    pub fn new(id: impl Into<String>, attributes: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Builds a `RemoteObject` from a JSON object carrying an `id` field.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Decode` if the value is not an object or has no
    /// usable `id`.
    pub fn from_value(value: Value) -> Result<Self, TransportError> {
        let Value::Object(mut attributes) = value else {
            return Err(TransportError::decode("expected a JSON object"));
        };
        let id = attributes
            .remove("id")
            .as_ref()
            .and_then(identifier_of)
            .ok_or_else(|| TransportError::decode("object has no usable \"id\" field"))?;
        Ok(Self { id, attributes })
    }

    /// Returns an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns the object as a single JSON object, `id` included.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

/// Extracts an identifier from a string, a number, or a nested object's `id`.
pub(crate) fn identifier_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => obj.get("id").and_then(identifier_of),
        _ => None,
    }
}
