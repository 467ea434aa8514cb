//! Canonical, comparable attribute shapes.
//!
//! Desired input is a partial specification: only attributes the caller gave
//! are normalised and later compared. Map attributes (custom fields) are
//! merged over the remote map, so keys the caller did not mention keep their
//! remote value instead of being cleared.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::object::{RemoteObject, identifier_of};
use crate::spec::{AttributeKind, ResourceSpec};

/// One attribute in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Compared by equality.
    Scalar(Value),
    /// Identifier of the referenced object, `None` when unset.
    Reference(Option<String>),
    /// Identifiers of the referenced objects, order-independent.
    ReferenceSet(BTreeSet<String>),
    /// Free-form map.
    Map(Map<String, Value>),
}

impl Normalized {
    /// The JSON form sent to and reported from the remote service.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::Reference(Some(id)) => Value::String(id.clone()),
            Self::Reference(None) => Value::Null,
            Self::ReferenceSet(ids) => {
                Value::Array(ids.iter().cloned().map(Value::String).collect())
            }
            Self::Map(map) => Value::Object(map.clone()),
        }
    }
}

/// Normalised attributes keyed by name, in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedAttributes(BTreeMap<String, Normalized>);

impl NormalizedAttributes {
    /// Returns an attribute by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Normalized> {
        self.0.get(name)
    }

    /// Iterates attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Normalized)> {
        self.0.iter()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The attributes as a write payload.
    #[must_use]
    pub fn to_payload(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), value.to_value()))
            .collect()
    }
}

/// Normalises resolved desired attributes.
///
/// `data` must already have passed through the reference resolver, so
/// reference attributes hold identifiers. When `existing` is given, map
/// attributes are merged over the existing map.
#[must_use]
pub fn normalize_desired(
    spec: &ResourceSpec,
    data: &Map<String, Value>,
    existing: Option<&NormalizedAttributes>,
) -> NormalizedAttributes {
    let mut out = BTreeMap::new();
    for attribute in &spec.attributes {
        let Some(value) = data.get(&attribute.name) else {
            continue;
        };
        let normalized = match &attribute.kind {
            AttributeKind::Map => {
                let desired = value.as_object().cloned().unwrap_or_default();
                match existing.and_then(|e| e.get(&attribute.name)) {
                    Some(Normalized::Map(current)) => {
                        Normalized::Map(merge_maps(current, &desired))
                    }
                    _ => Normalized::Map(desired),
                }
            }
            kind => normalize_value(kind, value),
        };
        out.insert(attribute.name.clone(), normalized);
    }
    NormalizedAttributes(out)
}

/// Normalises every recognised attribute present on a remote object.
///
/// Nested objects are reduced to their `id`, as are the members of reference
/// lists.
#[must_use]
pub fn normalize_remote(spec: &ResourceSpec, object: &RemoteObject) -> NormalizedAttributes {
    let mut out = BTreeMap::new();
    for attribute in &spec.attributes {
        if let Some(value) = object.get(&attribute.name) {
            out.insert(
                attribute.name.clone(),
                normalize_value(&attribute.kind, value),
            );
        }
    }
    NormalizedAttributes(out)
}

fn normalize_value(kind: &AttributeKind, value: &Value) -> Normalized {
    match kind {
        AttributeKind::Scalar => Normalized::Scalar(value.clone()),
        AttributeKind::Reference { .. } => Normalized::Reference(identifier_of(value)),
        AttributeKind::ReferenceList { .. } => {
            let ids = match value {
                Value::Array(items) => items.iter().filter_map(identifier_of).collect(),
                Value::Null => BTreeSet::new(),
                single => identifier_of(single).into_iter().collect(),
            };
            Normalized::ReferenceSet(ids)
        }
        AttributeKind::Map => Normalized::Map(value.as_object().cloned().unwrap_or_default()),
    }
}

/// Overlays `desired` on `current`; keys only in `current` are kept.
#[must_use]
pub fn merge_maps(current: &Map<String, Value>, desired: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = current.clone();
    for (key, value) in desired {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
