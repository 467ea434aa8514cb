//! Field-level comparison of desired and existing attributes.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::normalize::{Normalized, NormalizedAttributes};

/// Old and new value of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Value on the remote object (`null` when absent or unset).
    pub before: Value,
    /// Desired value.
    pub after: Value,
}

/// The attributes that differ, in name order.
///
/// A creation change set lists every desired attribute with a `null` before
/// value; it drives the create call and is not reported field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    changes: BTreeMap<String, FieldChange>,
    #[serde(skip)]
    creation: bool,
}

impl ChangeSet {
    /// Returns `true` if nothing differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Returns `true` if there was no existing object to compare against.
    #[must_use]
    pub fn is_creation(&self) -> bool {
        self.creation
    }

    /// Number of changed attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns the change of one attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldChange> {
        self.changes.get(name)
    }

    /// Iterates changes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldChange)> {
        self.changes.iter()
    }

    /// Names of the changed attributes.
    #[must_use]
    pub fn fields(&self) -> Vec<&str> {
        self.changes.keys().map(String::as_str).collect()
    }

    /// Old values of the changed attributes.
    #[must_use]
    pub fn before(&self) -> Map<String, Value> {
        self.changes
            .iter()
            .map(|(name, change)| (name.clone(), change.before.clone()))
            .collect()
    }

    /// New values of the changed attributes; the update payload.
    #[must_use]
    pub fn after(&self) -> Map<String, Value> {
        self.changes
            .iter()
            .map(|(name, change)| (name.clone(), change.after.clone()))
            .collect()
    }
}

/// Compares normalised desired attributes with an optional existing object.
///
/// Only attributes present in `desired` are compared. An attribute missing
/// from `existing` compares as unset. Without `existing`, every desired
/// attribute is new.
#[must_use]
pub fn diff(desired: &NormalizedAttributes, existing: Option<&NormalizedAttributes>) -> ChangeSet {
    let Some(existing) = existing else {
        let changes = desired
            .iter()
            .map(|(name, value)| {
                (
                    name.clone(),
                    FieldChange {
                        before: Value::Null,
                        after: value.to_value(),
                    },
                )
            })
            .collect();
        return ChangeSet {
            changes,
            creation: true,
        };
    };

    let mut changes = BTreeMap::new();
    for (name, wanted) in desired.iter() {
        let current = existing.get(name);
        let equal = match current {
            Some(current) => current == wanted,
            None => is_unset(wanted),
        };
        if !equal {
            changes.insert(
                name.clone(),
                FieldChange {
                    before: current.map_or(Value::Null, Normalized::to_value),
                    after: wanted.to_value(),
                },
            );
        }
    }
    ChangeSet {
        changes,
        creation: false,
    }
}

fn is_unset(value: &Normalized) -> bool {
    match value {
        Normalized::Scalar(v) => v.is_null(),
        Normalized::Reference(id) => id.is_none(),
        Normalized::ReferenceSet(ids) => ids.is_empty(),
        Normalized::Map(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize_desired, normalize_remote};
    use crate::object::RemoteObject;
    use crate::spec::ResourceSpec;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn existing(value: Value) -> NormalizedAttributes {
        normalize_remote(
            &ResourceSpec::route_target(),
            &RemoteObject::new("rt-1", map(value)),
        )
    }

    #[test]
    fn test_creation_lists_all_fields() {
        let spec = ResourceSpec::route_target();
        let desired = normalize_desired(&spec, &map(json!({"name": "x", "tags": ["t"]})), None);
        let changes = diff(&desired, None);
        assert!(changes.is_creation());
        assert_eq!(changes.fields(), vec!["name", "tags"]);
        assert_eq!(changes.after()["tags"], json!(["t"]));
    }

    #[test]
    fn test_equal_is_empty() {
        let spec = ResourceSpec::route_target();
        let current = existing(json!({
            "name": "65000:65001",
            "tenant": {"id": "t-1"},
            "tags": [{"id": "tag-1"}],
            "description": ""
        }));
        let desired = normalize_desired(
            &spec,
            &map(json!({"name": "65000:65001", "tenant": "t-1", "tags": ["tag-1"]})),
            Some(&current),
        );
        let changes = diff(&desired, Some(&current));
        assert!(changes.is_empty());
        assert!(!changes.is_creation());
    }

    #[test]
    fn test_only_changed_fields() {
        let spec = ResourceSpec::route_target();
        let current = existing(json!({"name": "x", "description": "", "tenant": null}));
        let desired = normalize_desired(
            &spec,
            &map(json!({"name": "x", "description": "management"})),
            Some(&current),
        );
        let changes = diff(&desired, Some(&current));
        assert_eq!(changes.fields(), vec!["description"]);
        assert_eq!(changes.before()["description"], json!(""));
        assert_eq!(changes.after(), map(json!({"description": "management"})));
    }

    #[test]
    fn test_untouched_custom_fields_do_not_differ() {
        let spec = ResourceSpec::route_target();
        let current = existing(json!({"name": "x", "custom_fields": {"a": 1, "b": 2}}));
        let desired = normalize_desired(
            &spec,
            &map(json!({"name": "x", "custom_fields": {"a": 1}})),
            Some(&current),
        );
        assert!(diff(&desired, Some(&current)).is_empty());

        let desired = normalize_desired(
            &spec,
            &map(json!({"name": "x", "custom_fields": {"a": 3}})),
            Some(&current),
        );
        let changes = diff(&desired, Some(&current));
        assert_eq!(
            changes.get("custom_fields").unwrap().after,
            json!({"a": 3, "b": 2})
        );
    }

    #[test]
    fn test_missing_remote_field_compares_as_unset() {
        let spec = ResourceSpec::route_target();
        let current = existing(json!({"name": "x"}));
        let desired = normalize_desired(&spec, &map(json!({"tags": []})), Some(&current));
        assert!(diff(&desired, Some(&current)).is_empty());

        let desired = normalize_desired(&spec, &map(json!({"tenant": "t-9"})), Some(&current));
        let changes = diff(&desired, Some(&current));
        assert_eq!(changes.get("tenant").unwrap().before, Value::Null);
    }

    #[test]
    fn test_deterministic_regardless_of_tag_order() {
        let spec = ResourceSpec::route_target();
        let current = existing(json!({"tags": [{"id": "a"}]}));
        let one = diff(
            &normalize_desired(&spec, &map(json!({"tags": ["c", "b"]})), Some(&current)),
            Some(&current),
        );
        let two = diff(
            &normalize_desired(&spec, &map(json!({"tags": ["b", "c"]})), Some(&current)),
            Some(&current),
        );
        assert_eq!(one, two);
        assert_eq!(one.get("tags").unwrap().after, json!(["b", "c"]));
    }
}
