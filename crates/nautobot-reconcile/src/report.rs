//! Outcome of a reconciliation run and its caller-facing rendering.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::diff::ChangeSet;
use crate::normalize::normalize_remote;
use crate::object::RemoteObject;
use crate::spec::{AttributeKind, ResourceSpec};

/// The single action a run decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Nothing to write.
    NoOp,
    /// Create the object.
    Create,
    /// Update the changed fields.
    Update,
    /// Delete the object.
    Delete,
}

impl Action {
    /// Returns `true` for actions that issue a write call.
    #[must_use]
    pub fn is_write(self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => write!(f, "no-op"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Before/after view of a change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diff {
    /// State before the change.
    pub before: Value,
    /// State after the change.
    pub after: Value,
}

/// The sole return value of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Resource kind name; the output key of the object.
    pub resource_kind: String,
    /// The action decided on.
    pub action: Action,
    /// `true` exactly when the action writes (or would write, in dry-run).
    pub changed: bool,
    /// Whether the write was suppressed.
    pub dry_run: bool,
    /// Serialised object, `None` when nothing exists.
    pub object: Option<Value>,
    /// Human-readable summary. Not a machine signal.
    pub message: String,
    /// Structured diff for changing actions.
    pub diff: Option<Diff>,
    /// Field-level changes behind a create or update.
    pub changes: ChangeSet,
}

impl Outcome {
    /// Renders `{changed, <resource_kind>: object or {}, msg, diff?}`.
    #[must_use]
    pub fn to_output(&self) -> Value {
        let mut output = Map::new();
        output.insert("changed".to_string(), Value::Bool(self.changed));
        output.insert(
            self.resource_kind.clone(),
            self.object.clone().unwrap_or_else(|| json!({})),
        );
        output.insert("msg".to_string(), Value::String(self.message.clone()));
        if let Some(diff) = &self.diff {
            output.insert(
                "diff".to_string(),
                json!({"before": diff.before, "after": diff.after}),
            );
        }
        Value::Object(output)
    }
}

/// Serialises a remote object the way it is reported: nested references
/// reduced to identifiers, reference lists to sorted identifier lists.
#[must_use]
pub fn serialize_object(spec: &ResourceSpec, object: &RemoteObject) -> Value {
    let normalized = normalize_remote(spec, object);
    let mut map = object.attributes.clone();
    for attribute in &spec.attributes {
        if matches!(attribute.kind, AttributeKind::Scalar | AttributeKind::Map) {
            continue;
        }
        if let Some(value) = normalized.get(&attribute.name) {
            map.insert(attribute.name.clone(), value.to_value());
        }
    }
    map.insert("id".to_string(), Value::String(object.id.clone()));
    Value::Object(map)
}

/// Builds outcomes for one resource instance.
pub struct Reporter<'a> {
    spec: &'a ResourceSpec,
    key: &'a str,
    dry_run: bool,
}

impl<'a> Reporter<'a> {
    /// Creates a reporter for the instance named `key`.
    pub fn new(spec: &'a ResourceSpec, key: &'a str, dry_run: bool) -> Self {
        Self { spec, key, dry_run }
    }

    fn message(&self, verb: &str) -> String {
        format!("{} {} {verb}", self.spec.name, self.key)
    }

    fn outcome(
        &self,
        action: Action,
        object: Option<Value>,
        verb: &str,
        diff: Option<Diff>,
        changes: ChangeSet,
    ) -> Outcome {
        Outcome {
            resource_kind: self.spec.name.clone(),
            action,
            changed: action.is_write(),
            dry_run: self.dry_run,
            object,
            message: self.message(verb),
            diff,
            changes,
        }
    }

    /// The object was (or would be) created.
    #[must_use]
    pub fn created(&self, object: Value, changes: ChangeSet) -> Outcome {
        let diff = Diff {
            before: json!({"state": "absent"}),
            after: json!({"state": "present"}),
        };
        self.outcome(Action::Create, Some(object), "created", Some(diff), changes)
    }

    /// The object was (or would be) updated.
    #[must_use]
    pub fn updated(&self, object: Value, changes: ChangeSet) -> Outcome {
        let diff = Diff {
            before: Value::Object(changes.before()),
            after: Value::Object(changes.after()),
        };
        self.outcome(Action::Update, Some(object), "updated", Some(diff), changes)
    }

    /// The object exists and already matches.
    #[must_use]
    pub fn unchanged(&self, object: Value) -> Outcome {
        self.outcome(
            Action::NoOp,
            Some(object),
            "already exists",
            None,
            ChangeSet::default(),
        )
    }

    /// The object was (or would be) deleted.
    #[must_use]
    pub fn deleted(&self, object: Value) -> Outcome {
        let diff = Diff {
            before: json!({"state": "present"}),
            after: json!({"state": "absent"}),
        };
        self.outcome(
            Action::Delete,
            Some(object),
            "deleted",
            Some(diff),
            ChangeSet::default(),
        )
    }

    /// The object does not exist and should not.
    #[must_use]
    pub fn absent(&self) -> Outcome {
        self.outcome(
            Action::NoOp,
            None,
            "already absent",
            None,
            ChangeSet::default(),
        )
    }
}
