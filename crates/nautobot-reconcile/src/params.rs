//! Caller input: the parameter structure and the validated desired state.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReconcileError;
use crate::spec::{AttributeKind, ResourceSpec};

/// Target lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    /// The object must exist with the desired attributes.
    #[default]
    Present,
    /// The object must not exist.
    Absent,
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

impl std::str::FromStr for TargetState {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(ReconcileError::invalid_parameters(format!(
                "state must be present or absent, got {other}"
            ))),
        }
    }
}

/// The parameter structure handed over by the argument layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Desired attributes.
    pub data: Map<String, Value>,
    /// Target lifecycle state.
    #[serde(default)]
    pub state: TargetState,
    /// Decide but do not write.
    #[serde(default, alias = "dry_run")]
    pub check_mode: bool,
    /// Replaces the natural-key fields used for the lookup.
    #[serde(default)]
    pub query_params: Option<Vec<String>>,
}

/// Validated desired state for one invocation. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    data: Map<String, Value>,
    state: TargetState,
    dry_run: bool,
    query_params: Option<Vec<String>>,
}

impl DesiredState {
    /// Validates `params` against `spec`.
    ///
    /// Null values are dropped first, so an explicit null means "omitted".
    /// A single token given for a reference-list attribute becomes a
    /// one-element list.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` for attributes the spec does not recognise and
    /// `InvalidParameters` for missing required attributes, a non-string
    /// primary key, a non-object map attribute or bad `query_params`.
    pub fn from_parameters(
        spec: &ResourceSpec,
        params: Parameters,
    ) -> Result<Self, ReconcileError> {
        let mut data = Map::new();
        for (name, value) in params.data {
            if value.is_null() {
                continue;
            }
            let attribute = spec
                .attribute(&name)
                .ok_or_else(|| ReconcileError::unknown_attribute(&spec.name, &name))?;
            let value = match (&attribute.kind, value) {
                (AttributeKind::ReferenceList { .. }, Value::Array(items)) => Value::Array(items),
                (AttributeKind::ReferenceList { .. }, single) => Value::Array(vec![single]),
                (AttributeKind::Map, Value::Object(map)) => Value::Object(map),
                (AttributeKind::Map, _) => {
                    return Err(ReconcileError::invalid_parameters(format!(
                        "{name} must be a mapping"
                    )));
                }
                (_, value) => value,
            };
            data.insert(name, value);
        }

        for attribute in spec.attributes.iter().filter(|a| a.required) {
            if !data.contains_key(&attribute.name) {
                return Err(ReconcileError::invalid_parameters(format!(
                    "missing required argument {} for {}",
                    attribute.name, spec.name
                )));
            }
        }
        if let Some(key) = spec.primary_key() {
            match data.get(key) {
                Some(Value::String(s)) if !s.is_empty() => {}
                Some(_) => {
                    return Err(ReconcileError::invalid_parameters(format!(
                        "{key} must be a non-empty string"
                    )));
                }
                None => {
                    return Err(ReconcileError::invalid_parameters(format!(
                        "missing required argument {key} for {}",
                        spec.name
                    )));
                }
            }
        }

        if let Some(fields) = &params.query_params {
            if fields.is_empty() {
                return Err(ReconcileError::invalid_parameters(
                    "query_params must name at least one field",
                ));
            }
            if let Some(unknown) = fields.iter().find(|f| !spec.recognizes(f)) {
                return Err(ReconcileError::invalid_parameters(format!(
                    "query_params names {unknown}, which is not an attribute of {}",
                    spec.name
                )));
            }
        }

        Ok(Self {
            data,
            state: params.state,
            dry_run: params.check_mode,
            query_params: params.query_params,
        })
    }

    /// Shorthand for a `present` state without dry-run.
    ///
    /// # Errors
    ///
    /// See [`DesiredState::from_parameters`].
    pub fn present(spec: &ResourceSpec, data: Map<String, Value>) -> Result<Self, ReconcileError> {
        Self::from_parameters(
            spec,
            Parameters {
                data,
                ..Parameters::default()
            },
        )
    }

    /// Shorthand for an `absent` state without dry-run.
    ///
    /// # Errors
    ///
    /// See [`DesiredState::from_parameters`].
    pub fn absent(spec: &ResourceSpec, data: Map<String, Value>) -> Result<Self, ReconcileError> {
        Self::from_parameters(
            spec,
            Parameters {
                data,
                state: TargetState::Absent,
                ..Parameters::default()
            },
        )
    }

    /// Returns a copy of this state with dry-run switched on or off.
    #[must_use]
    pub fn with_dry_run(&self, dry_run: bool) -> Self {
        Self {
            dry_run,
            ..self.clone()
        }
    }

    /// The validated attributes.
    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The target state.
    #[must_use]
    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Whether writes are suppressed.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Caller override of the lookup fields.
    #[must_use]
    pub fn query_params(&self) -> Option<&[String]> {
        self.query_params.as_deref()
    }

    /// The value that names the instance in messages.
    #[must_use]
    pub fn display_key(&self, spec: &ResourceSpec) -> String {
        spec.primary_key()
            .and_then(|key| self.data.get(key))
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    }
}
