//! Per-resource-kind metadata.
//!
//! A [`ResourceSpec`] is plain data: the API endpoint, the natural-key fields,
//! and each recognised attribute with its [`AttributeKind`]. The engine is
//! generic over it, so supporting another resource kind means adding a table
//! entry (or loading one from a file), not writing code.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

fn default_lookup_field() -> String {
    "name".to_string()
}

/// How an attribute's values are compared and resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// Compared by equality.
    Scalar,
    /// A single related object, given as an identifier or a reference token.
    Reference {
        /// Endpoint of the referenced resource kind.
        endpoint: String,
        /// Field a name token is matched against.
        #[serde(default = "default_lookup_field")]
        lookup_field: String,
    },
    /// A set of related objects; order is irrelevant.
    ReferenceList {
        /// Endpoint of the referenced resource kind.
        endpoint: String,
        /// Field a name token is matched against.
        #[serde(default = "default_lookup_field")]
        lookup_field: String,
    },
    /// A free-form map merged key by key into the remote map.
    Map,
}

impl AttributeKind {
    /// Returns the referenced endpoint and lookup field for reference kinds.
    #[must_use]
    pub fn reference_target(&self) -> Option<(&str, &str)> {
        match self {
            Self::Reference {
                endpoint,
                lookup_field,
            }
            | Self::ReferenceList {
                endpoint,
                lookup_field,
            } => Some((endpoint, lookup_field)),
            Self::Scalar | Self::Map => None,
        }
    }

    /// Short label used in listings.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Reference { .. } => "reference",
            Self::ReferenceList { .. } => "reference-list",
            Self::Map => "map",
        }
    }
}

/// One recognised attribute of a resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    /// Attribute name as used by the remote service.
    pub name: String,
    /// Comparison and resolution behaviour.
    #[serde(flatten)]
    pub kind: AttributeKind,
    /// Whether the caller must supply it.
    #[serde(default)]
    pub required: bool,
}

impl AttributeSpec {
    /// A scalar attribute.
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::with_kind(name, AttributeKind::Scalar)
    }

    /// A single reference resolved by `name` against `endpoint`.
    #[must_use]
    pub fn reference(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            AttributeKind::Reference {
                endpoint: endpoint.into(),
                lookup_field: default_lookup_field(),
            },
        )
    }

    /// A reference list resolved by `name` against `endpoint`.
    #[must_use]
    pub fn reference_list(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            AttributeKind::ReferenceList {
                endpoint: endpoint.into(),
                lookup_field: default_lookup_field(),
            },
        )
    }

    /// A free-form map attribute.
    #[must_use]
    pub fn map(name: impl Into<String>) -> Self {
        Self::with_kind(name, AttributeKind::Map)
    }

    fn with_kind(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    /// Marks the attribute as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Static metadata of one resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Resource kind name, e.g. `route_target`. Also the output key.
    pub name: String,
    /// API endpoint, e.g. `ipam/route-targets`.
    pub endpoint: String,
    /// Fields that identify an instance, in priority order.
    pub natural_key: Vec<String>,
    /// Recognised attributes.
    pub attributes: Vec<AttributeSpec>,
}

impl ResourceSpec {
    /// Creates a spec with no attributes.
    #[must_use]
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            natural_key: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Sets the natural-key fields.
    #[must_use]
    pub fn with_natural_key(mut self, fields: &[&str]) -> Self {
        self.natural_key = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Returns the attribute with the given name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Returns `true` if `name` is a recognised attribute.
    #[must_use]
    pub fn recognizes(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// The first natural-key field; its value names the instance in messages.
    #[must_use]
    pub fn primary_key(&self) -> Option<&str> {
        self.natural_key.first().map(String::as_str)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::InvalidParameters` if the spec has an empty
    /// name, endpoint or natural key, duplicate attributes, or natural-key
    /// fields that are not attributes.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.name.is_empty() || self.endpoint.is_empty() {
            return Err(ReconcileError::invalid_parameters(
                "resource spec needs a name and an endpoint",
            ));
        }
        if self.natural_key.is_empty() {
            return Err(ReconcileError::invalid_parameters(format!(
                "resource spec {} has no natural key",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            if !seen.insert(attribute.name.as_str()) {
                return Err(ReconcileError::invalid_parameters(format!(
                    "resource spec {} declares {} twice",
                    self.name, attribute.name
                )));
            }
        }
        if let Some(missing) = self.natural_key.iter().find(|f| !self.recognizes(f)) {
            return Err(ReconcileError::invalid_parameters(format!(
                "natural key field {missing} of {} is not an attribute",
                self.name
            )));
        }
        Ok(())
    }

    /// Parses and validates a spec from JSON.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::InvalidParameters` on parse or validation failure.
    pub fn from_json_str(content: &str) -> Result<Self, ReconcileError> {
        let spec: Self = serde_json::from_str(content).map_err(|e| {
            ReconcileError::invalid_parameters(format!("invalid resource spec: {e}"))
        })?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parses and validates a spec from TOML.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::InvalidParameters` on parse or validation failure.
    pub fn from_toml_str(content: &str) -> Result<Self, ReconcileError> {
        let spec: Self = toml::from_str(content).map_err(|e| {
            ReconcileError::invalid_parameters(format!("invalid resource spec: {e}"))
        })?;
        spec.validate()?;
        Ok(spec)
    }

    /// IPAM route target.
    #[must_use]
    pub fn route_target() -> Self {
        Self::new("route_target", "ipam/route-targets")
            .with_natural_key(&["name"])
            .with_attribute(AttributeSpec::scalar("name").required())
            .with_attribute(AttributeSpec::reference("tenant", "tenancy/tenants"))
            .with_attribute(AttributeSpec::scalar("description"))
            .with_attribute(AttributeSpec::reference_list("tags", "extras/tags"))
            .with_attribute(AttributeSpec::map("custom_fields"))
    }

    /// IPAM VRF. Its import/export targets reference route targets.
    #[must_use]
    pub fn vrf() -> Self {
        Self::new("vrf", "ipam/vrfs")
            .with_natural_key(&["name", "rd"])
            .with_attribute(AttributeSpec::scalar("name").required())
            .with_attribute(AttributeSpec::scalar("rd"))
            .with_attribute(AttributeSpec::reference("tenant", "tenancy/tenants"))
            .with_attribute(AttributeSpec::scalar("enforce_unique"))
            .with_attribute(AttributeSpec::scalar("description"))
            .with_attribute(AttributeSpec::reference_list(
                "import_targets",
                "ipam/route-targets",
            ))
            .with_attribute(AttributeSpec::reference_list(
                "export_targets",
                "ipam/route-targets",
            ))
            .with_attribute(AttributeSpec::reference_list("tags", "extras/tags"))
            .with_attribute(AttributeSpec::map("custom_fields"))
    }

    /// Tenancy tenant.
    #[must_use]
    pub fn tenant() -> Self {
        Self::new("tenant", "tenancy/tenants")
            .with_natural_key(&["name"])
            .with_attribute(AttributeSpec::scalar("name").required())
            .with_attribute(AttributeSpec::scalar("description"))
            .with_attribute(AttributeSpec::scalar("comments"))
            .with_attribute(AttributeSpec::reference_list("tags", "extras/tags"))
            .with_attribute(AttributeSpec::map("custom_fields"))
    }

    /// Extras tag.
    #[must_use]
    pub fn tag() -> Self {
        Self::new("tag", "extras/tags")
            .with_natural_key(&["name"])
            .with_attribute(AttributeSpec::scalar("name").required())
            .with_attribute(AttributeSpec::scalar("color"))
            .with_attribute(AttributeSpec::scalar("description"))
            .with_attribute(AttributeSpec::map("custom_fields"))
    }
}

/// Resource kinds known by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    specs: BTreeMap<String, ResourceSpec>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in resource kinds.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for spec in [
            ResourceSpec::route_target(),
            ResourceSpec::vrf(),
            ResourceSpec::tenant(),
            ResourceSpec::tag(),
        ] {
            registry.specs.insert(spec.name.clone(), spec);
        }
        registry
    }

    /// Adds or replaces a spec after validating it.
    ///
    /// # Errors
    ///
    /// Returns the validation error of an inconsistent spec.
    pub fn register(&mut self, spec: ResourceSpec) -> Result<(), ReconcileError> {
        spec.validate()?;
        self.specs.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Looks up a spec by kind name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceSpec> {
        self.specs.get(name)
    }

    /// Iterates specs in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceSpec> {
        self.specs.values()
    }

    /// Kind names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }
}
