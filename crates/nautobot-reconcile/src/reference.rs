//! Reference resolution.
//!
//! Reference attributes accept either a canonical identifier or a symbolic
//! token. Tokens are resolved here, once, before anything is compared or
//! written; the rest of the engine only ever sees identifiers.
//!
//! # Token forms
//!
//! - Identifier: a JSON number, or a string that parses as a UUID in any of
//!   its spellings; stored in the lowercase hyphenated form the service returns
//! - Name: any other string, matched against the spec's lookup field
//! - Filter: a JSON object, used verbatim as the query filter

use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Operation, ReconcileError};
use crate::spec::{AttributeKind, ResourceSpec};
use crate::transport::{Filter, Transport};

/// A symbolic or canonical reference as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceToken {
    /// Already canonical; passes through without a remote call.
    Identifier(String),
    /// Matched against the referenced kind's lookup field.
    Name(String),
    /// Used verbatim as a query filter.
    Filter(Map<String, Value>),
}

impl ReferenceToken {
    /// Classifies a caller value.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` for booleans, arrays, null, empty strings
    /// and empty mappings.
    pub fn parse(field: &str, value: &Value) -> Result<Self, ReconcileError> {
        match value {
            Value::Number(n) => Ok(Self::Identifier(n.to_string())),
            Value::String(s) if s.is_empty() => Err(ReconcileError::invalid_parameters(format!(
                "{field} must not be an empty string"
            ))),
            Value::String(s) => match uuid::Uuid::parse_str(s) {
                Ok(id) => Ok(Self::Identifier(id.hyphenated().to_string())),
                Err(_) => Ok(Self::Name(s.clone())),
            },
            Value::Object(map) if !map.is_empty() => Ok(Self::Filter(map.clone())),
            _ => Err(ReconcileError::invalid_parameters(format!(
                "{field} must be an identifier, a name or a filter mapping"
            ))),
        }
    }

    /// Returns `true` if no lookup is needed.
    #[must_use]
    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::Identifier(_))
    }

    /// The filter a non-identifier token is looked up with.
    #[must_use]
    pub fn to_filter(&self, lookup_field: &str) -> Filter {
        match self {
            Self::Identifier(id) => {
                let mut filter = Filter::new();
                filter.insert("id".to_string(), Value::String(id.clone()));
                filter
            }
            Self::Name(name) => {
                let mut filter = Filter::new();
                filter.insert(lookup_field.to_string(), Value::String(name.clone()));
                filter
            }
            Self::Filter(map) => map.clone(),
        }
    }
}

impl fmt::Display for ReferenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name:?}"),
            Self::Filter(map) => write!(f, "{}", Value::Object(map.clone())),
        }
    }
}

/// A canonical identifier understood by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolvedReference(String);

impl ResolvedReference {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the reference, returning the identifier.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns reference tokens into identifiers through the transport.
pub struct ReferenceResolver<'a> {
    transport: &'a dyn Transport,
}

impl<'a> ReferenceResolver<'a> {
    /// Creates a resolver reading through `transport`.
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Resolves one token for attribute `field`.
    ///
    /// Identifiers pass through without a remote call. Anything else costs one
    /// filtered read and must match exactly one object.
    ///
    /// # Errors
    ///
    /// `ReferenceNotFound` on zero matches, `AmbiguousReference` on more than
    /// one, `Transport` if the read fails.
    pub async fn resolve(
        &self,
        field: &str,
        endpoint: &str,
        lookup_field: &str,
        token: &ReferenceToken,
    ) -> Result<ResolvedReference, ReconcileError> {
        if let ReferenceToken::Identifier(id) = token {
            return Ok(ResolvedReference::new(id.clone()));
        }

        let filter = token.to_filter(lookup_field);
        debug!(field, endpoint, token = %token, "Resolving reference");
        let mut matches = self
            .transport
            .query(endpoint, &filter)
            .await
            .map_err(|e| {
                ReconcileError::from_transport(Operation::Resolve, endpoint, e).with_field(field)
            })?;

        match matches.len() {
            0 => Err(ReconcileError::reference_not_found(
                field,
                endpoint,
                token.to_string(),
            )),
            1 => Ok(ResolvedReference::new(matches.remove(0).id)),
            n => Err(ReconcileError::ambiguous_reference(
                field,
                endpoint,
                token.to_string(),
                n,
            )),
        }
    }

    /// Returns a copy of `data` with every reference attribute replaced by
    /// identifiers: a string for a single reference, an array of strings for a
    /// reference list. Other attributes are copied unchanged.
    ///
    /// # Errors
    ///
    /// The first resolution failure, before any further reads.
    pub async fn resolve_all(
        &self,
        spec: &ResourceSpec,
        data: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ReconcileError> {
        let mut resolved = Map::new();
        for (name, value) in data {
            let Some(attribute) = spec.attribute(name) else {
                resolved.insert(name.clone(), value.clone());
                continue;
            };
            let Some((endpoint, lookup_field)) = attribute.kind.reference_target() else {
                resolved.insert(name.clone(), value.clone());
                continue;
            };
            let value = if matches!(attribute.kind, AttributeKind::ReferenceList { .. }) {
                let items = match value {
                    Value::Array(items) => items.as_slice(),
                    single => std::slice::from_ref(single),
                };
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    let token = ReferenceToken::parse(name, item)?;
                    let id = self.resolve(name, endpoint, lookup_field, &token).await?;
                    ids.push(Value::String(id.into_inner()));
                }
                Value::Array(ids)
            } else {
                let token = ReferenceToken::parse(name, value)?;
                let id = self.resolve(name, endpoint, lookup_field, &token).await?;
                Value::String(id.into_inner())
            };
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }
}
