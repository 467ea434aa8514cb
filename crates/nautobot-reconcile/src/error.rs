//! Error types for the reconciliation engine.
//!
//! [`TransportError`] is what a [`Transport`](crate::Transport) implementation
//! reports; [`ReconcileError`] is what a reconciliation run returns. Every
//! variant of [`ReconcileError`] is terminal for the current invocation.

use std::collections::BTreeMap;
use std::fmt;

/// Key under which a remote service reports errors that are not tied to a field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Errors reported by the transport collaborator.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote service could not be reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The request did not complete in time.
    #[error("Request timed out: {message}")]
    Timeout {
        /// Description of the timed-out request.
        message: String,
    },

    /// The credentials were missing, invalid or lacked permission.
    #[error("Unauthorized (HTTP {status}): {message}")]
    Unauthorized {
        /// HTTP status returned by the service.
        status: u16,
        /// Error detail returned by the service.
        message: String,
    },

    /// The remote service refused the payload.
    #[error("Validation failed (HTTP {status}): {}", format_field_errors(.errors))]
    Validation {
        /// HTTP status returned by the service.
        status: u16,
        /// Messages keyed by the rejected attribute.
        errors: BTreeMap<String, Vec<String>>,
    },

    /// The addressed object does not exist.
    #[error("Not found: {endpoint}/{id}")]
    NotFound {
        /// API endpoint of the resource kind.
        endpoint: String,
        /// Identifier that was addressed.
        id: String,
    },

    /// Any other unsuccessful response.
    #[error("Remote error (HTTP {status}): {body}")]
    Remote {
        /// HTTP status returned by the service.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The response could not be decoded.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },
}

impl TransportError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(status: u16, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            status,
            message: message.into(),
        }
    }

    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(status: u16, errors: BTreeMap<String, Vec<String>>) -> Self {
        Self::Validation { status, errors }
    }

    /// Creates a `Validation` error for a single field.
    #[must_use]
    pub fn field_rejected(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(field.into(), vec![message.into()]);
        Self::Validation {
            status: 400,
            errors,
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(endpoint: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            endpoint: endpoint.into(),
            id: id.into(),
        }
    }

    /// Creates a new `Remote` error.
    #[must_use]
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        Self::Remote {
            status,
            body: body.into(),
        }
    }

    /// Creates a new `Decode` error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns `true` if the request timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

fn format_field_errors(errors: &BTreeMap<String, Vec<String>>) -> String {
    if errors.is_empty() {
        return "no details".to_string();
    }
    errors
        .iter()
        .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// The remote call a [`ReconcileError::Transport`] failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Reference resolution read.
    Resolve,
    /// Natural-key lookup read.
    Lookup,
    /// Create write.
    Create,
    /// Update write.
    Update,
    /// Delete write.
    Delete,
}

impl Operation {
    /// Returns `true` for create, update and delete.
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => write!(f, "resolve"),
            Self::Lookup => write!(f, "lookup"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Errors that terminate a reconciliation run.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The caller's parameters cannot be turned into a desired state.
    #[error("Invalid parameters: {message}")]
    InvalidParameters {
        /// Description of the problem.
        message: String,
    },

    /// The caller supplied an attribute the resource kind does not recognise.
    #[error("Unknown attribute '{attribute}' for {resource_kind}")]
    UnknownAttribute {
        /// Resource kind being reconciled.
        resource_kind: String,
        /// The unrecognised attribute name.
        attribute: String,
    },

    /// A reference token matched no remote object.
    #[error("Could not resolve id of {field}: no {endpoint} object matches {token}")]
    ReferenceNotFound {
        /// Attribute holding the token.
        field: String,
        /// Endpoint the token was looked up in.
        endpoint: String,
        /// The token as given.
        token: String,
    },

    /// A reference token matched more than one remote object.
    #[error("Could not resolve id of {field}: {matches} {endpoint} objects match {token}")]
    AmbiguousReference {
        /// Attribute holding the token.
        field: String,
        /// Endpoint the token was looked up in.
        endpoint: String,
        /// The token as given.
        token: String,
        /// Number of matching objects.
        matches: usize,
    },

    /// More than one remote object matches the natural key.
    #[error("More than one result returned for {resource_kind} {filter}: {matches} matches")]
    AmbiguousLookup {
        /// Resource kind being reconciled.
        resource_kind: String,
        /// The lookup filter, rendered as JSON.
        filter: String,
        /// Number of matching objects.
        matches: usize,
    },

    /// The remote service refused a write.
    #[error("{resource_kind} rejected by remote validation{}: {message}", field_suffix(.field))]
    ValidationRejected {
        /// Resource kind being reconciled.
        resource_kind: String,
        /// First attribute named by the remote service, if any.
        field: Option<String>,
        /// The service's messages.
        message: String,
    },

    /// A remote call failed for a reason other than validation.
    #[error("{operation} failed{}: {source}", field_suffix(.field))]
    Transport {
        /// The call that failed.
        operation: Operation,
        /// Attribute whose reference was being resolved, if any.
        field: Option<String>,
        /// The transport's error.
        #[source]
        source: TransportError,
    },
}

fn field_suffix(field: &Option<String>) -> String {
    match field {
        Some(field) => format!(" on '{field}'"),
        None => String::new(),
    }
}

impl ReconcileError {
    /// Creates a new `InvalidParameters` error.
    #[must_use]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Creates a new `UnknownAttribute` error.
    #[must_use]
    pub fn unknown_attribute(resource_kind: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            resource_kind: resource_kind.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates a new `ReferenceNotFound` error.
    #[must_use]
    pub fn reference_not_found(
        field: impl Into<String>,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self::ReferenceNotFound {
            field: field.into(),
            endpoint: endpoint.into(),
            token: token.into(),
        }
    }

    /// Creates a new `AmbiguousReference` error.
    #[must_use]
    pub fn ambiguous_reference(
        field: impl Into<String>,
        endpoint: impl Into<String>,
        token: impl Into<String>,
        matches: usize,
    ) -> Self {
        Self::AmbiguousReference {
            field: field.into(),
            endpoint: endpoint.into(),
            token: token.into(),
            matches,
        }
    }

    /// Creates a new `AmbiguousLookup` error.
    #[must_use]
    pub fn ambiguous_lookup(
        resource_kind: impl Into<String>,
        filter: impl Into<String>,
        matches: usize,
    ) -> Self {
        Self::AmbiguousLookup {
            resource_kind: resource_kind.into(),
            filter: filter.into(),
            matches,
        }
    }

    /// Wraps a transport failure, turning validation refusals of writes into
    /// [`ReconcileError::ValidationRejected`].
    #[must_use]
    pub fn from_transport(
        operation: Operation,
        resource_kind: &str,
        source: TransportError,
    ) -> Self {
        match source {
            TransportError::Validation { errors, .. } if operation.is_write() => {
                let field = errors
                    .keys()
                    .find(|k| k.as_str() != NON_FIELD_ERRORS && k.as_str() != "detail")
                    .cloned();
                Self::ValidationRejected {
                    resource_kind: resource_kind.to_string(),
                    field,
                    message: format_field_errors(&errors),
                }
            }
            source => Self::Transport {
                operation,
                field: None,
                source,
            },
        }
    }

    /// Names the attribute a `Transport` error was raised for. Other variants
    /// are returned unchanged.
    #[must_use]
    pub fn with_field(self, field: impl Into<String>) -> Self {
        match self {
            Self::Transport {
                operation, source, ..
            } => Self::Transport {
                operation,
                field: Some(field.into()),
                source,
            },
            other => other,
        }
    }

    /// Returns `true` if a reference token could not be resolved.
    #[must_use]
    pub fn is_reference_not_found(&self) -> bool {
        matches!(self, Self::ReferenceNotFound { .. })
    }

    /// Returns `true` for both ambiguity errors.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousReference { .. } | Self::AmbiguousLookup { .. }
        )
    }

    /// Returns `true` if the remote service refused a write.
    #[must_use]
    pub fn is_validation_rejected(&self) -> bool {
        matches!(self, Self::ValidationRejected { .. })
    }

    /// Returns the error category for logging.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidParameters { .. } | Self::UnknownAttribute { .. } => {
                ErrorCategory::InvalidInput
            }
            Self::ReferenceNotFound { .. } => ErrorCategory::NotFound,
            Self::AmbiguousReference { .. } | Self::AmbiguousLookup { .. } => {
                ErrorCategory::Ambiguous
            }
            Self::ValidationRejected { .. } => ErrorCategory::Validation,
            Self::Transport { .. } => ErrorCategory::Transport,
        }
    }
}

/// Categories of reconciliation errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller input problem.
    InvalidInput,
    /// A reference did not resolve.
    NotFound,
    /// A query matched more than one object.
    Ambiguous,
    /// The remote service refused a write.
    Validation,
    /// Network, authentication or timeout failure.
    Transport,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput => write!(f, "invalid_input"),
            Self::NotFound => write!(f, "not_found"),
            Self::Ambiguous => write!(f, "ambiguous"),
            Self::Validation => write!(f, "validation"),
            Self::Transport => write!(f, "transport"),
        }
    }
}
