//! # nautobot-reconcile
//!
//! Declarative state reconciliation for Nautobot resources.
//!
//! The caller describes how an object should look (or that it should not
//! exist); the engine reads the remote state through a [`Transport`], decides
//! on at most one write, issues it, and reports what happened.
//!
//! ## Overview
//!
//! A run is made of these steps:
//! - [`ReferenceResolver`] turns names and filters into identifiers
//! - [`LookupEngine`] finds the existing object by its natural key
//! - [`normalize_desired`] and [`normalize_remote`] put both sides into a
//!   comparable shape, and [`diff`] computes the changed fields
//! - [`Reconciler`] decides and executes, returning an [`Outcome`]
//!
//! Resource kinds are data: a [`ResourceSpec`] names the endpoint, the
//! natural key and the attributes. [`Registry::builtin`] carries the
//! route target kind and the kinds it references.
//!
//! ## Example
//!
//! ```ignore
//! use nautobot_reconcile::{DesiredState, Reconciler, ResourceSpec};
//! use serde_json::json;
//!
//! async fn ensure_route_target(transport: &dyn Transport) -> ReconcileResult<bool> {
//!     let spec = ResourceSpec::route_target();
//!     let data = json!({"name": "65000:65001", "tenant": "Test Tenant"});
//!     let desired = DesiredState::present(&spec, data.as_object().cloned().unwrap_or_default())?;
//!     let outcome = Reconciler::new(transport, &spec).reconcile(&desired).await?;
//!     Ok(outcome.changed)
//! }
//! ```
//!
//! ## Transports
//!
//! To talk to a service, implement the [`Transport`] trait:
//!
//! ```ignore
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn query(&self, endpoint: &str, filter: &Filter) -> Result<Vec<RemoteObject>, TransportError> {
//!         // Implementation
//!     }
//!     // ... other methods
//! }
//! ```

mod diff;
mod error;
mod lookup;
mod normalize;
mod object;
mod params;
mod reconciler;
mod reference;
mod report;
mod spec;
mod transport;

pub use diff::{ChangeSet, FieldChange, diff};
pub use error::{ErrorCategory, NON_FIELD_ERRORS, Operation, ReconcileError, TransportError};
pub use lookup::LookupEngine;
pub use normalize::{Normalized, NormalizedAttributes, merge_maps, normalize_desired, normalize_remote};
pub use object::RemoteObject;
pub use params::{DesiredState, Parameters, TargetState};
pub use reconciler::{Phase, Reconciler, decide};
pub use reference::{ReferenceResolver, ReferenceToken, ResolvedReference};
pub use report::{Action, Diff, Outcome, Reporter, serialize_object};
pub use spec::{AttributeKind, AttributeSpec, Registry, ResourceSpec};
pub use transport::{Filter, Transport};

/// Type alias for a reconciliation result.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use nautobot_reconcile::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ReconcileError, TransportError};
    pub use crate::object::RemoteObject;
    pub use crate::params::{DesiredState, Parameters, TargetState};
    pub use crate::reconciler::Reconciler;
    pub use crate::report::{Action, Outcome};
    pub use crate::spec::{Registry, ResourceSpec};
    pub use crate::transport::{Filter, Transport};
    pub use crate::ReconcileResult;
}
