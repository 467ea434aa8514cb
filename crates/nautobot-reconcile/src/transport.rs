//! The transport capability the engine talks to the remote service through.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::object::RemoteObject;

/// A query filter: field name to value. Array values mean "any of".
///
/// `serde_json::Map` keeps keys sorted, so filters render deterministically.
pub type Filter = Map<String, Value>;

/// Remote CRUD and query operations, keyed by a resource kind's API endpoint.
///
/// Implementations own authentication, timeouts and retries. The engine calls
/// each method at most once per step and never retries a failure.
///
/// # Example
///
/// ```ignore
/// use nautobot_reconcile::{Filter, Transport, TransportError};
///
/// async fn count_route_targets(transport: &dyn Transport) -> Result<usize, TransportError> {
///     Ok(transport.query("ipam/route-targets", &Filter::new()).await?.len())
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns every object of the endpoint matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error for network, authentication or decoding failures.
    async fn query(&self, endpoint: &str, filter: &Filter)
    -> Result<Vec<RemoteObject>, TransportError>;

    /// Creates an object and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Validation` if the service refuses the payload.
    async fn create(
        &self,
        endpoint: &str,
        attributes: &Map<String, Value>,
    ) -> Result<RemoteObject, TransportError>;

    /// Partially updates an object with `attributes` and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Validation` if the service refuses the payload
    /// and `TransportError::NotFound` if the object no longer exists.
    async fn update(
        &self,
        endpoint: &str,
        id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<RemoteObject, TransportError>;

    /// Deletes an object.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotFound` if the object no longer exists.
    async fn delete(&self, endpoint: &str, id: &str) -> Result<(), TransportError>;

    /// Returns the name of this transport for logging.
    fn transport_name(&self) -> &'static str;
}
