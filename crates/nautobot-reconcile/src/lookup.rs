//! Natural-key lookup of the existing remote object.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Operation, ReconcileError};
use crate::object::RemoteObject;
use crate::spec::ResourceSpec;
use crate::transport::{Filter, Transport};

/// Finds the remote object a desired state refers to.
pub struct LookupEngine<'a> {
    transport: &'a dyn Transport,
}

impl<'a> LookupEngine<'a> {
    /// Creates a lookup engine reading through `transport`.
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Builds the lookup filter from resolved desired attributes.
    ///
    /// The fields are `query_params` when given, the spec's natural key
    /// otherwise. Fields without a desired value are skipped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameters` if no field has a value.
    pub fn build_filter(
        spec: &ResourceSpec,
        resolved: &Map<String, Value>,
        query_params: Option<&[String]>,
    ) -> Result<Filter, ReconcileError> {
        let fields = query_params.unwrap_or(spec.natural_key.as_slice());
        let filter: Filter = fields
            .iter()
            .filter_map(|field| {
                resolved
                    .get(field)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect();
        if filter.is_empty() {
            return Err(ReconcileError::invalid_parameters(format!(
                "none of the lookup fields [{}] of {} has a value",
                fields.join(", "),
                spec.name
            )));
        }
        Ok(filter)
    }

    /// Queries for `filter` and returns the single match, if any.
    ///
    /// # Errors
    ///
    /// `AmbiguousLookup` when more than one object matches; the first result
    /// is never picked. `Transport` if the read fails.
    pub async fn find(
        &self,
        spec: &ResourceSpec,
        filter: &Filter,
    ) -> Result<Option<RemoteObject>, ReconcileError> {
        let rendered = Value::Object(filter.clone()).to_string();
        debug!(
            resource_kind = %spec.name,
            filter = %rendered,
            "Looking up existing object"
        );
        let mut matches = self
            .transport
            .query(&spec.endpoint, filter)
            .await
            .map_err(|e| ReconcileError::from_transport(Operation::Lookup, &spec.name, e))?;

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(ReconcileError::ambiguous_lookup(
                &spec.name,
                rendered,
                n,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use serde_json::json;

    /// Answers every query with the same records.
    struct Fixed(Vec<RemoteObject>);

    #[async_trait]
    impl Transport for Fixed {
        async fn query(&self, _: &str, _: &Filter) -> Result<Vec<RemoteObject>, TransportError> {
            Ok(self.0.clone())
        }
        async fn create(
            &self,
            _: &str,
            _: &Map<String, Value>,
        ) -> Result<RemoteObject, TransportError> {
            Err(TransportError::connection("read only"))
        }
        async fn update(
            &self,
            _: &str,
            _: &str,
            _: &Map<String, Value>,
        ) -> Result<RemoteObject, TransportError> {
            Err(TransportError::connection("read only"))
        }
        async fn delete(&self, _: &str, _: &str) -> Result<(), TransportError> {
            Err(TransportError::connection("read only"))
        }
        fn transport_name(&self) -> &'static str {
            "fixed"
        }
    }

    fn route_target(id: &str) -> RemoteObject {
        RemoteObject::new(id, map(json!({"name": "65000:65001"})))
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_from_natural_key() {
        let spec = ResourceSpec::route_target();
        let filter = LookupEngine::build_filter(
            &spec,
            &map(json!({"name": "65000:65001", "description": "x"})),
            None,
        )
        .unwrap();
        assert_eq!(filter, map(json!({"name": "65000:65001"})));
    }

    #[test]
    fn test_filter_skips_missing_key_fields() {
        let spec = ResourceSpec::vrf();
        let filter =
            LookupEngine::build_filter(&spec, &map(json!({"name": "blue"})), None).unwrap();
        assert_eq!(filter, map(json!({"name": "blue"})));
    }

    #[test]
    fn test_query_params_override() {
        let spec = ResourceSpec::route_target();
        let fields = vec!["name".to_string(), "tenant".to_string()];
        let filter = LookupEngine::build_filter(
            &spec,
            &map(json!({"name": "x", "tenant": "t-1"})),
            Some(fields.as_slice()),
        )
        .unwrap();
        assert_eq!(filter, map(json!({"name": "x", "tenant": "t-1"})));
    }

    #[test]
    fn test_find_single_match() {
        let spec = ResourceSpec::route_target();
        let transport = Fixed(vec![route_target("rt-1")]);
        let filter = map(json!({"name": "65000:65001"}));
        let found = tokio_test::block_on(LookupEngine::new(&transport).find(&spec, &filter))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "rt-1");

        let empty = Fixed(Vec::new());
        assert!(
            tokio_test::block_on(LookupEngine::new(&empty).find(&spec, &filter))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_find_reports_rendered_filter_when_ambiguous() {
        let spec = ResourceSpec::route_target();
        let transport = Fixed(vec![route_target("rt-1"), route_target("rt-2")]);
        let filter = map(json!({"name": "65000:65001"}));
        let err = tokio_test::block_on(LookupEngine::new(&transport).find(&spec, &filter))
            .unwrap_err();
        match err {
            ReconcileError::AmbiguousLookup {
                filter, matches, ..
            } => {
                assert_eq!(filter, r#"{"name":"65000:65001"}"#);
                assert_eq!(matches, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_filter_is_error() {
        let spec = ResourceSpec::route_target();
        let fields = vec!["tenant".to_string()];
        let result =
            LookupEngine::build_filter(&spec, &map(json!({"name": "x"})), Some(fields.as_slice()));
        assert!(matches!(
            result,
            Err(ReconcileError::InvalidParameters { .. })
        ));
    }
}
