//! Shared test support: an in-memory transport that records every call.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use nautobot_reconcile::{Filter, RemoteObject, Transport, TransportError};
use serde_json::{Map, Value, json};

/// One recorded transport call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query {
        endpoint: String,
        filter: Filter,
    },
    Create {
        endpoint: String,
        payload: Map<String, Value>,
    },
    Update {
        endpoint: String,
        id: String,
        payload: Map<String, Value>,
    },
    Delete {
        endpoint: String,
        id: String,
    },
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Query { .. })
    }
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, Vec<RemoteObject>>,
    calls: Vec<Call>,
    next_id: u64,
    rejection: Option<(String, String)>,
    read_failure: Option<String>,
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("00000000-0000-4000-8000-{:012}", self.next_id)
    }
}

/// Transport backed by per-endpoint object lists.
#[derive(Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object as-is and returns its id. An object without an `id`
    /// gets one assigned.
    pub fn seed(&self, endpoint: &str, value: Value) -> String {
        let mut state = self.state.lock().unwrap();
        let mut value = value;
        if value.get("id").is_none() {
            let id = state.allocate_id();
            value["id"] = Value::String(id);
        }
        let object = RemoteObject::from_value(value).unwrap();
        let id = object.id.clone();
        state
            .objects
            .entry(endpoint.to_string())
            .or_default()
            .push(object);
        id
    }

    /// Makes every create and update fail with a field validation error.
    pub fn reject_writes(&self, field: &str, message: &str) {
        self.state.lock().unwrap().rejection = Some((field.to_string(), message.to_string()));
    }

    /// Makes every query fail with a connection error.
    pub fn fail_reads(&self, message: &str) {
        self.state.lock().unwrap().read_failure = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn query_count(&self) -> usize {
        self.calls().iter().filter(|c| !c.is_write()).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn objects(&self, endpoint: &str) -> Vec<RemoteObject> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(endpoint)
            .cloned()
            .unwrap_or_default()
    }
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("id").and_then(identifier),
        _ => None,
    }
}

fn field_matches(stored: Option<&Value>, wanted: &Value) -> bool {
    if let Value::Array(options) = wanted {
        return options.iter().any(|w| field_matches(stored, w));
    }
    let Some(stored) = stored else {
        return false;
    };
    if stored == wanted {
        return true;
    }
    let wanted_id = identifier(wanted);
    match stored {
        Value::Array(items) => items.iter().any(|item| identifier(item) == wanted_id),
        other => wanted_id.is_some() && identifier(other) == wanted_id,
    }
}

fn object_matches(object: &RemoteObject, filter: &Filter) -> bool {
    filter.iter().all(|(field, wanted)| {
        if field == "id" {
            return identifier(wanted).as_deref() == Some(object.id.as_str());
        }
        field_matches(object.get(field), wanted)
    })
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn query(
        &self,
        endpoint: &str,
        filter: &Filter,
    ) -> Result<Vec<RemoteObject>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Query {
            endpoint: endpoint.to_string(),
            filter: filter.clone(),
        });
        if let Some(message) = &state.read_failure {
            return Err(TransportError::connection(message.clone()));
        }
        Ok(state
            .objects
            .get(endpoint)
            .map(|objects| {
                objects
                    .iter()
                    .filter(|o| object_matches(o, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(
        &self,
        endpoint: &str,
        attributes: &Map<String, Value>,
    ) -> Result<RemoteObject, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create {
            endpoint: endpoint.to_string(),
            payload: attributes.clone(),
        });
        if let Some((field, message)) = &state.rejection {
            return Err(TransportError::field_rejected(field.clone(), message.clone()));
        }
        let id = state.allocate_id();
        let object = RemoteObject::new(id, attributes.clone());
        state
            .objects
            .entry(endpoint.to_string())
            .or_default()
            .push(object.clone());
        Ok(object)
    }

    async fn update(
        &self,
        endpoint: &str,
        id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<RemoteObject, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update {
            endpoint: endpoint.to_string(),
            id: id.to_string(),
            payload: attributes.clone(),
        });
        if let Some((field, message)) = &state.rejection {
            return Err(TransportError::field_rejected(field.clone(), message.clone()));
        }
        let object = state
            .objects
            .get_mut(endpoint)
            .and_then(|objects| objects.iter_mut().find(|o| o.id == id))
            .ok_or_else(|| TransportError::not_found(endpoint, id))?;
        for (key, value) in attributes {
            object.attributes.insert(key.clone(), value.clone());
        }
        Ok(object.clone())
    }

    async fn delete(&self, endpoint: &str, id: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Delete {
            endpoint: endpoint.to_string(),
            id: id.to_string(),
        });
        let objects = state.objects.entry(endpoint.to_string()).or_default();
        let before = objects.len();
        objects.retain(|o| o.id != id);
        if objects.len() == before {
            return Err(TransportError::not_found(endpoint, id));
        }
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "memory"
    }
}

pub const TENANTS: &str = "tenancy/tenants";
pub const TAGS: &str = "extras/tags";
pub const ROUTE_TARGETS: &str = "ipam/route-targets";
pub const VRFS: &str = "ipam/vrfs";

/// A transport holding the tenant "Test Tenant" and the tag "Schnozzberry".
/// Returns the transport with both ids.
pub fn seeded() -> (MemoryTransport, String, String) {
    let transport = MemoryTransport::new();
    let tenant = transport.seed(TENANTS, json!({"name": "Test Tenant", "slug": "test-tenant"}));
    let tag = transport.seed(TAGS, json!({"name": "Schnozzberry", "color": "9e9e9e"}));
    (transport, tenant, tag)
}

/// Builds a JSON object map.
pub fn data(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}
