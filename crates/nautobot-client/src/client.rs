use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use nautobot_reconcile::{Filter, NON_FIELD_ERRORS, RemoteObject, Transport, TransportError};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::{Origin, Url};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// One page of a list response.
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    next: Option<String>,
    results: Vec<Value>,
}

/// [`Transport`] over the Nautobot REST API.
#[derive(Debug, Clone)]
pub struct NautobotClient {
    http: reqwest::Client,
    api_base: String,
    origin: Origin,
    token: String,
    page_size: u32,
}

impl NautobotClient {
    /// Builds a client from validated settings.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidConfig` for unusable settings and
    /// `ClientError::Build` if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base = config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.validate_certs)
            .user_agent(concat!("nbstate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let api_base = format!("{}/api/", base.as_str().trim_end_matches('/'));

        Ok(Self {
            http,
            api_base,
            origin: base.origin(),
            token: config.token.trim().to_string(),
            page_size: config.page_size,
        })
    }

    /// Root of the REST API, ending in `/api/`.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{}/", self.api_base, endpoint.trim_matches('/'))
    }

    fn object_url(&self, endpoint: &str, id: &str) -> String {
        format!("{}{}/", self.endpoint_url(endpoint), id)
    }

    /// Checks a pagination link before the token is sent to it.
    fn next_page(&self, next: &str) -> Result<Url, TransportError> {
        let url = Url::parse(next)
            .map_err(|e| TransportError::decode(format!("invalid next link {next}: {e}")))?;
        if url.origin() != self.origin {
            return Err(TransportError::decode(format!(
                "next link {next} leaves {}",
                self.origin.ascii_serialization()
            )));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!(method = %method, url = %url, "Nautobot request");
        self.http
            .request(method, url)
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
    }

    async fn send(
        &self,
        request: RequestBuilder,
        endpoint: &str,
        id: &str,
    ) -> Result<Response, TransportError> {
        let response = request.send().await.map_err(request_error)?;
        check_status(response, endpoint, id).await
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: &str,
        id: &str,
    ) -> Result<T, TransportError> {
        let response = self.send(request, endpoint, id).await?;
        let body = response.text().await.map_err(request_error)?;
        serde_json::from_str(&body)
            .map_err(|e| TransportError::decode(format!("invalid response from {endpoint}: {e}")))
    }
}

#[async_trait]
impl Transport for NautobotClient {
    async fn query(
        &self,
        endpoint: &str,
        filter: &Filter,
    ) -> Result<Vec<RemoteObject>, TransportError> {
        let mut params = query_pairs(filter);
        params.push(("limit".to_string(), self.page_size.to_string()));

        let mut request = self
            .request(Method::GET, &self.endpoint_url(endpoint))
            .query(&params);
        let mut objects = Vec::new();
        let mut followed = BTreeSet::new();
        loop {
            let page: Page = self.send_json(request, endpoint, "").await?;
            for value in page.results {
                objects.push(RemoteObject::from_value(value)?);
            }
            let Some(next) = page.next else { break };
            let url = self.next_page(&next)?;
            if !followed.insert(url.to_string()) {
                warn!(endpoint, next = %url, "Pagination link repeats, stopping");
                break;
            }
            request = self.request(Method::GET, url.as_str());
        }
        debug!(endpoint, matches = objects.len(), "Query finished");
        Ok(objects)
    }

    async fn create(
        &self,
        endpoint: &str,
        attributes: &Map<String, Value>,
    ) -> Result<RemoteObject, TransportError> {
        let request = self
            .request(Method::POST, &self.endpoint_url(endpoint))
            .json(attributes);
        let value: Value = self.send_json(request, endpoint, "").await?;
        RemoteObject::from_value(value)
    }

    async fn update(
        &self,
        endpoint: &str,
        id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<RemoteObject, TransportError> {
        let request = self
            .request(Method::PATCH, &self.object_url(endpoint, id))
            .json(attributes);
        let value: Value = self.send_json(request, endpoint, id).await?;
        RemoteObject::from_value(value)
    }

    async fn delete(&self, endpoint: &str, id: &str) -> Result<(), TransportError> {
        let request = self.request(Method::DELETE, &self.object_url(endpoint, id));
        self.send(request, endpoint, id).await?;
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "nautobot"
    }
}

/// Filter as query pairs; list values repeat the key.
fn query_pairs(filter: &Filter) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(filter.len());
    for (key, value) in filter {
        match value {
            Value::Array(items) => {
                pairs.extend(items.iter().map(|item| (key.clone(), param_value(item))));
            }
            other => pairs.push((key.clone(), param_value(other))),
        }
    }
    pairs
}

fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::timeout(err.to_string())
    } else if err.is_decode() {
        TransportError::decode(err.to_string())
    } else {
        TransportError::connection(err.to_string())
    }
}

async fn check_status(
    response: Response,
    endpoint: &str,
    id: &str,
) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let code = status.as_u16();
    let body = response.text().await.unwrap_or_default();
    debug!(status = code, endpoint, "Nautobot request failed");

    Err(match code {
        400 => TransportError::validation(code, field_errors(&body)),
        401 | 403 => TransportError::unauthorized(code, detail(&body)),
        404 => TransportError::not_found(endpoint, id),
        _ => TransportError::remote(code, body),
    })
}

/// Parses a 400 body: an object of field -> messages, a list of messages, or
/// plain text.
fn field_errors(body: &str) -> BTreeMap<String, Vec<String>> {
    let mut errors = BTreeMap::new();
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => {
            for (field, value) in fields {
                errors.insert(field, messages(&value));
            }
        }
        Ok(Value::Array(items)) => {
            errors.insert(NON_FIELD_ERRORS.to_string(), items.iter().map(message).collect());
        }
        _ if !body.trim().is_empty() => {
            errors.insert(NON_FIELD_ERRORS.to_string(), vec![body.trim().to_string()]);
        }
        _ => {}
    }
    errors
}

fn messages(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(message).collect(),
        other => vec![message(other)],
    }
}

fn message(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
