//! HTTP transport for a Weaviate server (REST schema and object endpoints plus
//! the GraphQL query endpoint).

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use weave_core::config::{VectorDbConfig, VectorDbKind};
use weave_core::{CallContext, PropertyInfo};

use crate::backend::{classify_graphql_errors, Backend, BackendError, GetResponse, GraphQlError};
use crate::query::{self, GetQuery};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    openai_api_key: Option<String>,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            openai_api_key: None,
            timeout,
        })
    }

    pub fn from_config(db: &VectorDbConfig) -> Result<Self, BackendError> {
        let scheme = if db.kind == VectorDbKind::WeaviateCloud { "https" } else { "http" };
        Ok(Self::new(&with_scheme(&db.url, scheme), db.timeout())?
            .with_api_key(db.api_key.clone())
            .with_openai_api_key(db.openai_api_key.clone()))
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self { self.api_key = key; self }

    pub fn with_openai_api_key(mut self, key: Option<String>) -> Self { self.openai_api_key = key; self }

    pub fn base_url(&self) -> &str { &self.base_url }

    fn request(&self, method: Method, path: &str, ctx: &CallContext) -> RequestBuilder {
        let timeout = ctx.remaining().map_or(self.timeout, |left| left.min(self.timeout));
        let mut req = self.client.request(method, format!("{}{}", self.base_url, path)).timeout(timeout);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        if let Some(key) = &self.openai_api_key {
            req = req.header("X-Openai-Api-Key", key);
        }
        req
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<Response, BackendError> {
        let resp = req.send().map_err(|e| BackendError::Transport(format!("{what}: {e}")))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(BackendError::NotFound { message: format!("{what}: HTTP 404 {body}"), hint: None })
        } else {
            Err(BackendError::Other(format!("{what}: HTTP {} - {body}", status.as_u16())))
        }
    }

    fn graphql<T: DeserializeOwned>(&self, text: &str, ctx: &CallContext) -> Result<T, BackendError> {
        debug!(query = %text, "graphql request");
        let req = self.request(Method::POST, "/v1/graphql", ctx).json(&json!({ "query": text }));
        decode(self.send(req, "graphql")?)
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
    resp.json::<T>().map_err(|e| BackendError::Other(format!("failed to decode response: {e}")))
}

/// Prefix `scheme://` when `url` carries no scheme.
pub fn with_scheme(url: &str, scheme: &str) -> String {
    if url.contains("://") { url.to_string() } else { format!("{scheme}://{url}") }
}

#[derive(Deserialize)]
struct ClassWire {
    #[serde(default)]
    properties: Option<Vec<PropertyWire>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyWire {
    name: String,
    #[serde(default)]
    data_type: Vec<String>,
    #[serde(default)]
    nested_properties: Option<Vec<NestedWire>>,
}

#[derive(Deserialize)]
struct NestedWire {
    name: String,
}

#[derive(Deserialize)]
struct SchemaWire {
    #[serde(default)]
    classes: Option<Vec<ClassNameWire>>,
}

#[derive(Deserialize)]
struct ClassNameWire {
    class: String,
}

#[derive(Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    data: Option<AggregateData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct AggregateData {
    #[serde(rename = "Aggregate", default)]
    aggregate: HashMap<String, Option<Vec<AggregateGroup>>>,
}

#[derive(Deserialize)]
struct AggregateGroup {
    #[serde(default)]
    meta: Option<AggregateMeta>,
}

#[derive(Deserialize)]
struct AggregateMeta {
    #[serde(default)]
    count: Option<u64>,
}

impl Backend for HttpBackend {
    fn class_schema(&self, collection: &str, ctx: &CallContext) -> Result<Vec<PropertyInfo>, BackendError> {
        let req = self.request(Method::GET, &format!("/v1/schema/{collection}"), ctx);
        let class: ClassWire = decode(self.send(req, "schema")?)?;
        Ok(class
            .properties
            .unwrap_or_default()
            .into_iter()
            .map(|p| PropertyInfo {
                name: p.name,
                data_type: p.data_type,
                nested: p.nested_properties.unwrap_or_default().into_iter().map(|n| n.name).collect(),
            })
            .collect())
    }

    fn get(&self, query: &GetQuery, ctx: &CallContext) -> Result<GetResponse, BackendError> {
        self.graphql(&query.to_graphql(), ctx)
    }

    fn aggregate_count(&self, collection: &str, ctx: &CallContext) -> Result<usize, BackendError> {
        let resp: AggregateResponse = self.graphql(&query::aggregate_count(collection), ctx)?;
        if let Some(errors) = resp.errors.filter(|e| !e.is_empty()) {
            return Err(classify_graphql_errors(&errors));
        }
        let count = resp
            .data
            .and_then(|mut d| d.aggregate.remove(collection))
            .flatten()
            .and_then(|groups| groups.into_iter().next())
            .and_then(|g| g.meta)
            .and_then(|m| m.count)
            .unwrap_or(0);
        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    fn delete_object(&self, collection: &str, id: &str, ctx: &CallContext) -> Result<(), BackendError> {
        let req = self.request(Method::DELETE, &format!("/v1/objects/{collection}/{id}"), ctx);
        self.send(req, "delete object").map(|_| ())
    }

    fn list_classes(&self, ctx: &CallContext) -> Result<Vec<String>, BackendError> {
        let req = self.request(Method::GET, "/v1/schema", ctx);
        let schema: SchemaWire = decode(self.send(req, "schema")?)?;
        Ok(schema.classes.unwrap_or_default().into_iter().map(|c| c.class).collect())
    }

    fn ready(&self, ctx: &CallContext) -> Result<(), BackendError> {
        let req = self.request(Method::GET, "/v1/.well-known/ready", ctx);
        self.send(req, "readiness").map(|_| ())
    }
}
