//! Backend adapter seam.
//!
//! The cascade and the engine only see typed responses and typed errors. Any
//! interpretation of backend error wording happens in this module.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

use weave_core::{CallContext, Error, PropertyInfo};

use crate::query::GetQuery;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("not found: {message}")]
    NotFound { message: String, hint: Option<String> },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("transport: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn other(message: impl Into<String>) -> Self { Self::Other(message.into()) }

    /// Map onto the engine taxonomy; a missing class becomes
    /// `CollectionNotFound` for `collection`.
    pub fn into_core(self, collection: &str) -> Error {
        match self {
            Self::NotFound { hint, .. } => Error::CollectionNotFound { name: collection.to_string(), hint },
            other => Error::Backend(other.to_string()),
        }
    }
}

pub trait Backend: Send + Sync {
    /// Properties of one class, including nested property names.
    fn class_schema(&self, collection: &str, ctx: &CallContext) -> Result<Vec<PropertyInfo>, BackendError>;

    fn get(&self, query: &GetQuery, ctx: &CallContext) -> Result<GetResponse, BackendError>;

    fn aggregate_count(&self, collection: &str, ctx: &CallContext) -> Result<usize, BackendError>;

    fn delete_object(&self, collection: &str, id: &str, ctx: &CallContext) -> Result<(), BackendError>;

    fn list_classes(&self, ctx: &CallContext) -> Result<Vec<String>, BackendError>;

    fn ready(&self, ctx: &CallContext) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: String,
}

impl GraphQlError {
    pub fn new(message: impl Into<String>) -> Self { Self { message: message.into() } }
}

/// A `Get` response: data and errors as sent by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetResponse {
    #[serde(default)]
    pub data: Option<GetData>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

impl GetResponse {
    pub fn ok(data: GetData) -> Self { Self { data: Some(data), errors: None } }

    pub fn failed(messages: &[&str]) -> Self {
        Self { data: None, errors: Some(messages.iter().map(|m| GraphQlError::new(*m)).collect()) }
    }

    pub fn errors(&self) -> &[GraphQlError] { self.errors.as_deref().unwrap_or_default() }

    /// Data when the backend reported no errors.
    pub fn into_data(self) -> Result<GetData, BackendError> {
        if !self.errors().is_empty() {
            return Err(classify_graphql_errors(self.errors()));
        }
        self.data.ok_or_else(|| BackendError::other("response carried neither data nor errors"))
    }
}

/// Items keyed by class name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetData {
    #[serde(rename = "Get", default)]
    pub get: HashMap<String, Option<Vec<RawItem>>>,
}

impl GetData {
    pub fn single(collection: &str, items: Vec<RawItem>) -> Self {
        Self { get: HashMap::from([(collection.to_string(), Some(items))]) }
    }

    /// Items for `collection`, or for the only class present when the key
    /// differs in case. `None` when the payload names no class at all.
    pub fn take_items(mut self, collection: &str) -> Option<Vec<RawItem>> {
        if let Some(items) = self.get.remove(collection) {
            return Some(items.unwrap_or_default());
        }
        self.get.into_values().next().map(Option::unwrap_or_default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawItem {
    #[serde(rename = "_additional", default)]
    pub additional: Additional,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RawItem {
    pub fn new(id: &str) -> Self {
        Self { additional: Additional { id: id.to_string(), ..Additional::default() }, fields: Map::new() }
    }

    pub fn distance(mut self, distance: f64) -> Self { self.additional.distance = Some(distance); self }

    pub fn score(mut self, score: f64) -> Self { self.additional.score = Some(score); self }

    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Additional {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
}

// Relevance scores come back as numeric strings, distances as numbers.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Translate backend error wording into a typed variant.
pub fn classify_graphql_errors(errors: &[GraphQlError]) -> BackendError {
    if let Some(e) = errors.iter().find(|e| is_missing_class(&e.message)) {
        return BackendError::NotFound { message: e.message.clone(), hint: did_you_mean(&e.message) };
    }
    let joined = errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ");
    if errors.iter().any(|e| is_unsupported(&e.message)) {
        BackendError::Unsupported(joined)
    } else {
        BackendError::Other(joined)
    }
}

fn is_missing_class(message: &str) -> bool {
    (message.contains("class") && message.contains("not found"))
        || message.contains("Unknown class")
        || (message.contains("Cannot query field") && message.contains("GetObjectsObj"))
}

fn is_unsupported(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["unknown argument", "not supported", "unsupported", "no module", "vectoriz"]
        .iter()
        .any(|needle| lower.contains(needle))
}

fn did_you_mean(message: &str) -> Option<String> {
    let (_, rest) = message.split_once("Did you mean")?;
    let hint = rest.trim().trim_end_matches('?').trim().trim_matches('"');
    (!hint.is_empty()).then(|| hint.to_string())
}
