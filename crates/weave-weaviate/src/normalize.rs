use serde_json::Value;

use weave_core::schema::METADATA_FIELD;
use weave_core::types::placeholder_content;
use weave_core::{Error, Metadata, QueryResult, Result};

use crate::backend::{GetData, RawItem};

/// Turns raw `Get` payloads into scored results.
///
/// Score precedence: distance (`1 - d`), then the backend score, then `1.0`.
/// A fixed score overrides all of it.
pub struct ResultNormalizer<'a> {
    collection: &'a str,
    content_field: Option<&'a str>,
    fixed_score: Option<f64>,
}

impl<'a> ResultNormalizer<'a> {
    pub fn new(collection: &'a str, content_field: Option<&'a str>) -> Self {
        Self { collection, content_field, fixed_score: None }
    }

    pub fn with_fixed_score(mut self, score: f64) -> Self { self.fixed_score = Some(score); self }

    pub fn normalize(&self, data: GetData) -> Result<Vec<QueryResult>> {
        let items = data
            .take_items(self.collection)
            .ok_or_else(|| Error::Backend(format!("no results for {} in response", self.collection)))?;
        Ok(items.into_iter().map(|item| self.normalize_item(item)).collect())
    }

    fn normalize_item(&self, mut item: RawItem) -> QueryResult {
        let id = item.additional.id.clone();
        let score = self.fixed_score.unwrap_or_else(|| score_of(&item));
        let content = self
            .content_field
            .and_then(|f| item.fields.get(f))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map_or_else(|| placeholder_content(&id), str::to_string);
        let metadata = item.fields.remove(METADATA_FIELD).map(normalize_metadata).unwrap_or_default();
        QueryResult { id, content, metadata, score }
    }
}

fn score_of(item: &RawItem) -> f64 {
    match (item.additional.distance, item.additional.score) {
        (Some(distance), _) => 1.0 - distance,
        (None, Some(score)) => score,
        (None, None) => 1.0,
    }
}

/// Objects pass through, JSON-encoded strings are decoded, anything else is
/// kept under a single `metadata` key.
pub fn normalize_metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        Value::Null => Metadata::new(),
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => Metadata::from_iter([(METADATA_FIELD.to_string(), Value::String(raw))]),
        },
        other => Metadata::from_iter([(METADATA_FIELD.to_string(), other)]),
    }
}
