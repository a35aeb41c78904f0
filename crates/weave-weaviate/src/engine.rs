use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use weave_core::config::VectorDbConfig;
use weave_core::schema::METADATA_FIELD;
use weave_core::types::{effective_top_k, placeholder_content, EXCLUDED_PLACEHOLDER, OVERSIZED_FIELDS};
use weave_core::{
    parse_batch_filters, CallContext, CollectionSchema, Document, Error, FilterNode, MetadataFilter, MetadataFilterCompiler,
    QueryRequest, QueryResult, Result, SearchEngine,
};

use crate::backend::{Backend, BackendError, RawItem};
use crate::cascade::{CascadeOutcome, QueryStrategyCascade};
use crate::http::HttpBackend;
use crate::query::{GetQuery, Selection};
use crate::resolver::SchemaResolver;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const BATCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on IDs collected by one metadata batch operation.
const MAX_BATCH: usize = 10_000;

/// Properties checked, in order, for a document's display text.
const CONTENT_CANDIDATES: [&str; 9] =
    ["text", "content", "body", "description", "title", "name", "chunk", "pageContent", "document"];

const IMAGE_HINTS: [&str; 5] = ["image", "img", "photo", "picture", "visual"];

pub struct WeaviateEngine {
    backend: Arc<dyn Backend>,
    resolver: SchemaResolver,
    cascade: QueryStrategyCascade,
    timeout: Duration,
    batch_timeout: Duration,
}

impl WeaviateEngine {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let resolver = SchemaResolver::new(Arc::clone(&backend));
        let cascade = QueryStrategyCascade::new(Arc::clone(&backend), resolver.clone());
        Self { backend, resolver, cascade, timeout: DEFAULT_TIMEOUT, batch_timeout: BATCH_TIMEOUT }
    }

    pub fn from_config(db: &VectorDbConfig) -> Result<Self> {
        let backend = HttpBackend::from_config(db).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        info!(database = %db.name, url = %backend.base_url(), "weaviate engine ready");
        Ok(Self::new(Arc::new(backend)).with_timeout(db.timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self { self.timeout = timeout; self }

    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self { self.batch_timeout = timeout; self }

    /// Run the cascade and keep the strategy trail.
    pub fn search(&self, request: &QueryRequest, filters: &[MetadataFilter]) -> Result<CascadeOutcome> {
        let ctx = request.context.bounded(self.timeout);
        self.cascade.run(request, filters, &ctx)
    }

    pub fn health(&self, ctx: &CallContext) -> Result<()> {
        let ctx = ctx.bounded(self.timeout);
        self.backend.ready(&ctx).map_err(|e| Error::Backend(e.to_string()))
    }

    fn fetch(&self, query: &GetQuery, ctx: &CallContext) -> std::result::Result<Vec<RawItem>, BackendError> {
        let data = self.backend.get(query, ctx)?.into_data()?;
        Ok(data.take_items(&query.class).unwrap_or_default())
    }

    /// IDs of every document matching all filter tokens.
    fn matching_ids(&self, collection: &str, tokens: &[String], ctx: &CallContext) -> Result<Vec<String>> {
        let filters = parse_batch_filters(tokens)?;
        let schema = self.resolver.resolve(collection, ctx)?;
        let filter = MetadataFilterCompiler::new(&schema)
            .compile(&filters)
            .ok_or_else(|| Error::InvalidFilterSyntax(tokens.join(" ")))?;
        let query = GetQuery::new(collection).filter(Some(filter)).limit(MAX_BATCH);
        let items = self.fetch(&query, ctx).map_err(|e| e.into_core(collection))?;
        Ok(items.into_iter().map(|i| i.additional.id).filter(|id| !id.is_empty()).collect())
    }

    fn fetch_document(&self, collection: &str, id: &str, ctx: &CallContext) -> Result<Document> {
        let fields = match self.resolver.discover(collection, ctx) {
            Ok(schema) => full_selection(&schema, &[]),
            Err(Error::SchemaDiscoveryFailed { reason, .. }) => {
                warn!(collection, %reason, "schema discovery failed, fetching ID only");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let by_id = || GetQuery::new(collection).filter(Some(FilterNode::equal(&["id"], id))).limit(1);
        let items = match self.fetch(&by_id().select(fields.clone()), ctx) {
            Ok(items) => items,
            Err(e @ BackendError::NotFound { .. }) => return Err(e.into_core(collection)),
            Err(e) if !fields.is_empty() => {
                warn!(collection, id, error = %e, "property fetch failed, retrying with ID only");
                self.fetch(&by_id(), ctx).map_err(|e| e.into_core(collection))?
            }
            Err(e) => return Err(e.into_core(collection)),
        };
        items
            .into_iter()
            .next()
            .map(document_from_item)
            .ok_or_else(|| Error::DocumentNotFound { collection: collection.to_string(), id: id.to_string() })
    }

    fn id_only_listing(&self, collection: &str, limit: usize, ctx: &CallContext) -> Result<Vec<Document>> {
        let items = self.fetch(&GetQuery::new(collection).limit(limit), ctx).map_err(|e| e.into_core(collection))?;
        Ok(items.into_iter().map(document_from_item).collect())
    }
}

/// Every selectable property except `exclude`. Object properties without
/// known sub-fields and cross-references cannot be selected flat.
pub fn full_selection(schema: &CollectionSchema, exclude: &[&str]) -> Vec<Selection> {
    let mut fields = Vec::new();
    for prop in schema.properties() {
        if exclude.contains(&prop.name.as_str()) {
            continue;
        }
        let data_type = prop.data_type.first().map(String::as_str).unwrap_or("text");
        if prop.name == METADATA_FIELD {
            if let Some(shape) = schema.metadata_shape() {
                fields.push(Selection::metadata(METADATA_FIELD, &shape));
            }
        } else if data_type.starts_with("object") {
            if !prop.nested.is_empty() {
                fields.push(Selection::Object { name: prop.name.clone(), fields: prop.nested.clone() });
            }
        } else if !data_type.starts_with(|c: char| c.is_ascii_uppercase()) {
            fields.push(Selection::Field(prop.name.clone()));
        }
    }
    fields
}

pub fn document_from_item(item: RawItem) -> Document {
    let id = item.additional.id;
    let content = CONTENT_CANDIDATES
        .iter()
        .find_map(|f| item.fields.get(*f).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .map_or_else(|| placeholder_content(&id), str::to_string);
    let mut metadata = item.fields;
    metadata.insert("id".to_string(), Value::String(id.clone()));
    Document { id, content, metadata }
}

fn is_image_collection(collection: &str) -> bool {
    let lower = collection.to_lowercase();
    IMAGE_HINTS.iter().any(|hint| lower.contains(hint))
}

impl SearchEngine for WeaviateEngine {
    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryResult>> {
        self.search(request, &[]).map(|outcome| outcome.results)
    }

    fn query_with_filters(&self, request: &QueryRequest, filters: &[MetadataFilter]) -> Result<Vec<QueryResult>> {
        self.search(request, filters).map(|outcome| outcome.results)
    }

    fn get_documents_by_metadata(&self, collection: &str, filters: &[String], ctx: &CallContext) -> Result<Vec<Document>> {
        let ctx = ctx.bounded(self.batch_timeout);
        let ids = self.matching_ids(collection, filters, &ctx)?;
        let mut documents = Vec::with_capacity(ids.len());
        for id in ids {
            ctx.check()?;
            match self.fetch_document(collection, &id, &ctx) {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!(collection, id = %id, error = %e, "skipping document that could not be fetched"),
            }
        }
        Ok(documents)
    }

    fn delete_documents_by_metadata(&self, collection: &str, filters: &[String], ctx: &CallContext) -> Result<usize> {
        let ctx = ctx.bounded(self.batch_timeout);
        let ids = self.matching_ids(collection, filters, &ctx)?;
        let mut deleted = 0;
        for id in ids {
            if let Err(e) = ctx.check() {
                warn!(collection, deleted, error = %e, "stopping metadata delete early");
                break;
            }
            match self.backend.delete_object(collection, &id, &ctx) {
                Ok(()) => deleted += 1,
                Err(e) => warn!(collection, id = %id, error = %e, "failed to delete document"),
            }
        }
        Ok(deleted)
    }

    fn list_documents(&self, collection: &str, limit: usize, ctx: &CallContext) -> Result<Vec<Document>> {
        let ctx = ctx.bounded(self.timeout);
        let limit = effective_top_k(i64::try_from(limit).unwrap_or(i64::MAX));
        let schema = match self.resolver.discover(collection, &ctx) {
            Ok(schema) => schema,
            Err(Error::SchemaDiscoveryFailed { reason, .. }) => {
                warn!(collection, %reason, "schema discovery failed, listing IDs only");
                return self.id_only_listing(collection, limit, &ctx);
            }
            Err(e) => return Err(e),
        };
        let query = GetQuery::new(collection).limit(limit).select(full_selection(&schema, &OVERSIZED_FIELDS));
        let items = match self.fetch(&query, &ctx) {
            Ok(items) => items,
            Err(e @ BackendError::NotFound { .. }) => return Err(e.into_core(collection)),
            Err(e) => {
                warn!(collection, error = %e, "listing with properties failed, listing IDs only");
                return self.id_only_listing(collection, limit, &ctx);
            }
        };

        let placeholders: Vec<&str> = if is_image_collection(collection) {
            OVERSIZED_FIELDS.into_iter().filter(|f| schema.has_property(f)).collect()
        } else {
            Vec::new()
        };
        Ok(items
            .into_iter()
            .map(|item| {
                let mut doc = document_from_item(item);
                for field in &placeholders {
                    doc.metadata.insert((*field).to_string(), Value::from(EXCLUDED_PLACEHOLDER));
                }
                doc
            })
            .collect())
    }

    fn get_document(&self, collection: &str, id: &str, ctx: &CallContext) -> Result<Document> {
        self.fetch_document(collection, id, &ctx.bounded(self.timeout))
    }

    fn delete_document(&self, collection: &str, id: &str, ctx: &CallContext) -> Result<()> {
        match self.backend.delete_object(collection, id, &ctx.bounded(self.timeout)) {
            Ok(()) => Ok(()),
            Err(BackendError::NotFound { .. }) => {
                Err(Error::DocumentNotFound { collection: collection.to_string(), id: id.to_string() })
            }
            Err(e) => Err(Error::Backend(e.to_string())),
        }
    }

    fn count_documents(&self, collection: &str, ctx: &CallContext) -> Result<usize> {
        self.backend.aggregate_count(collection, &ctx.bounded(self.timeout)).map_err(|e| e.into_core(collection))
    }

    fn list_collections(&self, ctx: &CallContext) -> Result<Vec<String>> {
        self.backend.list_classes(&ctx.bounded(self.timeout)).map_err(|e| Error::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::PropertyInfo;

    #[test]
    fn content_taken_from_first_non_empty_candidate() {
        let doc = document_from_item(RawItem::new("a").field("content", "").field("title", "A title").field("year", 2024));
        assert_eq!(doc.content, "A title");
        assert_eq!(doc.metadata.get("id"), Some(&Value::from("a")));
        assert_eq!(doc.metadata.get("year"), Some(&Value::from(2024)));
    }

    #[test]
    fn item_without_text_gets_placeholder() {
        assert_eq!(document_from_item(RawItem::new("b")).content, "Document ID: b");
    }

    #[test]
    fn selection_skips_oversized_and_unselectable() {
        let schema = CollectionSchema::discovered(vec![
            PropertyInfo::text("content"),
            PropertyInfo::text("image"),
            PropertyInfo::object("metadata", &["author"]),
            PropertyInfo::object("extra", &[]),
            PropertyInfo { name: "owner".into(), data_type: vec!["Person".into()], nested: vec![] },
        ]);
        assert_eq!(
            full_selection(&schema, &OVERSIZED_FIELDS),
            vec![
                Selection::field("content"),
                Selection::Object { name: "metadata".into(), fields: vec!["author".into()] },
            ]
        );
    }

    #[test]
    fn image_collections_by_name() {
        assert!(is_image_collection("WeaveImages"));
        assert!(is_image_collection("PhotoArchive"));
        assert!(!is_image_collection("WeaveDocs"));
    }
}
