use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use weave_core::config::VectorDbConfig;
use weave_core::types::EXCLUDED_PLACEHOLDER;
use weave_core::types::OVERSIZED_FIELDS;
use weave_core::{
    parse_batch_filters, CallContext, Document, Error, MetadataFilter, QueryRequest, QueryResult, Result, SearchEngine,
};

use crate::matching::{content_score, filter_matches, metadata_score, tokenize};
use crate::sample;

/// In-memory engine. Each collection is an ordered document list; insertion
/// order breaks score ties.
pub struct MockSearchEngine {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MockSearchEngine {
    pub fn new<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let collections = collections.into_iter().map(|name| (name.into(), Vec::new())).collect();
        Self { collections: RwLock::new(collections) }
    }

    /// Empty collections named by the config, seeded with sample data.
    pub fn from_config(db: &VectorDbConfig) -> Self {
        let engine = Self::new(db.collection_names()).with_sample_data();
        info!(database = %db.name, collections = db.collections.len(), "mock engine ready");
        engine
    }

    /// Seed the demonstration collections that exist. Others stay untouched.
    pub fn with_sample_data(self) -> Self {
        {
            let mut collections = self.collections.write();
            if let Some(docs) = collections.get_mut(sample::DOCS_COLLECTION) {
                *docs = sample::docs();
            }
            if let Some(docs) = collections.get_mut(sample::IMAGES_COLLECTION) {
                *docs = sample::images();
            }
        }
        self
    }

    pub fn health(&self) -> Result<()> { Ok(()) }

    pub fn create_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(Error::CollectionExists(name.to_string()));
        }
        collections.insert(name.to_string(), Vec::new());
        Ok(())
    }

    pub fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().remove(name).map(|_| ()).ok_or_else(|| Error::collection_not_found(name))
    }

    pub fn add_document(&self, collection: &str, document: Document) -> Result<()> {
        let mut collections = self.collections.write();
        let docs = collections.get_mut(collection).ok_or_else(|| Error::collection_not_found(collection))?;
        if docs.iter().any(|d| d.id == document.id) {
            return Err(Error::DuplicateDocument { collection: collection.to_string(), id: document.id });
        }
        docs.push(document);
        Ok(())
    }

    pub fn delete_all_documents(&self, collection: &str) -> Result<()> {
        let mut collections = self.collections.write();
        let docs = collections.get_mut(collection).ok_or_else(|| Error::collection_not_found(collection))?;
        docs.clear();
        Ok(())
    }

    fn read<T>(&self, collection: &str, f: impl FnOnce(&[Document]) -> T) -> Result<T> {
        let collections = self.collections.read();
        let docs = collections.get(collection).ok_or_else(|| Error::collection_not_found(collection))?;
        Ok(f(docs))
    }

    fn matching(&self, collection: &str, filters: &[MetadataFilter]) -> Result<Vec<Document>> {
        self.read(collection, |docs| {
            docs.iter().filter(|doc| filters.iter().all(|f| filter_matches(doc, f))).cloned().collect()
        })
    }
}

fn score(doc: &Document, tokens: &[String], search_metadata: bool) -> f64 {
    let content = content_score(&doc.content, tokens);
    if content > 0.0 || !search_metadata {
        return content;
    }
    metadata_score(&doc.metadata, tokens)
}

fn to_result(doc: &Document, score: f64) -> QueryResult {
    QueryResult { id: doc.id.clone(), content: doc.display_content(), metadata: doc.metadata.clone(), score }
}

/// Score, drop zero hits, stable sort by descending score, truncate.
fn rank<'a>(docs: impl Iterator<Item = &'a Document>, request: &QueryRequest) -> Vec<QueryResult> {
    let tokens = tokenize(&request.query_text);
    let mut results: Vec<QueryResult> = docs
        .filter_map(|doc| {
            let s = score(doc, &tokens, request.search_metadata);
            (s > 0.0).then(|| to_result(doc, s))
        })
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(request.limit());
    results
}

fn without_oversized(mut doc: Document) -> Document {
    for field in OVERSIZED_FIELDS {
        if let Some(value) = doc.metadata.get_mut(field) {
            *value = Value::from(EXCLUDED_PLACEHOLDER);
        }
    }
    doc
}

impl SearchEngine for MockSearchEngine {
    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryResult>> {
        request.context.check()?;
        let results = self.read(&request.collection, |docs| rank(docs.iter(), request))?;
        debug!(collection = %request.collection, hits = results.len(), "mock query");
        Ok(results)
    }

    fn query_with_filters(&self, request: &QueryRequest, filters: &[MetadataFilter]) -> Result<Vec<QueryResult>> {
        request.context.check()?;
        let matched = self.matching(&request.collection, filters)?;
        if request.query_text.trim().is_empty() {
            return Ok(matched.iter().take(request.limit()).map(|doc| to_result(doc, 1.0)).collect());
        }
        Ok(rank(matched.iter(), request))
    }

    fn get_documents_by_metadata(&self, collection: &str, filters: &[String], ctx: &CallContext) -> Result<Vec<Document>> {
        ctx.check()?;
        let filters = parse_batch_filters(filters)?;
        self.matching(collection, &filters)
    }

    fn delete_documents_by_metadata(&self, collection: &str, filters: &[String], ctx: &CallContext) -> Result<usize> {
        ctx.check()?;
        let filters = parse_batch_filters(filters)?;
        let mut collections = self.collections.write();
        let docs = collections.get_mut(collection).ok_or_else(|| Error::collection_not_found(collection))?;
        let before = docs.len();
        docs.retain(|doc| !filters.iter().all(|f| filter_matches(doc, f)));
        Ok(before - docs.len())
    }

    fn list_documents(&self, collection: &str, limit: usize, ctx: &CallContext) -> Result<Vec<Document>> {
        ctx.check()?;
        self.read(collection, |docs| {
            let take = if limit == 0 { docs.len() } else { limit };
            docs.iter().take(take).cloned().map(without_oversized).collect()
        })
    }

    fn get_document(&self, collection: &str, id: &str, ctx: &CallContext) -> Result<Document> {
        ctx.check()?;
        self.read(collection, |docs| docs.iter().find(|d| d.id == id).cloned())?
            .ok_or_else(|| Error::DocumentNotFound { collection: collection.to_string(), id: id.to_string() })
    }

    fn delete_document(&self, collection: &str, id: &str, ctx: &CallContext) -> Result<()> {
        ctx.check()?;
        let mut collections = self.collections.write();
        let docs = collections.get_mut(collection).ok_or_else(|| Error::collection_not_found(collection))?;
        let index = docs
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::DocumentNotFound { collection: collection.to_string(), id: id.to_string() })?;
        docs.remove(index);
        Ok(())
    }

    fn count_documents(&self, collection: &str, ctx: &CallContext) -> Result<usize> {
        ctx.check()?;
        self.read(collection, <[Document]>::len)
    }

    fn list_collections(&self, ctx: &CallContext) -> Result<Vec<String>> {
        ctx.check()?;
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
