use crate::error::Result;
use crate::filter::MetadataFilter;
use crate::types::{CallContext, Document, QueryRequest, QueryResult};

/// The retrieval surface both the live and the in-memory engine expose.
///
/// Filter-taking operations accept raw `key=value` tokens; a malformed token
/// fails the call before anything reaches the backend.
pub trait SearchEngine: Send + Sync {
    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryResult>>;

    fn query_with_filters(&self, request: &QueryRequest, filters: &[MetadataFilter]) -> Result<Vec<QueryResult>>;

    fn get_documents_by_metadata(&self, collection: &str, filters: &[String], ctx: &CallContext) -> Result<Vec<Document>>;

    /// Returns the number of documents actually deleted.
    fn delete_documents_by_metadata(&self, collection: &str, filters: &[String], ctx: &CallContext) -> Result<usize>;

    fn list_documents(&self, collection: &str, limit: usize, ctx: &CallContext) -> Result<Vec<Document>>;

    fn get_document(&self, collection: &str, id: &str, ctx: &CallContext) -> Result<Document>;

    fn delete_document(&self, collection: &str, id: &str, ctx: &CallContext) -> Result<()>;

    fn count_documents(&self, collection: &str, ctx: &CallContext) -> Result<usize>;

    fn list_collections(&self, ctx: &CallContext) -> Result<Vec<String>>;
}
