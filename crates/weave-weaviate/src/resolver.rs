use std::sync::Arc;
use tracing::{debug, warn};

use weave_core::{CallContext, CollectionSchema, Error, Result};

use crate::backend::{Backend, BackendError};

/// Discovers collection layouts on demand. Nothing is cached: every call asks
/// the backend again.
#[derive(Clone)]
pub struct SchemaResolver {
    backend: Arc<dyn Backend>,
}

impl SchemaResolver {
    pub fn new(backend: Arc<dyn Backend>) -> Self { Self { backend } }

    /// Ask the backend for the collection's properties.
    pub fn discover(&self, collection: &str, ctx: &CallContext) -> Result<CollectionSchema> {
        ctx.check()?;
        match self.backend.class_schema(collection, ctx) {
            Ok(properties) => {
                debug!(collection, properties = properties.len(), "schema discovered");
                Ok(CollectionSchema::discovered(properties))
            }
            Err(BackendError::NotFound { hint, .. }) => {
                Err(Error::CollectionNotFound { name: collection.to_string(), hint })
            }
            Err(e) => Err(Error::SchemaDiscoveryFailed { collection: collection.to_string(), reason: e.to_string() }),
        }
    }

    /// Like [`discover`](Self::discover) but degrades to an ID-only schema
    /// when the backend cannot answer. A missing collection is still an
    /// error, as are cancellation and an elapsed deadline.
    pub fn resolve(&self, collection: &str, ctx: &CallContext) -> Result<CollectionSchema> {
        match self.discover(collection, ctx) {
            Err(Error::SchemaDiscoveryFailed { reason, .. }) => {
                warn!(collection, %reason, "schema discovery failed, falling back to ID-only queries");
                Ok(CollectionSchema::id_only())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::GetResponse;
    use crate::query::GetQuery;
    use weave_core::{PropertyInfo, SchemaCapability};

    struct SchemaOnly(std::result::Result<Vec<PropertyInfo>, BackendError>);

    impl Backend for SchemaOnly {
        fn class_schema(&self, _: &str, _: &CallContext) -> std::result::Result<Vec<PropertyInfo>, BackendError> {
            self.0.clone()
        }
        fn get(&self, _: &GetQuery, _: &CallContext) -> std::result::Result<GetResponse, BackendError> {
            Err(BackendError::other("unused"))
        }
        fn aggregate_count(&self, _: &str, _: &CallContext) -> std::result::Result<usize, BackendError> {
            Ok(0)
        }
        fn delete_object(&self, _: &str, _: &str, _: &CallContext) -> std::result::Result<(), BackendError> {
            Ok(())
        }
        fn list_classes(&self, _: &CallContext) -> std::result::Result<Vec<String>, BackendError> {
            Ok(vec![])
        }
        fn ready(&self, _: &CallContext) -> std::result::Result<(), BackendError> {
            Ok(())
        }
    }

    fn resolver(answer: std::result::Result<Vec<PropertyInfo>, BackendError>) -> SchemaResolver {
        SchemaResolver::new(Arc::new(SchemaOnly(answer)))
    }

    #[test]
    fn unreachable_backend_degrades_to_id_only() {
        let schema = resolver(Err(BackendError::Transport("connection refused".into())))
            .resolve("Docs", &CallContext::new())
            .expect("degraded schema");
        assert_eq!(schema.capability(), SchemaCapability::IdOnly);
    }

    #[test]
    fn missing_collection_is_surfaced() {
        let err = resolver(Err(BackendError::NotFound { message: "404".into(), hint: None }))
            .resolve("Nope", &CallContext::new())
            .unwrap_err();
        assert!(matches!(err, Error::CollectionNotFound { ref name, .. } if name == "Nope"));
    }

    #[test]
    fn discover_reports_failure() {
        let err = resolver(Err(BackendError::other("boom"))).discover("Docs", &CallContext::new()).unwrap_err();
        assert!(matches!(err, Error::SchemaDiscoveryFailed { .. }));
    }
}
