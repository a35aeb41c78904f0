mod common;

use std::sync::Arc;

use common::ScriptedBackend;
use weave_core::types::EXCLUDED_PLACEHOLDER;
use weave_core::{CallContext, Error, PropertyInfo, SearchEngine};
use weave_weaviate::{BackendError, RawItem, WeaviateEngine};

const DOCS: &str = "WeaveDocs";

fn filters(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| (*t).to_string()).collect()
}

#[test]
fn malformed_filter_never_reaches_backend() {
    let backend = Arc::new(ScriptedBackend::docs_schema());
    let engine = WeaviateEngine::new(backend.clone());
    let ctx = CallContext::new();

    let get = engine.get_documents_by_metadata(DOCS, &filters(&["invalid-filter"]), &ctx).unwrap_err();
    let delete = engine.delete_documents_by_metadata(DOCS, &filters(&["invalid-filter"]), &ctx).unwrap_err();

    assert!(matches!(get, Error::InvalidFilterSyntax(_)));
    assert!(matches!(delete, Error::InvalidFilterSyntax(_)));
    assert!(backend.kinds().is_empty());
}

#[test]
fn delete_by_metadata_with_no_match_deletes_nothing() -> anyhow::Result<()> {
    let backend = Arc::new(ScriptedBackend::docs_schema().items(DOCS, vec![]));
    let engine = WeaviateEngine::new(backend.clone());

    let deleted = engine.delete_documents_by_metadata(DOCS, &filters(&["filename=nope.pdf"]), &CallContext::new())?;
    assert_eq!(deleted, 0);
    assert!(backend.deleted.lock().is_empty());
    Ok(())
}

#[test]
fn delete_by_metadata_skips_failures_and_counts_successes() -> anyhow::Result<()> {
    let backend = Arc::new(
        ScriptedBackend::docs_schema()
            .items(DOCS, vec![RawItem::new("a"), RawItem::new("b"), RawItem::new("c")])
            .fail_delete("b"),
    );
    let engine = WeaviateEngine::new(backend.clone());

    let deleted = engine.delete_documents_by_metadata(DOCS, &filters(&["type=pdf"]), &CallContext::new())?;
    assert_eq!(deleted, 2);
    assert_eq!(*backend.deleted.lock(), vec!["a".to_string(), "c".to_string()]);
    Ok(())
}

#[test]
fn get_by_metadata_fetches_each_match() -> anyhow::Result<()> {
    let backend = Arc::new(
        ScriptedBackend::docs_schema()
            .items(DOCS, vec![RawItem::new("a"), RawItem::new("b")])
            .items(DOCS, vec![RawItem::new("a").field("content", "first")])
            .answer(Err(BackendError::Transport("reset".into())))
            .answer(Err(BackendError::Transport("reset".into()))),
    );
    let engine = WeaviateEngine::new(backend.clone());

    let docs = engine.get_documents_by_metadata(DOCS, &filters(&["original_filename=a.pdf"]), &CallContext::new())?;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content, "first");
    Ok(())
}

#[test]
fn get_document_not_found() {
    let backend = Arc::new(ScriptedBackend::docs_schema().items(DOCS, vec![]));
    let err = WeaviateEngine::new(backend).get_document(DOCS, "missing", &CallContext::new()).unwrap_err();
    assert!(matches!(err, Error::DocumentNotFound { ref id, .. } if id == "missing"));
}

#[test]
fn image_listing_gets_placeholders() -> anyhow::Result<()> {
    let backend = Arc::new(
        ScriptedBackend::new(vec![PropertyInfo::text("content"), PropertyInfo::text("image")])
            .items("WeaveImages", vec![RawItem::new("img-1").field("content", "a cat")]),
    );
    let engine = WeaviateEngine::new(backend.clone());

    let docs = engine.list_documents("WeaveImages", 10, &CallContext::new())?;
    assert_eq!(docs[0].metadata.get("image").and_then(|v| v.as_str()), Some(EXCLUDED_PLACEHOLDER));
    assert!(!backend.queries.lock()[0].to_graphql().contains("image "));
    Ok(())
}

#[test]
fn listing_falls_back_to_ids() -> anyhow::Result<()> {
    let backend = Arc::new(
        ScriptedBackend::docs_schema()
            .schema_error(BackendError::Transport("refused".into()))
            .items(DOCS, vec![RawItem::new("x")]),
    );
    let docs = WeaviateEngine::new(backend.clone()).list_documents(DOCS, 0, &CallContext::new())?;

    assert_eq!(docs[0].content, "Document ID: x");
    assert_eq!(backend.queries.lock()[0].limit, Some(5));
    Ok(())
}
