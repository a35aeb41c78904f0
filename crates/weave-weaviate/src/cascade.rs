//! Ordered search strategy fallback.
//!
//! Strategies run in the order concept, keyword, hybrid, substring. A
//! strategy that returns without error ends the cascade, even with zero
//! results. A missing collection, a collection without searchable fields,
//! cancellation and an elapsed deadline end it immediately; every other
//! failure moves on to the next strategy.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use weave_core::filter::wildcard;
use weave_core::{
    CallContext, CollectionSchema, Error, FilterNode, MetadataFilter, MetadataFilterCompiler, QueryRequest,
    QueryResult, Result,
};

use crate::backend::{Backend, BackendError};
use crate::normalize::ResultNormalizer;
use crate::query::{AdditionalField, GetQuery, SearchOperator, Selection};
use crate::resolver::SchemaResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Concept,
    Keyword,
    Hybrid,
    Substring,
}

impl Strategy {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Concept => Some(Self::Keyword),
            Self::Keyword => Some(Self::Hybrid),
            Self::Hybrid => Some(Self::Substring),
            Self::Substring => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Keyword => "keyword",
            Self::Hybrid => "hybrid",
            Self::Substring => "substring",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub strategy: Strategy,
    pub failure: Option<String>,
}

/// Results plus the trail of strategies tried to get them.
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub strategy: Strategy,
    pub results: Vec<QueryResult>,
    pub attempts: Vec<Attempt>,
}

enum StageFailure {
    Recoverable(String),
    Fatal(Error),
}

impl StageFailure {
    fn from_backend(e: BackendError, collection: &str) -> Self {
        match e {
            BackendError::NotFound { .. } => Self::Fatal(e.into_core(collection)),
            other => Self::Recoverable(other.to_string()),
        }
    }
}

pub struct QueryStrategyCascade {
    backend: Arc<dyn Backend>,
    resolver: SchemaResolver,
}

impl QueryStrategyCascade {
    pub fn new(backend: Arc<dyn Backend>, resolver: SchemaResolver) -> Self { Self { backend, resolver } }

    /// Run the cascade. `filters` are ANDed into every strategy.
    pub fn run(&self, request: &QueryRequest, filters: &[MetadataFilter], ctx: &CallContext) -> Result<CascadeOutcome> {
        let collection = request.collection.as_str();
        let schema = self.resolver.resolve(collection, ctx)?;
        let filter = MetadataFilterCompiler::new(&schema).compile(filters);

        let mut strategy = if request.force_keyword { Strategy::Keyword } else { Strategy::Concept };
        let mut attempts = Vec::new();
        loop {
            ctx.check()?;
            debug!(collection, %strategy, "attempting search strategy");
            match self.attempt(strategy, request, &schema, filter.as_ref(), ctx) {
                Ok(results) => {
                    debug!(collection, %strategy, hits = results.len(), "search strategy succeeded");
                    attempts.push(Attempt { strategy, failure: None });
                    return Ok(CascadeOutcome { strategy, results, attempts });
                }
                Err(StageFailure::Fatal(e)) => {
                    debug!(collection, %strategy, error = %e, "search aborted");
                    return Err(e);
                }
                Err(StageFailure::Recoverable(reason)) => {
                    let failure = Error::StrategyFailed { strategy: strategy.name().to_string(), reason }.to_string();
                    debug!(collection, error = %failure, "falling back");
                    attempts.push(Attempt { strategy, failure: Some(failure.clone()) });
                    match strategy.next() {
                        Some(next) => strategy = next,
                        None => {
                            return Err(Error::AllStrategiesExhausted { collection: collection.to_string(), last: failure })
                        }
                    }
                }
            }
        }
    }

    fn attempt(
        &self,
        strategy: Strategy,
        request: &QueryRequest,
        schema: &CollectionSchema,
        filter: Option<&FilterNode>,
        ctx: &CallContext,
    ) -> std::result::Result<Vec<QueryResult>, StageFailure> {
        let collection = request.collection.as_str();
        let query = build_query(strategy, request, schema, filter)?;
        let response = self.backend.get(&query, ctx).map_err(|e| StageFailure::from_backend(e, collection))?;
        let data = response.into_data().map_err(|e| StageFailure::from_backend(e, collection))?;

        let mut normalizer = ResultNormalizer::new(collection, schema.content_field());
        if strategy == Strategy::Substring {
            normalizer = normalizer.with_fixed_score(1.0);
        }
        normalizer.normalize(data).map_err(|e| StageFailure::Recoverable(e.to_string()))
    }
}

/// Properties returned alongside each hit.
pub fn result_selection(schema: &CollectionSchema) -> Vec<Selection> {
    let mut fields = Vec::new();
    if let Some(content) = schema.content_field() {
        fields.push(Selection::field(content));
    }
    if let Some(shape) = schema.metadata_shape() {
        fields.push(Selection::metadata(weave_core::schema::METADATA_FIELD, &shape));
    }
    fields
}

fn build_query(
    strategy: Strategy,
    request: &QueryRequest,
    schema: &CollectionSchema,
    filter: Option<&FilterNode>,
) -> std::result::Result<GetQuery, StageFailure> {
    let text = request.query_text.clone();
    let base = GetQuery::new(&request.collection).limit(request.limit()).select(result_selection(schema));
    let searchable = || {
        let properties = schema.searchable_fields(request.search_metadata);
        if properties.is_empty() {
            return Err(StageFailure::Fatal(Error::NoSearchableFields(request.collection.clone())));
        }
        Ok(properties)
    };
    Ok(match strategy {
        Strategy::Concept => base
            .search(SearchOperator::NearText { concepts: vec![text] })
            .filter(filter.cloned())
            .additional(AdditionalField::Distance),
        Strategy::Keyword => base
            .search(SearchOperator::Bm25 { query: text, properties: searchable()? })
            .filter(filter.cloned())
            .additional(AdditionalField::Score),
        Strategy::Hybrid => base
            .search(SearchOperator::Hybrid { query: text, properties: searchable()? })
            .filter(filter.cloned())
            .additional(AdditionalField::Score),
        Strategy::Substring => {
            let pattern = wildcard(&text);
            let any_field =
                FilterNode::any(searchable()?.iter().map(|p| FilterNode::like(&[p.as_str()], pattern.clone())).collect());
            base.filter(FilterNode::all(filter.cloned().into_iter().chain(any_field).collect()))
        }
    })
}
