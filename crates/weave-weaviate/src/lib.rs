//! Weaviate-backed search engine.
//!
//! [`WeaviateEngine`] discovers each collection's layout per call, compiles
//! metadata filters against it and runs the [`QueryStrategyCascade`]. All
//! backend traffic goes through the [`Backend`] trait; [`HttpBackend`] is the
//! production implementation.

pub mod backend;
pub mod cascade;
pub mod engine;
pub mod http;
pub mod normalize;
pub mod query;
pub mod resolver;

pub use backend::{Backend, BackendError, GetData, GetResponse, RawItem};
pub use cascade::{Attempt, CascadeOutcome, QueryStrategyCascade, Strategy};
pub use engine::WeaviateEngine;
pub use http::HttpBackend;
pub use normalize::ResultNormalizer;
pub use query::{GetQuery, SearchOperator, Selection};
pub use resolver::SchemaResolver;
