pub mod config;
pub mod error;
pub mod filter;
pub mod schema;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use filter::{parse_batch_filters, parse_filters, FilterMode, FilterNode, FilterOperator, MetadataFilter, MetadataFilterCompiler};
pub use schema::{CollectionSchema, MetadataShape, PropertyInfo, SchemaCapability};
pub use traits::SearchEngine;
pub use types::{CallContext, Document, Metadata, QueryRequest, QueryResult};
