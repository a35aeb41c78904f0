use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid metadata filter format: {0} (expected key=value)")]
    InvalidFilterSyntax(String),

    #[error("collection {name} does not exist{}", hint_suffix(.hint))]
    CollectionNotFound { name: String, hint: Option<String> },

    #[error("collection '{0}' already exists")]
    CollectionExists(String),

    #[error("document with ID {id} not found in collection {collection}")]
    DocumentNotFound { collection: String, id: String },

    #[error("document with ID '{id}' already exists in collection '{collection}'")]
    DuplicateDocument { collection: String, id: String },

    #[error("failed to discover schema for {collection}: {reason}")]
    SchemaDiscoveryFailed { collection: String, reason: String },

    #[error("no searchable fields found in collection {0}")]
    NoSearchableFields(String),

    #[error("{strategy} search failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    #[error("all search strategies failed for {collection}; last error: {last}")]
    AllStrategiesExhausted { collection: String, last: String },

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("call cancelled")]
    Cancelled,

    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into(), hint: None }
    }
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref().map(|h| format!(". Did you mean {h}?")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
