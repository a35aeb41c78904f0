//! Metadata filter parsing and compilation into backend-neutral filter trees.
//!
//! Filters arrive as ordered `key=value` tokens and are ANDed. Each key has an
//! implicit matching mode (see [`FilterMode`]). When one logical key maps to
//! more than one stored field, the per-field checks are ORed inside the AND
//! group. Every comparison is string based.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{CollectionSchema, METADATA_FIELD};

/// Keys whose values live as nested text inside a JSON-encoded metadata blob.
pub const NESTED_JSON_KEYS: [&str; 2] = ["filename", "original_filename"];

/// One `key=value` constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub key: String,
    pub value: String,
}

/// How a filter value is compared against stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Substring inside a serialized metadata blob (`"key": "value"`).
    NestedJson,
    /// Substring directly against the field.
    Substring,
    /// Exact string equality.
    Exact,
}

impl MetadataFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    /// Split a `key=value` token on the first `=`.
    pub fn parse(token: &str) -> Result<Self> {
        match token.split_once('=') {
            Some((key, value)) => Ok(Self::new(key, value)),
            None => Err(Error::InvalidFilterSyntax(token.to_string())),
        }
    }

    pub fn mode(&self) -> FilterMode {
        if NESTED_JSON_KEYS.contains(&self.key.as_str()) {
            FilterMode::NestedJson
        } else if self.key == "url" {
            FilterMode::Substring
        } else {
            FilterMode::Exact
        }
    }

    /// The fragment a JSON-encoded blob contains when it holds this pair.
    pub fn json_fragment(&self) -> String {
        format!("{}\": \"{}\"", self.key, self.value)
    }
}

/// Parse every token; the first malformed one aborts the whole list.
pub fn parse_filters<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<MetadataFilter>> {
    tokens.iter().map(|t| MetadataFilter::parse(t.as_ref())).collect()
}

/// Like [`parse_filters`], but an empty list is rejected: batch get and
/// delete never act on a whole collection.
pub fn parse_batch_filters<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<MetadataFilter>> {
    if tokens.is_empty() {
        return Err(Error::InvalidFilterSyntax("<no filters>".to_string()));
    }
    parse_filters(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    Like,
    Equal,
}

/// Boolean filter tree in the backend's vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
    Leaf { path: Vec<String>, operator: FilterOperator, value: String },
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
}

impl FilterNode {
    pub fn like(path: &[&str], value: impl Into<String>) -> Self {
        Self::Leaf { path: path.iter().map(|s| (*s).to_string()).collect(), operator: FilterOperator::Like, value: value.into() }
    }

    pub fn equal(path: &[&str], value: impl Into<String>) -> Self {
        Self::Leaf { path: path.iter().map(|s| (*s).to_string()).collect(), operator: FilterOperator::Equal, value: value.into() }
    }

    /// AND of `nodes`, collapsing a single operand to itself.
    pub fn all(mut nodes: Vec<FilterNode>) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(Self::And(nodes)),
        }
    }

    /// OR of `nodes`, collapsing a single operand to itself.
    pub fn any(mut nodes: Vec<FilterNode>) -> Option<Self> {
        match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(Self::Or(nodes)),
        }
    }
}

/// Wrap `value` for a wildcard substring comparison.
pub fn wildcard(value: &str) -> String {
    format!("*{value}*")
}

/// Compiles filters against a collection's discovered schema.
pub struct MetadataFilterCompiler<'a> {
    schema: &'a CollectionSchema,
}

impl<'a> MetadataFilterCompiler<'a> {
    pub fn new(schema: &'a CollectionSchema) -> Self { Self { schema } }

    /// AND of every filter; `None` for an empty list.
    pub fn compile(&self, filters: &[MetadataFilter]) -> Option<FilterNode> {
        FilterNode::all(filters.iter().filter_map(|f| self.compile_one(f)).collect())
    }

    fn compile_one(&self, filter: &MetadataFilter) -> Option<FilterNode> {
        let key = filter.key.as_str();
        let top_level = self.schema.has_property(key);
        let nested = self.schema.metadata_sub_field(key);
        let mut targets = Vec::new();
        match filter.mode() {
            FilterMode::NestedJson => {
                if nested {
                    targets.push(FilterNode::equal(&[METADATA_FIELD, key], filter.value.clone()));
                } else if self.schema.metadata_is_flat() || !self.schema.is_known() || !top_level {
                    targets.push(FilterNode::like(&[METADATA_FIELD], wildcard(&filter.json_fragment())));
                }
                if top_level {
                    targets.push(FilterNode::equal(&[key], filter.value.clone()));
                }
            }
            FilterMode::Substring => {
                targets.push(FilterNode::like(&[key], wildcard(&filter.value)));
                if nested {
                    targets.push(FilterNode::like(&[METADATA_FIELD, key], wildcard(&filter.value)));
                }
            }
            FilterMode::Exact => {
                if top_level || !nested {
                    targets.push(FilterNode::equal(&[key], filter.value.clone()));
                }
                if nested {
                    targets.push(FilterNode::equal(&[METADATA_FIELD, key], filter.value.clone()));
                }
            }
        }
        FilterNode::any(targets)
    }
}
