//! Typed `Get` queries rendered to GraphQL text.
//!
//! All user-supplied strings pass through [`quote`], so query text and filter
//! values can never break out of their literal.

use std::fmt::Write as _;

use weave_core::{FilterNode, FilterOperator, MetadataShape};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOperator {
    None,
    NearText { concepts: Vec<String> },
    Bm25 { query: String, properties: Vec<String> },
    Hybrid { query: String, properties: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdditionalField {
    Id,
    Distance,
    Score,
}

impl AdditionalField {
    fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Distance => "distance",
            Self::Score => "score",
        }
    }
}

/// A selected property; objects list their nested fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Field(String),
    Object { name: String, fields: Vec<String> },
}

impl Selection {
    pub fn field(name: &str) -> Self { Self::Field(name.to_string()) }

    /// Selection for the metadata property in the given shape.
    pub fn metadata(name: &str, shape: &MetadataShape) -> Self {
        match shape {
            MetadataShape::FlatString => Self::Field(name.to_string()),
            MetadataShape::Structured(fields) => Self::Object { name: name.to_string(), fields: fields.clone() },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetQuery {
    pub class: String,
    pub search: SearchOperator,
    pub filter: Option<FilterNode>,
    pub limit: Option<usize>,
    pub additional: Vec<AdditionalField>,
    pub fields: Vec<Selection>,
}

impl GetQuery {
    pub fn new(class: &str) -> Self {
        Self {
            class: class.to_string(),
            search: SearchOperator::None,
            filter: None,
            limit: None,
            additional: vec![AdditionalField::Id],
            fields: Vec::new(),
        }
    }

    pub fn search(mut self, search: SearchOperator) -> Self { self.search = search; self }

    pub fn filter(mut self, filter: Option<FilterNode>) -> Self { self.filter = filter; self }

    pub fn limit(mut self, limit: usize) -> Self { self.limit = Some(limit); self }

    pub fn additional(mut self, field: AdditionalField) -> Self {
        if !self.additional.contains(&field) {
            self.additional.push(field);
        }
        self
    }

    pub fn select(mut self, fields: Vec<Selection>) -> Self { self.fields = fields; self }

    pub fn to_graphql(&self) -> String {
        let mut args = Vec::new();
        match &self.search {
            SearchOperator::None => {}
            SearchOperator::NearText { concepts } => {
                args.push(format!("nearText: {{concepts: {}}}", string_list(concepts)));
            }
            SearchOperator::Bm25 { query, properties } => {
                args.push(format!("bm25: {{query: {}, properties: {}}}", quote(query), string_list(properties)));
            }
            SearchOperator::Hybrid { query, properties } => {
                args.push(format!("hybrid: {{query: {}, properties: {}}}", quote(query), string_list(properties)));
            }
        }
        if let Some(filter) = &self.filter {
            args.push(format!("where: {}", render_filter(filter)));
        }
        if let Some(limit) = self.limit {
            args.push(format!("limit: {limit}"));
        }

        let mut out = String::from("{ Get { ");
        out.push_str(&self.class);
        if !args.is_empty() {
            let _ = write!(out, "({})", args.join(", "));
        }
        out.push_str(" { ");
        for field in &self.fields {
            match field {
                Selection::Field(name) => {
                    let _ = write!(out, "{name} ");
                }
                Selection::Object { name, fields } => {
                    let _ = write!(out, "{name} {{ {} }} ", fields.join(" "));
                }
            }
        }
        let additional: Vec<&str> = self.additional.iter().map(|a| a.as_str()).collect();
        let _ = write!(out, "_additional {{ {} }} }} }} }}", additional.join(" "));
        out
    }
}

/// Count query for one class.
pub fn aggregate_count(class: &str) -> String {
    format!("{{ Aggregate {{ {class} {{ meta {{ count }} }} }} }}")
}

pub fn render_filter(node: &FilterNode) -> String {
    match node {
        FilterNode::Leaf { path, operator, value } => {
            let op = match operator {
                FilterOperator::Like => "Like",
                FilterOperator::Equal => "Equal",
            };
            format!("{{path: {}, operator: {op}, valueText: {}}}", string_list(path), quote(value))
        }
        FilterNode::And(nodes) => composite("And", nodes),
        FilterNode::Or(nodes) => composite("Or", nodes),
    }
}

fn composite(op: &str, nodes: &[FilterNode]) -> String {
    let operands: Vec<String> = nodes.iter().map(render_filter).collect();
    format!("{{operator: {op}, operands: [{}]}}", operands.join(", "))
}

fn string_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| quote(s.as_ref())).collect();
    format!("[{}]", quoted.join(", "))
}

/// A GraphQL string literal. JSON string escaping is valid GraphQL.
pub fn quote(raw: &str) -> String {
    serde_json::Value::String(raw.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_text_query_shape() {
        let q = GetQuery::new("WeaveDocs")
            .search(SearchOperator::NearText { concepts: vec!["machine learning".into()] })
            .limit(5)
            .additional(AdditionalField::Distance)
            .select(vec![Selection::field("content"), Selection::field("metadata")]);
        assert_eq!(
            q.to_graphql(),
            r#"{ Get { WeaveDocs(nearText: {concepts: ["machine learning"]}, limit: 5) { content metadata _additional { id distance } } } }"#
        );
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        assert_eq!(quote(r#"say "hi" \o/"#), r#""say \"hi\" \\o/""#);
        let q = GetQuery::new("Docs").search(SearchOperator::Bm25 {
            query: "a\"} } }".into(),
            properties: vec!["content".into()],
        });
        assert!(q.to_graphql().contains(r#"bm25: {query: "a\"} } }", properties: ["content"]}"#));
    }

    #[test]
    fn control_characters_are_unicode_escaped() {
        assert_eq!(quote("a\u{0b}b\u{01}"), r#""a\u000bb\u0001""#);
        assert_eq!(quote("line\nnext"), r#""line\nnext""#);
    }

    #[test]
    fn filter_tree_rendering() {
        let node = FilterNode::And(vec![
            FilterNode::like(&["metadata"], "*filename\": \"a.pdf\"*"),
            FilterNode::Or(vec![FilterNode::equal(&["type"], "pdf"), FilterNode::equal(&["metadata", "type"], "pdf")]),
        ]);
        assert_eq!(
            render_filter(&node),
            r#"{operator: And, operands: [{path: ["metadata"], operator: Like, valueText: "*filename\": \"a.pdf\"*"}, {operator: Or, operands: [{path: ["type"], operator: Equal, valueText: "pdf"}, {path: ["metadata", "type"], operator: Equal, valueText: "pdf"}]}]}"#
        );
    }

    #[test]
    fn structured_metadata_selection() {
        let q = GetQuery::new("Docs")
            .select(vec![Selection::metadata("metadata", &MetadataShape::Structured(vec!["author".into(), "year".into()]))]);
        assert_eq!(q.to_graphql(), "{ Get { Docs { metadata { author year } _additional { id } } } }");
    }
}
