//! Discovered collection layout.
//!
//! The engine has no static knowledge of a collection's fields. A schema is
//! either discovered from the backend or, when discovery failed, the
//! degraded [`CollectionSchema::id_only`] form that only allows ID queries.

use serde::{Deserialize, Serialize};

pub const CONTENT_FIELD: &str = "content";
pub const TEXT_FIELD: &str = "text";
pub const METADATA_FIELD: &str = "metadata";

/// Candidate primary content fields, most preferred first.
pub const CONTENT_FIELD_PREFERENCE: [&str; 2] = [CONTENT_FIELD, TEXT_FIELD];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub name: String,
    pub data_type: Vec<String>,
    pub nested: Vec<String>,
}

impl PropertyInfo {
    pub fn text(name: &str) -> Self {
        Self { name: name.to_string(), data_type: vec!["text".to_string()], nested: Vec::new() }
    }

    pub fn object(name: &str, nested: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            data_type: vec!["object".to_string()],
            nested: nested.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn is_object(&self) -> bool {
        self.data_type.first().is_some_and(|t| t.starts_with("object"))
    }
}

/// Shape of the `metadata` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataShape {
    FlatString,
    Structured(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCapability {
    Full,
    IdOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    properties: Vec<PropertyInfo>,
    capability: SchemaCapability,
}

impl CollectionSchema {
    pub fn discovered(properties: Vec<PropertyInfo>) -> Self {
        Self { properties, capability: SchemaCapability::Full }
    }

    /// Degraded result used when the backend could not be asked.
    pub fn id_only() -> Self {
        Self { properties: Vec::new(), capability: SchemaCapability::IdOnly }
    }

    pub fn capability(&self) -> SchemaCapability { self.capability }

    pub fn is_known(&self) -> bool { self.capability == SchemaCapability::Full }

    pub fn properties(&self) -> &[PropertyInfo] { &self.properties }

    pub fn property_names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.name.clone()).collect()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name == name)
    }

    /// `content` before `text`; first available wins.
    pub fn content_field(&self) -> Option<&'static str> {
        CONTENT_FIELD_PREFERENCE.into_iter().find(|f| self.has_property(f))
    }

    pub fn metadata_shape(&self) -> Option<MetadataShape> {
        let prop = self.properties.iter().find(|p| p.name == METADATA_FIELD)?;
        if prop.is_object() && !prop.nested.is_empty() {
            Some(MetadataShape::Structured(prop.nested.clone()))
        } else {
            Some(MetadataShape::FlatString)
        }
    }

    pub fn metadata_is_flat(&self) -> bool {
        matches!(self.metadata_shape(), Some(MetadataShape::FlatString))
    }

    pub fn metadata_sub_field(&self, key: &str) -> bool {
        match self.metadata_shape() {
            Some(MetadataShape::Structured(fields)) => fields.iter().any(|f| f == key),
            _ => false,
        }
    }

    /// Fields a keyword or substring search may target. Both `content` and
    /// `text` are included when present; `metadata` only on request.
    pub fn searchable_fields(&self, include_metadata: bool) -> Vec<String> {
        let mut fields: Vec<String> = CONTENT_FIELD_PREFERENCE
            .into_iter()
            .filter(|f| self.has_property(f))
            .map(str::to_string)
            .collect();
        if include_metadata && self.has_property(METADATA_FIELD) {
            fields.push(METADATA_FIELD.to_string());
        }
        fields
    }
}
