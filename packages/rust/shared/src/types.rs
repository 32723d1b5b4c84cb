//! Core domain types for Pressmark documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open property mapping carried alongside a document (frontmatter fields).
///
/// Insertion order is preserved so the serialized frontmatter keeps the
/// order in which the document source emitted the fields.
pub type Properties = Map<String, Value>;

// Well-known property keys.
pub const COVER: &str = "cover";
pub const DATE: &str = "date";
pub const PUBLISH_DATE: &str = "publishDate";
pub const UPDATED: &str = "updated";
pub const UPDATED_DATE: &str = "updatedDate";
pub const DESCRIPTION: &str = "description";
pub const TAGS: &str = "tags";

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A fetched remote document, the unit of work for the formatter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Markdown body.
    #[serde(default)]
    pub body: String,
    /// Structured properties (cover, dates, tags, ...).
    #[serde(default)]
    pub properties: Properties,
}

impl Document {
    /// Create a document with empty properties.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            properties: Properties::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// String value of a property, if present and a string.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// The cover image URL, if set to a non-empty string.
    pub fn cover(&self) -> Option<&str> {
        self.property_str(COVER).filter(|s| !s.is_empty())
    }
}
