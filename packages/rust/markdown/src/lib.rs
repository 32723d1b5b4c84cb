//! Markdown-with-frontmatter rendering for formatted documents.
//!
//! [`MatterMarkdownAdapter`] turns a [`Document`] into a YAML frontmatter block
//! built from its properties, followed by the markdown body.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use pressmark_shared::{Document, PressError, Result};

/// Property key holding the document title in the frontmatter.
const TITLE_KEY: &str = "title";

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Renders documents as `---` frontmatter plus markdown body.
#[derive(Debug, Clone, Default)]
pub struct MatterMarkdownAdapter {
    /// Property keys left out of the frontmatter.
    exclude: Vec<String>,
}

impl MatterMarkdownAdapter {
    /// Adapter that drops the given property keys from the frontmatter.
    pub fn new<I, S>(exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Render the document.
    ///
    /// The title is emitted first unless the properties already carry one.
    /// Properties with `null` values are skipped.
    #[instrument(skip_all, fields(title = %doc.title))]
    pub fn render(&self, doc: &Document) -> Result<String> {
        let mut fm = String::from("---\n");

        if !doc.properties.contains_key(TITLE_KEY) && !self.is_excluded(TITLE_KEY) {
            push_entry(&mut fm, TITLE_KEY, &Value::String(doc.title.clone()))?;
        }

        for (key, value) in &doc.properties {
            if self.is_excluded(key) || value.is_null() {
                continue;
            }
            push_entry(&mut fm, key, value)?;
        }
        fm.push_str("---\n");

        let markdown = format!("{fm}\n{}", doc.body);
        debug!(final_len = markdown.len(), "frontmatter rendered");
        Ok(markdown)
    }

    fn is_excluded(&self, key: &str) -> bool {
        self.exclude.iter().any(|k| k == key)
    }
}

// ---------------------------------------------------------------------------
// YAML helpers
// ---------------------------------------------------------------------------

/// Append one `key: value` entry. Arrays become block sequences.
fn push_entry(fm: &mut String, key: &str, value: &Value) -> Result<()> {
    let key = render_key(key);
    match value {
        Value::Array(items) if items.is_empty() => {
            fm.push_str(&format!("{key}: []\n"));
        }
        Value::Array(items) => {
            fm.push_str(&format!("{key}:\n"));
            for item in items {
                fm.push_str(&format!("  - {}\n", render_scalar(item)?));
            }
        }
        other => {
            fm.push_str(&format!("{key}: {}\n", render_scalar(other)?));
        }
    }
    Ok(())
}

/// Render a value on a single line. Objects and nested arrays use JSON flow
/// syntax, which YAML accepts as-is.
fn render_scalar(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok("null".into()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(format!("\"{}\"", escape_yaml_string(s))),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value)
            .map_err(|e| PressError::Serialization(format!("frontmatter value: {e}"))),
    }
}

/// Keys that are not plain identifiers get quoted.
fn render_key(key: &str) -> String {
    static PLAIN_KEY_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("valid regex"));

    if PLAIN_KEY_RE.is_match(key) {
        key.to_string()
    } else {
        format!("\"{}\"", escape_yaml_string(key))
    }
}

/// Escape special characters in a YAML double-quoted string value.
fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
