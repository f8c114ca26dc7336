//! Document — a retrieved unit of grounding context.

use serde::{Deserialize, Serialize};

/// Metadata key carrying the display URL of a knowledge-base article.
pub const SOURCE_URL_KEY: &str = "kb_url";
/// Metadata key carrying the article number.
pub const IDENTIFIER_KEY: &str = "kb_number";

/// A retrieved document: payload text plus provenance metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// The text content
    pub payload: String,

    /// Provenance (source URL, identifier, location, score, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Attach a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Display URL: the `kb_url` field, else the retrieval location URI.
    pub fn source_url(&self) -> Option<String> {
        if let Some(url) = self.metadata_str(SOURCE_URL_KEY) {
            return Some(url.to_string());
        }
        let location = self.metadata.get("location")?;
        ["s3Location", "webLocation", "confluenceLocation", "sharePointLocation", "salesforceLocation"]
            .iter()
            .find_map(|kind| {
                location
                    .get(kind)
                    .and_then(|l| l.get("uri").or_else(|| l.get("url")))
                    .and_then(|u| u.as_str())
            })
            .map(str::to_string)
    }

    /// Article identifier, stringified when stored as a number.
    pub fn identifier(&self) -> Option<String> {
        match self.metadata.get(IDENTIFIER_KEY)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Relevance score reported by the search service, if any.
    pub fn score(&self) -> Option<f64> {
        self.metadata.get("score").and_then(|v| v.as_f64())
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// Concatenate document payloads into the QA prompt's context text.
pub fn join_payloads(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.payload.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
