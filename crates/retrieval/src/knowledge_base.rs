//! Bedrock knowledge-base retriever.
//!
//! Runs a vector search against a managed knowledge base via the agent
//! runtime `Retrieve` API and maps each hit to a [`Document`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kbchat_config::Settings;
use kbchat_core::document::Document;
use kbchat_core::error::RetrievalError;
use kbchat_core::retriever::{Retriever, TOP_K};
use kbchat_core::session::ScopedSession;
use kbchat_security::client::{RawResponse, SendError, SignedJsonClient};
use kbchat_security::sigv4::uri_encode;
use serde::Deserialize;
use tracing::{debug, warn};

const SERVICE: &str = "bedrock";

pub struct KnowledgeBaseRetriever {
    knowledge_base_id: String,
    top_k: usize,
    client: SignedJsonClient,
}

impl KnowledgeBaseRetriever {
    pub fn new(
        knowledge_base_id: impl Into<String>,
        session: Arc<ScopedSession>,
        timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let endpoint = format!("https://bedrock-agent-runtime.{}.amazonaws.com", session.region());
        Self::with_endpoint(knowledge_base_id, session, timeout, endpoint)
    }

    pub fn with_endpoint(
        knowledge_base_id: impl Into<String>,
        session: Arc<ScopedSession>,
        timeout: Duration,
        endpoint: impl Into<String>,
    ) -> Result<Self, RetrievalError> {
        let client = SignedJsonClient::new(endpoint, SERVICE, session, timeout)
            .map_err(|e| RetrievalError::Network(e.to_string()))?;
        Ok(Self {
            knowledge_base_id: knowledge_base_id.into(),
            top_k: TOP_K,
            client,
        })
    }

    /// Build from settings, honouring `agent_runtime_endpoint`.
    pub fn from_settings(settings: &Settings, session: Arc<ScopedSession>) -> Result<Self, RetrievalError> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        match &settings.agent_runtime_endpoint {
            Some(endpoint) => Self::with_endpoint(
                settings.knowledge_base_id.clone(),
                session,
                timeout,
                endpoint.clone(),
            ),
            None => Self::new(settings.knowledge_base_id.clone(), session, timeout),
        }
    }

    pub fn knowledge_base_id(&self) -> &str {
        &self.knowledge_base_id
    }

    fn retrieve_path(&self) -> String {
        format!("/knowledgebases/{}/retrieve", uri_encode(&self.knowledge_base_id, true))
    }

    fn build_body(query: &str, top_k: usize) -> serde_json::Value {
        serde_json::json!({
            "retrievalQuery": { "text": query },
            "retrievalConfiguration": {
                "vectorSearchConfiguration": { "numberOfResults": top_k }
            }
        })
    }

    fn parse_response(response: RawResponse) -> Result<Vec<Document>, RetrievalError> {
        if response.status == 429 {
            return Err(RetrievalError::Throttled);
        }
        if !response.is_success() {
            warn!(status = response.status, body = %response.body, "Knowledge base API error");
            return Err(RetrievalError::ApiError {
                status_code: response.status,
                message: response.body,
            });
        }

        let parsed: RetrieveResponse = serde_json::from_str(&response.body).map_err(|e| {
            RetrievalError::InvalidResponse(format!("Failed to parse retrieve response: {e}"))
        })?;

        Ok(parsed.retrieval_results.into_iter().map(to_document).collect())
    }
}

// Service metadata is flattened onto the document; `location` and `score`
// ride along so sources can still be cited when `kb_url` is absent.
fn to_document(result: RetrievalResult) -> Document {
    let mut doc = Document::new(result.content.text);
    for (key, value) in result.metadata {
        doc.metadata.insert(key, value);
    }
    if let Some(location) = result.location {
        doc.metadata.insert("location".into(), location);
    }
    if let Some(score) = result.score {
        doc.metadata.insert("score".into(), score.into());
    }
    doc
}

#[async_trait]
impl Retriever for KnowledgeBaseRetriever {
    fn name(&self) -> &str {
        "bedrock-kb"
    }

    async fn retrieve(&self, query: &str) -> std::result::Result<Vec<Document>, RetrievalError> {
        debug!(knowledge_base_id = %self.knowledge_base_id, top_k = self.top_k, "Retrieving documents");

        let response = self
            .client
            .post_json(&self.retrieve_path(), &Self::build_body(query, self.top_k))
            .await
            .map_err(|e| match e {
                SendError::Expired(expired) => RetrievalError::SessionExpired(expired),
                other => RetrievalError::Network(other.to_string()),
            })?;

        let documents = Self::parse_response(response)?;
        debug!(count = documents.len(), "Documents retrieved");
        Ok(documents)
    }
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_results: Vec<RetrievalResult>,
}

#[derive(Debug, Deserialize)]
struct RetrievalResult {
    content: RetrievalContent,
    #[serde(default)]
    location: Option<serde_json::Value>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RetrievalContent {
    text: String,
}
