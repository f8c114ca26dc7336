//! SigV4-signed JSON client bound to a scoped session.
//!
//! Shared by the model provider and the knowledge-base retriever: both POST
//! JSON to a regional AWS endpoint with the same signing rules.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kbchat_core::error::SessionExpired;
use kbchat_core::session::ScopedSession;
use thiserror::Error;
use tracing::trace;

use crate::sigv4::{self, SignableRequest, SigningParams};

/// Failures before an HTTP status is available.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Expired(#[from] SessionExpired),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Transport(String),
}

/// A raw response: status code and body text.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct SignedJsonClient {
    client: reqwest::Client,
    endpoint: String,
    service: &'static str,
    session: Arc<ScopedSession>,
}

impl SignedJsonClient {
    pub fn new(
        endpoint: impl Into<String>,
        service: &'static str,
        session: Arc<ScopedSession>,
        timeout: Duration,
    ) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SendError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            service,
            session,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn session(&self) -> &ScopedSession {
        &self.session
    }

    /// Sign and POST `body` to `<endpoint><path>`.
    ///
    /// Fails closed with [`SendError::Expired`] once the session is past
    /// its expiry; nothing is sent in that case.
    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<RawResponse, SendError> {
        let credentials = self.session.credentials()?;
        let url = reqwest::Url::parse(&format!("{}{path}", self.endpoint))
            .map_err(|e| SendError::InvalidUrl(e.to_string()))?;
        let payload = serde_json::to_vec(body).map_err(|e| SendError::Transport(e.to_string()))?;

        let request = SignableRequest::new("POST", &url, &payload)
            .header("content-type", "application/json")
            .header("accept", "application/json");
        let signed = sigv4::sign(
            &request,
            &SigningParams {
                credentials,
                region: self.session.region(),
                service: self.service,
                time: Utc::now(),
            },
        );

        trace!(service = self.service, %url, "Sending signed request");

        let mut builder = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .header("accept", "application/json");
        for (name, value) in signed {
            builder = builder.header(name, value);
        }

        let response = builder
            .body(payload)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbchat_core::session::Credentials;

    fn session(expires_in: chrono::Duration) -> Arc<ScopedSession> {
        Arc::new(ScopedSession::new(
            Credentials::new("ASIAEXAMPLE", "secret", Some("token".into())),
            "us-west-2",
            "AssumeRoleSession1",
            Utc::now() + expires_in,
        ))
    }

    #[tokio::test]
    async fn expired_session_sends_nothing() {
        let client = SignedJsonClient::new(
            "http://127.0.0.1:9",
            "bedrock",
            session(chrono::Duration::seconds(-1)),
            Duration::from_secs(1),
        )
        .unwrap();

        let err = client
            .post_json("/model/x/invoke", &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::Expired(_)));
    }

    #[test]
    fn endpoint_is_normalized() {
        let client = SignedJsonClient::new(
            "https://bedrock-runtime.us-west-2.amazonaws.com/",
            "bedrock",
            session(chrono::Duration::hours(1)),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "https://bedrock-runtime.us-west-2.amazonaws.com");
        assert_eq!(client.session().region(), "us-west-2");
    }

    #[test]
    fn success_range() {
        assert!(RawResponse { status: 200, body: String::new() }.is_success());
        assert!(!RawResponse { status: 429, body: String::new() }.is_success());
    }
}
