//! Amazon Bedrock provider implementation.
//!
//! Invokes a text-completion model through the Bedrock runtime
//! `InvokeModel` API, signed with the session's scoped credentials.
//!
//! Features:
//! - Anthropic text-completion framing (`\n\nHuman: ... \n\nAssistant:`)
//! - Decoding parameters fixed at construction
//! - Fails closed once the scoped session expires

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kbchat_config::Settings;
use kbchat_core::error::GenerationError;
use kbchat_core::provider::{DecodingParams, Provider};
use kbchat_core::session::ScopedSession;
use kbchat_security::client::{RawResponse, SendError, SignedJsonClient};
use kbchat_security::sigv4::uri_encode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const SERVICE: &str = "bedrock";
const HUMAN_PREFIX: &str = "\n\nHuman:";
const ASSISTANT_PREFIX: &str = "\n\nAssistant:";

/// Bedrock runtime provider.
pub struct BedrockProvider {
    name: String,
    model_id: String,
    params: DecodingParams,
    client: SignedJsonClient,
}

impl BedrockProvider {
    /// Create a provider for `model_id` using the regional runtime endpoint.
    pub fn new(
        model_id: impl Into<String>,
        session: Arc<ScopedSession>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let endpoint = format!("https://bedrock-runtime.{}.amazonaws.com", session.region());
        Self::with_endpoint(model_id, session, timeout, endpoint)
    }

    /// Create with a custom endpoint (e.g., for testing or proxies).
    pub fn with_endpoint(
        model_id: impl Into<String>,
        session: Arc<ScopedSession>,
        timeout: Duration,
        endpoint: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let client = SignedJsonClient::new(endpoint, SERVICE, session, timeout)
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        Ok(Self {
            name: "bedrock".into(),
            model_id: model_id.into(),
            params: DecodingParams::deterministic(),
            client,
        })
    }

    /// Build from settings, honouring `bedrock_runtime_endpoint`.
    pub fn from_settings(settings: &Settings, session: Arc<ScopedSession>) -> Result<Self, GenerationError> {
        let timeout = Duration::from_secs(settings.request_timeout_secs);
        match &settings.bedrock_runtime_endpoint {
            Some(endpoint) => Self::with_endpoint(settings.model_id.clone(), session, timeout, endpoint.clone()),
            None => Self::new(settings.model_id.clone(), session, timeout),
        }
    }

    /// Override the decoding parameters.
    pub fn with_params(mut self, params: DecodingParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> DecodingParams {
        self.params
    }

    fn invoke_path(&self) -> String {
        format!("/model/{}/invoke", uri_encode(&self.model_id, true))
    }

    fn build_body(prompt: &str, params: &DecodingParams) -> CompletionRequest {
        CompletionRequest {
            prompt: format!("{HUMAN_PREFIX} {prompt}{ASSISTANT_PREFIX}"),
            max_tokens_to_sample: params.max_tokens,
            temperature: params.temperature,
            top_k: params.top_k,
            stop_sequences: vec![HUMAN_PREFIX.to_string()],
        }
    }

    fn parse_response(response: RawResponse) -> Result<String, GenerationError> {
        let status = response.status;

        if status == 429 {
            return Err(GenerationError::Throttled);
        }
        if !response.is_success() {
            if is_quota_error(&response.body) {
                return Err(GenerationError::QuotaExceeded(response.body));
            }
            if status == 401 || status == 403 {
                return Err(GenerationError::Rejected(response.body));
            }
            warn!(status, body = %response.body, "Bedrock API error");
            return Err(GenerationError::ApiError {
                status_code: status,
                message: response.body,
            });
        }

        let completion: CompletionResponse = serde_json::from_str(&response.body)
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse Bedrock response: {e}")))?;

        Ok(completion.completion.trim().to_string())
    }
}

#[async_trait]
impl Provider for BedrockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError> {
        let body = serde_json::to_value(Self::build_body(prompt, &self.params))
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        debug!(provider = "bedrock", model = %self.model_id, prompt_chars = prompt.len(), "Sending completion request");

        let response = self
            .client
            .post_json(&self.invoke_path(), &body)
            .await
            .map_err(|e| match e {
                SendError::Expired(expired) => GenerationError::SessionExpired(expired),
                other => GenerationError::Network(other.to_string()),
            })?;

        Self::parse_response(response)
    }
}

// ── Wire types ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest {
    prompt: String,
    max_tokens_to_sample: u32,
    temperature: f32,
    top_k: u32,
    stop_sequences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    completion: String,
}

/// Error body returned by the Bedrock runtime on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn is_quota_error(body: &str) -> bool {
    const MARKER: &str = "ServiceQuotaExceeded";
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => [err.error_type, err.message]
            .iter()
            .flatten()
            .any(|field| field.contains(MARKER)),
        Err(_) => body.contains(MARKER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kbchat_core::session::Credentials;

    fn session(expires_in: chrono::Duration) -> Arc<ScopedSession> {
        Arc::new(ScopedSession::new(
            Credentials::new("ASIAEXAMPLE", "secret", Some("token".into())),
            "us-west-2",
            "AssumeRoleSession1",
            Utc::now() + expires_in,
        ))
    }

    fn provider() -> BedrockProvider {
        BedrockProvider::new(
            "anthropic.claude-instant-v1",
            session(chrono::Duration::hours(1)),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn constructor() {
        let p = provider();
        assert_eq!(p.name(), "bedrock");
        assert_eq!(p.model(), "anthropic.claude-instant-v1");
        assert_eq!(p.params(), DecodingParams::deterministic());
    }

    #[test]
    fn model_id_is_path_encoded() {
        let p = BedrockProvider::new(
            "anthropic.claude-v2:1",
            session(chrono::Duration::hours(1)),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(p.invoke_path(), "/model/anthropic.claude-v2%3A1/invoke");
    }

    #[test]
    fn body_frames_prompt_and_fixes_decoding() {
        let body = serde_json::to_value(BedrockProvider::build_body(
            "What is the grading policy?",
            &DecodingParams::deterministic(),
        ))
        .unwrap();

        assert_eq!(
            body["prompt"],
            "\n\nHuman: What is the grading policy?\n\nAssistant:"
        );
        assert_eq!(body["max_tokens_to_sample"], 750);
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["top_k"], 10);
        assert_eq!(body["stop_sequences"][0], "\n\nHuman:");
    }

    #[test]
    fn completion_is_trimmed() {
        let text = BedrockProvider::parse_response(raw(
            200,
            r#"{"completion":"  Grades are posted weekly.\n","stop_reason":"stop_sequence"}"#,
        ))
        .unwrap();
        assert_eq!(text, "Grades are posted weekly.");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            BedrockProvider::parse_response(raw(429, "{}")),
            Err(GenerationError::Throttled)
        ));
        assert!(matches!(
            BedrockProvider::parse_response(raw(400, r#"{"message":"ServiceQuotaExceededException"}"#)),
            Err(GenerationError::QuotaExceeded(_))
        ));
        assert!(matches!(
            BedrockProvider::parse_response(raw(403, "denied")),
            Err(GenerationError::Rejected(_))
        ));
        assert!(matches!(
            BedrockProvider::parse_response(raw(500, "boom")),
            Err(GenerationError::ApiError { status_code: 500, .. })
        ));
        assert!(matches!(
            BedrockProvider::parse_response(raw(200, "not json")),
            Err(GenerationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn quota_type_field_is_recognised() {
        let body = r#"{"__type":"com.amazon.coral.service#ServiceQuotaExceededException","message":"Too many tokens"}"#;
        assert!(matches!(
            BedrockProvider::parse_response(raw(400, body)),
            Err(GenerationError::QuotaExceeded(_))
        ));
    }

    #[test]
    fn completion_mentioning_quota_exception_succeeds() {
        let text = BedrockProvider::parse_response(raw(
            200,
            r#"{"completion":" A ServiceQuotaExceededException means the account hit its limit."}"#,
        ))
        .unwrap();
        assert!(text.starts_with("A ServiceQuotaExceededException means"));
    }

    #[test]
    fn forbidden_without_quota_marker_is_rejected() {
        assert!(matches!(
            BedrockProvider::parse_response(raw(403, r#"{"message":"User is not authorized"}"#)),
            Err(GenerationError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn expired_session_fails_closed() {
        let p = BedrockProvider::with_endpoint(
            "anthropic.claude-instant-v1",
            session(chrono::Duration::seconds(-1)),
            Duration::from_secs(1),
            "http://127.0.0.1:9",
        )
        .unwrap();

        let err = p.generate("hello").await.unwrap_err();
        assert!(matches!(err, GenerationError::SessionExpired(_)));
    }
}
