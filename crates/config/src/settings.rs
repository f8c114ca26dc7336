//! Typed view over the effective configuration.

use std::path::PathBuf;
use kbchat_core::session::Credentials;
use serde::Deserialize;

use crate::resolver::EffectiveConfig;
use crate::ConfigError;

/// Keys that must be present after all layers are merged.
const REQUIRED_KEYS: &[&str] = &["region", "role_arn", "knowledge_base_id"];

pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// Everything the session bootstrap needs, extracted from an
/// [`EffectiveConfig`].
#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Resolved environment name
    pub environment: String,

    /// AWS region for every service client
    pub region: String,

    /// Role assumed for the scoped session
    pub role_arn: String,

    /// Knowledge base searched for grounding documents
    pub knowledge_base_id: String,

    /// Bedrock model identifier
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Session label sent with the role exchange
    #[serde(default = "default_session_name")]
    pub session_name: String,

    /// Directory holding prompt prefix, suffix and few-shot examples
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,

    /// Assistant greeting seeded into a new conversation
    #[serde(default)]
    pub welcome_message: Option<String>,

    /// HTTP timeout for every outbound call
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Override for the STS endpoint (proxies, tests)
    #[serde(default)]
    pub sts_endpoint: Option<String>,

    /// Override for the Bedrock runtime endpoint
    #[serde(default)]
    pub bedrock_runtime_endpoint: Option<String>,

    /// Override for the Bedrock agent runtime endpoint
    #[serde(default)]
    pub agent_runtime_endpoint: Option<String>,

    #[serde(default)]
    aws_access_key_id: Option<String>,

    #[serde(default)]
    aws_secret_access_key: Option<String>,

    #[serde(default)]
    aws_session_token: Option<String>,
}

fn default_model_id() -> String {
    "anthropic.claude-instant-v1".into()
}
fn default_session_name() -> String {
    "AssumeRoleSession1".into()
}
fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}
fn default_timeout() -> u64 {
    60
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("environment", &self.environment)
            .field("region", &self.region)
            .field("role_arn", &self.role_arn)
            .field("knowledge_base_id", &self.knowledge_base_id)
            .field("model_id", &self.model_id)
            .field("session_name", &self.session_name)
            .field("templates_dir", &self.templates_dir)
            .field("welcome_message", &self.welcome_message)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("sts_endpoint", &self.sts_endpoint)
            .field("bedrock_runtime_endpoint", &self.bedrock_runtime_endpoint)
            .field("agent_runtime_endpoint", &self.agent_runtime_endpoint)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field(
                "aws_secret_access_key",
                &self.aws_secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field(
                "aws_session_token",
                &self.aws_session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Settings {
    /// Extract typed settings, failing on missing or ill-typed keys.
    pub fn from_config(config: &EffectiveConfig) -> Result<Self, ConfigError> {
        if let Some(key) = REQUIRED_KEYS.iter().find(|&&k| !config.contains_key(k)) {
            return Err(ConfigError::Missing {
                key: (*key).to_string(),
            });
        }

        let settings: Self = toml::Value::Table(config.values().clone())
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Invalid(e.message().to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("region", &self.region),
            ("role_arn", &self.role_arn),
            ("knowledge_base_id", &self.knowledge_base_id),
            ("model_id", &self.model_id),
            ("session_name", &self.session_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{key} must not be empty")));
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Base credentials for the role exchange.
    ///
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`
    /// win over the configured `aws_*` keys.
    pub fn base_credentials(&self) -> Option<Credentials> {
        let from_env = |var: &str| std::env::var(var).ok().filter(|v| !v.is_empty());

        if let (Some(id), Some(secret)) = (from_env(ACCESS_KEY_ID_VAR), from_env(SECRET_ACCESS_KEY_VAR)) {
            return Some(Credentials::new(id, secret, from_env(SESSION_TOKEN_VAR)));
        }

        match (&self.aws_access_key_id, &self.aws_secret_access_key) {
            (Some(id), Some(secret)) => Some(Credentials::new(
                id.clone(),
                secret.clone(),
                self.aws_session_token.clone(),
            )),
            _ => None,
        }
    }

    /// Whether base credentials are present in configuration (not env).
    pub fn has_configured_credentials(&self) -> bool {
        self.aws_access_key_id.is_some() && self.aws_secret_access_key.is_some()
    }
}
