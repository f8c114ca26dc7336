//! Credential broker: base credentials in, scoped session out.

use std::sync::Arc;
use std::time::Duration;

use kbchat_config::Settings;
use kbchat_core::error::AuthError;
use kbchat_core::session::ScopedSession;
use tracing::{error, info};

use crate::sts::{RoleExchange, StsClient};

/// Performs the role exchange once per session bootstrap.
///
/// No caching, no refresh: a new session means a new call to
/// [`establish`](Self::establish).
pub struct CredentialBroker {
    exchange: Arc<dyn RoleExchange>,
}

impl CredentialBroker {
    pub fn new(exchange: Arc<dyn RoleExchange>) -> Self {
        Self { exchange }
    }

    /// A broker backed by STS in the configured region.
    pub fn from_settings(settings: &Settings) -> Result<Self, AuthError> {
        let mut client = StsClient::new(
            settings.region.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        if let Some(endpoint) = &settings.sts_endpoint {
            client = client.with_endpoint(endpoint.clone());
        }
        Ok(Self::new(Arc::new(client)))
    }

    /// Exchange base credentials for a session scoped to `settings.role_arn`.
    pub async fn establish(&self, settings: &Settings) -> Result<ScopedSession, AuthError> {
        let base = settings.base_credentials().ok_or_else(|| {
            let err = AuthError::MissingBaseCredentials(
                "set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, or aws_access_key_id and aws_secret_access_key in configuration".into(),
            );
            error!(error = %err, "Credential exchange failed");
            err
        })?;

        let assumed = self
            .exchange
            .assume_role(&base, &settings.role_arn, &settings.session_name)
            .await
            .map_err(|e| {
                error!(role_arn = %settings.role_arn, error = %e, "Credential exchange failed");
                e
            })?;

        info!(
            role_arn = %settings.role_arn,
            session_name = %settings.session_name,
            region = %settings.region,
            expires_at = %assumed.expires_at,
            "Scoped session established"
        );

        Ok(ScopedSession::new(
            assumed.credentials,
            settings.region.clone(),
            settings.session_name.clone(),
            assumed.expires_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sts::AssumedCredentials;
    use async_trait::async_trait;
    use chrono::Utc;
    use kbchat_config::{ConfigResolver, LayerRegistry};
    use kbchat_core::session::Credentials;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeExchange {
        calls: Mutex<Vec<(String, String, String)>>,
        reject: bool,
    }

    #[async_trait]
    impl RoleExchange for FakeExchange {
        async fn assume_role(
            &self,
            base: &Credentials,
            role_arn: &str,
            session_name: &str,
        ) -> Result<AssumedCredentials, AuthError> {
            self.calls.lock().unwrap().push((
                base.access_key_id.clone(),
                role_arn.to_string(),
                session_name.to_string(),
            ));
            if self.reject {
                return Err(AuthError::Rejected {
                    status_code: 403,
                    code: "AccessDenied".into(),
                    message: "not authorized".into(),
                });
            }
            Ok(AssumedCredentials {
                credentials: Credentials::new("ASIATEMP", "temp-secret", Some("temp-token".into())),
                expires_at: Utc::now() + chrono::Duration::hours(1),
            })
        }
    }

    fn settings(extra: &str) -> Settings {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = LayerRegistry::new();
        registry.insert(
            "default",
            format!(
                "region = \"us-west-2\"\n\
                 role_arn = \"arn:aws:iam::123456789012:role/kb-reader\"\n\
                 knowledge_base_id = \"KB01\"\n{extra}"
            ),
        );
        let config = ConfigResolver::standard("test", dir.path(), Arc::new(registry))
            .resolve()
            .unwrap();
        Settings::from_config(&config).unwrap()
    }

    const CONFIGURED_KEYS: &str =
        "aws_access_key_id = \"AKIDBASE\"\naws_secret_access_key = \"base-secret\"\n";

    fn env_credentials_present() -> bool {
        std::env::var(kbchat_config::settings::ACCESS_KEY_ID_VAR).is_ok()
    }

    #[tokio::test]
    async fn establishes_session_with_configured_label() {
        let exchange = Arc::new(FakeExchange::default());
        let broker = CredentialBroker::new(exchange.clone());

        let session = broker.establish(&settings(CONFIGURED_KEYS)).await.unwrap();

        assert_eq!(session.region(), "us-west-2");
        assert_eq!(session.label(), "AssumeRoleSession1");
        assert_eq!(session.credentials().unwrap().access_key_id, "ASIATEMP");

        let calls = exchange.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "arn:aws:iam::123456789012:role/kb-reader");
        assert_eq!(calls[0].2, "AssumeRoleSession1");
        if !env_credentials_present() {
            assert_eq!(calls[0].0, "AKIDBASE");
        }
    }

    #[tokio::test]
    async fn rejection_is_propagated() {
        let exchange = Arc::new(FakeExchange {
            reject: true,
            ..Default::default()
        });
        let broker = CredentialBroker::new(exchange);

        let err = broker.establish(&settings(CONFIGURED_KEYS)).await.unwrap_err();

        assert!(matches!(err, AuthError::Rejected { status_code: 403, .. }));
    }

    #[tokio::test]
    async fn missing_base_credentials_fails_before_exchange() {
        if env_credentials_present() {
            return;
        }
        let exchange = Arc::new(FakeExchange::default());
        let broker = CredentialBroker::new(exchange.clone());

        let err = broker.establish(&settings("")).await.unwrap_err();

        assert!(matches!(err, AuthError::MissingBaseCredentials(_)));
        assert!(exchange.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn from_settings_honours_endpoint_override() {
        let s = settings("sts_endpoint = \"http://127.0.0.1:4566\"\n");
        assert!(CredentialBroker::from_settings(&s).is_ok());
    }
}
