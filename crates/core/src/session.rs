//! Scoped session — time-limited credentials obtained by role exchange.
//!
//! The orchestrator never looks inside a session; it is handed to the
//! retriever and provider at construction and checked for expiry before
//! every signed request.

use chrono::{DateTime, Duration, Utc};
use crate::error::SessionExpired;

/// Credentials are treated as expired this long before their real expiry.
pub const EXPIRY_SKEW_SECS: i64 = 60;

/// An access key pair with an optional session token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Assumed-role credentials bound to a region, valid until `expires_at`.
#[derive(Debug, Clone)]
pub struct ScopedSession {
    credentials: Credentials,
    region: String,
    label: String,
    expires_at: DateTime<Utc>,
}

impl ScopedSession {
    pub fn new(
        credentials: Credentials,
        region: impl Into<String>,
        label: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            label: label.into(),
            expires_at,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// The session label used for the role exchange.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the session is unusable at `now`, including the skew margin.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }

    /// Credentials for signing, or `SessionExpired` once past expiry.
    pub fn credentials(&self) -> Result<&Credentials, SessionExpired> {
        self.credentials_at(Utc::now())
    }

    pub fn credentials_at(&self, now: DateTime<Utc>) -> Result<&Credentials, SessionExpired> {
        if self.is_expired_at(now) {
            return Err(SessionExpired {
                expired_at: self.expires_at,
            });
        }
        Ok(&self.credentials)
    }
}
