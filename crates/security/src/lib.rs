//! Security layer for kbchat.
//!
//! Provides:
//! - AWS Signature Version 4 request signing
//! - STS `AssumeRole` exchange
//! - A signed JSON client bound to a scoped session
//! - The credential broker that turns configuration into a scoped session

pub mod broker;
pub mod client;
pub mod sigv4;
pub mod sts;

pub use broker::CredentialBroker;
pub use client::{RawResponse, SendError, SignedJsonClient};
pub use sigv4::{SignableRequest, SigningParams};
pub use sts::{AssumedCredentials, RoleExchange, StsClient};
