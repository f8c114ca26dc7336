//! # kbchat Core
//!
//! Domain types, traits, and error definitions for the kbchat
//! retrieval-augmented assistant. Every collaborator of the conversation
//! orchestrator is defined as a trait here; implementations live in their
//! respective crates, so tests can swap in scripted fakes.

pub mod document;
pub mod error;
pub mod message;
pub mod provider;
pub mod retriever;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use document::Document;
pub use error::{
    AuthError, Error, GenerationError, Result, RetrievalError, SessionExpired, TemplateError,
    TemplateLoadError,
};
pub use message::{ConversationMemory, Role, Turn};
pub use provider::{DecodingParams, Provider};
pub use retriever::{Retriever, TOP_K};
pub use session::{Credentials, ScopedSession};
