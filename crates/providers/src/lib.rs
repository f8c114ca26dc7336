//! LLM provider implementations for kbchat.
//!
//! All providers implement the `kbchat_core::Provider` trait.

pub mod bedrock;

pub use bedrock::BedrockProvider;
