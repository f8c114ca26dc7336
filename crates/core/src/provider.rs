//! Provider trait — the abstraction over hosted language models.
//!
//! A Provider turns a fully rendered prompt into generated text. Decoding
//! parameters are fixed when the provider is built, so two identical prompts
//! produce the same answer; variability comes only from the prompt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::GenerationError;

/// Decoding parameters fixed at provider construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecodingParams {
    /// Temperature (0.0 = deterministic)
    pub temperature: f32,

    /// Candidate breadth: sample only from the top-k tokens
    pub top_k: u32,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl DecodingParams {
    /// Greedy decoding with the default breadth and length caps.
    pub const fn deterministic() -> Self {
        Self {
            temperature: 0.0,
            top_k: 10,
            max_tokens: 750,
        }
    }
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self::deterministic()
    }
}

/// The core Provider trait.
///
/// The orchestrator calls `generate()` for both question condensation and
/// answer generation without knowing which backend serves it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "bedrock").
    fn name(&self) -> &str;

    /// The model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Send a prompt and get the generated text back.
    async fn generate(&self, prompt: &str) -> std::result::Result<String, GenerationError>;
}
