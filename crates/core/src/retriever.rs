//! Retriever trait — query in, relevance-ordered documents out.

use async_trait::async_trait;
use crate::document::Document;
use crate::error::RetrievalError;

/// Number of documents requested per query.
pub const TOP_K: usize = 4;

/// The core Retriever trait.
///
/// Implementations return results in the search service's relevance order
/// and never re-rank. An empty result is a valid answer, not an error.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// The backend name (e.g., "bedrock-kb").
    fn name(&self) -> &str;

    /// Fetch up to [`TOP_K`] documents for `query`.
    async fn retrieve(&self, query: &str) -> std::result::Result<Vec<Document>, RetrievalError>;
}
