//! Retriever implementations for kbchat.
//!
//! All retrievers implement the `kbchat_core::Retriever` trait.

pub mod knowledge_base;

pub use knowledge_base::KnowledgeBaseRetriever;
