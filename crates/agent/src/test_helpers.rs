//! Shared test helpers for orchestrator tests.

use std::sync::Mutex;

use kbchat_core::document::Document;
use kbchat_core::error::{GenerationError, RetrievalError};
use kbchat_core::provider::Provider;
use kbchat_core::retriever::Retriever;

use crate::prompt::{Exemplar, PromptAssembler, PromptTemplate, QA_SLOTS};

/// A provider that returns scripted results in sequence and records every
/// prompt it receives.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut prompts = self.prompts.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = prompts.len();
        if index >= responses.len() {
            panic!(
                "ScriptedProvider: no more responses (call #{index}, have {})",
                responses.len()
            );
        }
        prompts.push(prompt.to_string());
        responses[index].clone()
    }
}

/// A retriever that returns scripted results in sequence and records every
/// query. Once the script is exhausted it returns no documents.
pub struct ScriptedRetriever {
    responses: Mutex<Vec<Result<Vec<Document>, RetrievalError>>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedRetriever {
    pub fn new(responses: Vec<Result<Vec<Document>, RetrievalError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn documents(docs: Vec<Document>) -> Self {
        Self::new(vec![Ok(docs)])
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Retriever for ScriptedRetriever {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        let mut queries = self.queries.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = queries.len();
        queries.push(query.to_string());
        responses.get(index).cloned().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// An assembler with a minimal QA template and one exemplar.
pub fn assembler() -> PromptAssembler {
    let qa = PromptTemplate::few_shot(
        "Context:\n{context}",
        &[Exemplar::new("example question", "example answer")],
        "History:\n{chat_history}\nQuestion: {question}\nAnswer:",
        &QA_SLOTS,
    )
    .unwrap();
    PromptAssembler::new(qa, 1).unwrap()
}

pub fn kb_document(payload: &str, url: &str, number: &str) -> Document {
    Document::new(payload)
        .with_metadata("kb_url", url)
        .with_metadata("kb_number", number)
}
