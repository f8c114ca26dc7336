//! Conversation orchestrator — the per-turn retrieval-augmented pipeline.
//!
//! # Flow
//!
//! 1. **Condensing**: rewrite a follow-up into a standalone question (skipped
//!    when there is no prior exchange)
//! 2. **Retrieving**: fetch supporting documents for the standalone question
//! 3. **Prompting**: render the grounded QA prompt
//! 4. **Generating**: invoke the model for the answer
//!
//! Memory is written only after step 4 succeeds. A failure at any step
//! discards the turn and leaves memory exactly as it was.

use std::sync::Arc;

use kbchat_core::document::{join_payloads, Document};
use kbchat_core::error::{GenerationError, RetrievalError, TemplateError};
use kbchat_core::message::ConversationMemory;
use kbchat_core::provider::Provider;
use kbchat_core::retriever::Retriever;
use tracing::{debug, error, info};

use crate::prompt::PromptAssembler;

/// Where the orchestrator is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Condensing,
    Retrieving,
    Prompting,
    Generating,
    Failed,
}

/// Coarse classification of a turn failure, for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Retrieval,
    Generation,
    Prompt,
}

/// The error that ended a failed turn.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TurnError {
    #[error("Question condensation failed: {0}")]
    Condense(GenerationError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Prompt rendering failed: {0}")]
    Prompt(#[from] TemplateError),

    #[error("Answer generation failed: {0}")]
    Generation(GenerationError),
}

impl TurnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TurnError::Condense(_) | TurnError::Generation(_) => ErrorKind::Generation,
            TurnError::Retrieval(_) => ErrorKind::Retrieval,
            TurnError::Prompt(_) => ErrorKind::Prompt,
        }
    }
}

/// Outcome of one orchestration cycle.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// The answer text (empty on failure).
    pub answer: String,
    /// Documents retrieved for this turn, in relevance order.
    pub sources: Vec<Document>,
    /// The question actually sent to retrieval.
    pub standalone_question: Option<String>,
    /// Set when the turn failed.
    pub error: Option<TurnError>,
    /// The state the turn failed in.
    pub failed_at: Option<TurnState>,
}

impl TurnResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(TurnError::kind)
    }

    fn failed(state: TurnState, error: TurnError, standalone_question: Option<String>, sources: Vec<Document>) -> Self {
        Self {
            answer: String::new(),
            sources,
            standalone_question,
            error: Some(error),
            failed_at: Some(state),
        }
    }
}

pub struct ConversationOrchestrator {
    provider: Arc<dyn Provider>,
    retriever: Arc<dyn Retriever>,
    assembler: PromptAssembler,
    memory: ConversationMemory,
    state: TurnState,
}

impl ConversationOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        retriever: Arc<dyn Retriever>,
        assembler: PromptAssembler,
        memory: ConversationMemory,
    ) -> Self {
        Self {
            provider,
            retriever,
            assembler,
            memory,
            state: TurnState::Idle,
        }
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// State of the most recent turn: `Idle` after success, `Failed` after
    /// a failure. Intermediate states are only observable while `submit`
    /// runs.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Reset memory to its seeded state.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.state = TurnState::Idle;
        info!("Conversation memory cleared");
    }

    /// Run one turn for `raw`.
    ///
    /// `&mut self` keeps turns strictly sequential.
    pub async fn submit(&mut self, raw: &str) -> TurnResult {
        let history = self.memory.render_history();

        // ── Condensing ──
        self.transition(TurnState::Condensing);
        let standalone = if self.memory.has_history() {
            match self.condense(&history, raw).await {
                Ok(q) => q,
                Err(e) => return self.fail(TurnState::Condensing, e, None, Vec::new()),
            }
        } else {
            debug!("Empty memory; using question as-is");
            raw.to_string()
        };

        // ── Retrieving ──
        self.transition(TurnState::Retrieving);
        let documents = match self.retriever.retrieve(&standalone).await {
            Ok(docs) => docs,
            Err(e) => return self.fail(TurnState::Retrieving, e.into(), Some(standalone), Vec::new()),
        };
        debug!(documents = documents.len(), retriever = self.retriever.name(), "Documents retrieved");

        // ── Prompting ──
        self.transition(TurnState::Prompting);
        let context = join_payloads(&documents);
        let prompt = match self.assembler.render_qa(&context, &history, &standalone) {
            Ok(p) => p,
            Err(e) => return self.fail(TurnState::Prompting, e.into(), Some(standalone), documents),
        };

        // ── Generating ──
        self.transition(TurnState::Generating);
        let answer = match self.provider.generate(&prompt).await {
            Ok(a) => a,
            Err(e) => {
                return self.fail(TurnState::Generating, TurnError::Generation(e), Some(standalone), documents);
            }
        };

        self.memory.record_exchange(raw, answer.clone());
        self.transition(TurnState::Idle);
        info!(
            sources = documents.len(),
            answer_len = answer.len(),
            memory_len = self.memory.len(),
            "Turn completed"
        );

        TurnResult {
            answer,
            sources: documents,
            standalone_question: Some(standalone),
            error: None,
            failed_at: None,
        }
    }

    async fn condense(&self, history: &str, raw: &str) -> Result<String, TurnError> {
        let prompt = self.assembler.render_condense(history, raw)?;
        let standalone = self
            .provider
            .generate(&prompt)
            .await
            .map_err(TurnError::Condense)?;
        let standalone = standalone.trim();
        debug!(standalone, "Question condensed");
        // An empty rewrite carries no query; fall back to the raw text.
        if standalone.is_empty() {
            Ok(raw.to_string())
        } else {
            Ok(standalone.to_string())
        }
    }

    fn transition(&mut self, next: TurnState) {
        debug!(from = ?self.state, to = ?next, "Turn state");
        self.state = next;
    }

    fn fail(
        &mut self,
        at: TurnState,
        err: TurnError,
        standalone_question: Option<String>,
        sources: Vec<Document>,
    ) -> TurnResult {
        error!(state = ?at, error = %err, "Turn failed");
        self.state = TurnState::Failed;
        TurnResult::failed(at, err, standalone_question, sources)
    }
}
