//! The conversational core of kbchat.
//!
//! Each user turn runs **Condense → Retrieve → Prompt → Generate**:
//!
//! 1. **Condense** a follow-up into a standalone question using the history
//! 2. **Retrieve** supporting documents from the knowledge base
//! 3. **Prompt**: render the few-shot QA template with context and history
//! 4. **Generate** the answer, then record the exchange in memory
//!
//! A failed step ends the turn without touching memory; the session stays
//! usable for the next submission.

pub mod orchestrator;
pub mod prompt;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use orchestrator::{ConversationOrchestrator, ErrorKind, TurnError, TurnResult, TurnState};
pub use prompt::{Exemplar, PromptAssembler, PromptTemplate, SlotMismatch};
