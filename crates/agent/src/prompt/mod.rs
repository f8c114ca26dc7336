//! Prompt templates and their assembly from static inputs.

pub mod assembler;
pub mod template;

pub use assembler::{PromptAssembler, CONDENSE_SLOTS, QA_SLOTS};
pub use template::{Exemplar, PromptTemplate, SlotMismatch};
