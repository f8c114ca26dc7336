//! Prompt assembly: the grounded QA template and the condensation template.
//!
//! Loaded once at startup from three static inputs in the templates
//! directory. Any missing or malformed input is fatal.

use std::path::{Path, PathBuf};

use kbchat_core::error::{TemplateError, TemplateLoadError};
use tracing::{debug, info};

use super::template::{placeholders, Exemplar, PromptTemplate, SlotMismatch};

pub const PREFIX_FILE: &str = "prompt_prefix.txt";
pub const SUFFIX_FILE: &str = "prompt_suffix.txt";
pub const EXAMPLES_FILE: &str = "few_shot_examples.json";

/// Slots of the grounded QA prompt, in order.
pub const QA_SLOTS: [&str; 3] = ["context", "chat_history", "question"];
/// Slots of the condensation prompt, in order.
pub const CONDENSE_SLOTS: [&str; 2] = ["chat_history", "question"];

const CONDENSE_TEMPLATE: &str = "Given the following conversation and a follow up question, \
rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{chat_history}

Follow Up Input:
{question}

Standalone question:";

pub struct PromptAssembler {
    qa: PromptTemplate,
    condense: PromptTemplate,
    exemplar_count: usize,
}

impl PromptAssembler {
    /// Load prefix, suffix and exemplars from `dir`.
    pub fn load(dir: &Path) -> Result<Self, TemplateLoadError> {
        let prefix_path = dir.join(PREFIX_FILE);
        let suffix_path = dir.join(SUFFIX_FILE);
        let examples_path = dir.join(EXAMPLES_FILE);

        let prefix = read(&prefix_path)?;
        let suffix = read(&suffix_path)?;
        let exemplars = parse_exemplars(&examples_path, &read(&examples_path)?)?;

        for (path, text) in [(&prefix_path, &prefix), (&suffix_path, &suffix)] {
            let undeclared: Vec<String> = placeholders(text)
                .into_iter()
                .filter(|p| !QA_SLOTS.contains(&p.as_str()))
                .collect();
            if !undeclared.is_empty() {
                return Err(malformed(
                    path,
                    SlotMismatch {
                        missing: Vec::new(),
                        undeclared,
                    },
                ));
            }
        }

        let qa = PromptTemplate::few_shot(&prefix, &exemplars, &suffix, &QA_SLOTS)
            .map_err(|e| malformed(dir, e))?;

        let assembler = Self::new(qa, exemplars.len()).map_err(|e| malformed(dir, e))?;
        info!(dir = %dir.display(), exemplars = exemplars.len(), "Prompt templates loaded");
        Ok(assembler)
    }

    /// Assemble from an already-built QA template. Compiles the built-in
    /// condensation template alongside it.
    pub fn new(qa: PromptTemplate, exemplar_count: usize) -> Result<Self, SlotMismatch> {
        Ok(Self {
            qa,
            condense: PromptTemplate::new(CONDENSE_TEMPLATE, &CONDENSE_SLOTS)?,
            exemplar_count,
        })
    }

    pub fn build_qa_prompt(&self) -> &PromptTemplate {
        &self.qa
    }

    pub fn build_condense_prompt(&self) -> &PromptTemplate {
        &self.condense
    }

    pub fn exemplar_count(&self) -> usize {
        self.exemplar_count
    }

    pub fn render_qa(&self, context: &str, chat_history: &str, question: &str) -> Result<String, TemplateError> {
        self.qa.render(&[
            ("context", context),
            ("chat_history", chat_history),
            ("question", question),
        ])
    }

    pub fn render_condense(&self, chat_history: &str, question: &str) -> Result<String, TemplateError> {
        self.condense
            .render(&[("chat_history", chat_history), ("question", question)])
    }
}

fn read(path: &Path) -> Result<String, TemplateLoadError> {
    debug!(path = %path.display(), "Reading template input");
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => TemplateLoadError::Missing {
            path: path.to_path_buf(),
        },
        _ => TemplateLoadError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })
}

fn parse_exemplars(path: &Path, text: &str) -> Result<Vec<Exemplar>, TemplateLoadError> {
    let exemplars: Vec<Exemplar> = serde_json::from_str(text).map_err(|e| TemplateLoadError::Malformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if exemplars.is_empty() {
        return Err(TemplateLoadError::Malformed {
            path: path.to_path_buf(),
            reason: "no exemplars".into(),
        });
    }
    Ok(exemplars)
}

fn malformed(path: impl Into<PathBuf>, mismatch: SlotMismatch) -> TemplateLoadError {
    TemplateLoadError::Malformed {
        path: path.into(),
        reason: mismatch.to_string(),
    }
}
