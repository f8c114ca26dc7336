//! Parametrized prompt templates with declared, named slots.
//!
//! Placeholders are written `{name}`; `{{` and `}}` produce literal braces.
//! Any other brace is literal text. A template is only constructed when its
//! placeholders are exactly its declared slots, so rendering can fail only
//! when the caller omits a value.

use std::collections::BTreeSet;

use kbchat_core::error::TemplateError;
use serde::{Deserialize, Serialize};

/// A fixed few-shot example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exemplar {
    pub input: String,
    pub output: String,
}

impl Exemplar {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    fn render(&self) -> String {
        format!("Input: {}\nOutput: {}", self.input, self.output)
    }
}

/// Placeholders and declared slots disagree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe_mismatch(.missing, .undeclared))]
pub struct SlotMismatch {
    /// Declared slots that never appear as a placeholder
    pub missing: Vec<String>,
    /// Placeholders that are not declared slots
    pub undeclared: Vec<String>,
}

fn describe_mismatch(missing: &[String], undeclared: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing placeholder(s): {}", missing.join(", ")));
    }
    if !undeclared.is_empty() {
        parts.push(format!("undeclared placeholder(s): {}", undeclared.join(", ")));
    }
    parts.join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
    slots: Vec<String>,
}

impl PromptTemplate {
    /// Compile `text` against the declared `slots`.
    pub fn new(text: &str, slots: &[&str]) -> Result<Self, SlotMismatch> {
        Self::from_segments(parse(text), slots)
    }

    /// A few-shot template: prefix, the rendered exemplars, then suffix,
    /// separated by blank lines. Exemplar text is never scanned for
    /// placeholders.
    pub fn few_shot(
        prefix: &str,
        exemplars: &[Exemplar],
        suffix: &str,
        slots: &[&str],
    ) -> Result<Self, SlotMismatch> {
        let examples = exemplars
            .iter()
            .map(Exemplar::render)
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut segments = parse(prefix.trim_end());
        segments.push(Segment::Text(format!("\n\n{examples}\n\n")));
        segments.extend(parse(suffix.trim_start()));
        Self::from_segments(segments, slots)
    }

    fn from_segments(segments: Vec<Segment>, slots: &[&str]) -> Result<Self, SlotMismatch> {
        let found: BTreeSet<&str> = segments
            .iter()
            .filter_map(|s| match s {
                Segment::Slot(name) => Some(name.as_str()),
                Segment::Text(_) => None,
            })
            .collect();
        let declared: BTreeSet<&str> = slots.iter().copied().collect();

        let missing: Vec<String> = slots
            .iter()
            .filter(|s| !found.contains(*s))
            .map(|s| s.to_string())
            .collect();
        let undeclared: Vec<String> = found
            .difference(&declared)
            .map(|s| s.to_string())
            .collect();

        if !missing.is_empty() || !undeclared.is_empty() {
            return Err(SlotMismatch { missing, undeclared });
        }

        Ok(Self {
            segments: merge_text(segments),
            slots: slots.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Declared slots, in order.
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// Fill every declared slot. Extra values are ignored.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        if let Some(slot) = self
            .slots
            .iter()
            .find(|slot| !values.iter().any(|(k, _)| k == slot))
        {
            return Err(TemplateError::MissingSlot(slot.clone()));
        }

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(name) => {
                    // Presence was checked above.
                    if let Some((_, value)) = values.iter().find(|(k, _)| k == name) {
                        out.push_str(value);
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Placeholder names in `text`, in order of first appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for segment in parse(text) {
        if let Segment::Slot(name) = segment {
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
    }
    seen
}

fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        match c {
            '{' if rest.starts_with("{{") => {
                literal.push('{');
                rest = &rest[2..];
            }
            '}' if rest.starts_with("}}") => {
                literal.push('}');
                rest = &rest[2..];
            }
            '{' => match slot_name(&rest[1..]) {
                Some(name) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut literal)));
                    }
                    rest = &rest[name.len() + 2..];
                    segments.push(Segment::Slot(name.to_string()));
                }
                None => {
                    literal.push('{');
                    rest = &rest[1..];
                }
            },
            _ => {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Text(literal));
    }
    segments
}

// `name}` at the start of `s`, where name is a non-empty identifier.
fn slot_name(s: &str) -> Option<&str> {
    let end = s.find('}')?;
    let name = &s[..end];
    let mut chars = name.chars();
    let first = chars.next()?;
    if (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Some(name)
    } else {
        None
    }
}

fn merge_text(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let (Some(Segment::Text(prev)), Segment::Text(next)) = (merged.last_mut(), &segment) {
            prev.push_str(next);
            continue;
        }
        merged.push(segment);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_declared_slots() {
        let t = PromptTemplate::new("Q: {question}\nH: {chat_history}", &["chat_history", "question"]).unwrap();
        let out = t
            .render(&[("chat_history", "none"), ("question", "Where?")])
            .unwrap();
        assert_eq!(out, "Q: Where?\nH: none");
        assert_eq!(t.slots(), ["chat_history", "question"]);
    }

    #[test]
    fn doubled_braces_are_literal() {
        let t = PromptTemplate::new("{{\"answer\": \"{question}\"}}", &["question"]).unwrap();
        assert_eq!(t.render(&[("question", "x")]).unwrap(), "{\"answer\": \"x\"}");
    }

    #[test]
    fn stray_braces_are_literal() {
        let t = PromptTemplate::new("{ not a slot } {question} {1x}", &["question"]).unwrap();
        assert_eq!(t.render(&[("question", "q")]).unwrap(), "{ not a slot } q {1x}");
    }

    #[test]
    fn undeclared_placeholder_is_rejected() {
        let err = PromptTemplate::new("{question} {topic}", &["question"]).unwrap_err();
        assert_eq!(err.undeclared, vec!["topic".to_string()]);
        assert!(err.missing.is_empty());
    }

    #[test]
    fn declared_but_absent_slot_is_rejected() {
        let err = PromptTemplate::new("{question}", &["context", "question"]).unwrap_err();
        assert_eq!(err.missing, vec!["context".to_string()]);
        assert!(err.to_string().contains("missing placeholder(s): context"));
    }

    #[test]
    fn missing_value_is_reported() {
        let t = PromptTemplate::new("{context}\n{question}", &["context", "question"]).unwrap();
        assert_eq!(
            t.render(&[("question", "q")]),
            Err(TemplateError::MissingSlot("context".into()))
        );
    }

    #[test]
    fn empty_value_is_allowed() {
        let t = PromptTemplate::new("Context:\n{context}\nQ: {question}", &["context", "question"]).unwrap();
        assert_eq!(
            t.render(&[("context", ""), ("question", "q")]).unwrap(),
            "Context:\n\nQ: q"
        );
    }

    #[test]
    fn few_shot_keeps_exemplars_literal() {
        let exemplars = vec![
            Exemplar::new("How do I log in?", "Use your {campus} ID."),
            Exemplar::new("Reset password?", "Visit the portal."),
        ];
        let t = PromptTemplate::few_shot(
            "Answer from context.\n{context}\n",
            &exemplars,
            "\nQuestion: {question}",
            &["context", "question"],
        )
        .unwrap();

        let out = t.render(&[("context", "CTX"), ("question", "Q")]).unwrap();
        assert_eq!(
            out,
            "Answer from context.\nCTX\n\n\
             Input: How do I log in?\nOutput: Use your {campus} ID.\n\n\
             Input: Reset password?\nOutput: Visit the portal.\n\n\
             Question: Q"
        );
    }

    #[test]
    fn placeholders_are_listed_once_in_order() {
        assert_eq!(
            placeholders("{b} {a} {b} {{c}}"),
            vec!["b".to_string(), "a".to_string()]
        );
    }
}
