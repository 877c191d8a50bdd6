use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

use crate::taxonomy::GENERAL_SUBTOPIC;

/// Number of clues every question carries, ordered abstract to concrete.
pub const CLUE_COUNT: usize = 5;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;
pub const DEFAULT_DIFFICULTY: u8 = 3;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Invariant violations found while decoding a question.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question has no options")]
    NoOptions,

    #[error("question has no correct option")]
    NoCorrectOption,

    #[error("single-answer question has {count} correct options")]
    AmbiguousSingleAnswer { count: usize },

    #[error("expected {CLUE_COUNT} clues, found {found}")]
    ClueCount { found: usize },

    #[error("difficulty {0} is outside 1..=5")]
    Difficulty(u8),
}

//
// ─── ENUMS ────────────────────────────────────────────────────────────────────
//

/// Whether one or several options are correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    #[default]
    SingleAnswer,
    MultiAnswer,
}

impl AnswerType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerType::SingleAnswer => "single_answer",
            AnswerType::MultiAnswer => "multi_answer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    #[default]
    Book,
    Paper,
    Website,
    Lecture,
}

//
// ─── VALUE TYPES ──────────────────────────────────────────────────────────────
//

/// One answer option; `answer` marks it as correct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub answer: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn new(label: impl Into<String>, answer: bool) -> Self {
        Self {
            label: label.into(),
            answer,
        }
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.answer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub topic: String,
    pub subtopic: String,
    pub difficulty: u8,
    pub tags: Vec<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            topic: GENERAL_SUBTOPIC.to_string(),
            subtopic: GENERAL_SUBTOPIC.to_string(),
            difficulty: DEFAULT_DIFFICULTY,
            tags: Vec::new(),
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} > {} (Level: {}/{MAX_DIFFICULTY})",
            self.topic, self.subtopic, self.difficulty
        )
    }
}

/// Academic reference backing a question's summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type", default)]
    pub kind: ReferenceKind,
    #[serde(default)]
    pub citation: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub pages: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A generated trivia question.
///
/// Decoding applies the field defaults and then checks the invariants, so a
/// `Question` value always has five clues, at least one option and a correct
/// option count consistent with its answer type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    #[serde(rename = "question")]
    text: String,
    clues: Vec<String>,
    #[serde(rename = "type")]
    answer_type: AnswerType,
    options: Vec<AnswerOption>,
    metadata: Metadata,
    summary: Option<String>,
    references: Vec<Reference>,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when clues, options or difficulty break the
    /// question invariants.
    pub fn new(
        text: impl Into<String>,
        clues: Vec<String>,
        answer_type: AnswerType,
        options: Vec<AnswerOption>,
        metadata: Metadata,
    ) -> Result<Self, QuestionError> {
        let question = Self {
            text: text.into(),
            clues,
            answer_type,
            options,
            metadata,
            summary: None,
            references: Vec::new(),
        };
        question.validate()?;
        Ok(question)
    }

    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn with_references(mut self, references: Vec<Reference>) -> Self {
        self.references = references;
        self
    }

    fn validate(&self) -> Result<(), QuestionError> {
        if self.options.is_empty() {
            return Err(QuestionError::NoOptions);
        }
        let correct = self.options.iter().filter(|opt| opt.answer).count();
        if correct == 0 {
            return Err(QuestionError::NoCorrectOption);
        }
        if self.answer_type == AnswerType::SingleAnswer && correct != 1 {
            return Err(QuestionError::AmbiguousSingleAnswer { count: correct });
        }
        if self.clues.len() != CLUE_COUNT {
            return Err(QuestionError::ClueCount {
                found: self.clues.len(),
            });
        }
        let difficulty = self.metadata.difficulty;
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
            return Err(QuestionError::Difficulty(difficulty));
        }
        Ok(())
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn clues(&self) -> &[String] {
        &self.clues
    }

    #[must_use]
    pub fn answer_type(&self) -> AnswerType {
        self.answer_type
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    #[must_use]
    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    /// Indices of the options marked correct.
    #[must_use]
    pub fn correct_indices(&self) -> Vec<usize> {
        self.options
            .iter()
            .enumerate()
            .filter_map(|(idx, opt)| opt.answer.then_some(idx))
            .collect()
    }
}

//
// ─── DECODING ─────────────────────────────────────────────────────────────────
//

// Wire shape with every field optional; `null` counts as missing.
#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    #[serde(default)]
    clues: Option<Vec<String>>,
    #[serde(rename = "type", default)]
    answer_type: Option<AnswerType>,
    #[serde(default)]
    options: Option<Vec<RawOption>>,
    #[serde(default)]
    metadata: Option<RawMetadata>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    references: Option<Vec<Reference>>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    answer: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    subtopic: Option<String>,
    #[serde(default)]
    difficulty: Option<u8>,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

impl From<RawMetadata> for Metadata {
    fn from(raw: RawMetadata) -> Self {
        let defaults = Metadata::default();
        let mut tags: Vec<String> = Vec::new();
        for tag in raw.tags.unwrap_or_default() {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        Self {
            topic: raw.topic.unwrap_or(defaults.topic),
            subtopic: raw.subtopic.unwrap_or(defaults.subtopic),
            difficulty: raw.difficulty.unwrap_or(defaults.difficulty),
            tags,
        }
    }
}

impl TryFrom<RawQuestion> for Question {
    type Error = QuestionError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let options = raw
            .options
            .unwrap_or_default()
            .into_iter()
            .map(|opt| AnswerOption {
                label: opt.label.unwrap_or_default(),
                answer: opt.answer.unwrap_or(false),
            })
            .collect();

        let question = Self {
            text: raw.question,
            clues: raw.clues.unwrap_or_default(),
            answer_type: raw.answer_type.unwrap_or_default(),
            options,
            metadata: raw.metadata.unwrap_or_default().into(),
            summary: raw.summary,
            references: raw.references.unwrap_or_default(),
        };
        question.validate()?;
        Ok(question)
    }
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(
        Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
            TextOrNumber::Text(text) => text,
            TextOrNumber::Number(num) => num.to_string(),
        }),
    )
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clues() -> serde_json::Value {
        json!(["theory", "property", "usage", "example", "name"])
    }

    #[test]
    fn decode_applies_defaults() {
        let value = json!({
            "question": "Which structure is LIFO?",
            "clues": clues(),
            "options": [{"label": "Stack", "answer": true}, {"label": "Queue"}],
        });
        let question: Question = serde_json::from_value(value).unwrap();

        assert_eq!(question.answer_type(), AnswerType::SingleAnswer);
        assert_eq!(question.metadata().topic, "General");
        assert_eq!(question.metadata().subtopic, "General");
        assert_eq!(question.metadata().difficulty, 3);
        assert!(question.metadata().tags.is_empty());
        assert!(!question.options()[1].is_correct());
        assert_eq!(question.correct_indices(), vec![0]);
        assert!(question.summary().is_none());
    }

    #[test]
    fn decode_rejects_invariant_violations() {
        let no_correct = json!({
            "question": "Q",
            "clues": clues(),
            "options": [{"label": "a", "answer": false}],
        });
        assert!(serde_json::from_value::<Question>(no_correct).is_err());

        let two_correct_single = json!({
            "question": "Q",
            "clues": clues(),
            "type": "single_answer",
            "options": [{"label": "a", "answer": true}, {"label": "b", "answer": true}],
        });
        assert!(serde_json::from_value::<Question>(two_correct_single).is_err());

        let short_clues = json!({
            "question": "Q",
            "clues": ["one"],
            "options": [{"label": "a", "answer": true}],
        });
        assert!(serde_json::from_value::<Question>(short_clues).is_err());
    }

    #[test]
    fn multi_answer_allows_several_correct() {
        let value = json!({
            "question": "Which are stable sorts?",
            "clues": clues(),
            "type": "multi_answer",
            "options": [
                {"label": "Merge sort", "answer": true},
                {"label": "Heap sort", "answer": false},
                {"label": "Insertion sort", "answer": true}
            ],
            "metadata": {"topic": "Algorithms", "subtopic": "Sorting", "difficulty": 2, "tags": ["sort", "sort", "stability"]},
            "references": [{"type": "paper", "citation": "Knuth", "pages": 102}]
        });
        let question: Question = serde_json::from_value(value).unwrap();
        assert_eq!(question.correct_indices(), vec![0, 2]);
        assert_eq!(question.metadata().tags, vec!["sort", "stability"]);
        assert_eq!(question.references()[0].kind, ReferenceKind::Paper);
        assert_eq!(question.references()[0].pages.as_deref(), Some("102"));
        assert_eq!(
            question.metadata().to_string(),
            "Algorithms > Sorting (Level: 2/5)"
        );
    }

    #[test]
    fn serialized_form_decodes_back() {
        let question = Question::new(
            "Which structure is LIFO?",
            ["a", "b", "c", "d", "e"].map(String::from).to_vec(),
            AnswerType::SingleAnswer,
            vec![AnswerOption::new("Stack", true), AnswerOption::new("Queue", false)],
            Metadata::default(),
        )
        .unwrap()
        .with_summary("Stacks pop the most recent push.");

        let value = serde_json::to_value(&question).unwrap();
        assert_eq!(value["question"], "Which structure is LIFO?");
        assert_eq!(value["type"], "single_answer");
        let decoded: Question = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, question);
    }
}
