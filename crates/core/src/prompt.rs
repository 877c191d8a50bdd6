//! Prompt construction for the question generator.
//!
//! A prompt is a fixed base instruction, the requested feature blocks, the
//! canonical output schema and one worked example, in that order. The example
//! anchors the model's output format and decodes cleanly with
//! [`crate::extract::parse_questions`].

use rand::Rng;
use rand::seq::IndexedRandom;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{AnswerType, MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::taxonomy::{self, GENERAL_SUBTOPIC, RANDOM_TOPIC};

/// Upper bound on questions requested from a single call.
pub const MAX_QUESTIONS_PER_PROMPT: usize = 20;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Invalid prompt parameters, rejected before any external call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParameterError {
    #[error("topic '{0}' not found in syllabus")]
    UnknownTopic(String),

    #[error("subtopic '{subtopic}' not found in topic '{topic}'")]
    UnknownSubtopic { topic: String, subtopic: String },

    #[error("difficulty must be between 1 and 5, got {0}")]
    Difficulty(u8),

    #[error("question count must be between 1 and {MAX_QUESTIONS_PER_PROMPT}, got {0}")]
    Count(usize),

    #[error("unknown prompt feature '{0}'")]
    UnknownFeature(String),
}

//
// ─── FEATURES ─────────────────────────────────────────────────────────────────
//

/// Optional instruction blocks appended after the base template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptFeature {
    Core,
    References,
    Summary,
}

pub const DEFAULT_FEATURES: &[PromptFeature] = &[PromptFeature::Core, PromptFeature::References];

impl PromptFeature {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::References => "references",
            Self::Summary => "summary",
        }
    }

    fn block(self) -> &'static str {
        match self {
            Self::Core => CORE_BLOCK,
            Self::References => REFERENCES_BLOCK,
            Self::Summary => SUMMARY_BLOCK,
        }
    }
}

impl FromStr for PromptFeature {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "core" => Ok(Self::Core),
            "references" => Ok(Self::References),
            "summary" => Ok(Self::Summary),
            _ => Err(ParameterError::UnknownFeature(s.to_string())),
        }
    }
}

/// Parse a comma separated feature list such as `core,summary`.
///
/// Blank entries are skipped, so an empty list selects no feature blocks.
///
/// # Errors
///
/// Returns `ParameterError::UnknownFeature` for the first unrecognized name.
pub fn parse_features(list: &str) -> Result<Vec<PromptFeature>, ParameterError> {
    list.split(',')
        .filter(|name| !name.trim().is_empty())
        .map(str::parse)
        .collect()
}

//
// ─── SLOTS ────────────────────────────────────────────────────────────────────
//

/// Flavor of question requested for one slot of a bulk prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStyle {
    Conceptual,
    Practical,
    Theoretical,
    ProblemSolving,
}

const STYLES: &[QuestionStyle] = &[
    QuestionStyle::Conceptual,
    QuestionStyle::Practical,
    QuestionStyle::Theoretical,
    QuestionStyle::ProblemSolving,
];

impl fmt::Display for QuestionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Conceptual => "conceptual",
            Self::Practical => "practical",
            Self::Theoretical => "theoretical",
            Self::ProblemSolving => "problem_solving",
        })
    }
}

/// Parameters for one question inside a bulk prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSlot {
    pub topic: String,
    pub subtopic: Option<String>,
    pub difficulty: u8,
    pub style: QuestionStyle,
    pub answer_type: AnswerType,
}

impl QuestionSlot {
    /// Draw a slot uniformly from the syllabus.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let (topic, subtopics) = taxonomy::entries()
            .choose(rng)
            .copied()
            .unwrap_or((RANDOM_TOPIC, &[]));
        let subtopic = subtopics.choose(rng).map(|s| (*s).to_string());
        let style = STYLES
            .choose(rng)
            .copied()
            .unwrap_or(QuestionStyle::Conceptual);
        let answer_type = if rng.random_bool(0.3) {
            AnswerType::MultiAnswer
        } else {
            AnswerType::SingleAnswer
        };
        Self {
            topic: topic.to_string(),
            subtopic,
            difficulty: rng.random_range(MIN_DIFFICULTY..=MAX_DIFFICULTY),
            style,
            answer_type,
        }
    }
}

/// `count` independently randomized slots.
pub fn random_slots<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<QuestionSlot> {
    (0..count).map(|_| QuestionSlot::random(rng)).collect()
}

//
// ─── BUILDER ──────────────────────────────────────────────────────────────────
//

/// Builds generation prompts from the built-in templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Prompt asking for `count` questions on a single topic.
    ///
    /// `topic` may be [`RANDOM_TOPIC`], in which case the subtopic is not
    /// checked against the syllabus.
    ///
    /// # Errors
    ///
    /// Returns `ParameterError` for an unknown topic or subtopic, a difficulty
    /// outside 1..=5 or a count outside 1..=`MAX_QUESTIONS_PER_PROMPT`.
    pub fn build(
        &self,
        topic: &str,
        subtopic: Option<&str>,
        difficulty: u8,
        count: usize,
        features: &[PromptFeature],
    ) -> Result<String, ParameterError> {
        validate_count(count)?;
        validate_slot(topic, subtopic, difficulty)?;

        let mut prompt = base_instruction(
            count,
            topic,
            subtopic.unwrap_or(GENERAL_SUBTOPIC),
            difficulty,
        );
        append_tail(&mut prompt, features, false);
        Ok(prompt)
    }

    /// One prompt requesting a question per slot, each individually parameterized.
    ///
    /// # Errors
    ///
    /// Returns `ParameterError` if the slot list is empty or too long, or if any
    /// slot carries invalid parameters.
    pub fn build_bulk(
        &self,
        slots: &[QuestionSlot],
        features: &[PromptFeature],
    ) -> Result<String, ParameterError> {
        validate_count(slots.len())?;

        let mut prompt = bulk_instruction(slots.len());
        for (idx, slot) in slots.iter().enumerate() {
            validate_slot(&slot.topic, slot.subtopic.as_deref(), slot.difficulty)?;
            prompt.push_str(&format!(
                "\n{}. topic \"{}\", subtopic \"{}\", difficulty {}, style {}, type {}",
                idx + 1,
                slot.topic,
                slot.subtopic.as_deref().unwrap_or(GENERAL_SUBTOPIC),
                slot.difficulty,
                slot.style,
                slot.answer_type.as_str(),
            ));
        }
        append_tail(&mut prompt, features, true);
        Ok(prompt)
    }
}

fn validate_count(count: usize) -> Result<(), ParameterError> {
    if count == 0 || count > MAX_QUESTIONS_PER_PROMPT {
        return Err(ParameterError::Count(count));
    }
    Ok(())
}

fn validate_slot(topic: &str, subtopic: Option<&str>, difficulty: u8) -> Result<(), ParameterError> {
    if topic != RANDOM_TOPIC {
        let Some(known) = taxonomy::subtopics(topic) else {
            return Err(ParameterError::UnknownTopic(topic.to_string()));
        };
        if let Some(sub) = subtopic {
            if !known.contains(&sub) {
                return Err(ParameterError::UnknownSubtopic {
                    topic: topic.to_string(),
                    subtopic: sub.to_string(),
                });
            }
        }
    }
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
        return Err(ParameterError::Difficulty(difficulty));
    }
    Ok(())
}

fn append_tail(prompt: &mut String, features: &[PromptFeature], wrapped: bool) {
    let mut seen: Vec<PromptFeature> = Vec::with_capacity(features.len());
    for feature in features {
        if seen.contains(feature) {
            continue;
        }
        seen.push(*feature);
        prompt.push_str("\n\n");
        prompt.push_str(feature.block());
    }

    prompt.push_str("\n\nReturn ONLY JSON, with no commentary, in this format:\n");
    if wrapped {
        prompt.push_str("{\"questions\": [QUESTION, ...]} where each QUESTION is:\n");
    }
    prompt.push_str(OUTPUT_SCHEMA);
    prompt.push_str("\n\nExample:\n");
    prompt.push_str(WORKED_EXAMPLE);
}

//
// ─── TEMPLATES ────────────────────────────────────────────────────────────────
//

const PERSONA: &str = "You are a computer science professor writing graduate-level trivia.";

fn base_instruction(count: usize, topic: &str, subtopic: &str, difficulty: u8) -> String {
    format!(
        "{PERSONA}
Generate {count} challenging question(s) about the topic \"{topic}\", subtopic \"{subtopic}\".
Difficulty: {difficulty} on a scale from 1 (first-year graduate) to 5 (research level)."
    )
}

fn bulk_instruction(count: usize) -> String {
    format!(
        "{PERSONA}
Generate {count} independent questions, one for each specification below, in the same order.
Difficulty runs from 1 (first-year graduate) to 5 (research level)."
    )
}

const CORE_BLOCK: &str = "Core requirements:
- Write a question that tests deep understanding rather than recall of a definition.
- Provide exactly 5 clues ordered from abstract (underlying theory) to concrete (a specific term or example).
- Provide 4 to 6 answer options; incorrect options must be plausible distractors.
- single_answer questions have exactly one correct option; multi_answer questions mark every correct option.
- Add a few short free-form tags.";

const REFERENCES_BLOCK: &str = "References:
- Cite 1 to 3 academic sources supporting the answer.
- Each reference has a type (book, paper, website or lecture), a full citation, and pages or a url when known.";

const SUMMARY_BLOCK: &str = "Summary:
- Explain in 2 to 4 sentences why the correct option is correct and the distractors are not.";

const OUTPUT_SCHEMA: &str = r#"{
  "question": "string",
  "clues": ["string", "string", "string", "string", "string"],
  "type": "single_answer | multi_answer",
  "options": [{"label": "string", "answer": true | false}],
  "metadata": {"topic": "string", "subtopic": "string", "difficulty": 1-5, "tags": ["string"]},
  "summary": "string",
  "references": [{"type": "book | paper | website | lecture", "citation": "string", "pages": "string", "url": "string"}]
}"#;

pub(crate) const WORKED_EXAMPLE: &str = r#"{
  "question": "Which data structure guarantees O(log n) worst-case search by keeping every root-to-leaf path's black-node count equal?",
  "clues": [
    "It is a self-balancing binary search tree",
    "Each node stores one extra bit of information",
    "Rotations and recolorings restore its invariants after insertion",
    "The Linux CFS scheduler and std::map in many C++ libraries use it",
    "Its nodes are colored red or black"
  ],
  "type": "single_answer",
  "options": [
    {"label": "Red-black tree", "answer": true},
    {"label": "AVL tree", "answer": false},
    {"label": "Skip list", "answer": false},
    {"label": "B+ tree", "answer": false}
  ],
  "metadata": {
    "topic": "Data Structures",
    "subtopic": "Balanced Search Trees",
    "difficulty": 3,
    "tags": ["trees", "balancing", "invariants"]
  },
  "summary": "Red-black trees bound the height at 2 log(n + 1) by forbidding consecutive red nodes and equalizing black height. AVL trees balance by subtree height instead, skip lists are probabilistic, and B+ trees are multiway.",
  "references": [
    {"type": "book", "citation": "Cormen, Leiserson, Rivest, Stein. Introduction to Algorithms, 3rd ed. MIT Press, 2009", "pages": "308-338"},
    {"type": "paper", "citation": "Guibas, Sedgewick. A Dichromatic Framework for Balanced Trees. FOCS 1978"}
  ]
}"#;

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
