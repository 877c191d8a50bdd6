use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Metrics, Question, TaskId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("no current question to answer")]
    NoCurrentQuestion,
}

/// Answer guard for the question at the current index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerState {
    #[default]
    Unanswered,
    Answered,
}

/// Navigation guard. `Advanced` means an increment is pending and the new
/// question has not been rendered yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceState {
    #[default]
    Served,
    Advanced,
}

/// Outcome of `QuizSession::record_answer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub metrics: Metrics,
    /// `false` when the answer was a repeat for an already answered question.
    pub recorded: bool,
}

/// Everything one browser session keeps between requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizSession {
    #[serde(default)]
    questions: Vec<Question>,
    #[serde(default, rename = "current_question_index")]
    current: usize,
    #[serde(default)]
    metrics: Option<Metrics>,
    #[serde(default, rename = "generation_task_id")]
    task_id: Option<TaskId>,
    #[serde(default)]
    generation_in_progress: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    answer_state: AnswerState,
    #[serde(default)]
    advance_state: AdvanceState,
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// True when there is nothing left to serve from the batch.
    #[must_use]
    pub fn needs_batch(&self) -> bool {
        self.current >= self.questions.len()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn metrics(&self) -> Metrics {
        self.metrics.unwrap_or_default()
    }

    pub fn ensure_metrics(&mut self) {
        self.metrics.get_or_insert_with(Metrics::new);
    }

    pub fn reset_metrics(&mut self) {
        self.metrics = Some(Metrics::new());
    }

    #[must_use]
    pub fn answer_state(&self) -> AnswerState {
        self.answer_state
    }

    #[must_use]
    pub fn advance_state(&self) -> AdvanceState {
        self.advance_state
    }

    #[must_use]
    pub fn task_id(&self) -> Option<&TaskId> {
        self.task_id.as_ref()
    }

    #[must_use]
    pub fn generation_in_progress(&self) -> bool {
        self.generation_in_progress
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// A fresh render of the current question clears the pending increment.
    pub fn mark_served(&mut self) {
        self.advance_state = AdvanceState::Served;
    }

    /// Move to the next question once per rendered question.
    ///
    /// Returns `false` when an increment is already pending.
    pub fn advance(&mut self) -> bool {
        if self.advance_state == AdvanceState::Advanced {
            return false;
        }
        self.current = self.current.saturating_add(1);
        self.advance_state = AdvanceState::Advanced;
        self.answer_state = AnswerState::Unanswered;
        true
    }

    /// Record an answer for the current question, at most once.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::NoCurrentQuestion` when the batch has no
    /// question at the current index.
    pub fn record_answer(&mut self, is_correct: bool) -> Result<AnswerOutcome, SessionStateError> {
        if self.current_question().is_none() {
            return Err(SessionStateError::NoCurrentQuestion);
        }
        let metrics = self.metrics.get_or_insert_with(Metrics::new);
        if self.answer_state == AnswerState::Answered {
            return Ok(AnswerOutcome {
                metrics: *metrics,
                recorded: false,
            });
        }
        metrics.record_answer(is_correct);
        self.answer_state = AnswerState::Answered;
        Ok(AnswerOutcome {
            metrics: *metrics,
            recorded: true,
        })
    }

    pub fn begin_generation(&mut self, task_id: TaskId) {
        self.task_id = Some(task_id);
        self.generation_in_progress = true;
    }

    /// Replace the batch with freshly generated questions.
    ///
    /// The advance guard is left alone: a pending increment stays pending until
    /// the first question of the new batch is rendered.
    pub fn install_batch(&mut self, questions: Vec<Question>) {
        self.questions = questions;
        self.current = 0;
        self.generation_in_progress = false;
        self.error = None;
        self.answer_state = AnswerState::Unanswered;
    }

    pub fn fail_generation(&mut self, message: impl Into<String>) {
        self.generation_in_progress = false;
        self.error = Some(message.into());
    }

    /// Forget a task the tracker no longer knows about.
    pub fn abandon_generation(&mut self) {
        self.generation_in_progress = false;
    }
}
