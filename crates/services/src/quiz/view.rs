use serde::Serialize;

use quiz_core::model::{GenerationTask, MetricsSnapshot, Question, QuizSession};

/// What a page render shows for a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageView {
    Ready {
        question: Question,
        question_number: usize,
        total_questions: usize,
        metrics: MetricsSnapshot,
    },
    Loading {
        task: Option<GenerationTask>,
        metrics: MetricsSnapshot,
    },
    Error {
        message: String,
        metrics: MetricsSnapshot,
    },
}

/// Body of the "next question" endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NextQuestionView {
    Question {
        question: Question,
        metrics: MetricsSnapshot,
        question_number: usize,
        total_questions: usize,
    },
    Loading {
        loading: bool,
        status: Option<GenerationTask>,
    },
    Error {
        error: String,
    },
}

impl PageView {
    pub(crate) fn from_session(session: &QuizSession, task: Option<GenerationTask>) -> Self {
        let metrics = session.metrics().snapshot();
        if let Some(question) = session.current_question() {
            return Self::Ready {
                question: question.clone(),
                question_number: session.current_index() + 1,
                total_questions: session.questions().len(),
                metrics,
            };
        }
        match session.error() {
            Some(message) => Self::Error {
                message: message.to_string(),
                metrics,
            },
            None => Self::Loading { task, metrics },
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

impl From<PageView> for NextQuestionView {
    fn from(view: PageView) -> Self {
        match view {
            PageView::Ready {
                question,
                question_number,
                total_questions,
                metrics,
            } => Self::Question {
                question,
                metrics,
                question_number,
                total_questions,
            },
            PageView::Loading { task, .. } => Self::Loading {
                loading: true,
                status: task,
            },
            PageView::Error { message, .. } => Self::Error { error: message },
        }
    }
}
