use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Question, TaskId};

/// Lifecycle of a generation task as seen by status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    InProgress,
    Completed,
    Failed,
    NotFound,
}

impl GenerationStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Coarse checkpoints reported while a task runs. UI feedback only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Initializing,
    RequestSent,
    AwaitingResponse,
    Processing,
    Parsing,
    Done,
}

impl GenerationStage {
    #[must_use]
    pub fn progress(self) -> u8 {
        match self {
            Self::Initializing => 0,
            Self::RequestSent => 10,
            Self::AwaitingResponse => 30,
            Self::Processing => 70,
            Self::Parsing => 90,
            Self::Done => 100,
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing question generation",
            Self::RequestSent => "Request sent to the generation service",
            Self::AwaitingResponse => "Waiting for the generation service",
            Self::Processing => "Processing the response",
            Self::Parsing => "Parsing questions",
            Self::Done => "Questions ready",
        }
    }
}

/// Snapshot of one generation task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationTask {
    pub id: TaskId,
    pub status: GenerationStatus,
    pub progress: u8,
    pub message: String,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<Question>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationTask {
    #[must_use]
    pub fn started(id: TaskId, started_at: DateTime<Utc>) -> Self {
        let stage = GenerationStage::Initializing;
        Self {
            id,
            status: GenerationStatus::InProgress,
            progress: stage.progress(),
            message: stage.message().to_string(),
            started_at: Some(started_at),
            questions: None,
            error: None,
        }
    }

    #[must_use]
    pub fn not_found(id: TaskId) -> Self {
        Self {
            id,
            status: GenerationStatus::NotFound,
            progress: 0,
            message: "Task not found".to_string(),
            started_at: None,
            questions: None,
            error: None,
        }
    }

    pub fn advance_to(&mut self, stage: GenerationStage) {
        self.progress = stage.progress();
        self.message = stage.message().to_string();
    }

    pub fn complete(&mut self, questions: Vec<Question>) {
        self.advance_to(GenerationStage::Done);
        self.status = GenerationStatus::Completed;
        self.message = format!("Generated {} questions", questions.len());
        self.questions = Some(questions);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.status = GenerationStatus::Failed;
        self.progress = GenerationStage::Done.progress();
        self.message = format!("Generation failed: {error}");
        self.error = Some(error);
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.status == GenerationStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn checkpoints_are_monotonic() {
        let stages = [
            GenerationStage::Initializing,
            GenerationStage::RequestSent,
            GenerationStage::AwaitingResponse,
            GenerationStage::Processing,
            GenerationStage::Parsing,
            GenerationStage::Done,
        ];
        let progress: Vec<u8> = stages.iter().map(|s| s.progress()).collect();
        assert_eq!(progress, vec![0, 10, 30, 70, 90, 100]);
    }

    #[test]
    fn failure_keeps_error_message() {
        let mut task = GenerationTask::started(TaskId::new("t1"), fixed_now());
        assert!(task.is_in_progress());
        task.fail("quota exceeded");
        assert_eq!(task.status, GenerationStatus::Failed);
        assert!(task.status.is_terminal());
        assert_eq!(task.error.as_deref(), Some("quota exceeded"));
        assert!(task.questions.is_none());
    }

    #[test]
    fn not_found_serializes_status() {
        let value = serde_json::to_value(GenerationTask::not_found(TaskId::new("t9"))).unwrap();
        assert_eq!(value["status"], "not_found");
        assert_eq!(value["id"], "t9");
        assert!(value.get("questions").is_none());
    }
}
