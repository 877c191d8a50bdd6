use std::sync::Arc;

use tracing::{debug, info, warn};

use quiz_core::model::{
    AnswerOutcome, GenerationStatus, GenerationTask, MetricsSnapshot, QuizSession, SessionId,
    TaskId,
};
use storage::{SessionStore, StorageError};

use super::view::{NextQuestionView, PageView};
use crate::error::SessionError;
use crate::generation::GenerationTracker;

/// Questions generated per batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Drives one browser session through batches of generated questions.
///
/// Each operation loads the session document, applies one transition and
/// writes it back. Generation is started without waiting for it; later
/// renders pick up the result by polling the tracker.
#[derive(Clone)]
pub struct QuizSessionService {
    tracker: GenerationTracker,
    sessions: Arc<dyn SessionStore>,
    batch_size: usize,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(tracker: GenerationTracker, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            tracker,
            sessions,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn tracker(&self) -> &GenerationTracker {
        &self.tracker
    }

    /// Load a session, starting from an empty one if none was stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the store cannot be read.
    pub async fn load(&self, id: &SessionId) -> Result<QuizSession, SessionError> {
        Ok(self.sessions.load(id).await?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the store rejects the write.
    pub async fn save(&self, id: &SessionId, session: &QuizSession) -> Result<(), SessionError> {
        self.sessions.save(id, session).await?;
        Ok(())
    }

    /// Make sure the session either has a servable question or a batch on the
    /// way. Never waits for generation to finish.
    ///
    /// Returns the latest snapshot of the session's generation task, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Parameter` if the configured batch size cannot be
    /// turned into a prompt.
    pub fn ensure_initialized(
        &self,
        id: &SessionId,
        session: &mut QuizSession,
    ) -> Result<Option<GenerationTask>, SessionError> {
        session.ensure_metrics();

        let snapshot = if session.generation_in_progress() {
            self.poll_generation_status(session)
        } else {
            None
        };

        if session.error().is_some() || session.generation_in_progress() || !session.needs_batch()
        {
            return Ok(snapshot);
        }

        let task_id = TaskId::for_session(id);
        if self
            .tracker
            .start_generation_for(task_id.clone(), self.batch_size)?
            .is_none()
        {
            debug!(session_id = %id, task_id = %task_id, "joining generation already in flight");
        }
        session.begin_generation(task_id.clone());
        Ok(Some(self.tracker.get_status(&task_id)))
    }

    /// Fold the tracker's view of the session's task into the session.
    ///
    /// A completed task installs its questions as the new batch, a failed one
    /// stores its error. Both clear the in-flight marker, as does a task the
    /// tracker no longer knows about.
    pub fn poll_generation_status(&self, session: &mut QuizSession) -> Option<GenerationTask> {
        let task_id = session.task_id()?.clone();
        let task = self.tracker.get_status(&task_id);
        if !session.generation_in_progress() {
            return Some(task);
        }

        match task.status {
            GenerationStatus::InProgress => {}
            GenerationStatus::Completed => {
                let questions = task.questions.clone().unwrap_or_default();
                info!(task_id = %task_id, count = questions.len(), "installing question batch");
                session.install_batch(questions);
            }
            GenerationStatus::Failed => {
                let message = task.error.clone().unwrap_or_else(|| task.message.clone());
                warn!(task_id = %task_id, error = %message, "generation failed for session");
                session.fail_generation(message);
            }
            GenerationStatus::NotFound => {
                warn!(task_id = %task_id, "generation task vanished, starting over");
                session.abandon_generation();
            }
        }
        Some(task)
    }

    /// Render the session. Clears a stored error first when `refresh` is set.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for storage failures or an unusable batch size.
    pub async fn page(&self, id: &SessionId, refresh: bool) -> Result<PageView, SessionError> {
        let mut session = self.load(id).await?;
        if refresh {
            session.clear_error();
        }
        let task = self.ensure_initialized(id, &mut session)?;
        let view = PageView::from_session(&session, task);
        if view.is_ready() {
            session.mark_served();
        }
        self.save(id, &session).await?;
        Ok(view)
    }

    /// Move to the next question and return it, or the loading/error state.
    ///
    /// At most one advance happens between two renders of `page`; repeated
    /// calls return the question already advanced to. `expected` is the index
    /// the client is looking at; a mismatch means the request is a retry of an
    /// advance that already happened, so the index is left alone.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for storage failures or an unusable batch size.
    pub async fn next_question(
        &self,
        id: &SessionId,
        expected: Option<usize>,
    ) -> Result<NextQuestionView, SessionError> {
        let mut session = self.load(id).await?;
        if expected.is_none_or(|index| index == session.current_index()) {
            if session.advance() {
                debug!(session_id = %id, index = session.current_index(), "advanced");
            } else {
                debug!(session_id = %id, "advance already pending, ignoring");
            }
        } else {
            debug!(session_id = %id, ?expected, "stale advance request, ignoring");
        }

        let task = self.ensure_initialized(id, &mut session)?;
        let view = PageView::from_session(&session, task);
        self.save(id, &session).await?;
        Ok(view.into())
    }

    /// Record an answer for the current question, at most once per question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::State` when there is no current question.
    pub async fn submit_answer(
        &self,
        id: &SessionId,
        is_correct: bool,
    ) -> Result<AnswerOutcome, SessionError> {
        let mut session = self.load(id).await?;
        session.ensure_metrics();
        let outcome = session.record_answer(is_correct)?;
        if outcome.recorded {
            self.save(id, &session).await?;
        } else {
            debug!(session_id = %id, "answer already recorded for this question");
        }
        Ok(outcome)
    }

    /// Raw status of the session's generation task.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the session cannot be read.
    pub async fn generation_status(&self, id: &SessionId) -> Result<GenerationTask, SessionError> {
        let session = self.load(id).await?;
        let task_id = session
            .task_id()
            .cloned()
            .unwrap_or_else(|| TaskId::for_session(id));
        Ok(self.tracker.get_status(&task_id))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the session cannot be read.
    pub async fn metrics(&self, id: &SessionId) -> Result<MetricsSnapshot, SessionError> {
        Ok(self.load(id).await?.metrics().snapshot())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the session cannot be stored.
    pub async fn reset_metrics(&self, id: &SessionId) -> Result<(), SessionError> {
        let mut session = self.load(id).await?;
        session.reset_metrics();
        self.save(id, &session).await
    }

    /// Forget everything stored for the session. Unknown sessions are fine.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the store cannot be reached.
    pub async fn clear_session(&self, id: &SessionId) -> Result<(), SessionError> {
        match self.sessions.remove(id).await {
            Ok(()) | Err(StorageError::NotFound) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
