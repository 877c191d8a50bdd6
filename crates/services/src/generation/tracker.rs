use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use quiz_core::Clock;
use quiz_core::extract::parse_questions;
use quiz_core::model::{GenerationStage, GenerationTask, TaskId};
use quiz_core::prompt::{DEFAULT_FEATURES, ParameterError, PromptBuilder, PromptFeature, random_slots};

use super::client::TextGenerator;

/// How long a finished task stays queryable.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(5 * 60);

/// Number of generation calls allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

struct TaskEntry {
    attempt: u64,
    task: GenerationTask,
}

type TaskTable = Arc<Mutex<HashMap<TaskId, TaskEntry>>>;

/// Runs question generation in the background and tracks it by task id.
///
/// Every mutation of the task table goes through one lock. Each task makes a
/// single call to the text generator; a failure is terminal for that task.
/// Finished tasks are purged after the retention window, after which status
/// polling reports `not_found`.
#[derive(Clone)]
pub struct GenerationTracker {
    clock: Clock,
    generator: Arc<dyn TextGenerator>,
    prompts: PromptBuilder,
    features: Arc<[PromptFeature]>,
    tasks: TaskTable,
    permits: Arc<Semaphore>,
    attempts: Arc<AtomicU64>,
    retention: Duration,
}

impl GenerationTracker {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            clock: Clock::default(),
            generator,
            prompts: PromptBuilder::new(),
            features: Arc::from(DEFAULT_FEATURES),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT)),
            attempts: Arc::new(AtomicU64::new(0)),
            retention: DEFAULT_RETENTION,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Bound the number of concurrently running generation calls (minimum 1).
    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: &[PromptFeature]) -> Self {
        self.features = Arc::from(features);
        self
    }

    /// Start generating `count` questions under a fresh task id.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `ParameterError::Count` for a count outside the accepted range.
    pub fn start_generation(&self, count: usize) -> Result<TaskId, ParameterError> {
        let id = TaskId::generate();
        self.start_generation_for(id.clone(), count)?;
        Ok(id)
    }

    /// Start generating under a caller-chosen id.
    ///
    /// Returns `Ok(None)` without touching the existing task when a task with
    /// this id is still in progress. A finished task with the same id is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns `ParameterError` when the prompt cannot be built; the task table
    /// is not modified in that case.
    pub fn start_generation_for(
        &self,
        id: TaskId,
        count: usize,
    ) -> Result<Option<TaskId>, ParameterError> {
        let slots = random_slots(count, &mut rand::rng());
        let prompt = self.prompts.build_bulk(&slots, &self.features)?;

        let attempt = {
            let mut table = self.table();
            if table.get(&id).is_some_and(|entry| entry.task.is_in_progress()) {
                warn!(task_id = %id, "generation already in progress, ignoring duplicate start");
                return Ok(None);
            }
            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
            table.insert(
                id.clone(),
                TaskEntry {
                    attempt,
                    task: GenerationTask::started(id.clone(), self.clock.now()),
                },
            );
            attempt
        };

        info!(task_id = %id, count, "question generation started");
        let worker = self.clone();
        let task_id = id.clone();
        tokio::spawn(async move {
            worker.run(task_id, attempt, prompt, count).await;
        });
        Ok(Some(id))
    }

    #[must_use]
    pub fn is_in_progress(&self, id: &TaskId) -> bool {
        self.table()
            .get(id)
            .is_some_and(|entry| entry.task.is_in_progress())
    }

    /// Snapshot of a task, or a `not_found` snapshot for unknown ids.
    #[must_use]
    pub fn get_status(&self, id: &TaskId) -> GenerationTask {
        self.table()
            .get(id)
            .map_or_else(|| GenerationTask::not_found(id.clone()), |entry| entry.task.clone())
    }

    fn table(&self) -> MutexGuard<'_, HashMap<TaskId, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, id: &TaskId, attempt: u64, apply: impl FnOnce(&mut GenerationTask)) {
        let mut table = self.table();
        if let Some(entry) = table.get_mut(id) {
            if entry.attempt == attempt {
                apply(&mut entry.task);
            }
        }
    }

    async fn run(self, id: TaskId, attempt: u64, prompt: String, count: usize) {
        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!(task_id = %id, "worker pool closed");
                self.update(&id, attempt, |task| task.fail("worker pool closed"));
                return;
            }
        };

        self.update(&id, attempt, |task| task.advance_to(GenerationStage::RequestSent));
        self.update(&id, attempt, |task| {
            task.advance_to(GenerationStage::AwaitingResponse);
        });
        let response = self.generator.generate(&prompt).await;
        drop(permit);

        match response {
            Ok(text) => {
                self.update(&id, attempt, |task| task.advance_to(GenerationStage::Processing));
                debug!(task_id = %id, response_len = text.len(), "generation response received");
                self.update(&id, attempt, |task| task.advance_to(GenerationStage::Parsing));
                let mut questions = parse_questions(&text);
                questions.truncate(count);
                if questions.is_empty() {
                    warn!(task_id = %id, "response contained no usable questions");
                    self.update(&id, attempt, |task| task.fail("no valid questions in response"));
                } else {
                    info!(task_id = %id, count = questions.len(), "question generation completed");
                    self.update(&id, attempt, |task| task.complete(questions));
                }
            }
            Err(err) => {
                error!(task_id = %id, error = %err, "question generation failed");
                self.update(&id, attempt, |task| task.fail(err.to_string()));
            }
        }

        tokio::time::sleep(self.retention).await;
        let mut table = self.table();
        if table.get(&id).is_some_and(|entry| entry.attempt == attempt) {
            table.remove(&id);
            debug!(task_id = %id, "finished task purged");
        }
    }
}
