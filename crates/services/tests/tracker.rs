use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quiz_core::model::{GenerationStatus, TaskId};
use quiz_core::prompt::PromptFeature;
use quiz_core::time::{fixed_clock, fixed_now};
use serde_json::{Value, json};
use services::app_services::ServiceSettings;
use services::{AppServices, Clock, GenerationError, GenerationTracker, TextGenerator};
use storage::Storage;
use tokio::sync::Notify;

fn batch_json(count: usize) -> String {
    let items: Vec<Value> = (1..=count)
        .map(|n| {
            json!({
                "question": format!("Question {n}"),
                "clues": ["c1", "c2", "c3", "c4", "c5"],
                "type": "single_answer",
                "options": [{"label": "right", "answer": true}, {"label": "wrong", "answer": false}],
                "metadata": {"topic": "Algorithms", "subtopic": "Sorting", "difficulty": 2},
            })
        })
        .collect();
    format!("Sure!\n```json\n{}\n```", Value::Array(items))
}

struct Canned(String);

#[async_trait]
impl TextGenerator for Canned {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok(self.0.clone())
    }
}

/// Keeps the last prompt it was asked to complete.
#[derive(Default)]
struct Recording {
    prompt: Mutex<Option<String>>,
}

#[async_trait]
impl TextGenerator for Recording {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        *self.prompt.lock().unwrap() = Some(prompt.to_string());
        Ok(batch_json(1))
    }
}

/// Holds every call until the test releases it.
struct Gated {
    release: Arc<Notify>,
    body: String,
}

#[async_trait]
impl TextGenerator for Gated {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.release.notified().await;
        Ok(self.body.clone())
    }
}

async fn wait_for(tracker: &GenerationTracker, id: &TaskId, done: impl Fn(u8, GenerationStatus) -> bool) {
    for _ in 0..1_000 {
        let task = tracker.get_status(id);
        if done(task.progress, task.status) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("task {id} never reached the expected state");
}

#[tokio::test]
async fn duplicate_start_leaves_running_task_untouched() {
    let release = Arc::new(Notify::new());
    let tracker = GenerationTracker::new(Arc::new(Gated {
        release: Arc::clone(&release),
        body: batch_json(2),
    }))
    .with_clock(Clock::fixed(fixed_now()));
    let id = TaskId::new("gen-dup");

    assert_eq!(
        tracker.start_generation_for(id.clone(), 2).unwrap(),
        Some(id.clone())
    );
    wait_for(&tracker, &id, |progress, _| progress == 30).await;

    assert_eq!(tracker.start_generation_for(id.clone(), 2).unwrap(), None);
    let task = tracker.get_status(&id);
    assert_eq!(task.status, GenerationStatus::InProgress);
    assert_eq!(task.progress, 30);
    assert_eq!(task.started_at, Some(fixed_now()));

    release.notify_one();
    wait_for(&tracker, &id, |_, status| status == GenerationStatus::Completed).await;
    let task = tracker.get_status(&id);
    assert_eq!(task.progress, 100);
    assert_eq!(task.questions.map(|q| q.len()), Some(2));
}

#[tokio::test]
async fn extra_questions_are_cut_to_the_requested_count() {
    let tracker = GenerationTracker::new(Arc::new(Canned(batch_json(4))));
    let id = tracker.start_generation(3).unwrap();
    wait_for(&tracker, &id, |_, status| status.is_terminal()).await;
    assert_eq!(tracker.get_status(&id).questions.map(|q| q.len()), Some(3));
}

#[tokio::test]
async fn unusable_response_fails_the_task() {
    let tracker = GenerationTracker::new(Arc::new(Canned("I cannot help with that.".into())));
    let id = tracker.start_generation(2).unwrap();
    wait_for(&tracker, &id, |_, status| status.is_terminal()).await;

    let task = tracker.get_status(&id);
    assert_eq!(task.status, GenerationStatus::Failed);
    assert_eq!(task.error.as_deref(), Some("no valid questions in response"));
    assert!(task.questions.is_none());
}

#[tokio::test]
async fn worker_pool_bounds_running_calls() {
    let release = Arc::new(Notify::new());
    let tracker = GenerationTracker::new(Arc::new(Gated {
        release: Arc::clone(&release),
        body: batch_json(1),
    }))
    .with_max_concurrent(1);

    let first = tracker.start_generation(1).unwrap();
    let second = tracker.start_generation(1).unwrap();
    wait_for(&tracker, &first, |progress, _| progress == 30).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(tracker.get_status(&second).progress, 0);
    assert!(tracker.is_in_progress(&second));

    release.notify_one();
    wait_for(&tracker, &first, |_, status| status == GenerationStatus::Completed).await;
    wait_for(&tracker, &second, |progress, _| progress == 30).await;

    release.notify_one();
    wait_for(&tracker, &second, |_, status| status == GenerationStatus::Completed).await;
}

#[tokio::test(start_paused = true)]
async fn finished_task_is_purged_after_retention() {
    let tracker = GenerationTracker::new(Arc::new(Canned(batch_json(1))))
        .with_retention(Duration::from_secs(60));
    let id = tracker.start_generation(1).unwrap();
    wait_for(&tracker, &id, |_, status| status == GenerationStatus::Completed).await;

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(tracker.get_status(&id).status, GenerationStatus::Completed);

    tokio::time::sleep(Duration::from_secs(2)).await;
    wait_for(&tracker, &id, |_, status| status == GenerationStatus::NotFound).await;
    assert!(!tracker.is_in_progress(&id));
}

#[tokio::test(start_paused = true)]
async fn purge_spares_a_newer_task_with_the_same_id() {
    let tracker = GenerationTracker::new(Arc::new(Canned(batch_json(1))))
        .with_retention(Duration::from_secs(60));
    let id = TaskId::new("gen-reused");

    tracker.start_generation_for(id.clone(), 1).unwrap();
    wait_for(&tracker, &id, |_, status| status == GenerationStatus::Completed).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(tracker.start_generation_for(id.clone(), 1).unwrap().is_some());
    wait_for(&tracker, &id, |_, status| status == GenerationStatus::Completed).await;

    // First purge fires here and must leave the second attempt alone.
    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(tracker.get_status(&id).status, GenerationStatus::Completed);

    tokio::time::sleep(Duration::from_secs(30)).await;
    wait_for(&tracker, &id, |_, status| status == GenerationStatus::NotFound).await;
}

#[tokio::test]
async fn configured_features_shape_the_prompt() {
    let generator = Arc::new(Recording::default());
    let services = AppServices::new(
        Storage::in_memory(),
        generator.clone(),
        fixed_clock(),
        ServiceSettings {
            features: vec![PromptFeature::Summary],
            ..ServiceSettings::default()
        },
    )
    .unwrap();

    let id = services.tracker().start_generation(1).unwrap();
    wait_for(services.tracker(), &id, |_, status| status.is_terminal()).await;

    let prompt = generator.prompt.lock().unwrap().clone().unwrap();
    assert!(prompt.contains("Summary:\n- Explain"));
    assert!(!prompt.contains("Core requirements:"));
    assert!(!prompt.contains("References:\n"));
}
