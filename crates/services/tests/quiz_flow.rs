use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use quiz_core::model::{SessionId, SessionStateError, TaskId};
use quiz_core::time::fixed_clock;
use serde_json::{Value, json};
use services::{
    AppServices, GenerationError, NextQuestionView, PageView, QuizSessionService,
    SessionError, TextGenerator, app_services::ServiceSettings,
};
use storage::Storage;

fn batch_json(count: usize, round: usize) -> String {
    let items: Vec<Value> = (1..=count)
        .map(|n| {
            json!({
                "question": format!("Round {round} question {n}"),
                "clues": ["c1", "c2", "c3", "c4", "c5"],
                "options": [{"label": "right", "answer": true}, {"label": "wrong", "answer": false}],
            })
        })
        .collect();
    json!({ "questions": items }).to_string()
}

/// Answers each call with a fresh batch, or fails while `failing` is set.
#[derive(Default)]
struct Scripted {
    calls: AtomicUsize,
    failing: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl TextGenerator for Scripted {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        let round = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(GenerationError::Service("model overloaded".into()));
        }
        Ok(batch_json(3, round))
    }
}

fn setup(generator: Arc<Scripted>) -> Arc<QuizSessionService> {
    let settings = ServiceSettings {
        batch_size: 3,
        ..ServiceSettings::default()
    };
    AppServices::new(
        Storage::in_memory(),
        generator,
        fixed_clock(),
        settings,
    )
    .unwrap()
    .quiz()
}

async fn settle(quiz: &QuizSessionService, session: &SessionId) {
    let id = TaskId::for_session(session);
    for _ in 0..1_000 {
        if !quiz.tracker().is_in_progress(&id) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("generation did not finish");
}

fn question_text(view: &PageView) -> &str {
    match view {
        PageView::Ready { question, .. } => question.text(),
        other => panic!("expected a ready page, got {other:?}"),
    }
}

#[tokio::test]
async fn first_visit_loads_then_serves_the_batch() {
    let generator = Arc::new(Scripted::default());
    let quiz = setup(Arc::clone(&generator));
    let session = SessionId::generate();

    let first = quiz.page(&session, false).await.unwrap();
    assert!(matches!(first, PageView::Loading { task: Some(_), .. }));

    // A second view while loading must not start another call.
    let again = quiz.page(&session, false).await.unwrap();
    assert!(matches!(again, PageView::Loading { .. }));

    settle(&quiz, &session).await;
    let ready = quiz.page(&session, false).await.unwrap();
    assert_eq!(question_text(&ready), "Round 1 question 1");
    match ready {
        PageView::Ready {
            question_number,
            total_questions,
            metrics,
            ..
        } => {
            assert_eq!(question_number, 1);
            assert_eq!(total_questions, 3);
            assert_eq!(metrics.total, 0);
        }
        _ => unreachable!(),
    }
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retried_next_advances_once() {
    let quiz = setup(Arc::new(Scripted::default()));
    let session = SessionId::generate();
    quiz.page(&session, false).await.unwrap();
    settle(&quiz, &session).await;
    quiz.page(&session, false).await.unwrap();

    let next = quiz.next_question(&session, Some(0)).await.unwrap();
    let retry = quiz.next_question(&session, Some(0)).await.unwrap();
    for view in [&next, &retry] {
        match view {
            NextQuestionView::Question {
                question,
                question_number,
                ..
            } => {
                assert_eq!(question.text(), "Round 1 question 2");
                assert_eq!(*question_number, 2);
            }
            other => panic!("expected a question, got {other:?}"),
        }
    }
    assert_eq!(quiz.load(&session).await.unwrap().current_index(), 1);
}

#[tokio::test]
async fn next_without_render_advances_once() {
    let quiz = setup(Arc::new(Scripted::default()));
    let session = SessionId::generate();
    quiz.page(&session, false).await.unwrap();
    settle(&quiz, &session).await;
    quiz.page(&session, false).await.unwrap();

    quiz.next_question(&session, None).await.unwrap();
    let retry = quiz.next_question(&session, None).await.unwrap();
    assert!(matches!(
        retry,
        NextQuestionView::Question { question_number: 2, .. }
    ));
    assert_eq!(quiz.load(&session).await.unwrap().current_index(), 1);

    // Rendering the page lets the next request move on.
    let page = quiz.page(&session, false).await.unwrap();
    assert_eq!(question_text(&page), "Round 1 question 2");
    quiz.next_question(&session, None).await.unwrap();
    assert_eq!(quiz.load(&session).await.unwrap().current_index(), 2);
}

#[tokio::test]
async fn repeated_submit_counts_once() {
    let quiz = setup(Arc::new(Scripted::default()));
    let session = SessionId::generate();
    quiz.page(&session, false).await.unwrap();
    settle(&quiz, &session).await;
    quiz.page(&session, false).await.unwrap();

    let first = quiz.submit_answer(&session, true).await.unwrap();
    let second = quiz.submit_answer(&session, true).await.unwrap();
    assert!(first.recorded);
    assert!(!second.recorded);
    assert_eq!(quiz.metrics(&session).await.unwrap().total, 1);

    quiz.next_question(&session, None).await.unwrap();
    quiz.submit_answer(&session, false).await.unwrap();
    let metrics = quiz.metrics(&session).await.unwrap();
    assert_eq!((metrics.total, metrics.correct, metrics.accuracy), (2, 1, 50));

    quiz.reset_metrics(&session).await.unwrap();
    assert_eq!(quiz.metrics(&session).await.unwrap().total, 0);
}

#[tokio::test]
async fn submit_without_question_is_rejected() {
    let quiz = setup(Arc::new(Scripted::default()));
    let err = quiz
        .submit_answer(&SessionId::generate(), true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::State(SessionStateError::NoCurrentQuestion)
    ));
}

#[tokio::test]
async fn exhausted_batch_is_replaced() {
    let generator = Arc::new(Scripted::default());
    let quiz = setup(Arc::clone(&generator));
    let session = SessionId::generate();
    quiz.page(&session, false).await.unwrap();
    settle(&quiz, &session).await;
    quiz.page(&session, false).await.unwrap();

    quiz.next_question(&session, Some(0)).await.unwrap();
    quiz.page(&session, false).await.unwrap();
    quiz.next_question(&session, Some(1)).await.unwrap();
    quiz.page(&session, false).await.unwrap();
    let loading = quiz.next_question(&session, Some(2)).await.unwrap();
    assert!(matches!(loading, NextQuestionView::Loading { loading: true, .. }));

    // Retry while loading must not skip ahead once the batch arrives.
    quiz.next_question(&session, None).await.unwrap();
    settle(&quiz, &session).await;

    let page = quiz.page(&session, false).await.unwrap();
    assert_eq!(question_text(&page), "Round 2 question 1");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failure_sticks_until_refresh() {
    let generator = Arc::new(Scripted::default());
    generator.failing.store(true, Ordering::SeqCst);
    let quiz = setup(Arc::clone(&generator));
    let session = SessionId::generate();

    quiz.page(&session, false).await.unwrap();
    settle(&quiz, &session).await;
    match quiz.page(&session, false).await.unwrap() {
        PageView::Error { message, .. } => assert!(message.contains("model overloaded")),
        other => panic!("expected an error page, got {other:?}"),
    }

    quiz.page(&session, false).await.unwrap();
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    let next = quiz.next_question(&session, None).await.unwrap();
    assert!(matches!(next, NextQuestionView::Error { .. }));

    generator.failing.store(false, Ordering::SeqCst);
    let retry = quiz.page(&session, true).await.unwrap();
    assert!(matches!(retry, PageView::Loading { .. }));
    settle(&quiz, &session).await;
    let ready = quiz.page(&session, false).await.unwrap();
    assert_eq!(question_text(&ready), "Round 2 question 1");
}

#[tokio::test]
async fn clearing_the_session_starts_over() {
    let quiz = setup(Arc::new(Scripted::default()));
    let session = SessionId::generate();
    quiz.page(&session, false).await.unwrap();
    settle(&quiz, &session).await;
    quiz.page(&session, false).await.unwrap();
    quiz.submit_answer(&session, true).await.unwrap();

    quiz.clear_session(&session).await.unwrap();
    quiz.clear_session(&session).await.unwrap();
    let fresh = quiz.load(&session).await.unwrap();
    assert!(fresh.questions().is_empty());
    assert_eq!(fresh.metrics().total(), 0);
}

#[tokio::test]
async fn status_reports_the_session_task() {
    let quiz = setup(Arc::new(Scripted::default()));
    let session = SessionId::generate();
    let before = quiz.generation_status(&session).await.unwrap();
    assert_eq!(before.id, TaskId::for_session(&session));

    quiz.page(&session, false).await.unwrap();
    settle(&quiz, &session).await;
    let value = serde_json::to_value(quiz.generation_status(&session).await.unwrap()).unwrap();
    assert_eq!(value["status"], "completed");
    assert_eq!(value["questions"].as_array().map(Vec::len), Some(3));
}
