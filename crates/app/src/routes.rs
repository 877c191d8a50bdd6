use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use quiz_core::model::MetricsSnapshot;
use quiz_core::taxonomy;
use services::{AppServices, QuizSessionService};

use crate::error::ApiError;
use crate::session::SessionCookie;

#[derive(Clone)]
pub struct AppState {
    pub quiz: Arc<QuizSessionService>,
}

impl AppState {
    #[must_use]
    pub fn new(services: &AppServices) -> Self {
        Self {
            quiz: services.quiz(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/refresh", get(refresh))
        .route("/submit-answer", post(submit_answer))
        .route("/next-question", get(next_question))
        .route("/generation-status", get(generation_status))
        .route("/metrics", get(metrics))
        .route("/reset-metrics", post(reset_metrics))
        .route("/clear-session", get(clear_session))
        .route("/topics", get(topics))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct IndexParams {
    pub refresh: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextParams {
    pub current: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub is_correct: bool,
}

#[derive(Serialize)]
pub struct SubmitAnswerResponse {
    pub success: bool,
    pub metrics: MetricsSnapshot,
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub metrics: MetricsSnapshot,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize)]
pub struct TopicEntry {
    pub topic: &'static str,
    pub subtopics: &'static [&'static str],
}

async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<IndexParams>,
) -> Result<Response, ApiError> {
    let cookie = SessionCookie::from_headers(&headers);
    let refresh = params
        .refresh
        .as_deref()
        .is_some_and(|value| matches!(value, "1" | "true"));
    let view = state.quiz.page(&cookie.id, refresh).await?;
    Ok(cookie.apply(Json(view).into_response()))
}

async fn refresh() -> Redirect {
    Redirect::to("/?refresh=1")
}

async fn submit_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<Response, ApiError> {
    let cookie = SessionCookie::from_headers(&headers);
    let outcome = state
        .quiz
        .submit_answer(&cookie.id, request.is_correct)
        .await?;
    let body = SubmitAnswerResponse {
        success: true,
        metrics: outcome.metrics.snapshot(),
    };
    Ok(cookie.apply(Json(body).into_response()))
}

async fn next_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<NextParams>,
) -> Result<Response, ApiError> {
    let cookie = SessionCookie::from_headers(&headers);
    let view = state.quiz.next_question(&cookie.id, params.current).await?;
    Ok(cookie.apply(Json(view).into_response()))
}

async fn generation_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let cookie = SessionCookie::from_headers(&headers);
    let status = state.quiz.generation_status(&cookie.id).await?;
    Ok(cookie.apply(Json(status).into_response()))
}

async fn metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let cookie = SessionCookie::from_headers(&headers);
    let metrics = state.quiz.metrics(&cookie.id).await?;
    Ok(cookie.apply(Json(MetricsResponse { metrics }).into_response()))
}

async fn reset_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let cookie = SessionCookie::from_headers(&headers);
    state.quiz.reset_metrics(&cookie.id).await?;
    info!(session_id = %cookie.id, "metrics reset");
    Ok(cookie.apply(Json(SuccessResponse { success: true }).into_response()))
}

async fn clear_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let cookie = SessionCookie::from_headers(&headers);
    state.quiz.clear_session(&cookie.id).await?;
    info!(session_id = %cookie.id, "session cleared");
    Ok(cookie.apply(Redirect::to("/").into_response()))
}

async fn topics() -> Json<Vec<TopicEntry>> {
    let entries = taxonomy::entries()
        .iter()
        .map(|&(topic, subtopics)| TopicEntry { topic, subtopics })
        .collect();
    Json(entries)
}
