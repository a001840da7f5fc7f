//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs sizes and result info, never note contents.

use std::sync::Arc;
use axum::{extract::State, http::StatusCode, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, gemini: state.online() })
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_summary(
  State(state): State<Arc<AppState>>,
  Json(body): Json<NoteIn>,
) -> impl IntoResponse {
  let out = do_summary(&state, &body.text).await;
  info!(target: "studybuddy", source = ?out.source, "HTTP summary served");
  Json(out)
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_table(
  State(state): State<Arc<AppState>>,
  Json(body): Json<NoteIn>,
) -> impl IntoResponse {
  let out = do_table(&state, &body.text).await;
  info!(target: "studybuddy", source = ?out.source, format = ?out.format, "HTTP table served");
  Json(out)
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_rewrite(
  State(state): State<Arc<AppState>>,
  Json(body): Json<RewriteIn>,
) -> impl IntoResponse {
  let out = do_rewrite(&state, &body.text, body.style).await;
  info!(target: "studybuddy", source = ?out.source, "HTTP rewrite served");
  Json(out)
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  Json(body): Json<NoteIn>,
) -> impl IntoResponse {
  let out = do_quiz(&state, &body.text).await;
  info!(target: "studybuddy", source = ?out.source, questions = out.questions.len(), "HTTP quiz served");
  Json(out)
}

#[instrument(level = "info", skip(body), fields(questions = body.questions.len(), answers = body.answers.len()))]
pub async fn http_post_grade(Json(body): Json<GradeIn>) -> impl IntoResponse {
  let score = grade_quiz(&body.questions, &body.answers);
  info!(target: "studybuddy", score = score.score, total = score.total, "HTTP quiz graded");
  Json(score)
}

#[instrument(level = "info", skip(state, body), fields(messages = body.messages.len()))]
pub async fn http_post_chat(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ChatIn>,
) -> impl IntoResponse {
  match do_chat(&state, body.messages).await {
    Ok(out) => (StatusCode::OK, Json(out)).into_response(),
    Err(error) => (StatusCode::BAD_GATEWAY, Json(ErrorOut { error })).into_response(),
  }
}
