//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - The acquisition pipeline: prompt building, remote generation, parsing
//!   - Heuristic fallback for summarize / table / rewrite / quiz
//!   - Chat (no fallback: failures are returned to the caller)
//!   - Quiz grading

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ChatMessage, ChatRole, Delivered, Generation, GenerationSource, PromptTask, QuizQuestion, QuizScore, TaskKind};
use crate::error::GenerationError;
use crate::fallback;
use crate::gemini::GenerationConfig;
use crate::markdown::render_markdown;
use crate::parse::{parse_quiz, parse_table, parse_text, validate_quiz};
use crate::protocol::{ChatOut, QuizOut, TableFormat, TableOut, TextOut, CHAT_UNAVAILABLE};
use crate::state::AppState;
use crate::util::{fill_template, take_chars};

pub const TRUNCATION_MARKER: &str = "\n[Truncated]";
const DEFAULT_REWRITE_STYLE: &str = "neutral";

/// Cap note text for the remote prompt, marking the cut.
pub fn normalize_content(text: &str, max_chars: usize) -> String {
  let head = take_chars(text, max_chars);
  if head.len() == text.len() { text.to_string() } else { format!("{}{}", head, TRUNCATION_MARKER) }
}

/// Build the task-specific prompt from the configured templates.
pub fn build_prompt(state: &AppState, task: &PromptTask) -> String {
  let prompts = &state.prompts;
  let notes = normalize_content(&task.text, state.settings.max_input_chars);
  match task.kind {
    TaskKind::Quiz => fill_template(&prompts.quiz_template, &[("notes", &notes)]),
    TaskKind::Summarize => fill_template(&prompts.summary_template, &[("notes", &notes)]),
    TaskKind::Tabulate => fill_template(&prompts.table_template, &[("notes", &notes)]),
    TaskKind::Rewrite => {
      let style = task.style.as_deref().unwrap_or(DEFAULT_REWRITE_STYLE);
      fill_template(&prompts.rewrite_template, &[("style", style), ("notes", &notes)])
    }
    TaskKind::Chat => {
      let history = task.history.iter()
        .map(|m| match m.role {
          ChatRole::User => format!("User: {}", m.content),
          ChatRole::Assistant => format!("Assistant: {}", m.content),
        })
        .collect::<Vec<_>>()
        .join("\n");
      fill_template(&prompts.chat_template, &[("system", &prompts.chat_system), ("history", &history)])
    }
  }
}

fn generation_config(kind: TaskKind) -> GenerationConfig {
  let temperature = match kind {
    TaskKind::Quiz => 0.4,
    TaskKind::Summarize => 0.3,
    TaskKind::Tabulate => 0.2,
    TaskKind::Rewrite | TaskKind::Chat => 0.7,
  };
  GenerationConfig::with_temperature(temperature)
}

/// Shape raw model text according to the task.
fn parse_for(kind: TaskKind, raw: &str) -> Result<Generation, GenerationError> {
  match kind {
    TaskKind::Quiz => Ok(Generation::Quiz(validate_quiz(parse_quiz(raw)?)?)),
    TaskKind::Tabulate => Ok(parse_table(raw)),
    TaskKind::Summarize | TaskKind::Rewrite | TaskKind::Chat => Ok(parse_text(raw)),
  }
}

/// Remote path only: credential, prompt, candidates, parsing.
async fn generate_remote(state: &AppState, task: &PromptTask) -> Result<Generation, GenerationError> {
  let gemini = state.gemini.as_ref().ok_or(GenerationError::Credential)?;
  let prompt = build_prompt(state, task);
  let raw = gemini.generate(&prompt, &generation_config(task.kind)).await?;
  parse_for(task.kind, &raw)
}

/// Heuristic substitute computed from the untruncated note text.
fn generate_fallback(task: &PromptTask) -> Option<Generation> {
  let text = task.text.as_str();
  match task.kind {
    TaskKind::Summarize => Some(Generation::Text(fallback::summary(text))),
    TaskKind::Tabulate => Some(Generation::Html(fallback::table(text))),
    TaskKind::Rewrite => Some(Generation::Text(fallback::rewrite(text, task.style.as_deref()))),
    TaskKind::Quiz => Some(Generation::Quiz(fallback_quiz(text))),
    TaskKind::Chat => None,
  }
}

fn fallback_quiz(text: &str) -> Vec<QuizQuestion> {
  fallback::quiz(text, &mut rand::thread_rng())
}

/// Run one task end to end. Only chat can return an error; every other task
/// degrades to the heuristic fallback.
#[instrument(level = "info", skip(state, task), fields(kind = task.kind.as_str(), text_len = task.text.len(), request_id = %Uuid::new_v4()))]
pub async fn generate(state: &AppState, task: &PromptTask) -> Result<Delivered, GenerationError> {
  match generate_remote(state, task).await {
    Ok(generation) => {
      info!(target: "studybuddy", kind = task.kind.as_str(), "Delivered Gemini result");
      Ok(Delivered { generation, source: GenerationSource::Gemini })
    }
    Err(e) => {
      match &e {
        GenerationError::Credential => warn!(target: "fallback", kind = task.kind.as_str(), "No usable Gemini key; using offline mode"),
        _ => error!(target: "fallback", kind = task.kind.as_str(), error = %e, "Gemini generation failed"),
      }
      match generate_fallback(task) {
        Some(generation) => {
          info!(target: "fallback", kind = task.kind.as_str(), "Delivered heuristic result");
          Ok(Delivered { generation, source: GenerationSource::Fallback })
        }
        None => Err(e),
      }
    }
  }
}

// --- Caller-facing operations ---

pub async fn generate_quiz_from_note(state: &AppState, text: &str) -> (Vec<QuizQuestion>, GenerationSource) {
  let task = PromptTask::quiz(text);
  match generate(state, &task).await {
    Ok(Delivered { generation: Generation::Quiz(questions), source }) => (questions, source),
    Ok(other) => {
      error!(target: "studybuddy", source = ?other.source, "Quiz task produced a non-quiz result");
      (fallback_quiz(text), GenerationSource::Fallback)
    }
    Err(_) => (fallback_quiz(text), GenerationSource::Fallback),
  }
}

pub async fn summarize_note(state: &AppState, text: &str) -> (String, GenerationSource) {
  let task = PromptTask::summarize(text);
  into_text(generate(state, &task).await, || fallback::summary(text))
}

/// Returns the table plus whether it is an HTML fragment (`true`) or text.
pub async fn generate_note_table(state: &AppState, text: &str) -> (String, bool, GenerationSource) {
  let task = PromptTask::tabulate(text);
  match generate(state, &task).await {
    Ok(Delivered { generation: Generation::Html(html), source }) => (html, true, source),
    Ok(Delivered { generation: Generation::Text(t), source }) => (t, false, source),
    _ => (fallback::table(text), true, GenerationSource::Fallback),
  }
}

pub async fn rewrite_note(state: &AppState, text: &str, style: Option<String>) -> (String, GenerationSource) {
  let task = PromptTask::rewrite(text, style);
  into_text(generate(state, &task).await, || fallback::rewrite(&task.text, task.style.as_deref()))
}

pub async fn chat_with_gemini(state: &AppState, history: Vec<ChatMessage>) -> Result<String, GenerationError> {
  let task = PromptTask::chat(history);
  match generate(state, &task).await?.generation {
    Generation::Text(t) | Generation::Html(t) => Ok(t),
    Generation::Quiz(_) => Err(GenerationError::Format("chat produced a quiz".into())),
  }
}

fn into_text(
  res: Result<Delivered, GenerationError>,
  fallback: impl FnOnce() -> String,
) -> (String, GenerationSource) {
  match res {
    Ok(Delivered { generation: Generation::Text(t) | Generation::Html(t), source }) => (t, source),
    _ => (fallback(), GenerationSource::Fallback),
  }
}

// --- Handler helpers (HTTP + WebSocket) ---

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn do_summary(state: &AppState, text: &str) -> TextOut {
  let (text, source) = summarize_note(state, text).await;
  TextOut { html: render_markdown(&text), text, source }
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn do_table(state: &AppState, text: &str) -> TableOut {
  let (content, is_html, source) = generate_note_table(state, text).await;
  if is_html {
    TableOut { format: TableFormat::Html, html: content.clone(), content, source }
  } else {
    TableOut { format: TableFormat::Text, html: render_markdown(&content), content, source }
  }
}

#[instrument(level = "info", skip(state, text, style), fields(text_len = text.len(), style = ?style))]
pub async fn do_rewrite(state: &AppState, text: &str, style: Option<String>) -> TextOut {
  let (text, source) = rewrite_note(state, text, style).await;
  TextOut { html: render_markdown(&text), text, source }
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn do_quiz(state: &AppState, text: &str) -> QuizOut {
  let (questions, source) = generate_quiz_from_note(state, text).await;
  QuizOut { questions, source }
}

/// Chat reply, or the user-facing failure message.
#[instrument(level = "info", skip(state, messages), fields(messages = messages.len()))]
pub async fn do_chat(state: &AppState, messages: Vec<ChatMessage>) -> Result<ChatOut, String> {
  match chat_with_gemini(state, messages).await {
    Ok(text) => Ok(ChatOut { html: render_markdown(&text), text }),
    Err(e) => {
      error!(target: "studybuddy", error = %e, "Chat failed");
      Err(CHAT_UNAVAILABLE.to_string())
    }
  }
}

/// Count answers matching each question's `correctAnswer`. `answers[i]`
/// belongs to `questions[i]`; missing or `None` answers count as wrong.
pub fn grade_quiz(questions: &[QuizQuestion], answers: &[Option<String>]) -> QuizScore {
  let total = questions.len();
  let score = questions.iter()
    .zip(answers.iter())
    .filter(|(q, a)| a.as_deref() == Some(q.correct_answer.as_str()))
    .count();
  let percentage = if total == 0 { 0 } else { ((score as f64 / total as f64) * 100.0).round() as u32 };
  QuizScore { score, total, percentage }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{GeminiSettings, Prompts};
  use crate::gemini::tests::{client_for, text_response};
  use crate::gemini::Gemini;
  use serde_json::json;
  use std::collections::HashSet;
  use wiremock::matchers::method;
  use wiremock::{Mock, MockServer, ResponseTemplate};

  const PHOTO: &str = "Photosynthesis converts light into chemical energy. Plants use chlorophyll to capture light.";

  fn settings() -> GeminiSettings {
    GeminiSettings {
      models: vec!["m-one".into()],
      api_versions: vec!["v1".into(), "v1beta".into()],
      attempt_timeout_secs: 2,
      max_input_chars: 8000,
    }
  }

  fn offline() -> AppState {
    AppState::from_parts(None, Prompts::default(), GeminiSettings::default())
  }

  fn online(server: &MockServer) -> AppState {
    let gemini: Gemini = client_for(server, &settings());
    AppState::from_parts(Some(gemini), Prompts::default(), settings())
  }

  async fn server_answering(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(status).set_body_json(body))
      .mount(&server)
      .await;
    server
  }

  fn remote_quiz_json() -> String {
    let qs: Vec<serde_json::Value> = (1..=5)
      .map(|i| json!({
        "id": i,
        "question": format!("Remote question {}?", i),
        "options": ["alpha", "beta", "gamma", "delta"],
        "correctAnswer": "gamma",
      }))
      .collect();
    format!("```json\n{}\n```", serde_json::Value::Array(qs))
  }

  #[test]
  fn long_notes_are_truncated_with_marker() {
    let text = "a".repeat(10_000);
    let out = normalize_content(&text, 8000);
    assert_eq!(out.len(), 8000 + TRUNCATION_MARKER.len());
    assert!(out.ends_with("\n[Truncated]"));
    assert_eq!(normalize_content("short", 8000), "short");
  }

  #[test]
  fn chat_prompt_lists_history_and_ends_with_assistant() {
    let task = PromptTask::chat(vec![
      ChatMessage { role: ChatRole::User, content: "What is ATP?".into() },
      ChatMessage { role: ChatRole::Assistant, content: "Energy currency.".into() },
      ChatMessage { role: ChatRole::User, content: "Where is it made?".into() },
    ]);
    let prompt = build_prompt(&offline(), &task);
    assert!(prompt.starts_with("You are Gemini"));
    assert!(prompt.contains("Chat History:\nUser: What is ATP?\nAssistant: Energy currency.\nUser: Where is it made?\nAssistant:"));
  }

  #[test]
  fn rewrite_prompt_defaults_to_neutral_style() {
    let prompt = build_prompt(&offline(), &PromptTask::rewrite("notes", None));
    assert!(prompt.contains("in a neutral writing style"));
    let prompt = build_prompt(&offline(), &PromptTask::rewrite("notes", Some("Academic".into())));
    assert!(prompt.contains("in a Academic writing style"));
  }

  #[tokio::test]
  async fn offline_generation_tasks_use_fallback() {
    let state = offline();
    let (summary, source) = summarize_note(&state, "").await;
    assert_eq!(summary, "No content provided.");
    assert_eq!(source, GenerationSource::Fallback);

    let (table, is_html, _) = generate_note_table(&state, "").await;
    assert!(is_html);
    assert_eq!(table.matches("<tr><td>").count(), 1);
    assert!(table.contains("<td>No content provided.</td><td>See notes</td>"));

    let (rewritten, _) = rewrite_note(&state, "my notes", Some("Casual".into())).await;
    assert_eq!(rewritten, "Rewrite (Casual):\nmy notes");
  }

  #[tokio::test]
  async fn chat_without_key_is_an_error() {
    let state = offline();
    let history = vec![ChatMessage { role: ChatRole::User, content: "hi".into() }];
    assert_eq!(chat_with_gemini(&state, history).await, Err(GenerationError::Credential));
  }

  #[tokio::test]
  async fn unreachable_endpoints_fall_back_to_keyword_quiz() {
    let server = server_answering(503, json!({ "error": { "message": "overloaded" } })).await;
    let state = online(&server);

    let (questions, source) = generate_quiz_from_note(&state, PHOTO).await;
    assert_eq!(source, GenerationSource::Fallback);
    assert_eq!(questions.len(), 5);
    for q in &questions {
      assert_eq!(q.options.len(), 4);
      assert!(q.options.contains(&q.correct_answer));
      assert!(q.question.contains("photosynthesis") || q.question.contains("plants"));
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn chat_exhaustion_is_propagated() {
    let server = server_answering(500, json!({})).await;
    let state = online(&server);
    let history = vec![ChatMessage { role: ChatRole::User, content: "hi".into() }];
    assert_eq!(chat_with_gemini(&state, history).await, Err(GenerationError::Exhausted { attempts: 2 }));
  }

  #[tokio::test]
  async fn remote_quiz_is_parsed_and_validated() {
    let server = server_answering(200, text_response(&remote_quiz_json())).await;
    let state = online(&server);

    let (questions, source) = generate_quiz_from_note(&state, PHOTO).await;
    assert_eq!(source, GenerationSource::Gemini);
    assert_eq!(questions[4].question, "Remote question 5?");
    assert_eq!(questions[4].correct_answer, "gamma");
  }

  #[tokio::test]
  async fn malformed_remote_quiz_triggers_fallback() {
    let server = server_answering(200, text_response("Here are some questions, sorry no JSON")).await;
    let state = online(&server);

    let (questions, source) = generate_quiz_from_note(&state, PHOTO).await;
    assert_eq!(source, GenerationSource::Fallback);
    let distinct: HashSet<&String> = questions[0].options.iter().collect();
    assert_eq!(distinct.len(), 4);
  }

  #[tokio::test]
  async fn remote_prompt_is_truncated_but_fallback_sees_full_text() {
    let server = server_answering(500, json!({})).await;
    let state = online(&server);
    let text = format!("{} {}", "Energy flows through every ecosystem on Earth.", "z".repeat(10_000));

    let (summary, source) = summarize_note(&state, &text).await;
    assert_eq!(source, GenerationSource::Fallback);
    assert!(summary.ends_with(&"z".repeat(100)));
    assert!(summary.chars().count() > 10_000);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.ends_with("\n[Truncated]"));
    let embedded = prompt.split("Notes:\n").nth(1).unwrap();
    assert_eq!(embedded.chars().count(), 8000 + TRUNCATION_MARKER.chars().count());
  }

  #[tokio::test]
  async fn text_tables_are_passed_through_as_text() {
    let server = server_answering(200, text_response("| Topic | Key Points |\n|---|---|")).await;
    let state = online(&server);
    let (table, is_html, source) = generate_note_table(&state, PHOTO).await;
    assert!(!is_html);
    assert_eq!(source, GenerationSource::Gemini);
    assert!(table.starts_with("| Topic"));
  }

  #[test]
  fn grading_counts_matching_answers() {
    let questions = fallback::unavailable_quiz();
    let answers: Vec<Option<String>> = vec![Some("Check API Key".into()), Some("Retry".into()), None, Some("Check API Key".into())];
    let score = grade_quiz(&questions, &answers);
    assert_eq!(score, QuizScore { score: 2, total: 5, percentage: 40 });
    assert_eq!(grade_quiz(&[], &[]).percentage, 0);
  }
}
