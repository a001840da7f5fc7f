//! Shaping raw model text into results: quiz JSON, HTML tables, plain text.
//!
//! Models like to wrap JSON in code fences or add chatter around it, so the
//! quiz parser strips fences first and then falls back to locating the first
//! bracketed JSON block in the text. `validate_quiz` enforces the delivered
//! quiz shape (5 questions, 4 distinct options, answer among options).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::{Generation, QuizQuestion};
use crate::error::GenerationError;

pub const QUIZ_LEN: usize = 5;
pub const QUIZ_OPTIONS: usize = 4;

static JSON_BLOCK: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?s)\[\s*\{.*\}\s*\]|\{\s*.*\s*\}").expect("static regex"));

/// A question record as the model sent it. Every field is optional here;
/// `validate_quiz` decides whether the record is usable. Any remote `id` is
/// ignored, whatever its JSON type, since ids are assigned by position.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RemoteQuestion {
  #[serde(default)]
  pub question: String,
  #[serde(default)]
  pub options: Vec<String>,
  #[serde(default, rename = "correctAnswer")]
  pub correct_answer: String,
}

/// Parse the model's quiz answer into question records (no shape checks).
pub fn parse_quiz(raw: &str) -> Result<Vec<RemoteQuestion>, GenerationError> {
  let value = parse_json_lenient(raw)?;
  questions_from_value(value)
}

fn parse_json_lenient(raw: &str) -> Result<Value, GenerationError> {
  let clean = raw.replace("```json", "").replace("```", "");
  if let Ok(v) = serde_json::from_str::<Value>(clean.trim()) {
    return Ok(v);
  }
  if let Some(m) = JSON_BLOCK.find(raw) {
    if let Ok(v) = serde_json::from_str::<Value>(m.as_str().trim()) {
      return Ok(v);
    }
  }
  Err(GenerationError::Format("no parseable JSON in response".into()))
}

fn questions_from_value(value: Value) -> Result<Vec<RemoteQuestion>, GenerationError> {
  let list = match value {
    Value::Array(_) => value,
    Value::Object(mut map) => match map.remove("questions") {
      Some(v @ Value::Array(_)) => v,
      _ => return Err(GenerationError::Format("expected a JSON array of questions".into())),
    },
    _ => return Err(GenerationError::Format("expected a JSON array of questions".into())),
  };
  serde_json::from_value::<Vec<RemoteQuestion>>(list)
    .map_err(|e| GenerationError::Format(format!("question records: {}", e)))
}

/// Check and normalize a remote quiz. Options and answers are trimmed and
/// ids renumbered 1..=5 by position.
pub fn validate_quiz(questions: Vec<RemoteQuestion>) -> Result<Vec<QuizQuestion>, GenerationError> {
  if questions.len() != QUIZ_LEN {
    return Err(GenerationError::Format(format!("expected {} questions, got {}", QUIZ_LEN, questions.len())));
  }

  let mut out = Vec::with_capacity(QUIZ_LEN);
  for (idx, q) in questions.into_iter().enumerate() {
    let position = idx + 1;
    let question = q.question.trim().to_string();
    if question.is_empty() {
      return Err(GenerationError::Format(format!("question {} has no text", position)));
    }
    let options: Vec<String> = q.options.iter().map(|o| o.trim().to_string()).collect();
    if options.len() != QUIZ_OPTIONS {
      return Err(GenerationError::Format(format!("question {} has {} options", position, options.len())));
    }
    let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
    if distinct.len() != QUIZ_OPTIONS || distinct.contains("") {
      return Err(GenerationError::Format(format!("question {} repeats or blanks an option", position)));
    }
    let correct_answer = q.correct_answer.trim().to_string();
    if !distinct.contains(correct_answer.as_str()) {
      return Err(GenerationError::Format(format!("question {} answer is not among its options", position)));
    }
    out.push(QuizQuestion { id: position as u32, question, options, correct_answer });
  }
  Ok(out)
}

/// `<table ...>` answers are HTML fragments; anything else is text for the
/// markdown renderer.
pub fn parse_table(raw: &str) -> Generation {
  if is_html_table(raw) { Generation::Html(raw.trim().to_string()) } else { Generation::Text(raw.to_string()) }
}

pub fn is_html_table(raw: &str) -> bool {
  let head: String = raw.trim_start().chars().take(6).collect();
  head.eq_ignore_ascii_case("<table")
}

pub fn parse_text(raw: &str) -> Generation {
  Generation::Text(raw.trim().to_string())
}
