//! Domain models: task kinds, prompt tasks, chat history, quiz records and
//! the delivered generation result.

use serde::{Deserialize, Serialize};

/// What the caller asked the assistant to do with a note.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
  Summarize,
  Tabulate,
  Rewrite,
  Quiz,
  Chat,
}

impl TaskKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      TaskKind::Summarize => "summarize",
      TaskKind::Tabulate => "tabulate",
      TaskKind::Rewrite => "rewrite",
      TaskKind::Quiz => "quiz",
      TaskKind::Chat => "chat",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
  User,
  Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role: ChatRole,
  pub content: String,
}

/// A single request for generated content. Built fresh per user action.
#[derive(Clone, Debug)]
pub struct PromptTask {
  pub kind: TaskKind,
  pub text: String,
  pub style: Option<String>,
  pub history: Vec<ChatMessage>,
}

impl PromptTask {
  pub fn summarize(text: impl Into<String>) -> Self {
    Self::plain(TaskKind::Summarize, text.into())
  }

  pub fn tabulate(text: impl Into<String>) -> Self {
    Self::plain(TaskKind::Tabulate, text.into())
  }

  pub fn quiz(text: impl Into<String>) -> Self {
    Self::plain(TaskKind::Quiz, text.into())
  }

  pub fn rewrite(text: impl Into<String>, style: Option<String>) -> Self {
    let style = style.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Self { kind: TaskKind::Rewrite, text: text.into(), style, history: Vec::new() }
  }

  pub fn chat(history: Vec<ChatMessage>) -> Self {
    Self { kind: TaskKind::Chat, text: String::new(), style: None, history }
  }

  fn plain(kind: TaskKind, text: String) -> Self {
    Self { kind, text, style: None, history: Vec::new() }
  }
}

/// One multiple-choice question. Wire field names follow the frontend
/// (`correctAnswer`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
  pub id: u32,
  pub question: String,
  pub options: Vec<String>,
  #[serde(rename = "correctAnswer")]
  pub correct_answer: String,
}

/// Shape of a generated result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Generation {
  Text(String),
  Html(String),
  Quiz(Vec<QuizQuestion>),
}

/// Which path produced a delivered result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationSource {
  Gemini,
  Fallback,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivered {
  pub generation: Generation,
  pub source: GenerationSource,
}

/// A (model, api version) pair tried during remote generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateEndpoint {
  pub model: String,
  pub version: String,
}

/// Result of grading a submitted quiz.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuizScore {
  pub score: usize,
  pub total: usize,
  pub percentage: u32,
}
