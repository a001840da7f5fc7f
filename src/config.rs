//! Loading agent configuration (prompts + Gemini candidate settings) from TOML.
//!
//! See `AgentConfig`, `Prompts` and `GeminiSettings` for the expected schema.
//! Every section is optional; missing sections fall back to the defaults below.
//!
//! ```toml
//! [gemini]
//! models = ["gemini-2.0-flash", "gemini-1.5-flash"]
//! api_versions = ["v1beta"]
//! attempt_timeout_secs = 10
//!
//! [prompts]
//! summary_template = "Summarize:\n{notes}"
//! ```

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub gemini: GeminiSettings,
}

/// Candidate endpoints and limits for the remote generator.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
  /// Model identifiers in priority order.
  pub models: Vec<String>,
  /// API versions tried for each model, in order.
  pub api_versions: Vec<String>,
  /// Upper bound for a single candidate attempt.
  pub attempt_timeout_secs: u64,
  /// Note text longer than this is truncated before it is embedded in a prompt.
  pub max_input_chars: usize,
}

impl Default for GeminiSettings {
  fn default() -> Self {
    Self {
      models: vec![
        "gemini-2.0-flash".into(),
        "gemini-2.5-flash".into(),
        "gemini-1.5-flash".into(),
        "gemini-pro".into(),
      ],
      api_versions: vec!["v1".into(), "v1beta".into()],
      attempt_timeout_secs: 15,
      max_input_chars: 8000,
    }
  }
}

/// Prompt templates. `{notes}` is replaced by the (truncated) note text,
/// `{style}` by the rewrite style and `{history}` by the chat transcript.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_template: String,
  pub summary_template: String,
  pub table_template: String,
  pub rewrite_template: String,
  pub chat_system: String,
  pub chat_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_template: "You are creating a quiz from study notes.\n\
Generate exactly 5 multiple-choice questions based ONLY on the notes.\n\
Return a JSON array with 5 objects:\n\
[\n  {\"id\":1,\"question\":\"...\",\"options\":[\"A\",\"B\",\"C\",\"D\"],\"correctAnswer\":\"...\"}\n]\n\
Rules: 4 options, only one correct answer, ids must be 1-5, no extra text.\n\
Notes:\n{notes}".into(),
      summary_template: "Summarize the following notes into 4-6 concise bullet points.\n\
Keep each bullet short and high signal. Return plain text bullet points.\n\
Notes:\n{notes}".into(),
      table_template: "Create a concise HTML table that summarizes the notes.\n\
Rules:\n\
- Return ONLY the <table>...</table> HTML (no markdown, no backticks, no extra text).\n\
- Include class=\"sb-ai-table\" on the <table>.\n\
- Use 3 columns: Topic, Key Points, Example.\n\
- Keep 3–6 rows.\n\
Notes:\n{notes}".into(),
      rewrite_template: "Rewrite the following notes in a {style} writing style.\n\
Keep the meaning intact. Preserve lists where possible. Return plain text.\n\
Notes:\n{notes}".into(),
      chat_system: "You are Gemini, a helpful study assistant. Keep answers concise, clear, and relevant to students. \
Use markdown for simple formatting if needed (bold, lists).".into(),
      chat_template: "{system}\n\nChat History:\n{history}\nAssistant:".into(),
    }
  }
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "studybuddy", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "studybuddy", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "studybuddy", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// Parse a TOML document into `AgentConfig`, rejecting empty candidate lists.
pub fn parse_agent_config(s: &str) -> Result<AgentConfig, String> {
  let cfg = toml::from_str::<AgentConfig>(s).map_err(|e| e.to_string())?;
  if cfg.gemini.models.is_empty() || cfg.gemini.api_versions.is_empty() {
    return Err("gemini.models and gemini.api_versions must not be empty".into());
  }
  Ok(cfg)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_yields_defaults() {
    let cfg = parse_agent_config("").unwrap();
    assert_eq!(cfg.gemini.models.len(), 4);
    assert_eq!(cfg.gemini.models[0], "gemini-2.0-flash");
    assert_eq!(cfg.gemini.api_versions, vec!["v1", "v1beta"]);
    assert_eq!(cfg.gemini.max_input_chars, 8000);
    assert!(cfg.prompts.quiz_template.contains("{notes}"));
  }

  #[test]
  fn partial_sections_keep_remaining_defaults() {
    let cfg = parse_agent_config(
      r#"
[gemini]
models = ["gemini-1.5-flash"]
attempt_timeout_secs = 3

[prompts]
summary_template = "Short: {notes}"
"#,
    )
    .unwrap();
    assert_eq!(cfg.gemini.models, vec!["gemini-1.5-flash"]);
    assert_eq!(cfg.gemini.api_versions, vec!["v1", "v1beta"]);
    assert_eq!(cfg.gemini.attempt_timeout_secs, 3);
    assert_eq!(cfg.prompts.summary_template, "Short: {notes}");
    assert!(cfg.prompts.rewrite_template.contains("{style}"));
  }

  #[test]
  fn empty_model_list_is_rejected() {
    assert!(parse_agent_config("[gemini]\nmodels = []\n").is_err());
  }
}
