//! Failure taxonomy of the generation pipeline.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
  /// No usable API key configured.
  #[error("Gemini API key is missing or invalid")]
  Credential,

  /// A single candidate endpoint failed; the caller moves on to the next one.
  #[error("{model} ({version}) failed: {reason}")]
  Endpoint { model: String, version: String, reason: String },

  #[error("{model} ({version}) timed out after {secs}s")]
  Timeout { model: String, version: String, secs: u64 },

  /// Every candidate endpoint was tried and failed.
  #[error("AI generation failed after {attempts} attempts; check API key or connection")]
  Exhausted { attempts: usize },

  /// Remote text arrived but could not be shaped into the expected structure.
  #[error("invalid AI format: {0}")]
  Format(String),
}
