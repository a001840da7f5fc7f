//! Minimal Gemini (generativelanguage) client for our use-cases.
//!
//! We only call `models/{model}:generateContent` and read back the first
//! candidate's text. The client walks a fixed list of candidate endpoints
//! (model × API version) in priority order and returns the first non-empty
//! answer. Each attempt is bounded by its own timeout so one unresponsive
//! endpoint cannot stall the chain.
//!
//! NOTE: We never log the API key; it travels as the `key` query parameter only.

use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{GeminiSettings, DEFAULT_BASE_URL};
use crate::domain::CandidateEndpoint;
use crate::error::GenerationError;
use crate::util::trunc_for_log;

const MIN_KEY_LEN: usize = 20;
const KEY_PLACEHOLDER: &str = "YOUR_API_KEY";

/// A key is usable when it is long enough and not the template placeholder.
/// Nothing is verified server-side until the first real call.
pub fn is_api_key_valid(key: &str) -> bool {
  let key = key.trim();
  key.len() > MIN_KEY_LEN && !key.contains(KEY_PLACEHOLDER)
}

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub candidates: Vec<CandidateEndpoint>,
  pub attempt_timeout: Duration,
}

impl Gemini {
  /// Construct the client if GEMINI_API_KEY holds a usable key; otherwise return None.
  pub fn from_env(settings: &GeminiSettings) -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok()?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    Self::new(api_key, base_url, settings)
  }

  /// Build a client from explicit parts. Returns None for an unusable key.
  pub fn new(api_key: String, base_url: String, settings: &GeminiSettings) -> Option<Self> {
    if !is_api_key_valid(&api_key) {
      return None;
    }

    let client = match reqwest::Client::builder().connect_timeout(Duration::from_secs(5)).build() {
      Ok(c) => c,
      Err(e) => {
        error!(target: "gemini", error = %e, "Failed to build HTTP client; Gemini disabled");
        return None;
      }
    };

    Some(Self {
      client,
      api_key: api_key.trim().to_string(),
      base_url: base_url.trim_end_matches('/').to_string(),
      candidates: candidate_endpoints(settings),
      attempt_timeout: Duration::from_secs(settings.attempt_timeout_secs.max(1)),
    })
  }

  /// Try every candidate endpoint in order; the first non-empty text wins.
  #[instrument(level = "info", skip(self, prompt, config), fields(prompt_len = prompt.len(), candidates = self.candidates.len()))]
  pub async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, GenerationError> {
    let body = GenerateContentRequest {
      contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
      generation_config: config.clone(),
    };

    let mut attempts = 0usize;
    for endpoint in &self.candidates {
      attempts += 1;
      let start = Instant::now();
      let outcome = match tokio::time::timeout(self.attempt_timeout, self.attempt(endpoint, &body)).await {
        Ok(res) => res,
        Err(_) => Err(GenerationError::Timeout {
          model: endpoint.model.clone(),
          version: endpoint.version.clone(),
          secs: self.attempt_timeout.as_secs(),
        }),
      };
      let elapsed = start.elapsed();

      match outcome {
        Ok(text) => {
          info!(target: "gemini", model = %endpoint.model, version = %endpoint.version, ?elapsed, response_len = text.len(), "Generation succeeded");
          return Ok(text);
        }
        Err(e @ GenerationError::Timeout { .. }) => {
          warn!(target: "gemini", model = %endpoint.model, version = %endpoint.version, ?elapsed, error = %e, "Candidate timed out; trying next");
        }
        Err(e) => {
          debug!(target: "gemini", model = %endpoint.model, version = %endpoint.version, ?elapsed, error = %e, "Candidate failed; trying next");
        }
      }
    }

    Err(GenerationError::Exhausted { attempts })
  }

  /// One POST against one candidate. Any failure is reported as an endpoint error.
  async fn attempt(&self, endpoint: &CandidateEndpoint, body: &GenerateContentRequest) -> Result<String, GenerationError> {
    let fail = |reason: String| GenerationError::Endpoint {
      model: endpoint.model.clone(),
      version: endpoint.version.clone(),
      reason,
    };

    let url = format!("{}/{}/models/{}:generateContent", self.base_url, endpoint.version, endpoint.model);
    let res = self.client.post(&url)
      .query(&[("key", self.api_key.as_str())])
      .header(USER_AGENT, "studybuddy-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(body).send().await.map_err(|e| fail(e.without_url().to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_gemini_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(fail(format!("HTTP {}: {}", status, msg)));
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| fail(format!("decode error: {}", e.without_url())))?;
    if let Some(usage) = &body.usage_metadata {
      debug!(target: "gemini", prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }

    match body.first_text() {
      Some(text) => Ok(text),
      None => Err(fail("response carried no candidate text".into())),
    }
  }
}

/// Nested priority order: every version of a model before the next model.
pub fn candidate_endpoints(settings: &GeminiSettings) -> Vec<CandidateEndpoint> {
  settings.models.iter()
    .flat_map(|model| {
      settings.api_versions.iter().map(move |version| CandidateEndpoint {
        model: model.clone(),
        version: version.clone(),
      })
    })
    .collect()
}

// --- Wire DTOs ---

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub temperature: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_output_tokens: Option<u32>,
}

impl GenerationConfig {
  pub fn with_temperature(temperature: f32) -> Self {
    Self { temperature: Some(temperature), max_output_tokens: None }
  }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default)]
  parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default)]
  text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(default)]
  usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
  /// `candidates[0].content.parts[0].text`, if present and non-empty.
  fn first_text(&self) -> Option<String> {
    let text = &self.candidates.first()?.content.as_ref()?.parts.first()?.text;
    if text.trim().is_empty() { None } else { Some(text.clone()) }
  }
}

#[derive(Deserialize)]
struct Candidate {
  #[serde(default)]
  content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
