//! Application state: prompts, Gemini candidate settings and the optional client.
//!
//! Everything here is read-only after startup. The Gemini client is only
//! built when GEMINI_API_KEY holds a usable key; without it every generation
//! task runs in offline (heuristic) mode and chat reports an error.

use tracing::{info, instrument, warn};

use crate::config::{load_agent_config_from_env, GeminiSettings, Prompts};
use crate::gemini::Gemini;

#[derive(Clone)]
pub struct AppState {
    pub gemini: Option<Gemini>,
    pub prompts: Prompts,
    pub settings: GeminiSettings,
}

impl AppState {
    /// Build state from env: load config, then init the Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_agent_config_from_env().unwrap_or_default();

        let gemini = Gemini::from_env(&cfg.gemini);
        if let Some(g) = &gemini {
            let models: Vec<&str> = cfg.gemini.models.iter().map(String::as_str).collect();
            info!(
                target: "studybuddy",
                base_url = %g.base_url,
                ?models,
                versions = ?cfg.gemini.api_versions,
                candidates = g.candidates.len(),
                attempt_timeout = ?g.attempt_timeout,
                "Gemini enabled."
            );
        } else {
            warn!(target: "studybuddy", "Gemini disabled (GEMINI_API_KEY missing or invalid, or client setup failed). Using offline heuristics.");
        }

        Self::from_parts(gemini, cfg.prompts, cfg.gemini)
    }

    pub fn from_parts(gemini: Option<Gemini>, prompts: Prompts, settings: GeminiSettings) -> Self {
        Self { gemini, prompts, settings }
    }

    pub fn online(&self) -> bool {
        self.gemini.is_some()
    }
}
