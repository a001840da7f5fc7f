//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, GenerationSource, QuizQuestion, QuizScore};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    Summarize {
        text: String,
    },
    Table {
        text: String,
    },
    Rewrite {
        text: String,
        #[serde(default)]
        style: Option<String>,
    },
    Quiz {
        text: String,
    },
    GradeQuiz {
        questions: Vec<QuizQuestion>,
        answers: Vec<Option<String>>,
    },
    Chat {
        messages: Vec<ChatMessage>,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Summary(TextOut),
    Table(TableOut),
    Rewrite(TextOut),
    Quiz(QuizOut),
    QuizScore(QuizScore),
    ChatReply(ChatOut),
    Error {
        message: String,
    },
}

/// Shown to the user when chat cannot produce an answer.
pub const CHAT_UNAVAILABLE: &str = "Sorry, I couldn't respond right now. Please try again in a moment.";

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
pub struct NoteIn {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct RewriteIn {
    pub text: String,
    #[serde(default)]
    pub style: Option<String>,
}

/// Plain-text result plus its rendered HTML.
#[derive(Debug, Serialize)]
pub struct TextOut {
    pub text: String,
    pub html: String,
    pub source: GenerationSource,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    Html,
    Text,
}

#[derive(Debug, Serialize)]
pub struct TableOut {
    pub format: TableFormat,
    pub content: String,
    pub html: String,
    pub source: GenerationSource,
}

#[derive(Debug, Serialize)]
pub struct QuizOut {
    pub questions: Vec<QuizQuestion>,
    pub source: GenerationSource,
}

#[derive(Debug, Deserialize)]
pub struct GradeIn {
    pub questions: Vec<QuizQuestion>,
    pub answers: Vec<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ChatIn {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatOut {
    pub text: String,
    pub html: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub gemini: bool,
}
