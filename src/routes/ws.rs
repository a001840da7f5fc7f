//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state, ws))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "studybuddy", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "studybuddy", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => handle_client_ws(incoming, &state).await,
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "studybuddy", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "studybuddy", "WebSocket disconnected");
}

#[instrument(level = "info", skip(msg, state))]
pub(crate) async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Summarize { text } => ServerWsMessage::Summary(do_summary(state, &text).await),

    ClientWsMessage::Table { text } => ServerWsMessage::Table(do_table(state, &text).await),

    ClientWsMessage::Rewrite { text, style } => ServerWsMessage::Rewrite(do_rewrite(state, &text, style).await),

    ClientWsMessage::Quiz { text } => {
      let out = do_quiz(state, &text).await;
      debug!(target: "studybuddy", source = ?out.source, "WS quiz served");
      ServerWsMessage::Quiz(out)
    }

    ClientWsMessage::GradeQuiz { questions, answers } => ServerWsMessage::QuizScore(grade_quiz(&questions, &answers)),

    ClientWsMessage::Chat { messages } => match do_chat(state, messages).await {
      Ok(out) => ServerWsMessage::ChatReply(out),
      Err(message) => ServerWsMessage::Error { message },
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::{GeminiSettings, Prompts};

  fn offline() -> AppState {
    AppState::from_parts(None, Prompts::default(), GeminiSettings::default())
  }

  async fn roundtrip(json: &str) -> serde_json::Value {
    let msg: ClientWsMessage = serde_json::from_str(json).unwrap();
    let reply = handle_client_ws(msg, &offline()).await;
    serde_json::to_value(&reply).unwrap()
  }

  #[tokio::test]
  async fn ping_answers_pong() {
    assert_eq!(roundtrip(r#"{"type":"ping"}"#).await, serde_json::json!({ "type": "pong" }));
  }

  #[tokio::test]
  async fn quiz_message_returns_tagged_quiz() {
    let reply = roundtrip(r#"{"type":"quiz","text":"Mitochondria produce most of the cell's ATP supply."}"#).await;
    assert_eq!(reply["type"], "quiz");
    assert_eq!(reply["source"], "fallback");
    assert_eq!(reply["questions"].as_array().unwrap().len(), 5);
    assert!(reply["questions"][0]["correctAnswer"].is_string());
  }

  #[tokio::test]
  async fn offline_chat_reports_error_message() {
    let reply = roundtrip(r#"{"type":"chat","messages":[{"role":"user","content":"hello"}]}"#).await;
    assert_eq!(reply["type"], "error");
    assert_eq!(reply["message"], crate::protocol::CHAT_UNAVAILABLE);
  }

  #[tokio::test]
  async fn grade_quiz_message_scores_answers() {
    let reply = roundtrip(
      r#"{"type":"grade_quiz","questions":[{"id":1,"question":"Q?","options":["a","b","c","d"],"correctAnswer":"b"}],"answers":["b"]}"#,
    ).await;
    assert_eq!(reply, serde_json::json!({ "type": "quiz_score", "score": 1, "total": 1, "percentage": 100 }));
  }
}
