//! /voice-tutor

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use uuid::Uuid;

use super::{ensure_session_owned, ApiJson, ApiQuery, IdPath, PageQuery};
use crate::auth::AuthContext;
use crate::db::conversations::{self, VoiceConversation, VoiceMessage};
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::services::voice_tutor::{self, ChatMessage, TutorReply};
use crate::state::AppState;
use crate::validation::{require_text, FieldChecks, TOPIC_MAX_LEN};

const QUESTION_MAX_LEN: usize = 1000;
const MESSAGE_MAX_LEN: usize = 5000;

#[derive(Deserialize)]
pub struct AskRequest {
  pub topic: String,
  pub user_question: String,
  #[serde(default)]
  pub conversation_history: Vec<ChatMessage>,
}

#[derive(Deserialize)]
pub struct CreateConversation {
  pub topic: String,
  #[serde(default)]
  pub study_session_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct AddMessage {
  pub role: String,
  pub content: String,
  #[serde(default)]
  pub audio_url: Option<String>,
}

fn check_role(role: &str) -> Result<(), String> {
  match role {
    "user" | "assistant" => Ok(()),
    _ => Err("Role must be 'user' or 'assistant'".to_string()),
  }
}

fn check_history(history: &[ChatMessage], max: usize) -> Result<(), String> {
  if history.len() > max {
    return Err(format!("At most {} messages of history are accepted", max));
  }
  history.iter().try_for_each(|m| check_role(&m.role))
}

/// POST /voice-tutor/ask
pub async fn ask(
  State(state): State<AppState>,
  _auth: AuthContext,
  ApiJson(req): ApiJson<AskRequest>,
) -> ApiResult<Json<TutorReply>> {
  let limits = &state.config.limits;
  FieldChecks::new()
    .check("topic", require_text(&req.topic, TOPIC_MAX_LEN))
    .check("user_question", require_text(&req.user_question, QUESTION_MAX_LEN))
    .check(
      "conversation_history",
      check_history(&req.conversation_history, limits.max_conversation_history),
    )
    .finish()?;

  let reply = voice_tutor::ask(
    state.model.as_ref(),
    req.topic.trim(),
    req.user_question.trim(),
    &req.conversation_history,
    limits.tutor_context_messages,
  )
  .await?;
  Ok(Json(reply))
}

/// POST /voice-tutor/conversations
pub async fn create_conversation(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<CreateConversation>,
) -> ApiResult<(StatusCode, Json<VoiceConversation>)> {
  FieldChecks::new().check("topic", require_text(&req.topic, TOPIC_MAX_LEN)).finish()?;
  let session_id = req.study_session_id.map(|id| id.to_string());

  let conn = try_lock(&state.db)?;
  ensure_session_owned(&conn, auth.user_id(), session_id.as_deref())?;
  let conversation = conversations::create_conversation(&conn, auth.user_id(), req.topic.trim(), session_id.as_deref())?;
  Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /voice-tutor/conversations
pub async fn list_conversations(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<VoiceConversation>>> {
  let (skip, limit) = page.resolve()?;
  let conn = try_lock(&state.db)?;
  Ok(Json(conversations::list_conversations(&conn, auth.user_id(), skip, limit)?))
}

/// POST /voice-tutor/conversations/{conversation_id}/messages
pub async fn add_message(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(conversation_id): IdPath,
  ApiJson(req): ApiJson<AddMessage>,
) -> ApiResult<(StatusCode, Json<VoiceMessage>)> {
  FieldChecks::new()
    .check("role", check_role(&req.role))
    .check("content", require_text(&req.content, MESSAGE_MAX_LEN))
    .finish()?;

  let conn = try_lock(&state.db)?;
  conversations::add_message(
    &conn,
    auth.user_id(),
    &conversation_id,
    &req.role,
    &req.content,
    req.audio_url.as_deref(),
  )?
  .map(|message| (StatusCode::CREATED, Json(message)))
  .ok_or_else(|| ApiError::not_found("Conversation"))
}

/// GET /voice-tutor/conversations/{conversation_id}/messages
pub async fn list_messages(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(conversation_id): IdPath,
) -> ApiResult<Json<Vec<VoiceMessage>>> {
  let conn = try_lock(&state.db)?;
  conversations::list_messages(&conn, auth.user_id(), &conversation_id)?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Conversation"))
}
