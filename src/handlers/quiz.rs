//! /quiz

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ensure_session_owned, ApiJson, ApiQuery, IdPath, PageQuery};
use crate::auth::AuthContext;
use crate::db::quizzes::{self, AnswerOutcome, NewQuizQuestion, QuizSession};
use crate::db::try_lock;
use crate::error::{ApiError, ApiResult};
use crate::services::flashcards::GeneratedCard;
use crate::services::quiz::OPTIONS_PER_QUESTION;
use crate::state::AppState;
use crate::validation::{require_text, FieldChecks, TOPIC_MAX_LEN};

#[derive(Deserialize)]
pub struct GenerateRequest {
  pub flashcards: Vec<GeneratedCard>,
}

#[derive(Serialize)]
pub struct GeneratedQuiz {
  pub questions: Vec<NewQuizQuestion>,
}

#[derive(Deserialize)]
pub struct CreateQuiz {
  pub topic: String,
  #[serde(default)]
  pub study_session_id: Option<Uuid>,
  pub questions: Vec<NewQuizQuestion>,
}

#[derive(Deserialize)]
pub struct AnswerRequest {
  pub quiz_question_id: Uuid,
  #[serde(default)]
  pub user_answer: Option<String>,
}

#[derive(Serialize)]
pub struct AnswerResult {
  pub message: &'static str,
  pub is_correct: bool,
  pub correct_answer: String,
}

/// POST /quiz/generate - build questions from the supplied cards (nothing is saved)
pub async fn generate_quiz(
  State(state): State<AppState>,
  _auth: AuthContext,
  ApiJson(req): ApiJson<GenerateRequest>,
) -> ApiResult<Json<GeneratedQuiz>> {
  if req.flashcards.is_empty() {
    return Err(ApiError::validation("flashcards", "At least one flashcard is required"));
  }
  let count = state.config.limits.max_quiz_questions;
  let questions = crate::services::quiz::generate_quiz(state.model.as_ref(), &req.flashcards, count).await?;
  Ok(Json(GeneratedQuiz { questions }))
}

fn check_questions(questions: &[NewQuizQuestion]) -> Result<(), String> {
  if questions.is_empty() {
    return Err("A quiz needs at least one question".to_string());
  }
  for (idx, q) in questions.iter().enumerate() {
    if q.question.trim().is_empty() {
      return Err(format!("Question {} is empty", idx + 1));
    }
    if q.options.len() != OPTIONS_PER_QUESTION {
      return Err(format!("Question {} must have {} options", idx + 1, OPTIONS_PER_QUESTION));
    }
    if !q.options.contains(&q.correct_answer) {
      return Err(format!("The answer to question {} is not among its options", idx + 1));
    }
  }
  Ok(())
}

/// POST /quiz/sessions
pub async fn create_quiz_session(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<CreateQuiz>,
) -> ApiResult<(StatusCode, Json<QuizSession>)> {
  FieldChecks::new()
    .check("topic", require_text(&req.topic, TOPIC_MAX_LEN))
    .check("questions", check_questions(&req.questions))
    .finish()?;
  let session_id = req.study_session_id.map(|id| id.to_string());

  let conn = try_lock(&state.db)?;
  ensure_session_owned(&conn, auth.user_id(), session_id.as_deref())?;
  let quiz = quizzes::create_quiz_session(
    &conn,
    auth.user_id(),
    req.topic.trim(),
    session_id.as_deref(),
    &req.questions,
  )?;
  Ok((StatusCode::CREATED, Json(quiz)))
}

/// POST /quiz/answer
pub async fn submit_answer(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<AnswerRequest>,
) -> ApiResult<Json<AnswerResult>> {
  let conn = try_lock(&state.db)?;
  let outcome = quizzes::submit_answer(
    &conn,
    auth.user_id(),
    &req.quiz_question_id.to_string(),
    req.user_answer.as_deref(),
  )?;
  match outcome {
    AnswerOutcome::QuestionNotFound => Err(ApiError::not_found("Question")),
    AnswerOutcome::NotOwner => Err(ApiError::Forbidden("Not authorized".to_string())),
    AnswerOutcome::Recorded { is_correct, correct_answer } => Ok(Json(AnswerResult {
      message: "Answer recorded",
      is_correct,
      correct_answer,
    })),
  }
}

/// POST /quiz/sessions/{quiz_id}/complete
pub async fn complete_quiz(
  State(state): State<AppState>,
  auth: AuthContext,
  IdPath(quiz_id): IdPath,
) -> ApiResult<Json<QuizSession>> {
  let conn = try_lock(&state.db)?;
  quizzes::complete_quiz(&conn, auth.user_id(), &quiz_id)?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Quiz"))
}

/// GET /quiz/sessions
pub async fn list_quiz_sessions(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<QuizSession>>> {
  let (skip, limit) = page.resolve()?;
  let conn = try_lock(&state.db)?;
  Ok(Json(quizzes::list_quiz_sessions(&conn, auth.user_id(), skip, limit)?))
}
