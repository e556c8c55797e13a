//! HTTP handlers and the application router.
//!
//! Handlers validate input, call into `services` for generation and `db`
//! for persistence, and return JSON. Request bodies and query strings go
//! through [`ApiJson`] / [`ApiQuery`] so malformed input produces the same
//! 422 envelope as a failed validation rule.

pub mod ai;
pub mod audio;
pub mod concept_map;
pub mod feynman;
pub mod flashcards;
pub mod goals;
pub mod quiz;
pub mod sessions;
pub mod stats;
pub mod video;
pub mod voice_tutor;

use std::time::Instant;

use axum::{
  extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    FromRequest, FromRequestParts, Path, Query, Request, State,
  },
  http::{request::Parts, HeaderName, HeaderValue, Method},
  middleware::{self, Next},
  response::Response,
  routing::{delete, get, post, MethodRouter},
  Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::config::{DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use crate::db::sessions::session_belongs_to;
use crate::error::{expose_internal_errors, ApiError, ApiResult};
use crate::state::AppState;

// ==================== Extractors ====================

/// JSON body whose rejections become 422 validation errors
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    match Json::<T>::from_request(req, state).await {
      Ok(Json(value)) => Ok(ApiJson(value)),
      Err(rejection) => Err(body_error(rejection)),
    }
  }
}

fn body_error(rejection: JsonRejection) -> ApiError {
  ApiError::validation("body", rejection.body_text())
}

/// Query string whose rejections become 422 validation errors
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
  T: DeserializeOwned,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    Query::<T>::from_request_parts(parts, state)
      .await
      .map(|Query(value)| ApiQuery(value))
      .map_err(|rejection: QueryRejection| ApiError::validation("query", rejection.body_text()))
  }
}

/// Single path segment holding a UUID, normalized to its hyphenated lowercase form
pub struct IdPath(pub String);

impl<S> FromRequestParts<S> for IdPath
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Path(raw) = Path::<String>::from_request_parts(parts, state)
      .await
      .map_err(|rejection: PathRejection| ApiError::validation("path", rejection.body_text()))?;
    uuid::Uuid::parse_str(&raw)
      .map(|id| IdPath(id.to_string()))
      .map_err(|_| ApiError::validation("path", format!("'{}' is not a valid id", raw)))
  }
}

// ==================== Shared request/response shapes ====================

/// `skip` / `limit` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
  pub skip: Option<i64>,
  pub limit: Option<i64>,
}

impl PageQuery {
  pub fn resolve(&self) -> ApiResult<(i64, i64)> {
    resolve_page(self.skip, self.limit)
  }
}

/// Check pagination bounds, returning `(skip, limit)`
pub fn resolve_page(skip: Option<i64>, limit: Option<i64>) -> ApiResult<(i64, i64)> {
  let skip = skip.unwrap_or(0);
  let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
  let mut errors = Vec::new();
  if skip < 0 {
    errors.push(crate::error::FieldError::new("skip", "Must be 0 or greater"));
  }
  if !(1..=MAX_LIST_LIMIT).contains(&limit) {
    errors.push(crate::error::FieldError::new(
      "limit",
      format!("Must be between 1 and {}", MAX_LIST_LIMIT),
    ));
  }
  if errors.is_empty() {
    Ok((skip, limit))
  } else {
    Err(ApiError::Validation(errors))
  }
}

/// `{"message": ...}` acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
  pub message: String,
}

impl Message {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// Fail with 404 unless `study_session_id` is absent or owned by `user_id`
pub fn ensure_session_owned(
  conn: &rusqlite::Connection,
  user_id: &str,
  study_session_id: Option<&str>,
) -> ApiResult<()> {
  match study_session_id {
    Some(id) if !session_belongs_to(conn, user_id, id)? => Err(ApiError::not_found("Study session")),
    _ => Ok(()),
  }
}

// ==================== Service endpoints ====================

#[derive(Serialize)]
pub struct ServiceInfo {
  message: String,
  version: &'static str,
  health: &'static str,
}

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
  Json(ServiceInfo {
    message: format!("Welcome to {}", state.config.server.app_name),
    version: env!("CARGO_PKG_VERSION"),
    health: "/health",
  })
}

#[derive(Serialize)]
pub struct Health {
  status: &'static str,
  app_name: String,
  version: &'static str,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Health> {
  Json(Health {
    status: "healthy",
    app_name: state.config.server.app_name.clone(),
    version: env!("CARGO_PKG_VERSION"),
  })
}

/// Adds `X-Process-Time` (seconds, as a decimal) to every response
async fn process_time(request: Request, next: Next) -> Response {
  let started = Instant::now();
  let mut response = next.run(request).await;
  let elapsed = format!("{:.6}", started.elapsed().as_secs_f64());
  if let Ok(value) = HeaderValue::from_str(&elapsed) {
    response
      .headers_mut()
      .insert(HeaderName::from_static("x-process-time"), value);
  }
  response
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
  let origins = if allowed_origins.iter().any(|o| o == "*") {
    AllowOrigin::any()
  } else {
    AllowOrigin::list(
      allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok()),
    )
  };
  CorsLayer::new()
    .allow_origin(origins)
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
    .allow_headers(Any)
}

/// Register a collection route both with and without its trailing slash
fn collection(router: Router<AppState>, path: &str, handlers: MethodRouter<AppState>) -> Router<AppState> {
  router
    .route(path, handlers.clone())
    .route(&format!("{}/", path), handlers)
}

fn api_routes() -> Router<AppState> {
  let router = Router::new();
  let router = collection(router, "/study-goals", post(goals::create_goal).get(goals::list_goals));
  let router = collection(
    router,
    "/study-sessions",
    post(sessions::create_session).get(sessions::list_sessions),
  );
  let router = collection(
    router,
    "/flashcards",
    post(flashcards::create_flashcard).get(flashcards::list_flashcards),
  );
  let router = collection(router, "/video", get(video::list_videos));
  let router = collection(router, "/concept-map", get(concept_map::list_concept_maps));
  let router = collection(router, "/stats", get(stats::get_stats));

  router
    // Auth
    .route("/auth/register", post(auth::handlers::register))
    .route("/auth/login", post(auth::handlers::login))
    .route("/auth/logout", post(auth::handlers::logout))
    .route("/auth/me", get(auth::handlers::me))
    .route("/auth/verify-token", get(auth::handlers::verify_token))
    // Study goals
    .route(
      "/study-goals/{goal_id}",
      get(goals::get_goal).put(goals::update_goal).delete(goals::delete_goal),
    )
    // Study sessions
    .route(
      "/study-sessions/{session_id}",
      get(sessions::get_session).delete(sessions::delete_session),
    )
    // Flashcards
    .route("/flashcards/generate", post(flashcards::generate_flashcards))
    .route("/flashcards/review", post(flashcards::review_flashcard))
    .route("/flashcards/{flashcard_id}", delete(flashcards::delete_flashcard))
    // Quiz
    .route("/quiz/generate", post(quiz::generate_quiz))
    .route("/quiz/sessions", post(quiz::create_quiz_session).get(quiz::list_quiz_sessions))
    .route("/quiz/answer", post(quiz::submit_answer))
    .route("/quiz/sessions/{quiz_id}/complete", post(quiz::complete_quiz))
    // Motivational and research copy
    .route("/ai/aida-engagement", post(ai::aida_engagement))
    .route("/ai/pomodoro-recommendations", post(ai::pomodoro_recommendations))
    // Voice tutor
    .route("/voice-tutor/ask", post(voice_tutor::ask))
    .route(
      "/voice-tutor/conversations",
      post(voice_tutor::create_conversation).get(voice_tutor::list_conversations),
    )
    .route(
      "/voice-tutor/conversations/{conversation_id}/messages",
      post(voice_tutor::add_message).get(voice_tutor::list_messages),
    )
    // Video
    .route("/video/generate", post(video::generate_video))
    .route("/video/save", post(video::save_video))
    .route("/video/test-connection", get(video::test_connection))
    .route("/video/{video_id}", get(video::get_video))
    // Audio
    .route("/audio/generate", post(audio::generate_audio))
    .route("/audio/save", post(audio::save_audio))
    .route("/audio/history", get(audio::audio_history))
    // Concept maps
    .route("/concept-map/generate", post(concept_map::generate_concept_map))
    .route("/concept-map/save", post(concept_map::save_concept_map))
    // Feynman
    .route("/feynman/explanation", post(feynman::explanation))
    .route("/feynman/analyze", post(feynman::analyze))
    .route(
      "/feynman/sessions",
      post(feynman::save_session).get(feynman::list_sessions),
    )
    // Stats
    .route("/stats/dashboard", get(stats::dashboard))
}

/// Build the full application: `/`, `/health` and the `/api/v1` API
pub fn router(state: AppState) -> Router {
  let mut app = Router::new()
    .route("/", get(root))
    .route("/health", get(health))
    .nest("/api/v1", api_routes());

  if state.config.server.debug {
    app = app.layer(middleware::from_fn_with_state(state.clone(), expose_internal_errors));
  }

  app
    .layer(middleware::from_fn(process_time))
    .layer(cors_layer(&state.config.server.allowed_origins))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolve_page_defaults_and_bounds() {
    assert_eq!(resolve_page(None, None).unwrap(), (0, 100));
    assert_eq!(resolve_page(Some(5), Some(1)).unwrap(), (5, 1));

    match resolve_page(Some(-1), Some(101)).unwrap_err() {
      ApiError::Validation(fields) => {
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["skip", "limit"]);
      }
      other => panic!("unexpected error: {:?}", other),
    }
    assert!(resolve_page(None, Some(0)).is_err());
  }
}
