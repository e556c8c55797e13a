//! /concept-map

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ensure_session_owned, ApiJson, ApiQuery, PageQuery};
use crate::auth::AuthContext;
use crate::db::concept_maps::{self, ConceptMap};
use crate::db::try_lock;
use crate::error::ApiResult;
use crate::services;
use crate::state::AppState;
use crate::validation::{require_text, FieldChecks, TOPIC_MAX_LEN};

#[derive(Deserialize)]
pub struct GenerateRequest {
  pub topic: String,
}

#[derive(Serialize)]
pub struct GeneratedMap {
  pub mermaid_graph: String,
}

#[derive(Deserialize)]
pub struct SaveRequest {
  pub topic: String,
  #[serde(default)]
  pub mermaid_graph: Option<String>,
  #[serde(default)]
  pub study_session_id: Option<Uuid>,
}

/// POST /concept-map/generate
pub async fn generate_concept_map(
  State(state): State<AppState>,
  _auth: AuthContext,
  ApiJson(req): ApiJson<GenerateRequest>,
) -> ApiResult<Json<GeneratedMap>> {
  FieldChecks::new().check("topic", require_text(&req.topic, TOPIC_MAX_LEN)).finish()?;
  let mermaid_graph = services::concept_map::generate_concept_map(state.model.as_ref(), req.topic.trim()).await?;
  Ok(Json(GeneratedMap { mermaid_graph }))
}

/// POST /concept-map/save - the graph is sanitized the same way generated ones are
pub async fn save_concept_map(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiJson(req): ApiJson<SaveRequest>,
) -> ApiResult<(StatusCode, Json<ConceptMap>)> {
  FieldChecks::new().check("topic", require_text(&req.topic, TOPIC_MAX_LEN)).finish()?;
  let session_id = req.study_session_id.map(|id| id.to_string());
  let graph = req
    .mermaid_graph
    .as_deref()
    .map(services::concept_map::sanitize_mermaid_graph);

  let conn = try_lock(&state.db)?;
  ensure_session_owned(&conn, auth.user_id(), session_id.as_deref())?;
  let map = concept_maps::save_concept_map(
    &conn,
    auth.user_id(),
    req.topic.trim(),
    graph.as_deref(),
    session_id.as_deref(),
  )?;
  Ok((StatusCode::CREATED, Json(map)))
}

/// GET /concept-map/
pub async fn list_concept_maps(
  State(state): State<AppState>,
  auth: AuthContext,
  ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Vec<ConceptMap>>> {
  let (skip, limit) = page.resolve()?;
  let conn = try_lock(&state.db)?;
  Ok(Json(concept_maps::list_concept_maps(&conn, auth.user_id(), skip, limit)?))
}
