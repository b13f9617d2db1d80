//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs basic request/result info.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, Path, State},
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{debug, info, instrument};

use crate::domain::LessonInput;
use crate::error::ApiError;
use crate::export::{content_disposition, ExportFile};
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_options(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::options(&state))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(logic::settings_view(&state).await)
}

/// Unwrap a JSON body, turning extractor failures into the API error shape.
fn json_body<T>(state: &AppState, body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
  body
    .map(|Json(v)| v)
    .map_err(|rejection| ApiError::from_json_rejection(rejection, state.config.limits.max_document_bytes))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_put_settings(
  State(state): State<Arc<AppState>>,
  body: Result<Json<SettingsIn>, JsonRejection>,
) -> Result<Json<SettingsOut>, ApiError> {
  let body = json_body(&state, body)?;
  let out = logic::save_settings(&state, &body).await?;
  info!(target: "giaoan", model = %out.model, "Settings updated");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_validate(
  State(state): State<Arc<AppState>>,
  body: Result<Json<LessonInput>, JsonRejection>,
) -> Result<Json<ValidateOut>, ApiError> {
  let body = json_body(&state, body)?;
  debug!(target: "giaoan", subject = %body.config.subject, encoding = body.encoding, "Validating submission");
  logic::check_input(&state, &body)?;
  Ok(Json(ValidateOut { ok: true }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_plan(
  State(state): State<Arc<AppState>>,
  body: Result<Json<LessonInput>, JsonRejection>,
) -> Result<(StatusCode, Json<PlanOut>), ApiError> {
  let body = json_body(&state, body)?;
  let out = logic::generate_plan(&state, &body).await?;
  info!(target: "giaoan", id = %out.id, model = %out.model, "HTTP plan generated");
  Ok((StatusCode::CREATED, Json(out)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_plan(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<PlanOut>, ApiError> {
  Ok(Json(logic::get_plan(&state, &id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_plan(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<DeletedOut>, ApiError> {
  logic::discard_plan(&state, &id).await?;
  info!(target: "giaoan", %id, "Plan discarded");
  Ok(Json(DeletedOut { deleted: true }))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_export_doc(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Response, ApiError> {
  let file = logic::export_doc(&state, &id).await?;
  Ok(attachment(file))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_export_simulation(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Response, ApiError> {
  let file = logic::export_simulation(&state, &id).await?;
  Ok(attachment(file))
}

fn attachment(file: ExportFile) -> Response {
  info!(target: "giaoan", file_name = %file.file_name, bytes = file.bytes.len(), "Export served");
  (
    [
      (header::CONTENT_TYPE, file.content_type.to_string()),
      (header::CONTENT_DISPOSITION, content_disposition(&file.file_name)),
    ],
    file.bytes,
  )
    .into_response()
}
