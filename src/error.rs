//! API error type shared by all handlers. Every variant maps to one status
//! code and a JSON body `{ error, message, fields }`.

use axum::{extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;
use tracing::warn;

use crate::fallback::GenerationError;
use crate::prompt::ValidationErrors;
use crate::protocol::{ErrorOut, FieldErrorOut};
use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Thông tin chưa hợp lệ")]
  Validation(#[from] ValidationErrors),
  #[error("Chưa cấu hình API Key. Vui lòng mở phần cài đặt.")]
  CredentialMissing,
  #[error(transparent)]
  Settings(#[from] SettingsError),
  #[error(transparent)]
  Generation(#[from] GenerationError),
  #[error("Không tìm thấy giáo án: {0}")]
  PlanNotFound(String),
  #[error("Giáo án này không có mô phỏng")]
  SimulationMissing,
  #[error("Tệp quá lớn, giới hạn là {limit} byte")]
  BodyTooLarge { limit: usize },
  #[error("Yêu cầu không hợp lệ: {message}")]
  MalformedBody { status: StatusCode, message: String },
}

impl ApiError {
  /// Map a `Json` extractor failure; an over-limit body becomes a `file` field error.
  pub fn from_json_rejection(rejection: JsonRejection, limit: usize) -> Self {
    let status = rejection.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
      ApiError::BodyTooLarge { limit }
    } else {
      ApiError::MalformedBody { status, message: rejection.body_text() }
    }
  }
}

impl ApiError {
  pub fn kind(&self) -> &'static str {
    match self {
      ApiError::Validation(_) => "validation",
      ApiError::CredentialMissing => "credential_missing",
      ApiError::Settings(SettingsError::BlankApiKey) => "validation",
      ApiError::Settings(_) => "settings",
      ApiError::Generation(GenerationError::Overloaded { .. }) => "overloaded",
      ApiError::Generation(_) => "generation_failed",
      ApiError::PlanNotFound(_) => "not_found",
      ApiError::SimulationMissing => "not_found",
      ApiError::BodyTooLarge { .. } => "validation",
      ApiError::MalformedBody { .. } => "bad_request",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::CredentialMissing => StatusCode::PRECONDITION_FAILED,
      ApiError::Settings(SettingsError::BlankApiKey) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Settings(_) => StatusCode::INTERNAL_SERVER_ERROR,
      ApiError::Generation(GenerationError::Overloaded { .. }) => StatusCode::TOO_MANY_REQUESTS,
      ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
      ApiError::PlanNotFound(_) | ApiError::SimulationMissing => StatusCode::NOT_FOUND,
      ApiError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::MalformedBody { status, .. } => *status,
    }
  }

  fn fields(&self) -> Vec<FieldErrorOut> {
    match self {
      ApiError::Validation(errs) => errs
        .0
        .iter()
        .map(|e| FieldErrorOut { field: e.field(), code: e.code(), message: e.to_string() })
        .collect(),
      ApiError::Settings(SettingsError::BlankApiKey) => vec![FieldErrorOut {
        field: "apiKey",
        code: "missing",
        message: SettingsError::BlankApiKey.to_string(),
      }],
      ApiError::BodyTooLarge { .. } => vec![FieldErrorOut {
        field: "file",
        code: "too_large",
        message: self.to_string(),
      }],
      _ => Vec::new(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> axum::response::Response {
    let status = self.status();
    if status.is_server_error() {
      warn!(target: "giaoan", error = %self, %status, "Request failed");
    }
    let body = ErrorOut { error: self.kind(), message: self.to_string(), fields: self.fields() };
    (status, Json(body)).into_response()
  }
}
