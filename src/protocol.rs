//! Public HTTP request/response DTOs (serde ready, camelCase on the wire).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::LessonPlanResponse;

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
}

//
// Form catalogues
//

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsOut {
  pub school_levels: Vec<SchoolLevelOut>,
  pub class_sizes: Vec<&'static str>,
  pub time_allotments: Vec<TimeAllotmentOut>,
  pub subjects: Vec<&'static str>,
  pub competencies: Vec<CompetencyOut>,
  pub models: Vec<String>,
  pub default_model: String,
  pub max_document_bytes: usize,
}

#[derive(Serialize)]
pub struct SchoolLevelOut {
  pub id: crate::domain::SchoolLevel,
  pub label: &'static str,
  pub grades: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct TimeAllotmentOut {
  pub minutes: u16,
  pub periods: u16,
}

#[derive(Serialize)]
pub struct CompetencyOut {
  pub id: &'static str,
  pub label: &'static str,
}

//
// Settings
//

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsIn {
  pub api_key: String,
  #[serde(default)]
  pub model: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOut {
  pub has_api_key: bool,
  pub masked_api_key: Option<String>,
  pub model: String,
  /// True when no credential is stored; the frontend opens the settings dialog.
  pub needs_setup: bool,
  pub models: Vec<String>,
}

//
// Plans
//

#[derive(Serialize)]
pub struct ValidateOut {
  pub ok: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOut {
  pub id: String,
  pub model: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file_name: Option<String>,
  pub plan: LessonPlanResponse,
}

#[derive(Serialize)]
pub struct DeletedOut {
  pub deleted: bool,
}

//
// Errors
//

#[derive(Debug, Serialize)]
pub struct ErrorOut {
  pub error: &'static str,
  pub message: String,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub fields: Vec<FieldErrorOut>,
}

#[derive(Debug, Serialize)]
pub struct FieldErrorOut {
  pub field: &'static str,
  pub code: &'static str,
  pub message: String,
}
