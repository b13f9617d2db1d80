//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Validating a submission and generating a plan with model fallback
//!   - Reading and saving operator settings
//!   - Building the form catalogues
//!   - Rendering exports for stored plans

use tracing::{info, instrument};

use crate::domain::{ClassSize, LessonInput, SchoolLevel, TimeAllotment, COMPETENCIES, SUBJECTS};
use crate::error::ApiError;
use crate::export::{simulation_page, word_document, ExportFile};
use crate::fallback;
use crate::prompt::{build_request, validate};
use crate::protocol::*;
use crate::state::{AppState, StoredPlan};

fn to_out(p: StoredPlan) -> PlanOut {
  PlanOut { id: p.id, model: p.model, file_name: p.source_file, plan: p.plan }
}

/// Validation only; never reaches the generation service.
pub fn check_input(state: &AppState, input: &LessonInput) -> Result<(), ApiError> {
  validate(input, &state.config.limits)?;
  Ok(())
}

/// Validate, require a credential, run the fallback sequence, store the result.
#[instrument(level = "info", skip(state, input), fields(subject = %input.config.subject, file = ?input.file_name))]
pub async fn generate_plan(state: &AppState, input: &LessonInput) -> Result<PlanOut, ApiError> {
  let request = build_request(input, &state.config.prompts, &state.config.limits)?;

  let settings = state.current_settings().await;
  let credentials = settings.credentials().ok_or(ApiError::CredentialMissing)?;
  let policy = state.policy_for(&settings);

  let generated = fallback::execute(state.service.as_ref(), &credentials, &policy, &request).await?;
  let stored = state.insert_plan(generated.model, input.file_name.clone(), generated.plan).await;
  info!(target: "giaoan", id = %stored.id, model = %stored.model, "Plan stored");
  Ok(to_out(stored))
}

pub async fn get_plan(state: &AppState, id: &str) -> Result<PlanOut, ApiError> {
  state.get_plan(id).await.map(to_out).ok_or_else(|| ApiError::PlanNotFound(id.to_string()))
}

pub async fn discard_plan(state: &AppState, id: &str) -> Result<(), ApiError> {
  if state.remove_plan(id).await {
    Ok(())
  } else {
    Err(ApiError::PlanNotFound(id.to_string()))
  }
}

pub async fn export_doc(state: &AppState, id: &str) -> Result<ExportFile, ApiError> {
  let stored = state.get_plan(id).await.ok_or_else(|| ApiError::PlanNotFound(id.to_string()))?;
  Ok(word_document(&stored.plan))
}

pub async fn export_simulation(state: &AppState, id: &str) -> Result<ExportFile, ApiError> {
  let stored = state.get_plan(id).await.ok_or_else(|| ApiError::PlanNotFound(id.to_string()))?;
  let sim = stored.plan.simulation.as_ref().ok_or(ApiError::SimulationMissing)?;
  Ok(simulation_page(sim))
}

pub async fn settings_view(state: &AppState) -> SettingsOut {
  let s = state.current_settings().await;
  let has_api_key = s.credentials().is_some();
  SettingsOut {
    has_api_key,
    masked_api_key: s.masked_api_key(),
    model: s.preferred_model(&state.config.models.default_model).to_string(),
    needs_setup: !has_api_key,
    models: state.config.models.fallback.clone(),
  }
}

#[instrument(level = "info", skip(state, body), fields(model = ?body.model))]
pub async fn save_settings(state: &AppState, body: &SettingsIn) -> Result<SettingsOut, ApiError> {
  let model = body
    .model
    .as_deref()
    .filter(|m| !m.trim().is_empty())
    .unwrap_or(state.config.models.default_model.as_str());
  state.settings.write().await.save(&body.api_key, model)?;
  Ok(settings_view(state).await)
}

pub fn options(state: &AppState) -> OptionsOut {
  OptionsOut {
    school_levels: SchoolLevel::ALL
      .iter()
      .map(|&l| SchoolLevelOut { id: l, label: l.label(), grades: l.grades().to_vec() })
      .collect(),
    class_sizes: ClassSize::ALL.iter().map(|c| c.as_str()).collect(),
    time_allotments: TimeAllotment::ALL
      .iter()
      .map(|t| TimeAllotmentOut { minutes: t.minutes(), periods: t.periods() })
      .collect(),
    subjects: SUBJECTS.to_vec(),
    competencies: COMPETENCIES.iter().map(|&(id, label)| CompetencyOut { id, label }).collect(),
    models: state.config.models.fallback.clone(),
    default_model: state.config.models.default_model.clone(),
    max_document_bytes: state.config.limits.max_document_bytes,
  }
}
