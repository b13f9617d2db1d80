//! Model fallback: try each model of a `ModelPolicy` in order until one
//! produces a parseable lesson plan.
//!
//! Attempts are strictly sequential. Per-attempt failures are logged and
//! dropped; only the last one can reach the caller, folded into a single
//! `GenerationError`.

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::domain::LessonPlanResponse;
use crate::gemini::{Credentials, GenerationService, ServiceError};
use crate::prompt::GenerationRequest;
use crate::util::strip_control_chars;

/// Ordered, duplicate-free list of model identifiers to try.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelPolicy {
  order: Vec<String>,
}

impl ModelPolicy {
  /// Preferred model first, then the fallbacks in their given order.
  /// Blank names and repeats are dropped.
  pub fn new(preferred: &str, fallbacks: &[String]) -> Self {
    let mut order: Vec<String> = Vec::with_capacity(fallbacks.len() + 1);
    for m in std::iter::once(preferred).chain(fallbacks.iter().map(String::as_str)) {
      let m = m.trim();
      if !m.is_empty() && !order.iter().any(|o| o == m) {
        order.push(m.to_string());
      }
    }
    Self { order }
  }

  pub fn models(&self) -> &[String] { &self.order }
}

/// Why a single attempt did not yield a plan.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
  #[error(transparent)]
  Service(#[from] ServiceError),
  #[error("AI trả về phản hồi rỗng.")]
  EmptyResponse,
  #[error("Phản hồi JSON không hợp lệ: {0}")]
  Malformed(String),
}

impl AttemptError {
  pub fn is_rate_limited(&self) -> bool {
    match self {
      AttemptError::Service(e) => e.is_rate_limited(),
      AttemptError::EmptyResponse | AttemptError::Malformed(_) => false,
    }
  }
}

/// Unified outcome once every model has failed.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
  #[error("429 RESOURCE_EXHAUSTED: Hệ thống đang quá tải, vui lòng thử lại sau hoặc đổi API Key.")]
  Overloaded { last: AttemptError },
  #[error(transparent)]
  Attempt(AttemptError),
  #[error("Không thể tạo giáo án sau khi thử tất cả các model.")]
  Exhausted,
}

/// A successful generation and the model that produced it.
#[derive(Clone, Debug)]
pub struct Generated {
  pub model: String,
  pub plan: LessonPlanResponse,
}

/// Parse model output; on failure, retry once with control characters stripped.
pub fn parse_plan(text: &str) -> Result<LessonPlanResponse, AttemptError> {
  match serde_json::from_str::<LessonPlanResponse>(text) {
    Ok(plan) => Ok(plan),
    Err(first) => {
      warn!(error = %first, "Plan JSON did not parse; retrying without control characters");
      let cleaned = strip_control_chars(text);
      serde_json::from_str::<LessonPlanResponse>(&cleaned).map_err(|e| AttemptError::Malformed(e.to_string()))
    }
  }
}

async fn attempt(
  service: &dyn GenerationService,
  credentials: &Credentials,
  model: &str,
  request: &GenerationRequest,
) -> Result<LessonPlanResponse, AttemptError> {
  let text = service.generate(credentials, model, request).await?;
  if text.trim().is_empty() {
    return Err(AttemptError::EmptyResponse);
  }
  parse_plan(&text)
}

/// Run the request against each model in `policy` until one succeeds.
#[instrument(level = "info", skip_all, fields(models = ?policy.models()))]
pub async fn execute(
  service: &dyn GenerationService,
  credentials: &Credentials,
  policy: &ModelPolicy,
  request: &GenerationRequest,
) -> Result<Generated, GenerationError> {
  let mut last_error: Option<AttemptError> = None;

  for (i, model) in policy.models().iter().enumerate() {
    info!(attempt = i + 1, %model, "Trying model");
    match attempt(service, credentials, model, request).await {
      Ok(plan) => {
        info!(%model, methods = plan.methods.len(), games = plan.games.len(), has_simulation = plan.simulation.is_some(), "Lesson plan generated");
        return Ok(Generated { model: model.clone(), plan });
      }
      Err(e) => {
        warn!(%model, error = %e, rate_limited = e.is_rate_limited(), "Model attempt failed");
        last_error = Some(e);
      }
    }
  }

  let err = match last_error {
    Some(last) if last.is_rate_limited() => GenerationError::Overloaded { last },
    Some(last) => GenerationError::Attempt(last),
    None => GenerationError::Exhausted,
  };
  error!(error = %err, "All models failed");
  Err(err)
}
