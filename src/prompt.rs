//! Request assembly: validates the submitted lesson input and turns it into a
//! single `GenerationRequest` (document part + prompt + system instruction +
//! response schema). Nothing here talks to the network.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{Limits, Prompts};
use crate::domain::{LessonConfig, LessonInput};
use crate::util::fill_template;

const GRADE_UNKNOWN: &str = "Không xác định";
const TECH_APPS_DEFAULT: &str = "Tự đề xuất phù hợp";
const INTEGRATION_DEFAULT: &str = "Không yêu cầu";
const SIMULATION_DEFAULT: &str = "Tự đề xuất nếu bài học phù hợp";

/// Decoded source document, ready to be sent as an inline binary part.
#[derive(Clone, Debug, PartialEq)]
pub struct InlineDocument {
  pub bytes: Vec<u8>,
  pub mime_type: String,
  pub file_name: Option<String>,
}

/// Everything the generation service needs except the model name and the credential.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
  pub document: Option<InlineDocument>,
  pub prompt: String,
  pub system_instruction: String,
  pub response_schema: Value,
  pub temperature: f32,
}

/// One field-level problem with the submitted form.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("Vui lòng tải lên giáo án")]
  DocumentMissing,
  #[error("Đang xử lý file...")]
  DocumentProcessing,
  #[error("Không xác định được định dạng tệp")]
  DocumentMediaTypeMissing,
  #[error("Tệp tải lên không đúng mã hóa base64")]
  DocumentEncoding,
  #[error("Tệp quá lớn ({size} byte), giới hạn là {limit} byte")]
  DocumentTooLarge { size: usize, limit: usize },
  #[error("Vui lòng chọn môn học")]
  SubjectMissing,
  #[error("Lớp '{grade}' không thuộc cấp học đã chọn")]
  GradeNotInLevel { grade: String },
}

impl ValidationError {
  pub fn field(&self) -> &'static str {
    match self {
      ValidationError::DocumentMissing
      | ValidationError::DocumentProcessing
      | ValidationError::DocumentMediaTypeMissing
      | ValidationError::DocumentEncoding
      | ValidationError::DocumentTooLarge { .. } => "file",
      ValidationError::SubjectMissing => "subject",
      ValidationError::GradeNotInLevel { .. } => "grade",
    }
  }

  pub fn code(&self) -> &'static str {
    match self {
      ValidationError::DocumentMissing | ValidationError::SubjectMissing => "missing",
      ValidationError::DocumentProcessing => "processing",
      ValidationError::DocumentMediaTypeMissing => "missing_media_type",
      ValidationError::DocumentEncoding => "invalid_encoding",
      ValidationError::DocumentTooLarge { .. } => "too_large",
      ValidationError::GradeNotInLevel { .. } => "not_in_level",
    }
  }
}

/// All problems found in one submission, never just the first.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{n} validation error(s)", n = .0.len())]
pub struct ValidationErrors(pub Vec<ValidationError>);

/// Check the input and decode the document. Every violation is collected.
#[instrument(level = "debug", skip_all, fields(has_document = input.has_document(), encoding = input.encoding))]
pub fn validate(input: &LessonInput, limits: &Limits) -> Result<Option<InlineDocument>, ValidationErrors> {
  let mut errors = Vec::new();

  let document = match decode_document(input, limits) {
    Ok(doc) => Some(doc),
    Err(e) => {
      errors.push(e);
      None
    }
  };

  if input.config.subject.trim().is_empty() {
    errors.push(ValidationError::SubjectMissing);
  }
  if !input.config.school_level.accepts_grade(&input.config.grade) {
    errors.push(ValidationError::GradeNotInLevel { grade: input.config.grade.clone() });
  }

  if errors.is_empty() {
    Ok(document)
  } else {
    debug!(count = errors.len(), "Submission rejected by validation");
    Err(ValidationErrors(errors))
  }
}

fn decode_document(input: &LessonInput, limits: &Limits) -> Result<InlineDocument, ValidationError> {
  if !input.has_document() {
    return Err(ValidationError::DocumentMissing);
  }
  let raw = match input.file_base64.as_deref() {
    Some(d) if !input.encoding && !d.trim().is_empty() => d.trim(),
    _ => return Err(ValidationError::DocumentProcessing),
  };

  // Browsers hand over `data:<mime>;base64,<payload>`.
  let (url_mime, payload) = match raw.strip_prefix("data:").and_then(|r| r.split_once(',')) {
    Some((header, payload)) => (header.split(';').next().filter(|m| !m.is_empty()), payload),
    None => (None, raw),
  };

  let mime_type = input
    .mime_type
    .as_deref()
    .map(str::trim)
    .filter(|m| !m.is_empty())
    .or(url_mime)
    .ok_or(ValidationError::DocumentMediaTypeMissing)?
    .to_string();

  let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
  if compact.is_empty() {
    return Err(ValidationError::DocumentProcessing);
  }
  // Upper bound from the encoded length; oversized payloads are never decoded.
  let estimated = compact.len() / 4 * 3;
  if estimated > limits.max_document_bytes + 3 {
    return Err(ValidationError::DocumentTooLarge { size: estimated, limit: limits.max_document_bytes });
  }
  let bytes = STANDARD.decode(compact.as_bytes()).map_err(|_| ValidationError::DocumentEncoding)?;
  if bytes.len() > limits.max_document_bytes {
    return Err(ValidationError::DocumentTooLarge { size: bytes.len(), limit: limits.max_document_bytes });
  }

  Ok(InlineDocument { bytes, mime_type, file_name: input.file_name.clone() })
}

/// Validate and assemble the generation request.
#[instrument(level = "info", skip_all, fields(subject = %input.config.subject))]
pub fn build_request(
  input: &LessonInput,
  prompts: &Prompts,
  limits: &Limits,
) -> Result<GenerationRequest, ValidationErrors> {
  let document = validate(input, limits)?;
  let prompt = render_prompt(&input.config, &prompts.user_template);
  debug!(
    prompt_len = prompt.len(),
    document_bytes = document.as_ref().map(|d| d.bytes.len()).unwrap_or(0),
    "Generation request assembled"
  );

  Ok(GenerationRequest {
    document,
    prompt,
    system_instruction: prompts.system_instruction.clone(),
    response_schema: response_schema(),
    temperature: prompts.temperature,
  })
}

/// Deterministic prompt text listing every configuration field.
pub fn render_prompt(config: &LessonConfig, template: &str) -> String {
  let grade = non_empty_or(&config.grade, GRADE_UNKNOWN);
  let minutes = config.time_constraint.minutes().to_string();

  let mut resources = serde_json::to_string(&config.resources).unwrap_or_default();
  let custom_resource = config.custom_resource.trim();
  if !custom_resource.is_empty() {
    resources.push_str(", ");
    resources.push_str(custom_resource);
  }

  let competencies = config.all_competencies().join(", ");
  let simulation = config.simulation_topic.as_deref().unwrap_or_default();

  fill_template(
    template,
    &[
      ("school_level", config.school_level.label()),
      ("grade", grade),
      ("subject", config.subject.trim()),
      ("class_size", config.class_size.as_str()),
      ("minutes", &minutes),
      ("resources", &resources),
      ("tech_apps", non_empty_or(&config.tech_apps, TECH_APPS_DEFAULT)),
      ("integration", non_empty_or(&config.integration, INTEGRATION_DEFAULT)),
      ("competencies", &competencies),
      ("simulation", non_empty_or(simulation, SIMULATION_DEFAULT)),
    ],
  )
}

fn non_empty_or<'a>(value: &'a str, default: &'a str) -> &'a str {
  let v = value.trim();
  if v.is_empty() { default } else { v }
}

/// Output shape requested from the model. Only `simulation` is optional.
pub fn response_schema() -> Value {
  let string = json!({ "type": "STRING" });
  let string_list = json!({ "type": "ARRAY", "items": { "type": "STRING" } });

  json!({
    "type": "OBJECT",
    "properties": {
      "summary": {
        "type": "OBJECT",
        "properties": {
          "subject": string,
          "topic": string,
          "weakness": string,
          "proposal": string,
        },
        "required": ["subject", "topic", "weakness", "proposal"],
      },
      "methods": {
        "type": "ARRAY",
        "items": {
          "type": "OBJECT",
          "properties": {
            "name": string,
            "description": string,
            "steps": string_list,
          },
          "required": ["name", "description", "steps"],
        },
      },
      "games": {
        "type": "ARRAY",
        "items": {
          "type": "OBJECT",
          "properties": {
            "name": string,
            "duration": string,
            "type": string,
            "objective": string,
            "steps": string_list,
          },
          "required": ["name", "duration", "type", "objective", "steps"],
        },
      },
      "simulation": {
        "type": "OBJECT",
        "properties": {
          "title": string,
          "description": string,
          "code": string,
        },
      },
      "fullPlanHtml": string,
    },
    "required": ["summary", "methods", "games", "fullPlanHtml"],
  })
}
