//! Minimal Gemini client for our use-case.
//!
//! We only call `models/{model}:generateContent` with an optional inline document,
//! one text part, a system instruction and a JSON response schema.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::prompt::GenerationRequest;
use crate::util::trunc_for_log;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Credential passed explicitly to every call; the service never stores it.
#[derive(Clone)]
pub struct Credentials {
  pub api_key: String,
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials").field("api_key", &"***").finish()
  }
}

/// Failure of one remote call.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
  #[error("Gemini HTTP {status}: {message}")]
  Http { status: u16, code: Option<String>, message: String },
  #[error("Gemini transport error: {0}")]
  Transport(String),
  #[error("Gemini response decode error: {0}")]
  Decode(String),
}

impl ServiceError {
  /// Quota/rate-limit failures (HTTP 429, RESOURCE_EXHAUSTED). Only a rejected
  /// HTTP call qualifies; transport and decode text is never inspected.
  pub fn is_rate_limited(&self) -> bool {
    match self {
      ServiceError::Http { status, code, message } => {
        *status == 429
          || code.as_deref() == Some("RESOURCE_EXHAUSTED")
          || message.contains("RESOURCE_EXHAUSTED")
      }
      ServiceError::Transport(_) | ServiceError::Decode(_) => false,
    }
  }
}

/// Remote generation boundary: returns the raw text payload of the first candidate.
#[async_trait]
pub trait GenerationService: Send + Sync {
  async fn generate(
    &self,
    credentials: &Credentials,
    model: &str,
    request: &GenerationRequest,
  ) -> Result<String, ServiceError>;
}

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl Gemini {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| ServiceError::Transport(e.to_string()))?;
    Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
  }

  /// Build from GEMINI_BASE_URL (or the public endpoint).
  pub fn from_env(timeout: Duration) -> Result<Self, ServiceError> {
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    Self::new(base_url, timeout)
  }
}

#[async_trait]
impl GenerationService for Gemini {
  #[instrument(level = "info", skip(self, credentials, request), fields(model = %model, prompt_len = request.prompt.len()))]
  async fn generate(
    &self,
    credentials: &Credentials,
    model: &str,
    request: &GenerationRequest,
  ) -> Result<String, ServiceError> {
    // Model names come from operator settings; keep them inside one path segment.
    let url = format!("{}/models/{}:generateContent", self.base_url, urlencoding::encode(model));
    if let Some(doc) = &request.document {
      debug!(file = ?doc.file_name, mime = %doc.mime_type, bytes = doc.bytes.len(), "Attaching document");
    }
    let body = to_wire(request);

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "giaoan-pro-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &credentials.api_key)
      .json(&body).send().await.map_err(|e| ServiceError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let (code, message) = extract_gemini_error(&body)
        .unwrap_or_else(|| (None, trunc_for_log(&body, 300)));
      warn!(status, code = ?code, elapsed = ?start.elapsed(), "Gemini call rejected");
      return Err(ServiceError::Http { status, code, message });
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| ServiceError::Decode(e.to_string()))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidates_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    let text: String = body.candidates.first()
      .and_then(|c| c.content.as_ref())
      .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
      .unwrap_or_default();

    info!(elapsed = ?start.elapsed(), text_len = text.len(), "Gemini response received");
    Ok(text)
  }
}

fn to_wire(request: &GenerationRequest) -> GenerateContentRequest<'_> {
  let mut parts = Vec::with_capacity(2);
  if let Some(doc) = &request.document {
    parts.push(PartReq {
      inline_data: Some(InlineDataReq { mime_type: &doc.mime_type, data: STANDARD.encode(&doc.bytes) }),
      text: None,
    });
  }
  parts.push(PartReq { inline_data: None, text: Some(&request.prompt) });

  GenerateContentRequest {
    contents: vec![ContentReq { role: "user", parts }],
    system_instruction: SystemInstructionReq {
      parts: vec![PartReq { inline_data: None, text: Some(&request.system_instruction) }],
    },
    generation_config: GenerationConfigReq {
      response_mime_type: "application/json",
      response_schema: &request.response_schema,
      temperature: request.temperature,
    },
  }
}

// --- Wire DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
  contents: Vec<ContentReq<'a>>,
  system_instruction: SystemInstructionReq<'a>,
  generation_config: GenerationConfigReq<'a>,
}
#[derive(Serialize)]
struct ContentReq<'a> { role: &'a str, parts: Vec<PartReq<'a>> }
#[derive(Serialize)]
struct SystemInstructionReq<'a> { parts: Vec<PartReq<'a>> }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PartReq<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  inline_data: Option<InlineDataReq<'a>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  text: Option<&'a str>,
}
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataReq<'a> { mime_type: &'a str, data: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigReq<'a> {
  response_mime_type: &'a str,
  response_schema: &'a Value,
  temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
struct Candidate { #[serde(default)] content: Option<ContentResp> }
#[derive(Deserialize)]
struct ContentResp { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Pull `(status, message)` out of a Google API error body.
fn extract_gemini_error(body: &str) -> Option<(Option<String>, String)> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String, #[serde(default)] status: Option<String> }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some((w.error.status, w.error.message)),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::prompt::{response_schema, InlineDocument};
  use serde_json::json;
  use wiremock::matchers::{header, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn request(with_doc: bool) -> GenerationRequest {
    GenerationRequest {
      document: with_doc.then(|| InlineDocument {
        bytes: b"%PDF-1".to_vec(),
        mime_type: "application/pdf".into(),
        file_name: None,
      }),
      prompt: "THÔNG TIN LỚP HỌC".into(),
      system_instruction: "Bạn là Giáo Án Pro".into(),
      response_schema: response_schema(),
      temperature: 0.5,
    }
  }

  fn creds() -> Credentials { Credentials { api_key: "test-key".into() } }

  #[tokio::test]
  async fn sends_document_instruction_and_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/models/gemini-2.5-flash:generateContent"))
      .and(header("x-goog-api-key", "test-key"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }],
        "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 2, "totalTokenCount": 12 }
      })))
      .expect(1)
      .mount(&server)
      .await;

    let gemini = Gemini::new(server.uri(), Duration::from_secs(5)).unwrap();
    let text = gemini.generate(&creds(), "gemini-2.5-flash", &request(true)).await.unwrap();
    assert_eq!(text, "{\"a\":1}");

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
    assert_eq!(parts[0]["inlineData"]["data"], "JVBERi0x");
    assert_eq!(parts[1]["text"], "THÔNG TIN LỚP HỌC");
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Bạn là Giáo Án Pro");
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    assert_eq!(body["generationConfig"]["temperature"], 0.5);
  }

  #[tokio::test]
  async fn without_document_only_text_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
      .mount(&server)
      .await;

    let gemini = Gemini::new(server.uri(), Duration::from_secs(5)).unwrap();
    let text = gemini.generate(&creds(), "m", &request(false)).await.unwrap();
    assert!(text.is_empty());

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 1);
    assert!(parts[0].get("inlineData").is_none());
  }

  #[tokio::test]
  async fn quota_error_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(429).set_body_json(json!({
        "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
      })))
      .mount(&server)
      .await;

    let gemini = Gemini::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = gemini.generate(&creds(), "m", &request(false)).await.unwrap_err();
    assert!(err.is_rate_limited());
    match err {
      ServiceError::Http { status, code, message } => {
        assert_eq!(status, 429);
        assert_eq!(code.as_deref(), Some("RESOURCE_EXHAUSTED"));
        assert_eq!(message, "Quota exceeded");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn other_http_errors_are_not_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(400).set_body_string("bad things"))
      .mount(&server)
      .await;

    let gemini = Gemini::new(server.uri(), Duration::from_secs(5)).unwrap();
    let err = gemini.generate(&creds(), "m", &request(false)).await.unwrap_err();
    assert!(!err.is_rate_limited());
    assert_eq!(err.to_string(), "Gemini HTTP 400: bad things");
  }

  #[tokio::test]
  async fn model_name_stays_in_its_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
      .mount(&server)
      .await;

    let gemini = Gemini::new(server.uri(), Duration::from_secs(5)).unwrap();
    gemini.generate(&creds(), "../../x?", &request(false)).await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.path(), "/models/..%2F..%2Fx%3F:generateContent");
    assert!(received[0].url.query().is_none());
  }

  #[test]
  fn decode_and_transport_errors_are_never_rate_limited() {
    assert!(!ServiceError::Decode("EOF while parsing at line 1 column 4291".into()).is_rate_limited());
    assert!(!ServiceError::Transport("connection reset after 429 ms".into()).is_rate_limited());
    let quota = ServiceError::Http { status: 400, code: None, message: "RESOURCE_EXHAUSTED: quota".into() };
    assert!(quota.is_rate_limited());
  }

  #[test]
  fn credentials_debug_hides_key() {
    let dbg = format!("{:?}", creds());
    assert!(!dbg.contains("test-key"));
  }
}
