//! Loading application configuration (prompts, model list, limits) from TOML.
//!
//! Every section is optional; anything missing falls back to the defaults below.
//! See `AppConfig`, `Prompts`, `ModelsCfg` and `Limits` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub models: ModelsCfg,
  #[serde(default)]
  pub limits: Limits,
}

/// Prompts sent with every generation request.
///
/// `user_template` is filled with `fill_template`; available keys are
/// `school_level`, `grade`, `subject`, `class_size`, `minutes`, `resources`,
/// `tech_apps`, `integration`, `competencies` and `simulation`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system_instruction: String,
  pub user_template: String,
  pub temperature: f32,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system_instruction: DEFAULT_SYSTEM_INSTRUCTION.trim().to_string(),
      user_template: DEFAULT_USER_TEMPLATE.trim().to_string(),
      temperature: 0.5,
    }
  }
}

/// Known Gemini models. `fallback` is the retry order after the preferred one.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ModelsCfg {
  pub default_model: String,
  pub fallback: Vec<String>,
}

impl Default for ModelsCfg {
  fn default() -> Self {
    Self {
      default_model: "gemini-3-flash-preview".into(),
      fallback: vec![
        "gemini-3-flash-preview".into(),
        "gemini-3-pro-preview".into(),
        "gemini-2.5-flash".into(),
      ],
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
  /// Largest accepted document after base64 decoding.
  pub max_document_bytes: usize,
  /// Per-call HTTP timeout for the Gemini client.
  pub request_timeout_secs: u64,
}

impl Default for Limits {
  fn default() -> Self {
    Self { max_document_bytes: 10 * 1024 * 1024, request_timeout_secs: 180 }
  }
}

impl Limits {
  /// Body limit for JSON uploads: twice the decoded cap plus room for the form
  /// fields, so a base64 document up to half again the cap still reaches the
  /// `too_large` field check instead of the transport limit.
  pub fn max_body_bytes(&self) -> usize {
    self.max_document_bytes.saturating_mul(2).saturating_add(64 * 1024)
  }
}

const DEFAULT_SYSTEM_INSTRUCTION: &str = r#"
Bạn là "Giáo Án Pro", trợ lý AI chuyên gia về thiết kế bài giảng tích cực.
Nhiệm vụ: Phân tích giáo án đầu vào và đề xuất các NỘI DUNG BỔ SUNG để nâng cấp bài giảng.

QUAN TRỌNG VỀ ĐỊNH DẠNG JSON & LATEX:
1. Bạn PHẢI trả về định dạng JSON hợp lệ tuân theo Schema được cung cấp.
2. **Xử lý LaTeX (RẤT QUAN TRỌNG)**:
   - Để giáo viên có thể chuyển đổi công thức trong Word, bạn **PHẢI DÙNG MÃ LATEX** ($...$ hoặc $$...$$) cho các biểu thức toán học.
   - **KHÔNG** sử dụng ký tự Unicode (như x², ½, ±, α) nếu có thể dùng LaTeX (như x^2, \\frac{1}{2}, \\pm, \\alpha).
   - Dùng **HAI dấu gạch chéo ngược** (double backslash) cho mọi lệnh LaTeX trong JSON string.
   - Ví dụ SAI: "\frac{a}{b}", "x²"
   - Ví dụ ĐÚNG: "\\frac{a}{b}", "x^2"
3. **fullPlanHtml**: Chứa các thẻ HTML <div>. KHÔNG bao gồm thẻ <html>, <head>, <body>.

NỘI DUNG YÊU CẦU:
- Phân tích điểm yếu và đề xuất giải pháp.
- Phương pháp dạy học tích cực (Think-Pair-Share, Jigsaw, Gallery Walk...).
- Trò chơi giáo dục phù hợp lứa tuổi.
- Mô phỏng/Thí nghiệm ảo (nếu bài học liên quan KHTN).
- Phụ lục cải tiến (fullPlanHtml) để giáo viên cắt dán.
"#;

const DEFAULT_USER_TEMPLATE: &str = r#"
THÔNG TIN LỚP HỌC:
- Cấp học: {school_level}
- Lớp: {grade}
- Môn học: {subject}
- Quy mô: {class_size}
- Thời lượng: {minutes} phút
- Thiết bị: {resources}
- Công nghệ/Ứng dụng mong muốn: {tech_apps}
- Tích hợp liên môn: {integration}
- Mục tiêu phát triển năng lực: {competencies}
- Ý tưởng mô phỏng: {simulation}

YÊU CẦU:
1. Phân tích nội dung và đề xuất cải tiến.
2. fullPlanHtml phải chứa danh sách các thẻ <div class="change-block type-add">...</div> hoặc <div class="change-block type-modify">...</div>.
3. Bên trong change-block, hãy dùng <h4 class="location">...</h4>, <div class="instruction">...</div>, <div class="content">...</div>.
4. TUYỆT ĐỐI CHÚ Ý: Các công thức Toán PHẢI dùng định dạng LaTeX (ví dụ $\\frac{a}{b}$), KHÔNG dùng ký tự Unicode để đảm bảo khi copy sang Word có thể convert được.
"#;

/// Attempt to load `AppConfig` from APP_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("APP_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "giaoan", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "giaoan", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "giaoan", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg: AppConfig = toml::from_str(
      r#"
      [models]
      fallback = ["gemini-2.5-flash"]

      [limits]
      max_document_bytes = 1024
      "#,
    )
    .unwrap();

    assert_eq!(cfg.models.fallback, vec!["gemini-2.5-flash"]);
    assert_eq!(cfg.models.default_model, "gemini-3-flash-preview");
    assert_eq!(cfg.limits.max_document_bytes, 1024);
    assert_eq!(cfg.limits.request_timeout_secs, 180);
    assert!((cfg.prompts.temperature - 0.5).abs() < f32::EPSILON);
    assert!(cfg.prompts.user_template.contains("{subject}"));
  }

  #[test]
  fn body_limit_leaves_room_above_the_document_cap() {
    let limits = Limits { max_document_bytes: 3 * 1024, request_timeout_secs: 1 };
    // base64 of a document 1.5x the cap must still fit.
    let encoded_oversize = (limits.max_document_bytes * 3 / 2) / 3 * 4;
    assert!(limits.max_body_bytes() > encoded_oversize);
  }
}
