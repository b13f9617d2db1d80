//! File exports: the Word-compatible `.doc` appendix and the standalone
//! simulation page.

use crate::domain::{LessonPlanResponse, Simulation};
use crate::util::underscore_whitespace;

const DOC_HEADER: &str = r#"
      <html xmlns:o='urn:schemas-microsoft-com:office:office' xmlns:w='urn:schemas-microsoft-com:office:word' xmlns='http://www.w3.org/TR/REC-html40'>
      <head>
          <meta charset='utf-8'>
          <title>Phụ Lục Cải Tiến</title>
          <style>
              body { font-family: 'Times New Roman', serif; font-size: 12pt; line-height: 1.5; } 
              .change-block { margin-bottom: 20px; border: 1px solid #ddd; padding: 15px; } 
              .type-add { background: #e6fffa; border-left: 5px solid #0d9488; } 
              .type-modify { background: #fffaf0; border-left: 5px solid #d97706; }
              /* Ensure LaTeX code is visible and not hidden by styling */
              .content { white-space: pre-wrap; }
          </style>
      </head>
      <body>
      <h1>PHỤ LỤC CẢI TIẾN GIÁO ÁN</h1>
      <p style="color: #666; font-style: italic;">
        Lưu ý: Các công thức toán học được giữ ở định dạng LaTeX (ví dụ: $x^2$) để quý thầy cô dễ dàng chuyển đổi bằng MathType hoặc tính năng Equation trong Word.
      </p>
      <hr/>"#;

const DOC_FOOTER: &str = "</body></html>";
const BOM: &str = "\u{feff}";

/// A rendered download.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportFile {
  pub file_name: String,
  pub content_type: &'static str,
  pub bytes: Vec<u8>,
}

/// `<prefix><base>.<ext>` where `base` has whitespace runs replaced by `_`,
/// or `fallback` when `base` is empty.
pub fn export_file_name(prefix: &str, base: &str, fallback: &str, ext: &str) -> String {
  let base = if base.is_empty() { fallback } else { base };
  format!("{}{}.{}", prefix, underscore_whitespace(base), ext)
}

/// Word-processor export: BOM + fixed header + verbatim plan fragment + footer.
pub fn word_document(plan: &LessonPlanResponse) -> ExportFile {
  let mut body = String::with_capacity(BOM.len() + DOC_HEADER.len() + plan.full_plan_html.len() + DOC_FOOTER.len());
  body.push_str(BOM);
  body.push_str(DOC_HEADER);
  body.push_str(&plan.full_plan_html);
  body.push_str(DOC_FOOTER);

  ExportFile {
    file_name: export_file_name("Cai_Tien_", &plan.summary.topic, "GiaoAn", "doc"),
    content_type: "application/msword",
    bytes: body.into_bytes(),
  }
}

/// Simulation export: the source code saved as-is.
pub fn simulation_page(sim: &Simulation) -> ExportFile {
  ExportFile {
    file_name: export_file_name("Mo_phong_", &sim.title, "Simulation", "html"),
    content_type: "text/html; charset=utf-8",
    bytes: sim.code.clone().into_bytes(),
  }
}

/// `Content-Disposition` value with an ASCII fallback and an RFC 5987 UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
  let ascii: String = file_name
    .chars()
    .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
    .collect();
  format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", ascii, urlencoding::encode(file_name))
}
