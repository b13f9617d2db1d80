//! Domain models: lesson configuration submitted by the form, and the
//! structured lesson plan returned by the model.

use serde::{Deserialize, Serialize};

/// School level; constrains which grade values are valid.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchoolLevel {
  Primary,
  Secondary,
  High,
  University,
}
impl Default for SchoolLevel {
  fn default() -> Self { SchoolLevel::Secondary }
}

impl SchoolLevel {
  pub const ALL: [SchoolLevel; 4] = [
    SchoolLevel::Primary,
    SchoolLevel::Secondary,
    SchoolLevel::High,
    SchoolLevel::University,
  ];

  /// Label written into the prompt.
  pub fn label(self) -> &'static str {
    match self {
      SchoolLevel::Primary => "Tiểu học",
      SchoolLevel::Secondary => "Trung học cơ sở (THCS)",
      SchoolLevel::High => "Trung học phổ thông (THPT)",
      SchoolLevel::University => "Đại học/Cao đẳng",
    }
  }

  /// Grades offered for this level. University has no numbered grades,
  /// so the only accepted grade there is the empty string.
  pub fn grades(self) -> &'static [&'static str] {
    match self {
      SchoolLevel::Primary => &["1", "2", "3", "4", "5"],
      SchoolLevel::Secondary => &["6", "7", "8", "9"],
      SchoolLevel::High => &["10", "11", "12"],
      SchoolLevel::University => &[],
    }
  }

  pub fn accepts_grade(self, grade: &str) -> bool {
    let grade = grade.trim();
    match self.grades() {
      [] => grade.is_empty(),
      set => set.contains(&grade),
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassSize {
  Small,
  Medium,
  Large,
}
impl Default for ClassSize {
  fn default() -> Self { ClassSize::Medium }
}

impl ClassSize {
  pub const ALL: [ClassSize; 3] = [ClassSize::Small, ClassSize::Medium, ClassSize::Large];

  pub fn as_str(self) -> &'static str {
    match self {
      ClassSize::Small => "small",
      ClassSize::Medium => "medium",
      ClassSize::Large => "large",
    }
  }
}

/// Lesson duration. One period is 45 minutes; serialized as the minute count string.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeAllotment {
  #[serde(rename = "45")] Min45,
  #[serde(rename = "90")] Min90,
  #[serde(rename = "135")] Min135,
  #[serde(rename = "180")] Min180,
  #[serde(rename = "225")] Min225,
  #[serde(rename = "270")] Min270,
}
impl Default for TimeAllotment {
  fn default() -> Self { TimeAllotment::Min45 }
}

impl TimeAllotment {
  pub const ALL: [TimeAllotment; 6] = [
    TimeAllotment::Min45,
    TimeAllotment::Min90,
    TimeAllotment::Min135,
    TimeAllotment::Min180,
    TimeAllotment::Min225,
    TimeAllotment::Min270,
  ];

  pub fn minutes(self) -> u16 {
    match self {
      TimeAllotment::Min45 => 45,
      TimeAllotment::Min90 => 90,
      TimeAllotment::Min135 => 135,
      TimeAllotment::Min180 => 180,
      TimeAllotment::Min225 => 225,
      TimeAllotment::Min270 => 270,
    }
  }

  pub fn periods(self) -> u16 { self.minutes() / 45 }
}

/// Equipment available in the classroom. Field order is the order they are
/// printed in the prompt.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resources {
  #[serde(default)] pub projector: bool,
  #[serde(default)] pub internet: bool,
  #[serde(default)] pub materials: bool,
}
impl Default for Resources {
  fn default() -> Self { Self { projector: true, internet: true, materials: false } }
}

/// The operator's structured choices from the form.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LessonConfig {
  #[serde(default)] pub school_level: SchoolLevel,
  #[serde(default)] pub grade: String,
  #[serde(default)] pub subject: String,
  #[serde(default)] pub class_size: ClassSize,
  #[serde(default)] pub resources: Resources,
  #[serde(default)] pub custom_resource: String,
  #[serde(default)] pub time_constraint: TimeAllotment,
  #[serde(default)] pub teaching_focus: Vec<String>,
  #[serde(default)] pub custom_competency: String,
  #[serde(default)] pub tech_apps: String,
  #[serde(default)] pub integration: String,
  #[serde(default)] pub simulation_topic: Option<String>,
}

impl LessonConfig {
  /// Selected competency labels with the custom addition appended (if any).
  pub fn all_competencies(&self) -> Vec<String> {
    let mut all = self.teaching_focus.clone();
    let custom = self.custom_competency.trim();
    if !custom.is_empty() {
      all.push(custom.to_string());
    }
    all
  }
}

/// Configuration plus the uploaded source document.
///
/// The browser reads the file asynchronously; `encoding` stays true until the
/// read settles, and `file_base64` may still carry the data-URL prefix.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LessonInput {
  #[serde(default)] pub file_base64: Option<String>,
  #[serde(default)] pub mime_type: Option<String>,
  #[serde(default)] pub file_name: Option<String>,
  #[serde(default)] pub encoding: bool,
  pub config: LessonConfig,
}

impl LessonInput {
  /// A document counts as attached once the operator picked a file, even if
  /// its bytes have not arrived yet.
  pub fn has_document(&self) -> bool {
    self.encoding
      || self.file_name.as_deref().is_some_and(|n| !n.trim().is_empty())
      || self.file_base64.as_deref().is_some_and(|d| !d.is_empty())
  }
}

// --- Generated plan ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSummary {
  pub subject: String,
  pub topic: String,
  pub weakness: String,
  pub proposal: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TeachingMethod {
  pub name: String,
  pub description: String,
  pub steps: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Game {
  pub name: String,
  pub duration: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub objective: String,
  pub steps: Vec<String>,
}

/// Interactive simulation. The schema marks none of its fields required.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Simulation {
  #[serde(default)] pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub code: String,
}

/// Parsed model output. Everything except `simulation` is required.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonPlanResponse {
  pub summary: AnalysisSummary,
  pub methods: Vec<TeachingMethod>,
  pub games: Vec<Game>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub simulation: Option<Simulation>,
  pub full_plan_html: String,
}

// --- Option catalogues ---

pub const SUBJECTS: &[&str] = &[
  "Toán", "Vật lí", "Hóa học", "Sinh học", "Ngữ văn", "Lịch sử", "Địa lí",
  "Tiếng Anh", "Giáo dục thể chất", "Giáo dục quốc phòng", "Âm nhạc",
  "Thể dục", "Công nghệ", "Giáo dục Kinh tế và Pháp luật", "Hoạt động trải nghiệm, hướng nghiệp",
];

/// (id, label). The label is what gets stored in `teaching_focus`.
pub const COMPETENCIES: &[(&str, &str)] = &[
  ("problem-solving", "Giải quyết vấn đề"),
  ("digital", "Năng lực số"),
  ("collaboration", "Hợp tác"),
  ("teamwork", "Làm việc nhóm"),
  ("autonomy", "Tự chủ và tự học"),
];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn grade_must_match_school_level() {
    assert!(SchoolLevel::Primary.accepts_grade("3"));
    assert!(!SchoolLevel::Primary.accepts_grade("7"));
    assert!(SchoolLevel::High.accepts_grade(" 12 "));
    assert!(SchoolLevel::University.accepts_grade(""));
    assert!(!SchoolLevel::University.accepts_grade("1"));
  }

  #[test]
  fn config_deserializes_from_form_payload() {
    let cfg: LessonConfig = serde_json::from_value(serde_json::json!({
      "schoolLevel": "high",
      "grade": "10",
      "subject": "Vật lí",
      "classSize": "large",
      "resources": { "projector": false, "internet": true, "materials": true },
      "timeConstraint": "90",
      "teachingFocus": ["Hợp tác"],
      "customCompetency": "  Tư duy phản biện "
    }))
    .unwrap();

    assert_eq!(cfg.school_level, SchoolLevel::High);
    assert_eq!(cfg.class_size, ClassSize::Large);
    assert_eq!(cfg.time_constraint.minutes(), 90);
    assert_eq!(cfg.time_constraint.periods(), 2);
    assert_eq!(cfg.all_competencies(), vec!["Hợp tác", "Tư duy phản biện"]);
    assert!(cfg.simulation_topic.is_none());
  }

  #[test]
  fn unknown_time_allotment_is_rejected() {
    let r = serde_json::from_str::<TimeAllotment>("\"60\"");
    assert!(r.is_err());
  }

  #[test]
  fn plan_without_simulation_parses() {
    let plan: LessonPlanResponse = serde_json::from_value(serde_json::json!({
      "summary": { "subject": "Toán", "topic": "Phân số", "weakness": "w", "proposal": "p" },
      "methods": [],
      "games": [{ "name": "g", "duration": "5 phút", "type": "nhóm", "objective": "o", "steps": ["a"] }],
      "fullPlanHtml": "<div></div>"
    }))
    .unwrap();
    assert!(plan.simulation.is_none());
    assert_eq!(plan.games[0].kind, "nhóm");
  }

  #[test]
  fn plan_missing_required_field_is_rejected() {
    let r = serde_json::from_value::<LessonPlanResponse>(serde_json::json!({
      "summary": { "subject": "Toán", "topic": "Phân số", "weakness": "w", "proposal": "p" },
      "methods": [],
      "games": []
    }));
    assert!(r.is_err());
  }
}
