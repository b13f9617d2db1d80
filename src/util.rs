//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single left-to-right pass: substituted text is never scanned again, and
/// unknown `{...}` sequences are kept as written.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let value = after
      .find('}')
      .and_then(|close| pairs.iter().find(|(k, _)| *k == &after[..close]).map(|(_, v)| (close, *v)));
    match value {
      Some((close, v)) => {
        out.push_str(v);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// Remove every C0 control character (U+0000..=U+001F), newlines and tabs included.
pub fn strip_control_chars(s: &str) -> String {
  s.chars().filter(|c| !('\u{0}'..='\u{1F}').contains(c)).collect()
}

/// Collapse each run of whitespace into a single underscore.
pub fn underscore_whitespace(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut in_run = false;
  for ch in s.chars() {
    if ch.is_whitespace() {
      if !in_run { out.push('_'); }
      in_run = true;
    } else {
      out.push(ch);
      in_run = false;
    }
  }
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) { cut -= 1; }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_all_keys() {
    let out = fill_template("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and y and x");
  }

  #[test]
  fn substituted_values_are_not_rescanned() {
    let out = fill_template("I: {integration}; C: {competencies}", &[("integration", "{competencies}"), ("competencies", "Hợp tác")]);
    assert_eq!(out, "I: {competencies}; C: Hợp tác");
  }

  #[test]
  fn unknown_and_unclosed_braces_are_kept() {
    let out = fill_template("$\\frac{a}{b}$ {x} {", &[("x", "1")]);
    assert_eq!(out, "$\\frac{a}{b}$ 1 {");
  }

  #[test]
  fn control_chars_are_removed() {
    assert_eq!(strip_control_chars("{\"a\":\n\t\"b\u{1}\"}"), "{\"a\":\"b\"}");
    assert_eq!(strip_control_chars("Phép cộng"), "Phép cộng");
  }

  #[test]
  fn whitespace_runs_become_one_underscore() {
    assert_eq!(underscore_whitespace("Phép cộng  có\tnhớ"), "Phép_cộng_có_nhớ");
    assert_eq!(underscore_whitespace(" lead"), "_lead");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    let s = "ộộộộ";
    let t = trunc_for_log(s, 4);
    assert!(t.starts_with('ộ'));
    assert!(t.ends_with("(12 bytes total)"));
  }
}
