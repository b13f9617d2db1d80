//! Operator settings persisted in a small key-value JSON file.
//!
//! Two keys matter: `gemini_api_key` (the credential) and `gemini_model`
//! (the preferred model). The file is read once at startup and rewritten on
//! every update.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::gemini::Credentials;

pub const KEY_API_KEY: &str = "gemini_api_key";
pub const KEY_MODEL: &str = "gemini_model";

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("Vui lòng nhập API Key")]
  BlankApiKey,
  #[error("settings file IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("settings file is not valid JSON: {0}")]
  Format(#[from] serde_json::Error),
}

/// File-backed key-value store.
#[derive(Debug)]
pub struct SettingsStore {
  path: PathBuf,
  values: BTreeMap<String, String>,
}

impl SettingsStore {
  /// Open the store at `path`. A missing file is an empty store; a corrupt one
  /// is logged and treated as empty so the operator can re-enter settings.
  #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
  pub fn open(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref().to_path_buf();
    let values = match std::fs::read_to_string(&path) {
      Ok(s) => match serde_json::from_str::<BTreeMap<String, String>>(&s) {
        Ok(v) => {
          info!(target: "giaoan", keys = v.len(), "Loaded settings");
          v
        }
        Err(e) => {
          warn!(target: "giaoan", error = %e, "Settings file unreadable; starting empty");
          BTreeMap::new()
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
      Err(e) => {
        warn!(target: "giaoan", error = %e, "Failed to read settings file; starting empty");
        BTreeMap::new()
      }
    };
    Self { path, values }
  }

  /// Open from SETTINGS_PATH (default `./data/settings.json`), then seed any
  /// missing entry from GEMINI_API_KEY / GEMINI_MODEL.
  pub fn from_env() -> Self {
    let path = std::env::var("SETTINGS_PATH").unwrap_or_else(|_| "./data/settings.json".into());
    let mut store = Self::open(path);
    for (env, key) in [("GEMINI_API_KEY", KEY_API_KEY), ("GEMINI_MODEL", KEY_MODEL)] {
      if store.get(key).is_none() {
        if let Ok(v) = std::env::var(env) {
          if !v.trim().is_empty() {
            store.values.insert(key.to_string(), v.trim().to_string());
          }
        }
      }
    }
    store
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  /// Write `values` to disk as the whole file.
  fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
    if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
      std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(values)?;
    std::fs::write(&self.path, json)?;
    Ok(())
  }

  /// Typed view of the stored values.
  pub fn settings(&self) -> Settings {
    Settings {
      api_key: self.get(KEY_API_KEY).map(str::to_string),
      model: self.get(KEY_MODEL).map(str::to_string),
    }
  }

  /// Save credential and preferred model together. A blank key is refused.
  /// The in-memory values only change once the file has been written.
  #[instrument(level = "info", skip(self, api_key), fields(%model))]
  pub fn save(&mut self, api_key: &str, model: &str) -> Result<(), SettingsError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
      return Err(SettingsError::BlankApiKey);
    }
    let mut next = self.values.clone();
    next.insert(KEY_API_KEY.to_string(), api_key.to_string());
    next.insert(KEY_MODEL.to_string(), model.trim().to_string());
    self.persist(&next)?;
    self.values = next;
    info!(target: "giaoan", "Settings saved");
    Ok(())
  }
}

#[derive(Clone, Debug, Default)]
pub struct Settings {
  pub api_key: Option<String>,
  pub model: Option<String>,
}

impl Settings {
  /// None until a non-blank key has been configured.
  pub fn credentials(&self) -> Option<Credentials> {
    self.api_key
      .as_deref()
      .map(str::trim)
      .filter(|k| !k.is_empty())
      .map(|k| Credentials { api_key: k.to_string() })
  }

  /// Preferred model, or `default` when none is stored.
  pub fn preferred_model<'a>(&'a self, default: &'a str) -> &'a str {
    self.model.as_deref().map(str::trim).filter(|m| !m.is_empty()).unwrap_or(default)
  }

  /// Key with everything but the last four characters hidden.
  pub fn masked_api_key(&self) -> Option<String> {
    let key = self.credentials()?.api_key;
    let chars: Vec<char> = key.chars().collect();
    let visible = chars.len().min(4);
    let tail: String = chars[chars.len() - visible..].iter().collect();
    Some(format!("{}{}", "•".repeat(chars.len() - visible), tail))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_means_setup_is_needed() {
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::open(dir.path().join("settings.json"));
    let s = store.settings();
    assert!(s.credentials().is_none());
    assert_eq!(s.preferred_model("gemini-3-flash-preview"), "gemini-3-flash-preview");
  }

  #[test]
  fn saved_settings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    let mut store = SettingsStore::open(&path);
    store.save("  AIzaSecret1234 ", "gemini-2.5-flash").unwrap();

    let reopened = SettingsStore::open(&path).settings();
    assert_eq!(reopened.credentials().unwrap().api_key, "AIzaSecret1234");
    assert_eq!(reopened.preferred_model("x"), "gemini-2.5-flash");
    assert_eq!(reopened.masked_api_key().unwrap(), "••••••••••1234");
  }

  #[test]
  fn blank_key_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = SettingsStore::open(dir.path().join("s.json"));
    assert!(matches!(store.save("   ", "m"), Err(SettingsError::BlankApiKey)));
    assert!(!dir.path().join("s.json").exists());
  }

  #[test]
  fn failed_write_leaves_previous_values() {
    let dir = tempfile::tempdir().unwrap();
    // The target path is a directory, so writing the file fails.
    let target = dir.path().join("settings.json");
    std::fs::create_dir(&target).unwrap();

    let mut store = SettingsStore::open(&target);
    let err = store.save("AIzaNew", "gemini-2.5-flash").unwrap_err();
    assert!(matches!(err, SettingsError::Io(_)));
    assert!(store.get(KEY_API_KEY).is_none());
    assert!(store.settings().credentials().is_none());
  }

  #[test]
  fn corrupt_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s.json");
    std::fs::write(&path, "not json").unwrap();
    let mut store = SettingsStore::open(&path);
    assert!(store.get(KEY_API_KEY).is_none());
    store.save("k", "gemini-3-pro-preview").unwrap();
    assert_eq!(SettingsStore::open(&path).get(KEY_MODEL), Some("gemini-3-pro-preview"));
  }
}
