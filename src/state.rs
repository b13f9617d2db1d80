//! Application state: configuration, persisted settings, the generation
//! service, and the in-memory store of generated plans.
//!
//! Plans live only as long as the process (or until the operator resets).

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_app_config_from_env, AppConfig};
use crate::domain::LessonPlanResponse;
use crate::fallback::ModelPolicy;
use crate::gemini::{Gemini, GenerationService, ServiceError};
use crate::settings::{Settings, SettingsStore};

/// A generated plan kept for display and export.
#[derive(Clone, Debug)]
pub struct StoredPlan {
    pub id: String,
    pub model: String,
    pub source_file: Option<String>,
    pub plan: LessonPlanResponse,
}

pub struct AppState {
    pub config: AppConfig,
    pub settings: RwLock<SettingsStore>,
    pub service: Arc<dyn GenerationService>,
    pub plans: RwLock<HashMap<String, StoredPlan>>,
}

impl AppState {
    /// Build state from env: load TOML config, open the settings file, init the Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, ServiceError> {
        let config = load_app_config_from_env().unwrap_or_default();
        let settings = SettingsStore::from_env();
        let gemini = Gemini::from_env(Duration::from_secs(config.limits.request_timeout_secs))?;
        info!(target: "giaoan", base_url = %gemini.base_url, models = ?config.models.fallback, "Gemini client ready");

        if settings.settings().credentials().is_none() {
            warn!(target: "giaoan", "No Gemini API key configured; the frontend will prompt for one");
        }

        Ok(Self::new(config, settings, Arc::new(gemini)))
    }

    pub fn new(config: AppConfig, settings: SettingsStore, service: Arc<dyn GenerationService>) -> Self {
        Self {
            config,
            settings: RwLock::new(settings),
            service,
            plans: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of the persisted settings.
    pub async fn current_settings(&self) -> Settings {
        self.settings.read().await.settings()
    }

    /// Retry order for one generation: preferred model, then the configured fallbacks.
    pub fn policy_for(&self, settings: &Settings) -> ModelPolicy {
        let models = &self.config.models;
        ModelPolicy::new(settings.preferred_model(&models.default_model), &models.fallback)
    }

    #[instrument(level = "debug", skip(self, plan))]
    pub async fn insert_plan(&self, model: String, source_file: Option<String>, plan: LessonPlanResponse) -> StoredPlan {
        let stored = StoredPlan { id: Uuid::new_v4().to_string(), model, source_file, plan };
        self.plans.write().await.insert(stored.id.clone(), stored.clone());
        stored
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_plan(&self, id: &str) -> Option<StoredPlan> {
        self.plans.read().await.get(id).cloned()
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_plan(&self, id: &str) -> bool {
        self.plans.write().await.remove(id).is_some()
    }
}
