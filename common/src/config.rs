use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraderConfig {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    /// Bucket label for submissions that belong to no group.
    pub no_group_label: String,
    /// `none`, `restore` or `fromUpstream`.
    pub default_init_mode: String,
}

static CONFIG: OnceCell<GraderConfig> = OnceCell::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.into())
}

impl GraderConfig {
    /// Reads the current process environment without touching the global.
    pub fn from_env() -> Self {
        GraderConfig {
            project_name: var_or("PROJECT_NAME", "grader"),
            log_level: var_or("LOG_LEVEL", "info"),
            log_file: var_or("LOG_FILE", "logs/grader.log"),
            no_group_label: var_or("NO_GROUP_LABEL", "No Group"),
            default_init_mode: var_or("DEFAULT_INIT_MODE", "restore"),
        }
    }

    /// Loads `env_path` (if it exists) into the environment and freezes the result.
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();
        CONFIG.get_or_init(Self::from_env)
    }

    /// The frozen config, if [`GraderConfig::init`] has run.
    pub fn get() -> Option<&'static Self> {
        CONFIG.get()
    }
}
