use crate::domain::model::EnrollmentPolicy;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{GestorError, Result};
use crate::utils::validation::{validate_path, validate_positive_number, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_STATE_FILE: &str = "state.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub policy: Option<PolicyConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    pub state_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub max_active_enrollments: Option<usize>,
    pub max_courses_per_teacher: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                state_file: None,
            },
            policy: None,
            logging: None,
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GestorError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| GestorError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_path("storage.data_dir", &self.storage.data_dir)?;
        if let Some(state_file) = &self.storage.state_file {
            validate_path("storage.state_file", state_file)?;
        }

        if let Some(policy) = &self.policy {
            if let Some(max) = policy.max_active_enrollments {
                validate_positive_number("policy.max_active_enrollments", max, 1)?;
            }
            if let Some(max) = policy.max_courses_per_teacher {
                validate_positive_number("policy.max_courses_per_teacher", max, 1)?;
            }
        }

        if let Some(level) = self.log_level() {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level) {
                return Err(GestorError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

/// 替換環境變數 (例如 ${DATA_DIR})，未設定的變數保持原樣
pub(crate) fn substitute_env_vars(content: &str) -> String {
    let re = Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}

impl ConfigProvider for AppConfig {
    fn data_dir(&self) -> &str {
        &self.storage.data_dir
    }

    fn state_file(&self) -> &str {
        self.storage
            .state_file
            .as_deref()
            .unwrap_or(DEFAULT_STATE_FILE)
    }

    fn policy(&self) -> EnrollmentPolicy {
        let defaults = EnrollmentPolicy::default();
        match &self.policy {
            Some(p) => EnrollmentPolicy {
                max_active_enrollments: p
                    .max_active_enrollments
                    .unwrap_or(defaults.max_active_enrollments),
                max_courses_per_teacher: p
                    .max_courses_per_teacher
                    .unwrap_or(defaults.max_courses_per_teacher),
            },
            None => defaults,
        }
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
