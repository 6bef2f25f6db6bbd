use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Public Gemini REST endpoint.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 60;

/// Request bodies above this size are rejected (10MB).
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PlantConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub analysis: AnalysisSettings,
    pub storage: StorageConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub timeout_secs: u64,
}

impl AnalysisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Scratch directory for incoming images.
    pub uploads_dir: PathBuf,
    /// Scratch directory for generated reports.
    pub reports_dir: PathBuf,
    /// Front-end assets served as-is.
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub max_body_bytes: usize,
}

impl PlantConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env, APP__ prefix and PORT)
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let config = PlantConfig {
            common: common_config,
            gemini: GeminiSettings {
                api_key: get_env("GEMINI_API_KEY", None, is_prod)?,
                model: get_env("GEMINI_MODEL", Some("gemini-1.5-flash"), is_prod)?,
                api_base: get_env("GEMINI_API_BASE", Some(DEFAULT_GEMINI_API_BASE), false)?,
            },
            analysis: AnalysisSettings {
                timeout_secs: parse_env(
                    "ANALYSIS_TIMEOUT_SECS",
                    DEFAULT_ANALYSIS_TIMEOUT_SECS,
                )?,
            },
            storage: StorageConfig {
                uploads_dir: get_env("UPLOADS_DIR", Some("uploads"), false)?.into(),
                reports_dir: get_env("REPORTS_DIR", Some("reports"), false)?.into(),
                static_dir: get_env("STATIC_DIR", Some("public"), false)?.into(),
            },
            http: HttpConfig {
                max_body_bytes: parse_env("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GEMINI_API_KEY must not be empty"
            )));
        }
        if self.analysis.timeout_secs == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ANALYSIS_TIMEOUT_SECS must be greater than zero"
            )));
        }
        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse().map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
        }),
        Err(_) => Ok(default),
    }
}
