use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File, FileFormat};
use data_ingestion::config::ProviderConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";
pub const ENV_PREFIX: &str = "DASHBOARD";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub model: ModelConfig,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8501".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub artifact_path: PathBuf,
    /// JSON array with the ordered column names the model was trained on.
    pub features_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("model/stock_model.json"),
            features_path: PathBuf::from("model/features.json"),
        }
    }
}

/// Pre-filled values of the input form.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub ticker: String,
    pub start_date: NaiveDate,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            ticker: "AAPL".to_string(),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
        }
    }
}

impl AppConfig {
    /// Layers the TOML file (optional unless a path is given) and
    /// `DASHBOARD__SECTION__KEY` environment variables over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let cfg = Config::builder()
            .add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(path.is_some()),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        cfg.try_deserialize()
    }
}
