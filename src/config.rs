use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::backend::{AppwriteConfig, BackendConfig};

/// Top-level application configuration loaded from file + environment.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub cors: CorsSection,
    pub admin: AdminSection,
    pub backend: BackendSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Load configuration from disk and environment.
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("MEDRELAY_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        let mut builder = config::Config::builder();

        if Path::new(&config_path).exists() {
            builder = builder.add_source(config::File::from(PathBuf::from(&config_path)));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MEDRELAY")
                .prefix_separator("_")
                .separator("__"),
        );

        let settings = builder.build()?;
        let mut config: Self = settings.try_deserialize()?;

        // Hosting platforms hand out the port as a bare PORT variable
        if let Ok(port) = env::var("PORT") {
            config.server.port = port.parse().context("invalid PORT")?;
        }

        if config.logging.level.trim().is_empty() {
            config.logging.level = "info".to_string();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.admin.passkey.is_empty() {
            bail!("admin.passkey must be specified");
        }
        Ok(())
    }

    /// Whether error responses may carry internal detail.
    pub fn expose_error_details(&self) -> bool {
        self.environment == Environment::Development
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CorsSection {
    pub frontend_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AdminSection {
    pub passkey: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BackendSection {
    pub kind: BackendKind,
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub database_id: String,
    pub patient_collection_id: String,
    pub appointment_collection_id: String,
    pub bucket_id: Option<String>,
}

impl BackendSection {
    pub fn to_runtime(&self) -> Result<BackendConfig> {
        match self.kind {
            BackendKind::Memory => Ok(BackendConfig::Memory),
            BackendKind::Appwrite => {
                let required = [
                    ("backend.endpoint", &self.endpoint),
                    ("backend.project_id", &self.project_id),
                    ("backend.api_key", &self.api_key),
                    ("backend.database_id", &self.database_id),
                    ("backend.patient_collection_id", &self.patient_collection_id),
                    (
                        "backend.appointment_collection_id",
                        &self.appointment_collection_id,
                    ),
                ];
                for (name, value) in required {
                    if value.trim().is_empty() {
                        bail!("{} must be specified", name);
                    }
                }

                Ok(BackendConfig::Appwrite(AppwriteConfig {
                    endpoint: self.endpoint.trim().to_string(),
                    project_id: self.project_id.clone(),
                    api_key: self.api_key.clone(),
                    database_id: self.database_id.clone(),
                    patient_collection_id: self.patient_collection_id.clone(),
                    appointment_collection_id: self.appointment_collection_id.clone(),
                    bucket_id: self
                        .bucket_id
                        .as_deref()
                        .map(str::trim)
                        .filter(|b| !b.is_empty())
                        .map(str::to_string),
                }))
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Appwrite,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}
