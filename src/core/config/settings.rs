use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::ApiError;

/// Typed view over the merged configuration tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub storage: StorageSettings,
    pub mistral: MistralSettings,
    pub ionos: IonosSettings,
}

impl Settings {
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        serde_json::from_value(value.clone())
            .map_err(|e| ApiError::BadRequest(format!("Invalid config: {}", e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_mb: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
            max_upload_mb: 50,
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// `postgres://...` or `sqlite://...`; falls back to a SQLite file in the data dir.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: Option<String>,
    pub region: String,
    pub max_retries: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            access_key: None,
            secret_key: None,
            bucket: None,
            region: "eu-central-1".to_string(),
            max_retries: 3,
        }
    }
}

impl StorageSettings {
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MistralSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub enable_models: bool,
    pub timeout_secs: u64,
}

impl Default for MistralSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.mistral.ai".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            enable_models: true,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IonosSettings {
    /// Without a token the IONOS provider answers offline.
    pub api_token: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for IonosSettings {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: "https://openai.inference.de-txl.ionos.com".to_string(),
            model: "meta-llama/Meta-Llama-3.1-8B-Instruct".to_string(),
            timeout_secs: 120,
        }
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
