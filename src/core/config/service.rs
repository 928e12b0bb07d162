use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 9] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "access_key",
    "auth_",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "total_tokens"];

#[derive(Debug, Clone, Copy)]
enum EnvKind {
    Text,
    Integer,
    Float,
    Flag,
}

/// Environment variables understood by the service and where they land in the tree.
const ENV_OVERRIDES: [(&str, &[&str], EnvKind); 17] = [
    ("DATABASE_URL", &["database", "url"], EnvKind::Text),
    ("POSTGRES_URL", &["database", "url"], EnvKind::Text),
    ("S3_ENDPOINT", &["storage", "endpoint"], EnvKind::Text),
    ("S3_ACCESS_KEY", &["storage", "access_key"], EnvKind::Text),
    ("S3_SECRET_KEY", &["storage", "secret_key"], EnvKind::Text),
    ("S3_BUCKET", &["storage", "bucket"], EnvKind::Text),
    ("S3_REGION", &["storage", "region"], EnvKind::Text),
    ("MISTRAL_API_KEY", &["mistral", "api_key"], EnvKind::Text),
    ("MISTRAL_BASE_URL", &["mistral", "base_url"], EnvKind::Text),
    ("MISTRAL_MAX_TOKENS", &["mistral", "max_tokens"], EnvKind::Integer),
    ("MISTRAL_TEMPERATURE", &["mistral", "temperature"], EnvKind::Float),
    ("ENABLE_MISTRAL_MODELS", &["mistral", "enable_models"], EnvKind::Flag),
    ("IONOS_API_TOKEN", &["ionos", "api_token"], EnvKind::Text),
    ("IONOS_BASE_URL", &["ionos", "base_url"], EnvKind::Text),
    ("IONOS_MODEL", &["ionos", "model"], EnvKind::Text),
    ("HOST", &["server", "host"], EnvKind::Text),
    ("PORT", &["server", "port"], EnvKind::Integer),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("LEGAL_RAG_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config with secrets merged over it, then the process environment.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let mut merged = deep_merge(&public_config, &secrets_config);
        apply_env_overrides(&mut merged, |key| env::var(key).ok());
        validate_config(&merged)?;
        Ok(merged)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unreadable config {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (key, path, kind) in ENV_OVERRIDES {
        let Some(raw) = lookup(key) else {
            continue;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        ensure_object_path(config, path, env_value(raw, kind));
    }
}

fn env_value(raw: &str, kind: EnvKind) -> Value {
    let parsed = match kind {
        EnvKind::Text => None,
        EnvKind::Integer => raw.parse::<u64>().ok().map(Value::from),
        EnvKind::Float => raw.parse::<f64>().ok().map(Value::from),
        EnvKind::Flag => Some(Value::Bool(raw.eq_ignore_ascii_case("true"))),
    };
    // unparseable numbers stay strings so validation reports them by path
    parsed.unwrap_or_else(|| Value::String(raw.to_string()))
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }
    if !config.is_object() {
        *config = Value::Object(Map::new());
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}
