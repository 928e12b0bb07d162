use serde_json::{Map, Value};
use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
        validate_u64_field(server, "server.max_upload_mb", "max_upload_mb", 1, 10_240)?;
    }

    if let Some(database) = expect_optional_object(root, "database")? {
        validate_optional_string_field(database, "database.url", "url")?;
        validate_u64_field(
            database,
            "database.max_connections",
            "max_connections",
            1,
            100,
        )?;
    }

    if let Some(storage) = expect_optional_object(root, "storage")? {
        for key in ["endpoint", "access_key", "secret_key", "bucket", "region"] {
            validate_optional_string_field(storage, &format!("storage.{}", key), key)?;
        }
        validate_u64_field(storage, "storage.max_retries", "max_retries", 0, 10)?;
    }

    if let Some(mistral) = expect_optional_object(root, "mistral")? {
        validate_optional_string_field(mistral, "mistral.api_key", "api_key")?;
        validate_optional_string_field(mistral, "mistral.base_url", "base_url")?;
        validate_u64_field(mistral, "mistral.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_f64_field(mistral, "mistral.temperature", "temperature", 0.0, 2.0)?;
        validate_bool_field(mistral, "mistral.enable_models", "enable_models")?;
        validate_u64_field(mistral, "mistral.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(ionos) = expect_optional_object(root, "ionos")? {
        validate_optional_string_field(ionos, "ionos.api_token", "api_token")?;
        validate_optional_string_field(ionos, "ionos.base_url", "base_url")?;
        validate_optional_string_field(ionos, "ionos.model", "model")?;
        validate_u64_field(ionos, "ionos.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_str().is_none() {
        return Err(config_type_error(path, "string"));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_a_complete_config() {
        let config = json!({
            "server": { "host": "0.0.0.0", "port": 8000, "cors_allowed_origins": ["*"] },
            "database": { "url": "postgres://db/legal", "max_connections": 10 },
            "storage": { "bucket": "legal", "region": "eu-central-1", "max_retries": 0 },
            "mistral": { "max_tokens": 2000, "temperature": 0.7, "enable_models": true },
            "ionos": { "model": "meta-llama/Meta-Llama-3.1-8B-Instruct" }
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn reports_the_offending_path() {
        let err = validate_config(&json!({ "server": { "port": 70000 } })).unwrap_err();
        assert_eq!(
            err.message(),
            "Invalid config at 'server.port': must be between 1 and 65535"
        );

        let err = validate_config(&json!({ "mistral": { "temperature": "hot" } })).unwrap_err();
        assert_eq!(
            err.message(),
            "Invalid config at 'mistral.temperature': expected number"
        );

        let err = validate_config(&json!({ "server": { "cors_allowed_origins": [""] } }))
            .unwrap_err();
        assert!(err.message().contains("server.cors_allowed_origins[0]"));

        let err = validate_config(&json!({ "storage": { "max_retries": 50 } })).unwrap_err();
        assert_eq!(
            err.message(),
            "Invalid config at 'storage.max_retries': must be between 0 and 10"
        );
    }

    #[test]
    fn rejects_non_object_sections() {
        assert!(validate_config(&json!({ "storage": "s3" })).is_err());
        assert!(validate_config(&json!([1, 2])).is_err());
    }
}
