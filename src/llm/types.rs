use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, deserialize_with = "deserialize_content")]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// Accepts plain strings, `null`, and OpenAI content-part arrays (text parts are joined).
fn deserialize_content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                Value::Object(obj) => obj.get("text").and_then(Value::as_str),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn last_content(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ionos,
    Mistral,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ionos => "ionos",
            ProviderKind::Mistral => "mistral",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_accepts_strings_nulls_and_parts() {
        let plain: ChatMessage =
            serde_json::from_value(json!({"role": "user", "content": "Hallo"})).unwrap();
        assert_eq!(plain.content, "Hallo");

        let null: ChatMessage =
            serde_json::from_value(json!({"role": "assistant", "content": null})).unwrap();
        assert_eq!(null.content, "");

        let missing: ChatMessage = serde_json::from_value(json!({"role": "assistant"})).unwrap();
        assert_eq!(missing.content, "");

        let parts: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "Was regelt"},
                {"type": "image_url", "image_url": {"url": "data:"}},
                {"type": "text", "text": "§ 433 BGB?"}
            ]
        }))
        .unwrap();
        assert_eq!(parts.content, "Was regelt\n§ 433 BGB?");
    }

    #[test]
    fn last_content_is_empty_without_messages() {
        assert_eq!(ChatRequest::new(vec![]).last_content(), "");
        let req = ChatRequest::new(vec![ChatMessage::user("a"), ChatMessage::user("b")]);
        assert_eq!(req.last_content(), "b");
    }
}
