//! OpenAI chat-completions wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{ChatMessage, ChatRequest, ModelCard, DEFAULT_MODEL};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub stop: Option<Value>,
}

impl ChatCompletionRequest {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_MODEL)
    }

    /// `stop` may be a single string or a list.
    fn stop_sequences(&self) -> Option<Vec<String>> {
        match self.stop.as_ref()? {
            Value::String(s) => Some(vec![s.clone()]),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn to_chat_request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            messages,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            stop: self.stop_sequences(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Serialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    /// Whitespace-separated word counts, not model tokens.
    pub fn from_words(prompt: &[ChatMessage], completion: &str) -> Self {
        let prompt_tokens = prompt
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum();
        let completion_tokens = completion.split_whitespace().count();
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk<'a> {
    pub id: &'a str,
    pub object: &'static str,
    pub created: i64,
    pub model: &'a str,
    pub choices: [ChunkChoice; 1],
}

#[derive(Debug, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
    pub finish_reason: Option<&'static str>,
}

#[derive(Debug, Default, Serialize)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl<'a> ChatCompletionChunk<'a> {
    pub fn content(id: &'a str, created: i64, model: &'a str, content: String) -> Self {
        Self::build(id, created, model, Delta { content: Some(content) }, None)
    }

    pub fn stop(id: &'a str, created: i64, model: &'a str) -> Self {
        Self::build(id, created, model, Delta::default(), Some("stop"))
    }

    fn build(
        id: &'a str,
        created: i64,
        model: &'a str,
        delta: Delta,
        finish_reason: Option<&'static str>,
    ) -> Self {
        Self {
            id,
            object: "chat.completion.chunk",
            created,
            model,
            choices: [ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<ModelCard>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_defaults_to_ionos_model_and_no_messages() {
        let req: ChatCompletionRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.model(), "ionos-german-legal-rag");
        assert!(req.messages.is_empty());
        assert!(!req.stream);
    }

    #[test]
    fn stop_accepts_string_or_list() {
        let single: ChatCompletionRequest =
            serde_json::from_value(json!({"stop": "\n\n"})).unwrap();
        assert_eq!(
            single.to_chat_request(vec![]).stop,
            Some(vec!["\n\n".to_string()])
        );

        let list: ChatCompletionRequest =
            serde_json::from_value(json!({"stop": ["END", 3, "STOP"], "max_tokens": 5})).unwrap();
        let chat = list.to_chat_request(vec![]);
        assert_eq!(chat.stop, Some(vec!["END".to_string(), "STOP".to_string()]));
        assert_eq!(chat.max_tokens, Some(5));
    }

    #[test]
    fn usage_counts_words() {
        let prompt = vec![
            ChatMessage::user("Was regelt   § 433 BGB?"),
            ChatMessage::new("assistant", ""),
        ];
        let usage = Usage::from_words(&prompt, "Den Kaufvertrag.");
        assert_eq!(
            usage,
            Usage {
                prompt_tokens: 5,
                completion_tokens: 2,
                total_tokens: 7
            }
        );
    }

    #[test]
    fn chunks_serialize_like_openai() {
        let content = serde_json::to_value(ChatCompletionChunk::content(
            "chatcmpl-1",
            10,
            "mistral-medium-rag",
            "Hallo ".to_string(),
        ))
        .unwrap();
        assert_eq!(content["object"], "chat.completion.chunk");
        assert_eq!(content["choices"][0]["delta"]["content"], "Hallo ");
        assert!(content["choices"][0]["finish_reason"].is_null());

        let stop = serde_json::to_value(ChatCompletionChunk::stop("chatcmpl-1", 10, "m")).unwrap();
        assert_eq!(stop["choices"][0]["delta"], json!({}));
        assert_eq!(stop["choices"][0]["finish_reason"], "stop");
    }
}
