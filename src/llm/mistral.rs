use std::time::Duration;

use async_trait::async_trait;

use super::openai_compat::OpenAiCompatClient;
use super::provider::{ChunkReceiver, LlmProvider};
use super::types::{ChatRequest, ProviderKind};
use crate::core::config::settings::{non_empty, MistralSettings};
use crate::core::errors::ApiError;

#[derive(Clone)]
pub struct MistralProvider {
    client: Option<OpenAiCompatClient>,
    max_tokens: u32,
    temperature: f64,
}

impl MistralProvider {
    pub fn from_settings(settings: &MistralSettings) -> Result<Self, ApiError> {
        let client = match non_empty(&settings.api_key) {
            Some(api_key) => Some(OpenAiCompatClient::new(
                "Mistral",
                &settings.base_url,
                api_key,
                Duration::from_secs(settings.timeout_secs),
            )?),
            None => None,
        };

        Ok(Self {
            client,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }

    fn client(&self) -> Result<&OpenAiCompatClient, ApiError> {
        self.client.as_ref().ok_or_else(|| {
            ApiError::ServiceUnavailable("Mistral API key not configured".to_string())
        })
    }

    fn with_defaults(&self, mut request: ChatRequest) -> ChatRequest {
        request.max_tokens.get_or_insert(self.max_tokens);
        request.temperature.get_or_insert(self.temperature);
        request
    }
}

#[async_trait]
impl LlmProvider for MistralProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mistral
    }

    fn is_available(&self) -> bool {
        self.client.is_some()
    }

    async fn chat(&self, request: ChatRequest, model: &str) -> Result<String, ApiError> {
        let client = self.client()?;
        client.chat(&self.with_defaults(request), model).await
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        model: &str,
    ) -> Result<ChunkReceiver, ApiError> {
        let client = self.client()?;
        client.stream_chat(&self.with_defaults(request), model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::openai_compat::tests::spawn_upstream;
    use crate::llm::types::ChatMessage;

    fn settings(base_url: &str, api_key: Option<&str>) -> MistralSettings {
        MistralSettings {
            api_key: api_key.map(str::to_string),
            base_url: base_url.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unconfigured_provider_is_unavailable() {
        let provider = MistralProvider::from_settings(&settings("http://127.0.0.1:1", None)).unwrap();
        assert!(!provider.is_available());
        assert_eq!(provider.name(), "mistral");

        let err = provider
            .chat(ChatRequest::new(vec![ChatMessage::user("x")]), "mistral-medium")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let provider =
            MistralProvider::from_settings(&settings("http://127.0.0.1:1", Some("  "))).unwrap();
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn configured_defaults_apply_unless_overridden() {
        let (base_url, seen) = spawn_upstream("ok").await;
        let provider = MistralProvider::from_settings(&settings(&base_url, Some("test-key"))).unwrap();
        assert!(provider.is_available());

        let answer = provider
            .chat(ChatRequest::new(vec![ChatMessage::user("x")]), "mistral-medium")
            .await
            .unwrap();
        assert_eq!(answer, "Antwort von mistral-medium");

        let overridden = ChatRequest {
            messages: vec![ChatMessage::user("y")],
            max_tokens: Some(10),
            temperature: Some(0.1),
            ..Default::default()
        };
        provider.chat(overridden, "mistral-large").await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0]["max_tokens"], 2000);
        assert_eq!(seen[0]["temperature"], 0.7);
        assert_eq!(seen[1]["max_tokens"], 10);
        assert_eq!(seen[1]["temperature"], 0.1);
    }
}
