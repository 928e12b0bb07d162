//! IONOS AI Model Hub adapter.
//!
//! With an API token requests go to the hub's OpenAI-compatible endpoint using
//! the configured model. Without one the provider answers offline with a
//! canned analysis that echoes the question and the retrieved context.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::openai_compat::OpenAiCompatClient;
use super::provider::{ChunkReceiver, LlmProvider};
use super::types::{ChatRequest, ProviderKind};
use crate::core::config::settings::{non_empty, IonosSettings};
use crate::core::errors::ApiError;
use crate::rag::{truncate_chars, RagContextBuilder};

const OFFLINE_WORD_DELAY: Duration = Duration::from_millis(20);
const OFFLINE_CONTEXT_CHARS: usize = 200;

#[derive(Clone)]
pub struct IonosProvider {
    client: Option<OpenAiCompatClient>,
    hub_model: String,
    rag: RagContextBuilder,
    word_delay: Duration,
}

impl IonosProvider {
    pub fn from_settings(settings: &IonosSettings, rag: RagContextBuilder) -> Result<Self, ApiError> {
        let client = match non_empty(&settings.api_token) {
            Some(token) => Some(OpenAiCompatClient::new(
                "IONOS",
                &settings.base_url,
                token,
                Duration::from_secs(settings.timeout_secs),
            )?),
            None => None,
        };

        Ok(Self {
            client,
            hub_model: settings.model.clone(),
            rag,
            word_delay: OFFLINE_WORD_DELAY,
        })
    }

    pub fn with_word_delay(mut self, delay: Duration) -> Self {
        self.word_delay = delay;
        self
    }

    pub fn is_online(&self) -> bool {
        self.client.is_some()
    }

    async fn offline_answer(&self, request: &ChatRequest) -> String {
        let last = request.last_content();
        let context = self.rag.build_context(last).await;
        format!(
            "🏛️ [IONOS + RAG] Deutsche Rechtsfrage: '{}'\n\n\
             RAG Context: {}...\n\n\
             Das IONOS Legal-RAG System würde hier eine detaillierte juristische Analyse liefern, \
             basierend auf deutschen Rechtsdokumenten und IONOS AI Hub Embeddings.",
            last,
            truncate_chars(&context, OFFLINE_CONTEXT_CHARS)
        )
    }
}

#[async_trait]
impl LlmProvider for IonosProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ionos
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn chat(&self, request: ChatRequest, _model: &str) -> Result<String, ApiError> {
        match &self.client {
            Some(client) => client.chat(&request, &self.hub_model).await,
            None => Ok(self.offline_answer(&request).await),
        }
    }

    async fn stream_chat(
        &self,
        request: ChatRequest,
        _model: &str,
    ) -> Result<ChunkReceiver, ApiError> {
        if let Some(client) = &self.client {
            return client.stream_chat(&request, &self.hub_model).await;
        }

        let answer = self.offline_answer(&request).await;
        let delay = self.word_delay;
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            for word in answer.split_whitespace() {
                if tx.send(Ok(format!("{} ", word))).await.is_err() {
                    break;
                }
                tokio::time::sleep(delay).await;
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::openai_compat::tests::spawn_upstream;
    use crate::llm::types::ChatMessage;
    use crate::rag::StaticRetriever;
    use std::sync::Arc;

    fn rag() -> RagContextBuilder {
        RagContextBuilder::new(Arc::new(StaticRetriever))
    }

    fn offline() -> IonosProvider {
        IonosProvider::from_settings(&IonosSettings::default(), rag())
            .unwrap()
            .with_word_delay(Duration::ZERO)
    }

    fn question() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("Was ist ein Kaufvertrag?")])
    }

    #[tokio::test]
    async fn offline_answer_echoes_question_and_context() {
        let provider = offline();
        assert!(provider.is_available());
        assert!(!provider.is_online());

        let answer = provider.chat(question(), "ionos-legal").await.unwrap();
        assert!(answer.starts_with(
            "🏛️ [IONOS + RAG] Deutsche Rechtsfrage: 'Was ist ein Kaufvertrag?'\n\nRAG Context: Relevante deutsche Rechtsdokumente:\n- BGH Urteil"
        ));
        assert!(answer.ends_with("IONOS AI Hub Embeddings."));

        let context = rag().build_context("Was ist ein Kaufvertrag?").await;
        let expected_context = truncate_chars(&context, 200);
        assert!(answer.contains(&format!("RAG Context: {}...\n\n", expected_context)));
    }

    #[tokio::test]
    async fn offline_answer_handles_empty_conversations() {
        let answer = offline()
            .chat(ChatRequest::new(Vec::new()), "ionos-legal")
            .await
            .unwrap();
        assert!(answer.starts_with("🏛️ [IONOS + RAG] Deutsche Rechtsfrage: ''"));
    }

    #[tokio::test]
    async fn offline_stream_yields_words_with_trailing_space() {
        let provider = offline();
        let full = provider.chat(question(), "ionos-legal").await.unwrap();
        let mut rx = provider.stream_chat(question(), "ionos-legal").await.unwrap();

        let mut words = Vec::new();
        while let Some(chunk) = rx.recv().await {
            words.push(chunk.unwrap());
        }
        assert!(words.iter().all(|w| w.ends_with(' ') && !w.trim().is_empty()));
        assert_eq!(words.len(), full.split_whitespace().count());
        assert_eq!(words[0], "🏛️ ");
    }

    #[tokio::test]
    async fn token_forwards_to_configured_hub_model() {
        let (base_url, seen) = spawn_upstream("ok").await;
        let settings = IonosSettings {
            api_token: Some("test-key".to_string()),
            base_url,
            model: "meta-llama/Llama-3.3-70B-Instruct".to_string(),
            ..Default::default()
        };
        let provider = IonosProvider::from_settings(&settings, rag()).unwrap();
        assert!(provider.is_online());

        let answer = provider.chat(question(), "ionos-legal").await.unwrap();
        assert_eq!(answer, "Antwort von meta-llama/Llama-3.3-70B-Instruct");
        assert_eq!(
            seen.lock().unwrap()[0]["model"],
            "meta-llama/Llama-3.3-70B-Instruct"
        );
    }
}
