use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{ChatRequest, ProviderKind};
use crate::core::errors::ApiError;

pub type ChunkReceiver = mpsc::Receiver<Result<String, ApiError>>;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// whether the provider is configured well enough to be asked at all
    fn is_available(&self) -> bool;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model: &str) -> Result<String, ApiError>;

    /// chat completion (streaming); the channel closes when the answer is complete
    async fn stream_chat(&self, request: ChatRequest, model: &str)
        -> Result<ChunkReceiver, ApiError>;
}
