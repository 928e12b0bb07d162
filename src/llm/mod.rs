pub mod ionos;
pub mod mistral;
pub mod openai_compat;
pub mod provider;
pub mod routing;
pub mod service;
pub mod types;

pub use provider::{ChunkReceiver, LlmProvider};
pub use routing::{resolve_model, ModelCard, ModelRoute, DEFAULT_MODEL};
pub use service::LlmService;
pub use types::{ChatMessage, ChatRequest, ProviderKind};
