use std::sync::Arc;

use tokio::sync::mpsc;

use super::ionos::IonosProvider;
use super::mistral::MistralProvider;
use super::provider::{ChunkReceiver, LlmProvider};
use super::routing::{model_catalog, resolve_model, ModelCard, ModelRoute};
use super::types::{ChatRequest, ProviderKind};
use crate::core::config::Settings;
use crate::core::errors::ApiError;
use crate::rag::RagContextBuilder;

/// Routes chat requests to IONOS or Mistral, falling back to IONOS whenever
/// Mistral cannot serve.
#[derive(Clone)]
pub struct LlmService {
    ionos: Arc<dyn LlmProvider>,
    mistral: Arc<dyn LlmProvider>,
    list_mistral_models: bool,
}

impl LlmService {
    pub fn new(
        ionos: Arc<dyn LlmProvider>,
        mistral: Arc<dyn LlmProvider>,
        list_mistral_models: bool,
    ) -> Self {
        Self {
            ionos,
            mistral,
            list_mistral_models,
        }
    }

    pub fn from_settings(settings: &Settings, rag: RagContextBuilder) -> Result<Self, ApiError> {
        let ionos = IonosProvider::from_settings(&settings.ionos, rag)?;
        let mistral = MistralProvider::from_settings(&settings.mistral)?;
        if ionos.is_online() {
            tracing::info!("IONOS AI Hub configured with model {}", settings.ionos.model);
        } else {
            tracing::info!("IONOS AI Hub token not set; answering offline");
        }
        if mistral.is_available() {
            tracing::info!("Mistral AI configured");
        }

        Ok(Self::new(
            Arc::new(ionos),
            Arc::new(mistral),
            settings.mistral.enable_models,
        ))
    }

    pub fn mistral_available(&self) -> bool {
        self.mistral.is_available()
    }

    /// Model ids advertised on `/v1/models`.
    pub fn models(&self) -> Vec<ModelCard> {
        model_catalog(self.mistral_available() && self.list_mistral_models)
    }

    /// Resolves the route, downgrading to IONOS when Mistral is not configured.
    pub fn route(&self, requested_model: &str) -> ModelRoute {
        let route = resolve_model(requested_model);
        if route.provider == ProviderKind::Mistral && !self.mistral_available() {
            tracing::warn!(
                "Mistral requested for '{}' but not configured; using IONOS",
                requested_model
            );
            return ModelRoute::ionos();
        }
        route
    }

    pub async fn generate(
        &self,
        request: ChatRequest,
        requested_model: &str,
    ) -> Result<String, ApiError> {
        let route = self.route(requested_model);
        if route.provider == ProviderKind::Ionos {
            return self.ionos.chat(request, route.model_name).await;
        }

        match self.mistral.chat(request.clone(), route.model_name).await {
            Ok(answer) => Ok(answer),
            Err(err) => {
                tracing::error!("Mistral API error, falling back to IONOS: {}", err);
                let fallback = ModelRoute::ionos();
                self.ionos.chat(request, fallback.model_name).await
            }
        }
    }

    pub async fn generate_stream(
        &self,
        request: ChatRequest,
        requested_model: &str,
    ) -> Result<ChunkReceiver, ApiError> {
        let route = self.route(requested_model);
        if route.provider == ProviderKind::Ionos {
            return self.ionos.stream_chat(request, route.model_name).await;
        }

        let upstream = match self.mistral.stream_chat(request.clone(), route.model_name).await {
            Ok(rx) => rx,
            Err(err) => {
                tracing::error!("Mistral stream failed to open, falling back to IONOS: {}", err);
                let fallback = ModelRoute::ionos();
                return self.ionos.stream_chat(request, fallback.model_name).await;
            }
        };

        Ok(report_stream_errors(upstream))
    }
}

/// Turns the first upstream error into a visible chunk and ends the stream there.
fn report_stream_errors(mut upstream: ChunkReceiver) -> ChunkReceiver {
    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(async move {
        while let Some(item) = upstream.recv().await {
            match item {
                Ok(chunk) => {
                    if tx.send(Ok(chunk)).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    tracing::error!("Mistral stream error: {}", err);
                    let _ = tx
                        .send(Ok(format!("⚠️ Mistral API Fehler: {}", err.message())))
                        .await;
                    return;
                }
            }
        }
    });
    rx
}
