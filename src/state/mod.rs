use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::documents::DocumentStore;
use crate::llm::LlmService;
use crate::rag::{RagContextBuilder, StaticRetriever};
use crate::storage::ObjectStorage;

pub mod error;

use error::InitializationError;

/// Shared state handed to every route.
///
/// `storage` is `None` when no bucket is configured; uploads then answer 503.
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub documents: DocumentStore,
    pub storage: Option<ObjectStorage>,
    pub llm: LlmService,
    pub rag: RagContextBuilder,
}

impl AppState {
    /// Loads configuration, connects the database (creating tables), configures
    /// object storage and the LLM providers.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let raw_config = config
            .load_config()
            .map_err(|e| InitializationError::Config(e.into()))?;
        let settings =
            Settings::from_value(&raw_config).map_err(|e| InitializationError::Config(e.into()))?;
        tracing::info!(
            "Effective configuration: {}",
            config.redact_sensitive_values(&raw_config)
        );

        let database_url = settings
            .database
            .url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| paths.default_database_url());
        let documents = DocumentStore::connect(&database_url, settings.database.max_connections)
            .await
            .map_err(|e| InitializationError::Database(e.into()))?;
        tracing::info!("Document database ready ({:?})", documents.backend());

        let storage = ObjectStorage::from_settings(&settings.storage)
            .map_err(|e| InitializationError::Storage(e.into()))?;
        match &storage {
            Some(storage) => tracing::info!("Object storage bucket: {}", storage.bucket()),
            None => tracing::warn!("No S3 bucket configured; uploads are disabled"),
        }

        Self::assemble(settings, documents, storage)
    }

    /// Builds the provider layer over already-connected backends.
    pub fn assemble(
        settings: Settings,
        documents: DocumentStore,
        storage: Option<ObjectStorage>,
    ) -> Result<Arc<Self>, InitializationError> {
        let rag = RagContextBuilder::new(Arc::new(StaticRetriever));
        let llm = LlmService::from_settings(&settings, rag.clone())
            .map_err(|e| InitializationError::Provider(e.into()))?;

        Ok(Arc::new(AppState {
            settings,
            documents,
            storage,
            llm,
            rag,
        }))
    }

    pub fn storage_configured(&self) -> bool {
        self.storage.is_some()
    }
}
