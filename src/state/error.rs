use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize document database: {0}")]
    Database(#[source] anyhow::Error),

    #[error("Failed to initialize object storage: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("Failed to initialize LLM providers: {0}")]
    Provider(#[source] anyhow::Error),
}
