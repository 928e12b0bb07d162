use serde::Serialize;

use super::types::ProviderKind;

pub const DEFAULT_MODEL: &str = "ionos-german-legal-rag";
pub const MODEL_CREATED: i64 = 1677610602;

pub const IONOS_MODEL_NAME: &str = "ionos-legal";
pub const MISTRAL_MEDIUM: &str = "mistral-medium";
pub const MISTRAL_LARGE: &str = "mistral-large";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    pub provider: ProviderKind,
    pub model_name: &'static str,
}

impl ModelRoute {
    pub fn ionos() -> Self {
        Self {
            provider: ProviderKind::Ionos,
            model_name: IONOS_MODEL_NAME,
        }
    }
}

/// Maps a requested model id onto a provider and its model name.
pub fn resolve_model(requested: &str) -> ModelRoute {
    let id = requested.to_lowercase();
    if id.contains("mistral") {
        // "medium" wins over "large" when both appear
        let model_name = if id.contains("medium") {
            MISTRAL_MEDIUM
        } else if id.contains("large") {
            MISTRAL_LARGE
        } else {
            MISTRAL_MEDIUM
        };
        ModelRoute {
            provider: ProviderKind::Mistral,
            model_name,
        }
    } else {
        ModelRoute::ionos()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelCard {
    pub id: &'static str,
    pub object: &'static str,
    pub created: i64,
    pub owned_by: &'static str,
    pub description: &'static str,
}

impl ModelCard {
    fn new(id: &'static str, owned_by: &'static str, description: &'static str) -> Self {
        Self {
            id,
            object: "model",
            created: MODEL_CREATED,
            owned_by,
            description,
        }
    }
}

pub fn model_catalog(mistral_listed: bool) -> Vec<ModelCard> {
    let mut models = vec![ModelCard::new(
        DEFAULT_MODEL,
        "ionos-legal-system",
        "IONOS AI Hub + German Legal RAG",
    )];
    if mistral_listed {
        models.push(ModelCard::new(
            "mistral-medium-rag",
            "mistral-ai",
            "Mistral Medium + German Legal RAG",
        ));
        models.push(ModelCard::new(
            "mistral-large-rag",
            "mistral-ai",
            "Mistral Large + German Legal RAG",
        ));
    }
    models
}
