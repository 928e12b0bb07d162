use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::llm::DEFAULT_MODEL;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "ionos-mistral-deutsches-legal-rag-system";

const FEATURES: [&str; 5] = [
    "Flair German Legal NER",
    "IONOS AI Hub Integration",
    "Mistral AI Integration",
    "Multi-Provider RAG",
    "S3 Object Storage",
];

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "providers": {
            "ionos": state.storage_configured(),
            "mistral": state.llm.mistral_available()
        },
        "features": FEATURES,
        "timestamp": Utc::now().to_rfc3339()
    }))
}

pub async fn list_providers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut providers = Map::new();
    providers.insert(
        "ionos".to_string(),
        json!({
            "available": state.storage_configured(),
            "models": [DEFAULT_MODEL],
            "description": "IONOS AI Hub mit deutschen Legal Embeddings"
        }),
    );
    if state.llm.mistral_available() {
        providers.insert(
            "mistral".to_string(),
            json!({
                "available": true,
                "models": ["mistral-medium-rag", "mistral-large-rag"],
                "description": "Mistral AI mit German Legal RAG Context"
            }),
        );
    }

    Json(json!({ "providers": Value::Object(providers) }))
}
