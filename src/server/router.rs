use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::settings::ServerSettings;
use crate::server::handlers::{documents, health, openai};
use crate::state::AppState;

/// Creates the application router.
///
/// - `/health` and `/api/providers`: status
/// - `/api/upload`, `/api/documents`, `/api/search`: document intake and lookup
/// - `/v1/models`, `/v1/chat/completions`: OpenAI-compatible chat with RAG context
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server);
    let body_limit = DefaultBodyLimit::max(state.settings.server.max_upload_bytes());

    Router::new()
        .route("/health", get(health::health))
        .route("/api/providers", get(health::list_providers))
        .route("/api/upload", post(documents::upload_documents))
        .route("/api/documents", get(documents::list_documents))
        .route("/api/documents/:document_id", get(documents::get_document))
        .route(
            "/api/documents/:document_id/file",
            get(documents::download_document),
        )
        .route("/api/search", get(documents::search_documents))
        .route("/v1/models", get(openai::list_models))
        .route("/v1/chat/completions", post(openai::chat_completions))
        .with_state(state)
        .layer(body_limit)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(settings: &ServerSettings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match resolve_allowed_origins(&settings.cors_allowed_origins) {
        Some(origins) => layer.allow_origin(AllowOrigin::list(origins)),
        None => layer.allow_origin(Any),
    }
}

/// `None` means any origin: the list is empty or contains `*`.
fn resolve_allowed_origins(configured: &[String]) -> Option<Vec<HeaderValue>> {
    let origins = configured
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .collect::<Vec<_>>();

    if origins.is_empty() || origins.contains(&"*") {
        return None;
    }

    let parsed = origins
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect::<Vec<_>>();
    Some(parsed)
}
