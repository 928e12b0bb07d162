use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::core::errors::ApiError;
use crate::documents::intake::UploadForm;
use crate::documents::{DocumentFilter, NewDocument};
use crate::llm::ProviderKind;
use crate::state::AppState;
use crate::storage::{document_key, DocumentMetadata, ObjectStorage};

const DEFAULT_SEARCH_LIMIT: i64 = 20;

fn storage(state: &AppState) -> Result<&ObjectStorage, ApiError> {
    state.storage.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable("Object storage is not configured".to_string())
    })
}

pub async fn upload_documents(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = UploadForm::from_multipart(multipart).await?.validate()?;
    let storage = storage(&state)?;

    let metadata = DocumentMetadata {
        document_type: upload.document_type.clone(),
        court_level: upload.court_level.clone(),
        legal_area: upload.legal_area.clone(),
    };

    let mut uploaded = Vec::with_capacity(upload.files.len());
    for file in &upload.files {
        let document_id = Uuid::new_v4().to_string();
        let key = document_key(upload.legal_area.as_deref(), &document_id, &file.filename);

        storage
            .put_document(&key, file.bytes.clone(), file.content_type.as_deref(), &metadata)
            .await
            .map_err(|e| {
                tracing::error!("S3 upload failed for {}: {}", key, e);
                ApiError::Internal(format!("Upload-Fehler: {}", e.message()))
            })?;

        state
            .documents
            .insert_document(NewDocument {
                document_id: document_id.clone(),
                title: file.filename.clone(),
                original_filename: Some(file.filename.clone()),
                primary_domain: upload.legal_area_or_default().to_string(),
                court_level: upload.court_level.clone(),
                s3_original_key: Some(key.clone()),
            })
            .await?;

        tracing::info!("Document uploaded: {} -> {}", file.filename, document_id);
        uploaded.push(json!({
            "id": document_id,
            "filename": file.filename,
            "s3_location": key,
            "status": "processing"
        }));
    }

    Ok(Json(json!({
        "success": true,
        "uploaded_documents": uploaded,
        "processing": "Multi-Provider Legal-RAG Analyse gestartet"
    })))
}

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<DocumentFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.documents.list_documents(&filter).await?;
    Ok(Json(json!({
        "documents": documents,
        "providers": [ProviderKind::Ionos.as_str(), ProviderKind::Mistral.as_str()]
    })))
}

pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state
        .documents
        .get_document(&document_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Dokument {} nicht gefunden", document_id)))?;
    let entities = state.documents.entities_for_document(&document_id).await?;

    Ok(Json(json!({
        "document": document,
        "entities": entities
    })))
}

/// Streams the stored original back with its recorded content type and
/// user metadata as `x-amz-meta-*` headers.
pub async fn download_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key = state
        .documents
        .get_document(&document_id)
        .await?
        .and_then(|doc| doc.s3_original_key)
        .ok_or_else(|| ApiError::NotFound(format!("Dokument {} nicht gefunden", document_id)))?;

    let object = storage(&state)?.get_document(&key).await?;
    let content_type = object
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    for (key, value) in &object.metadata {
        let name = HeaderName::try_from(format!("x-amz-meta-{}", key));
        if let (Ok(name), Ok(value)) = (name, HeaderValue::from_str(value)) {
            headers.insert(name, value);
        }
    }

    Ok((headers, object.bytes))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub domain: Option<String>,
    pub provider: Option<String>,
    pub limit: Option<i64>,
}

pub async fn search_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params
        .query
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Pflichtparameter 'query' fehlt".to_string()))?;

    let results = state
        .documents
        .search_documents(
            query,
            params.domain.as_deref(),
            params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        )
        .await?;

    let provider = params
        .provider
        .clone()
        .unwrap_or_else(|| ProviderKind::Ionos.as_str().to_string());
    let search_method =
        if provider == ProviderKind::Mistral.as_str() && state.llm.mistral_available() {
            "Mistral Medium + German Legal RAG"
        } else {
            "IONOS AI Hub + German Legal RAG"
        };

    Ok(Json(json!({
        "query": query,
        "domain_filter": params.domain,
        "provider": provider,
        "results": results,
        "search_method": search_method
    })))
}
