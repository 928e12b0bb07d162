//! S3-compatible object storage for original document files.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, PutOptions, PutPayload, RetryConfig,
};

use crate::core::config::settings::{non_empty, StorageSettings};
use crate::core::errors::ApiError;
use crate::documents::models::DEFAULT_DOMAIN;

pub const KEY_PREFIX: &str = "legal-documents";

/// User metadata attached to every stored original.
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub document_type: String,
    pub court_level: Option<String>,
    pub legal_area: Option<String>,
}

impl DocumentMetadata {
    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            ("document-type", self.document_type.clone()),
            (
                "court-level",
                self.court_level.clone().unwrap_or_else(|| "unknown".to_string()),
            ),
            (
                "legal-area",
                self.legal_area
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            ),
        ]
    }

    fn to_attributes(&self, content_type: Option<&str>) -> Attributes {
        let mut attributes = Attributes::new();
        for (key, value) in self.pairs() {
            attributes.insert(Attribute::Metadata(key.into()), AttributeValue::from(value));
        }
        if let Some(content_type) = content_type {
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(content_type.to_string()),
            );
        }
        attributes
    }
}

/// A stored original; `metadata` holds the user metadata pairs without the
/// `x-amz-meta-` prefix.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Clone)]
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// `None` when no bucket is configured.
    pub fn from_settings(settings: &StorageSettings) -> Result<Option<Self>, ApiError> {
        let Some(bucket) = settings.bucket_name() else {
            return Ok(None);
        };

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(settings.region.clone())
            .with_virtual_hosted_style_request(false)
            .with_retry(RetryConfig {
                max_retries: settings.max_retries,
                ..Default::default()
            });

        if let Some(endpoint) = non_empty(&settings.endpoint) {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        if let Some(access_key) = non_empty(&settings.access_key) {
            builder = builder.with_access_key_id(access_key);
        }
        if let Some(secret_key) = non_empty(&settings.secret_key) {
            builder = builder.with_secret_access_key(secret_key);
        }

        let store = builder
            .build()
            .map_err(|e| ApiError::internal(format!("Failed to configure S3 client: {}", e)))?;

        Ok(Some(Self {
            store: Arc::new(store),
            bucket: bucket.to_string(),
        }))
    }

    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn put_document(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
        metadata: &DocumentMetadata,
    ) -> Result<(), ApiError> {
        let options = PutOptions {
            attributes: metadata.to_attributes(content_type),
            ..Default::default()
        };
        self.store
            .put_opts(&ObjectPath::from(key), PutPayload::from(bytes), options)
            .await?;
        Ok(())
    }

    pub async fn get_document(&self, key: &str) -> Result<StoredObject, ApiError> {
        let result = match self.store.get(&ObjectPath::from(key)).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(ApiError::NotFound(format!("Object not found: {}", key)))
            }
            Err(err) => return Err(err.into()),
        };

        let mut content_type = None;
        let mut metadata = HashMap::new();
        for (attribute, value) in result.attributes.iter() {
            match attribute {
                Attribute::ContentType => content_type = Some(value.to_string()),
                Attribute::Metadata(name) => {
                    metadata.insert(name.to_string(), value.to_string());
                }
                _ => {}
            }
        }
        let bytes = result.bytes().await?;

        Ok(StoredObject {
            bytes,
            content_type,
            metadata,
        })
    }
}

/// `legal-documents/{legal_area or "general"}/{document_id}/{filename}`
pub fn document_key(legal_area: Option<&str>, document_id: &str, filename: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        KEY_PREFIX,
        legal_area.unwrap_or(DEFAULT_DOMAIN),
        document_id,
        filename
    )
}
