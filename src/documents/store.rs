//! Document metadata store.
//!
//! Runs on Postgres in deployments and on SQLite for local use and tests,
//! through the same `Any` pool. Queries use `$N` placeholders, which both
//! backends accept; only the DDL differs per dialect.

use chrono::SecondsFormat;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};

use super::models::{
    DocumentFilter, LegalDocument, LegalEntity, NewDocument, NewEntity, STATUS_UPLOADED,
};
use crate::core::errors::ApiError;

const DOCUMENT_COLUMNS: &str = "document_id, title, original_filename, primary_domain, \
     sub_domains, legal_area_confidence, court_level, court_location, case_number, \
     decision_date, processing_status, created_at, s3_original_key, s3_processed_key";

const ENTITY_COLUMNS: &str =
    "id, document_id, entity_text, entity_type, flair_confidence, legal_classification";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbBackend {
    Postgres,
    Sqlite,
}

/// Drops a `+driver` suffix from the scheme, so SQLAlchemy-style urls such as
/// `postgresql+asyncpg://` reach sqlx as `postgresql://`.
pub fn normalize_url(url: &str) -> String {
    match url.split_once(':') {
        Some((scheme, rest)) if scheme.contains('+') => {
            let base = scheme.split('+').next().unwrap_or(scheme);
            format!("{}:{}", base, rest)
        }
        _ => url.to_string(),
    }
}

impl DbBackend {
    pub fn from_url(url: &str) -> Result<Self, ApiError> {
        let url = normalize_url(url);
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbBackend::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(DbBackend::Sqlite)
        } else {
            Err(ApiError::BadRequest(format!(
                "Unsupported database url scheme: {}",
                url.split(':').next().unwrap_or_default()
            )))
        }
    }

    fn entity_id_column(self) -> &'static str {
        match self {
            DbBackend::Postgres => "id BIGSERIAL PRIMARY KEY",
            DbBackend::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }
}

#[derive(Clone)]
pub struct DocumentStore {
    pool: AnyPool,
    backend: DbBackend,
}

impl DocumentStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, ApiError> {
        sqlx::any::install_default_drivers();
        let url = normalize_url(url);
        let backend = DbBackend::from_url(&url)?;

        let in_memory = backend == DbBackend::Sqlite && url.contains(":memory:");
        let mut options = AnyPoolOptions::new().max_connections(max_connections.max(1));
        if in_memory {
            // every connection to :memory: is a separate database
            options = options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options
            .connect(&url)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to document db: {}", e)))?;

        let store = Self { pool, backend };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn backend(&self) -> DbBackend {
        self.backend
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS legal_documents (
                document_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                original_filename TEXT,
                primary_domain TEXT NOT NULL,
                sub_domains TEXT,
                legal_area_confidence DOUBLE PRECISION,
                court_level TEXT,
                court_location TEXT,
                case_number TEXT,
                decision_date TEXT,
                processing_status TEXT NOT NULL DEFAULT 'uploaded',
                created_at TEXT NOT NULL,
                s3_original_key TEXT,
                s3_processed_key TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init legal_documents table: {}", e)))?;

        let entities_ddl = format!(
            "CREATE TABLE IF NOT EXISTS legal_entities (
                {},
                document_id TEXT NOT NULL,
                entity_text TEXT NOT NULL,
                entity_type TEXT,
                flair_confidence DOUBLE PRECISION,
                legal_classification TEXT
            )",
            self.backend.entity_id_column()
        );
        sqlx::query(&entities_ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                ApiError::internal(format!("Failed to init legal_entities table: {}", e))
            })?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_legal_entities_document ON legal_entities(document_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create index: {}", e)))?;

        Ok(())
    }

    pub async fn insert_document(&self, doc: NewDocument) -> Result<LegalDocument, ApiError> {
        let created_at = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        sqlx::query(
            "INSERT INTO legal_documents \
             (document_id, title, original_filename, primary_domain, court_level, \
              processing_status, created_at, s3_original_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&doc.document_id)
        .bind(&doc.title)
        .bind(doc.original_filename.clone())
        .bind(&doc.primary_domain)
        .bind(doc.court_level.clone())
        .bind(STATUS_UPLOADED)
        .bind(&created_at)
        .bind(doc.s3_original_key.clone())
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert document: {}", e)))?;

        Ok(LegalDocument {
            document_id: doc.document_id,
            title: doc.title,
            original_filename: doc.original_filename,
            primary_domain: doc.primary_domain,
            sub_domains: None,
            legal_area_confidence: None,
            court_level: doc.court_level,
            court_location: None,
            case_number: None,
            decision_date: None,
            processing_status: STATUS_UPLOADED.to_string(),
            created_at,
            s3_original_key: doc.s3_original_key,
            s3_processed_key: None,
        })
    }

    pub async fn get_document(&self, document_id: &str) -> Result<Option<LegalDocument>, ApiError> {
        let sql = format!(
            "SELECT {} FROM legal_documents WHERE document_id = $1",
            DOCUMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    /// Newest first.
    pub async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<Vec<LegalDocument>, ApiError> {
        let mut sql = format!("SELECT {} FROM legal_documents WHERE 1 = 1", DOCUMENT_COLUMNS);
        let mut binds: Vec<String> = Vec::new();

        for (column, value) in [
            ("primary_domain", &filter.domain),
            ("court_level", &filter.court_level),
            ("processing_status", &filter.status),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                binds.push(value.to_string());
                sql.push_str(&format!(" AND {} = ${}", column, binds.len()));
            }
        }
        sql.push_str(&format!(
            " ORDER BY created_at DESC, document_id LIMIT ${}",
            binds.len() + 1
        ));

        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }
        let rows = query
            .bind(filter.effective_limit())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_document).collect()
    }

    /// Case-insensitive substring match on title and original filename.
    pub async fn search_documents(
        &self,
        query: &str,
        domain: Option<&str>,
        limit: i64,
    ) -> Result<Vec<LegalDocument>, ApiError> {
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let mut sql = format!(
            "SELECT {} FROM legal_documents \
             WHERE (LOWER(title) LIKE $1 ESCAPE '\\' \
                OR LOWER(COALESCE(original_filename, '')) LIKE $1 ESCAPE '\\')",
            DOCUMENT_COLUMNS
        );
        let domain = domain.filter(|d| !d.is_empty());
        if domain.is_some() {
            sql.push_str(" AND primary_domain = $2 ORDER BY created_at DESC LIMIT $3");
        } else {
            sql.push_str(" ORDER BY created_at DESC LIMIT $2");
        }

        let mut statement = sqlx::query(&sql).bind(pattern);
        if let Some(domain) = domain {
            statement = statement.bind(domain.to_string());
        }
        let rows = statement
            .bind(limit.clamp(1, DocumentFilter::MAX_LIMIT))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_document).collect()
    }

    pub async fn count_documents(&self) -> Result<i64, ApiError> {
        let row = sqlx::query("SELECT COUNT(*) FROM legal_documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    pub async fn insert_entity(&self, entity: NewEntity) -> Result<i64, ApiError> {
        let row = sqlx::query(
            "INSERT INTO legal_entities \
             (document_id, entity_text, entity_type, flair_confidence, legal_classification) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(entity.document_id)
        .bind(entity.entity_text)
        .bind(entity.entity_type)
        .bind(entity.flair_confidence)
        .bind(entity.legal_classification)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert entity: {}", e)))?;

        Ok(row.try_get::<i64, _>("id")?)
    }

    pub async fn entities_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<LegalEntity>, ApiError> {
        let sql = format!(
            "SELECT {} FROM legal_entities WHERE document_id = $1 ORDER BY id ASC",
            ENTITY_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;

        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            entities.push(LegalEntity {
                id: row.try_get("id")?,
                document_id: row.try_get("document_id")?,
                entity_text: row.try_get("entity_text")?,
                entity_type: row.try_get("entity_type")?,
                flair_confidence: row.try_get("flair_confidence")?,
                legal_classification: row.try_get("legal_classification")?,
            });
        }
        Ok(entities)
    }
}

fn row_to_document(row: &AnyRow) -> Result<LegalDocument, ApiError> {
    Ok(LegalDocument {
        document_id: row.try_get("document_id")?,
        title: row.try_get("title")?,
        original_filename: row.try_get("original_filename")?,
        primary_domain: row.try_get("primary_domain")?,
        sub_domains: row.try_get("sub_domains")?,
        legal_area_confidence: row.try_get("legal_area_confidence")?,
        court_level: row.try_get("court_level")?,
        court_location: row.try_get("court_location")?,
        case_number: row.try_get("case_number")?,
        decision_date: row.try_get("decision_date")?,
        processing_status: row.try_get("processing_status")?,
        created_at: row.try_get("created_at")?,
        s3_original_key: row.try_get("s3_original_key")?,
        s3_processed_key: row.try_get("s3_processed_key")?,
    })
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
