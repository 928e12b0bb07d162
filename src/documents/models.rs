use serde::{Deserialize, Serialize};

pub const STATUS_UPLOADED: &str = "uploaded";
pub const DEFAULT_DOMAIN: &str = "general";

/// Row of `legal_documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalDocument {
    pub document_id: String,
    pub title: String,
    pub original_filename: Option<String>,

    pub primary_domain: String,
    pub sub_domains: Option<String>,
    pub legal_area_confidence: Option<f64>,

    pub court_level: Option<String>,
    pub court_location: Option<String>,
    pub case_number: Option<String>,
    pub decision_date: Option<String>,

    pub processing_status: String,
    pub created_at: String,

    pub s3_original_key: Option<String>,
    pub s3_processed_key: Option<String>,
}

/// Fields known at upload time; everything else starts empty.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub document_id: String,
    pub title: String,
    pub original_filename: Option<String>,
    pub primary_domain: String,
    pub court_level: Option<String>,
    pub s3_original_key: Option<String>,
}

/// Row of `legal_entities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalEntity {
    pub id: i64,
    pub document_id: String,
    pub entity_text: String,
    pub entity_type: Option<String>,
    pub flair_confidence: Option<f64>,
    pub legal_classification: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewEntity {
    pub document_id: String,
    pub entity_text: String,
    pub entity_type: Option<String>,
    pub flair_confidence: Option<f64>,
    pub legal_classification: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentFilter {
    pub limit: Option<i64>,
    pub domain: Option<String>,
    pub court_level: Option<String>,
    pub status: Option<String>,
}

impl DocumentFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        assert_eq!(DocumentFilter::default().effective_limit(), 50);
        let filter = DocumentFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), 1);
        let filter = DocumentFilter {
            limit: Some(10_000),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), 500);
    }
}
