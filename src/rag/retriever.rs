//! Document retrieval for prompt augmentation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub title: String,
    pub excerpt: String,
    pub relevance: f32,
}

#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Best matches first, at most `limit`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>, ApiError>;
}

/// Fixed stand-in for a vector index: always answers with the same two
/// German civil-law sources, whatever the query.
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever;

impl StaticRetriever {
    pub fn documents() -> Vec<RetrievedDocument> {
        vec![
            RetrievedDocument {
                title: "BGH Urteil - Kaufvertragsrecht".to_string(),
                excerpt: "Bei Kaufverträgen nach § 433 BGB entstehen gegenseitige Verpflichtungen..."
                    .to_string(),
                relevance: 0.89,
            },
            RetrievedDocument {
                title: "§ 280 BGB - Schadensersatz".to_string(),
                excerpt: "Verletzt der Schuldner eine Pflicht aus dem Schuldverhältnis..."
                    .to_string(),
                relevance: 0.76,
            },
        ]
    }
}

#[async_trait]
impl DocumentRetriever for StaticRetriever {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>, ApiError> {
        tracing::debug!(query_len = query.len(), limit, "static retrieval");
        Ok(Self::documents().into_iter().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_fixed_documents_in_relevance_order() {
        let docs = StaticRetriever.search("Mietminderung", 3).await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "BGH Urteil - Kaufvertragsrecht");
        assert_eq!(docs[1].title, "§ 280 BGB - Schadensersatz");
        assert!(docs[0].relevance > docs[1].relevance);
    }

    #[tokio::test]
    async fn honours_limit() {
        assert_eq!(StaticRetriever.search("x", 1).await.unwrap().len(), 1);
        assert!(StaticRetriever.search("x", 0).await.unwrap().is_empty());
    }
}
