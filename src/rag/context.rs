use std::sync::Arc;

use super::retriever::{DocumentRetriever, RetrievedDocument};
use crate::llm::types::ChatMessage;

pub const NO_DOCUMENTS: &str = "Keine spezifischen Dokumente gefunden.";
pub const CONTEXT_UNAVAILABLE: &str = "RAG Context nicht verfügbar.";

const CONTEXT_HEADER: &str = "Relevante deutsche Rechtsdokumente:\n";
const CONTEXT_DOCUMENTS: usize = 3;
const EXCERPT_CHARS: usize = 200;

#[derive(Clone)]
pub struct RagContextBuilder {
    retriever: Arc<dyn DocumentRetriever>,
}

impl RagContextBuilder {
    pub fn new(retriever: Arc<dyn DocumentRetriever>) -> Self {
        Self { retriever }
    }

    /// Never fails: retrieval errors degrade to a fixed notice.
    pub async fn build_context(&self, query: &str) -> String {
        match self.retriever.search(query, CONTEXT_DOCUMENTS).await {
            Ok(docs) if docs.is_empty() => NO_DOCUMENTS.to_string(),
            Ok(docs) => format_context(&docs),
            Err(err) => {
                tracing::error!("RAG context retrieval failed: {}", err);
                CONTEXT_UNAVAILABLE.to_string()
            }
        }
    }

    /// Prepends the legal-expert system message built from the last message.
    pub async fn augment_messages(&self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let Some(last) = messages.last() else {
            return messages;
        };
        let context = self.build_context(&last.content).await;

        let mut augmented = Vec::with_capacity(messages.len() + 1);
        augmented.push(ChatMessage::system(system_prompt(&context)));
        augmented.extend(messages);
        augmented
    }
}

fn format_context(docs: &[RetrievedDocument]) -> String {
    let mut context = String::from(CONTEXT_HEADER);
    for doc in docs {
        context.push_str(&format!(
            "- {}: {}...\n",
            doc.title,
            truncate_chars(&doc.excerpt, EXCERPT_CHARS)
        ));
    }
    context
}

fn system_prompt(context: &str) -> String {
    format!(
        "Du bist ein deutsches Rechtssystem-Experte. Verwende diese Informationen:\n\n\
         {}\n\n\
         Antworte auf Deutsch und zitiere relevante Gesetze und Rechtsprechung.",
        context
    )
}

/// First `max` characters (not bytes) of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ApiError;
    use crate::rag::StaticRetriever;
    use async_trait::async_trait;

    struct FailingRetriever;

    #[async_trait]
    impl DocumentRetriever for FailingRetriever {
        async fn search(&self, _: &str, _: usize) -> Result<Vec<RetrievedDocument>, ApiError> {
            Err(ApiError::Internal("index offline".into()))
        }
    }

    struct EmptyRetriever;

    #[async_trait]
    impl DocumentRetriever for EmptyRetriever {
        async fn search(&self, _: &str, _: usize) -> Result<Vec<RetrievedDocument>, ApiError> {
            Ok(Vec::new())
        }
    }

    fn builder() -> RagContextBuilder {
        RagContextBuilder::new(Arc::new(StaticRetriever))
    }

    #[tokio::test]
    async fn context_lists_titles_with_excerpts() {
        let context = builder().build_context("Kaufvertrag").await;
        assert_eq!(
            context,
            "Relevante deutsche Rechtsdokumente:\n\
             - BGH Urteil - Kaufvertragsrecht: Bei Kaufverträgen nach § 433 BGB entstehen gegenseitige Verpflichtungen......\n\
             - § 280 BGB - Schadensersatz: Verletzt der Schuldner eine Pflicht aus dem Schuldverhältnis......\n"
        );
    }

    #[tokio::test]
    async fn context_degrades_on_empty_and_failing_retrievers() {
        let empty = RagContextBuilder::new(Arc::new(EmptyRetriever));
        assert_eq!(empty.build_context("x").await, NO_DOCUMENTS);

        let failing = RagContextBuilder::new(Arc::new(FailingRetriever));
        assert_eq!(failing.build_context("x").await, CONTEXT_UNAVAILABLE);
    }

    #[tokio::test]
    async fn augment_prepends_system_message() {
        let messages = vec![
            ChatMessage::user("Hallo"),
            ChatMessage::new("assistant", "Guten Tag"),
            ChatMessage::user("Was ist Schadensersatz?"),
        ];
        let augmented = builder().augment_messages(messages.clone()).await;

        assert_eq!(augmented.len(), 4);
        assert_eq!(augmented[0].role, "system");
        assert!(augmented[0]
            .content
            .starts_with("Du bist ein deutsches Rechtssystem-Experte."));
        assert!(augmented[0].content.contains("§ 280 BGB - Schadensersatz"));
        assert!(augmented[0]
            .content
            .ends_with("Antworte auf Deutsch und zitiere relevante Gesetze und Rechtsprechung."));
        assert_eq!(&augmented[1..], &messages[..]);
    }

    #[tokio::test]
    async fn augment_leaves_empty_conversations_alone() {
        assert!(builder().augment_messages(Vec::new()).await.is_empty());
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("§§§§", 2), "§§");
        assert_eq!(truncate_chars("kurz", 200), "kurz");
        assert_eq!(truncate_chars("", 3), "");
    }
}
