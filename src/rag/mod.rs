//! Retrieval-augmented prompting.
//!
//! - `DocumentRetriever` / `StaticRetriever`: where excerpts come from
//! - `RagContextBuilder`: turns excerpts into a context block and prepends
//!   it to a conversation as a system message

mod context;
mod retriever;

pub use context::{truncate_chars, RagContextBuilder, CONTEXT_UNAVAILABLE, NO_DOCUMENTS};
pub use retriever::{DocumentRetriever, RetrievedDocument, StaticRetriever};
