//! Legal document metadata: the `legal_documents` and `legal_entities` tables.

pub mod intake;
pub mod models;
pub mod store;

pub use models::{DocumentFilter, LegalDocument, LegalEntity, NewDocument, NewEntity};
pub use store::{DbBackend, DocumentStore};
