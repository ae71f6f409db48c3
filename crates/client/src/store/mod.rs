//! Document store collaborator.
//!
//! A schemaless store with two capabilities: insert a document into a
//! collection, and find the documents whose field equals a value. Documents
//! are addressed by store-generated ids, never by a key we choose.
//!
//! # Implementations
//!
//! - [`RestDocumentStore`] - JSON-over-HTTP client for a hosted store
//! - [`MemoryDocumentStore`] - In-process store for tests and offline use

mod memory;
mod rest;

pub use memory::MemoryDocumentStore;
pub use rest::RestDocumentStore;

use async_trait::async_trait;
use thiserror::Error;

use portfolio_core::DocumentId;

/// Field map of a schemaless document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-generated id.
    pub id: DocumentId,
    /// Document contents.
    pub fields: Fields,
}

/// Errors that can occur when talking to a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused to serve the request.
    #[error("document store unavailable")]
    Unavailable,

    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with something we could not interpret.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A document could not be converted to or from its field map.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Any other rejection, with the store's message when it gave one.
    #[error("store error (status {status}): {}", .message.as_deref().unwrap_or("no details"))]
    Service {
        /// HTTP status.
        status: u16,
        /// Message supplied by the store, if any.
        message: Option<String>,
    },
}

/// Capabilities the profile workflow needs from a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document and return its generated id.
    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError>;

    /// All documents in `collection` whose `field` equals `value`, oldest first.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = StoreError::Service {
            status: 403,
            message: Some("permission denied".to_string()),
        };
        assert_eq!(err.to_string(), "store error (status 403): permission denied");

        let err = StoreError::Service {
            status: 500,
            message: None,
        };
        assert_eq!(err.to_string(), "store error (status 500): no details");
    }
}
