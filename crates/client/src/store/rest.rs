//! REST document store client.
//!
//! - `POST v1/collections/{collection}/documents` with `{"fields": {...}}`,
//!   answered by `{"id": "..."}`
//! - `GET v1/collections/{collection}/documents?field=..&value=..`, answered by
//!   `{"documents": [{"id": "...", "fields": {...}}]}`

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use portfolio_core::DocumentId;

use super::{Document, DocumentStore, Fields, StoreError};
use crate::identity::API_KEY_HEADER;

#[derive(Debug, Serialize)]
struct InsertRequest<'a> {
    fields: &'a Fields,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<DocumentBody>,
}

#[derive(Debug, Deserialize)]
struct DocumentBody {
    id: String,
    #[serde(default)]
    fields: Fields,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for a hosted document store.
#[derive(Clone)]
pub struct RestDocumentStore {
    inner: Arc<RestDocumentStoreInner>,
}

struct RestDocumentStoreInner {
    client: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl RestDocumentStore {
    /// Create a client for the store rooted at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: Url, api_key: SecretString) -> Self {
        Self {
            inner: Arc::new(RestDocumentStoreInner {
                client,
                base_url,
                api_key,
            }),
        }
    }

    /// URL of a collection's documents, with the collection name escaped.
    fn documents_url(&self, collection: &str) -> Result<Url, StoreError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::MalformedResponse("store URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["v1", "collections", collection, "documents"]);
        Ok(url)
    }

    /// Read the body of a response, turning non-2xx statuses into errors.
    async fn read_body(response: reqwest::Response) -> Result<String, StoreError> {
        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(StoreError::Unavailable);
        }
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.message);
            return Err(StoreError::Service {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    #[instrument(skip(self, fields))]
    async fn insert(&self, collection: &str, fields: Fields) -> Result<DocumentId, StoreError> {
        let response = self
            .inner
            .client
            .post(self.documents_url(collection)?)
            .header(API_KEY_HEADER, self.inner.api_key.expose_secret())
            .json(&InsertRequest { fields: &fields })
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let parsed: InsertResponse = serde_json::from_str(&body)
            .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;

        debug!(document_id = %parsed.id, "document inserted");
        Ok(DocumentId::new(parsed.id))
    }

    #[instrument(skip(self))]
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        let mut url = self.documents_url(collection)?;
        url.query_pairs_mut()
            .append_pair("field", field)
            .append_pair("value", value);

        let response = self
            .inner
            .client
            .get(url)
            .header(API_KEY_HEADER, self.inner.api_key.expose_secret())
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let parsed: QueryResponse = serde_json::from_str(&body)
            .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;

        debug!(matches = parsed.documents.len(), "query answered");
        Ok(parsed
            .documents
            .into_iter()
            .map(|doc| Document {
                id: DocumentId::new(doc.id),
                fields: doc.fields,
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store(base: &str) -> RestDocumentStore {
        RestDocumentStore::new(
            reqwest::Client::new(),
            Url::parse(base).unwrap(),
            SecretString::from("key"),
        )
    }

    #[test]
    fn test_documents_url_escapes_collection() {
        let url = store("https://db.example.net/project-1/")
            .documents_url("team profiles")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://db.example.net/project-1/v1/collections/team%20profiles/documents"
        );
    }

    #[test]
    fn test_documents_url_without_trailing_slash() {
        let url = store("http://127.0.0.1:8080").documents_url("users").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/v1/collections/users/documents");
    }

    #[test]
    fn test_query_response_tolerates_missing_fields() {
        let parsed: QueryResponse =
            serde_json::from_str(r#"{"documents":[{"id":"d1"}]}"#).unwrap();
        assert_eq!(parsed.documents.len(), 1);
        assert!(parsed.documents[0].fields.is_empty());

        let empty: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.documents.is_empty());
    }
}
